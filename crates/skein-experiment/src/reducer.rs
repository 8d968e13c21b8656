//! Result reduction
//!
//! Flattens an orphanage response into one CSV row per measurement
//! interval, splitting every per-issuer count into an honest and an
//! adversary share keyed off the adversary's node id.

use tracing::info;

use skein_client::OrphanageResponse;
use skein_core::unix_micros;

use crate::controller::ExperimentParams;
use crate::error::ExperimentError;

/// Column order of the result table.
pub const CSV_HEADER: [&str; 16] = [
    "expId",
    "q",
    "mps",
    "honestOrphanageRate",
    "advOrphanageRate",
    "totalOrphans",
    "honestOrphans",
    "advOrphans",
    "totalIssued",
    "honestIssued",
    "advIssued",
    "requester",
    "attackDuration",
    "intervalNum",
    "intervalStart",
    "intervalStop",
];

/// Reduce one orphanage response into CSV rows, one per interval.
pub fn reduce(
    params: &ExperimentParams,
    response: &OrphanageResponse,
) -> Result<Vec<Vec<String>>, ExperimentError> {
    let requester = &response.creator_node_id;
    info!(requester = %requester, "parsing the results");

    let interval_count = params.measure_points.len() + 1;
    let honest_issued = sum_counts(&response.issued_by_node, &params.adversary_id, false, interval_count);
    let adv_issued = sum_counts(&response.issued_by_node, &params.adversary_id, true, interval_count);
    let honest_orphaned = sum_counts(&response.orphans_by_node, &params.adversary_id, false, interval_count);
    let adv_orphaned = sum_counts(&response.orphans_by_node, &params.adversary_id, true, interval_count);

    if honest_issued.iter().sum::<u64>() == 0 {
        return Err(ExperimentError::NoResults(
            "honest issued message list is empty".into(),
        ));
    }
    if adv_issued.iter().sum::<u64>() == 0 {
        return Err(ExperimentError::NoResults(
            "adversary issued message list is empty".into(),
        ));
    }

    let mut interval_stops = params.measure_points.clone();
    interval_stops.push(params.stop_time);

    let mut rows = Vec::with_capacity(interval_count);
    let mut interval_start = params.start_time;
    for i in 0..interval_count {
        let interval_stop = interval_stops[i];
        rows.push(vec![
            params.exp_id.to_string(),
            format!("{:.3}", params.q),
            params.mps.to_string(),
            format!("{:.3}", orphanage_rate(honest_orphaned[i], honest_issued[i])),
            format!("{:.3}", orphanage_rate(adv_orphaned[i], adv_issued[i])),
            (honest_orphaned[i] + adv_orphaned[i]).to_string(),
            honest_orphaned[i].to_string(),
            adv_orphaned[i].to_string(),
            (honest_issued[i] + adv_issued[i]).to_string(),
            honest_issued[i].to_string(),
            adv_issued[i].to_string(),
            requester.clone(),
            params.attack_duration.as_secs().to_string(),
            (i + 1).to_string(),
            unix_micros(interval_start).to_string(),
            unix_micros(interval_stop).to_string(),
        ]);
        interval_start = interval_stop;
    }
    Ok(rows)
}

fn orphanage_rate(orphaned: u64, issued: u64) -> f64 {
    if issued == 0 {
        0.0
    } else {
        orphaned as f64 / issued as f64
    }
}

/// Sum the per-interval counts of either the adversary or everyone else.
/// The adversary id may be a short form of the full issuer id.
fn sum_counts(
    by_node: &std::collections::HashMap<String, Vec<u64>>,
    adversary_id: &str,
    adversary: bool,
    interval_count: usize,
) -> Vec<u64> {
    let mut totals = vec![0u64; interval_count];
    for (issuer, counts) in by_node {
        if is_adversary(issuer, adversary_id) != adversary {
            continue;
        }
        for (i, count) in counts.iter().take(interval_count).enumerate() {
            totals[i] += count;
        }
    }
    totals
}

fn is_adversary(issuer: &str, adversary_id: &str) -> bool {
    !adversary_id.is_empty() && (issuer == adversary_id || issuer.starts_with(adversary_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn at_secs(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn params() -> ExperimentParams {
        ExperimentParams {
            exp_id: 0,
            q: 0.5,
            mps: 60,
            k: 2,
            max_parent_age: Duration::from_secs(60),
            attack_duration: Duration::from_secs(120),
            adversary_id: "adv-node".into(),
            start_time: at_secs(100),
            stop_time: at_secs(160),
            measure_points: vec![at_secs(120), at_secs(140)],
        }
    }

    fn response() -> OrphanageResponse {
        let mut issued = HashMap::new();
        issued.insert("adv-node".to_string(), vec![10u64, 10, 10]);
        issued.insert("honest-a".to_string(), vec![5, 5, 5]);
        issued.insert("honest-b".to_string(), vec![5, 5, 5]);
        let mut orphans = HashMap::new();
        orphans.insert("adv-node".to_string(), vec![1u64, 2, 3]);
        orphans.insert("honest-a".to_string(), vec![0, 1, 2]);
        orphans.insert("honest-b".to_string(), vec![0, 1, 2]);
        OrphanageResponse {
            error: None,
            creator_node_id: "honest-a".into(),
            max_parent_age: 60_000_000,
            orphans_by_node: orphans,
            issued_by_node: issued,
            last_message_id: skein_core::MessageId::EMPTY.to_base58(),
        }
    }

    #[test]
    fn test_one_row_per_interval() {
        let rows = reduce(&params(), &response()).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.len() == CSV_HEADER.len()));
    }

    #[test]
    fn test_honest_and_adversary_shares_are_split() {
        let rows = reduce(&params(), &response()).unwrap();

        // second interval: honest orphaned 2 of 10, adversary 2 of 10
        let row = &rows[1];
        assert_eq!(row[3], "0.200"); // honestOrphanageRate
        assert_eq!(row[4], "0.200"); // advOrphanageRate
        assert_eq!(row[5], "4"); // totalOrphans
        assert_eq!(row[6], "2"); // honestOrphans
        assert_eq!(row[7], "2"); // advOrphans
        assert_eq!(row[8], "20"); // totalIssued
        assert_eq!(row[9], "10"); // honestIssued
        assert_eq!(row[10], "10"); // advIssued
        assert_eq!(row[11], "honest-a"); // requester
        assert_eq!(row[13], "2"); // intervalNum
    }

    #[test]
    fn test_interval_times_are_micro_epochs() {
        let rows = reduce(&params(), &response()).unwrap();

        assert_eq!(rows[0][14], (100_000_000i64).to_string());
        assert_eq!(rows[0][15], (120_000_000i64).to_string());
        assert_eq!(rows[2][14], (140_000_000i64).to_string());
        assert_eq!(rows[2][15], (160_000_000i64).to_string());
    }

    #[test]
    fn test_zero_issued_yields_zero_rate() {
        let mut response = response();
        response
            .issued_by_node
            .insert("honest-a".into(), vec![0, 0, 0]);
        response
            .issued_by_node
            .insert("honest-b".into(), vec![0, 3, 0]);
        response
            .orphans_by_node
            .insert("honest-a".into(), vec![0, 0, 0]);
        response
            .orphans_by_node
            .insert("honest-b".into(), vec![0, 0, 0]);

        let rows = reduce(&params(), &response).unwrap();
        let zero_interval_rate = &reduce(&params(), &response).unwrap()[0][3];

        assert_eq!(zero_interval_rate, "0.000");
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_adversary_short_id_matches_full_issuer() {
        let mut p = params();
        p.adversary_id = "adv".into();

        let rows = reduce(&p, &response()).unwrap();
        assert_eq!(rows[0][10], "10"); // advIssued still attributed
    }

    #[test]
    fn test_missing_adversary_counts_is_an_error() {
        let mut response = response();
        response.issued_by_node.remove("adv-node");
        response.orphans_by_node.remove("adv-node");

        let result = reduce(&params(), &response);
        assert!(matches!(result, Err(ExperimentError::NoResults(_))));
    }

    #[test]
    fn test_rate_math() {
        // mps=60, q=0.5, 3 honest nodes -> adversary 30, honest 10 per node
        let (honest, adversary) = crate::controller::calculate_rates(60, 0.5, 3);
        assert_eq!(adversary, 30);
        assert_eq!(honest, 10);

        // flooring, not rounding
        let (honest, adversary) = crate::controller::calculate_rates(50, 0.48, 7);
        assert_eq!(adversary, 24);
        assert_eq!(honest, 3);
    }
}
