//! Past-cone walker and orphanage measurement
//!
//! Walks the future cone of a start message breadth-first (following
//! approver edges) and buckets issued / orphaned message counts per issuer
//! across operator-supplied time intervals. A message counts as orphaned
//! when nothing in the tangle references it.

use hashbrown::{HashMap, HashSet};
use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

use skein_core::{MessageId, NodeId};

use crate::error::{Result, TangleError};
use crate::tangle::{GradeOfFinality, Tangle};

/// Breadth-first traversal frame: a work queue with a visited set.
#[derive(Default)]
pub struct Walker {
    queue: VecDeque<MessageId>,
    visited: HashSet<MessageId>,
}

impl Walker {
    pub fn new(start: MessageId) -> Self {
        let mut walker = Self::default();
        walker.push(start);
        walker
    }

    pub fn push(&mut self, id: MessageId) {
        self.queue.push_back(id);
    }

    /// Pop the next unvisited id, marking it visited.
    pub fn next(&mut self) -> Option<MessageId> {
        while let Some(id) = self.queue.pop_front() {
            if self.visited.insert(id) {
                return Some(id);
            }
        }
        None
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// Per-issuer interval counts collected by an orphanage walk.
#[derive(Clone, Debug, Default)]
pub struct OrphanageReport {
    /// Messages issued per issuer per interval.
    pub issued: HashMap<String, Vec<u64>>,
    /// Messages without approvers per issuer per interval.
    pub orphaned: HashMap<String, Vec<u64>>,
    /// Most recent High-finality message in range, `MessageId::EMPTY` when
    /// none was seen. Usable as the start of the next walk.
    pub last_confirmed: MessageId,
    /// The max parent age the measured node runs with.
    pub max_parent_age: Duration,
}

/// Walk the cone reachable from `start` and bucket the messages issued
/// within `(t_start, t_stop)` into the intervals delimited by `boundaries`.
///
/// `boundaries` holds the intermediate interval edges; they must be strictly
/// increasing and lie strictly between `t_start` and `t_stop`. With `N - 1`
/// boundaries the report vectors have length `N`.
pub fn orphanage_walk(
    tangle: &Tangle,
    start: MessageId,
    t_start: SystemTime,
    t_stop: SystemTime,
    boundaries: &[SystemTime],
    max_parent_age: Duration,
) -> Result<OrphanageReport> {
    if t_stop <= t_start {
        return Err(TangleError::InvalidBoundaries(
            "stop time does not lie after start time".into(),
        ));
    }
    for pair in boundaries.windows(2) {
        if pair[1] <= pair[0] {
            return Err(TangleError::InvalidBoundaries(
                "measure points are not strictly increasing".into(),
            ));
        }
    }
    if boundaries
        .iter()
        .any(|b| *b <= t_start || *b >= t_stop)
    {
        return Err(TangleError::InvalidBoundaries(
            "measure points must lie strictly between start and stop".into(),
        ));
    }

    // interval edges: every boundary plus the stop time itself
    let mut edges: Vec<SystemTime> = boundaries.to_vec();
    edges.push(t_stop);
    let interval_count = edges.len();

    let mut report = OrphanageReport {
        last_confirmed: MessageId::EMPTY,
        max_parent_age,
        ..OrphanageReport::default()
    };
    let mut last_confirmed_ts = SystemTime::UNIX_EPOCH;

    let mut walker = Walker::new(start);
    while let Some(id) = walker.next() {
        let approvers = tangle.approvers(&id);

        // a missing message never aborts the walk; its approvers are still
        // reachable through the index
        if let Some(message) = tangle.message(&id) {
            let timestamp = message.issuing_time();
            if t_start < timestamp && timestamp < t_stop {
                let issuer = NodeId::from_public_key(&message.issuer_public_key()).to_string();

                let issued = report
                    .issued
                    .entry(issuer.clone())
                    .or_insert_with(|| vec![0; interval_count]);
                let interval = edges.partition_point(|edge| *edge <= timestamp);
                issued[interval] += 1;

                if approvers.is_empty() {
                    report
                        .orphaned
                        .entry(issuer.clone())
                        .or_insert_with(|| vec![0; interval_count])[interval] += 1;
                } else {
                    report
                        .orphaned
                        .entry(issuer)
                        .or_insert_with(|| vec![0; interval_count]);
                }

                // missing metadata skips only the finality bookkeeping
                if last_confirmed_ts < timestamp {
                    if let Some(metadata) = tangle.metadata(&id) {
                        if metadata.grade_of_finality == GradeOfFinality::High {
                            last_confirmed_ts = timestamp;
                            report.last_confirmed = id;
                        }
                    }
                }
            }
        }

        for approver in approvers {
            walker.push(approver);
        }
    }

    Ok(report)
}
