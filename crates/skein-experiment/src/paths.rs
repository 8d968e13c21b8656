//! Results directory layout
//!
//! Results land in `<root>/k_<K>/<label>/<index>/` where `<index>` counts
//! re-runs of the same series; the log file sits alongside the CSVs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Create (or extend) the results directory for a series and return the
/// final per-run path.
pub fn create_results_dir(root: &Path, k: u32, label: &str) -> io::Result<PathBuf> {
    let series = root.join(format!("k_{k}")).join(label);
    if !series.exists() {
        let run = series.join("0");
        fs::create_dir_all(&run)?;
        return Ok(run);
    }
    // series already ran: next numbered sub-directory
    let index = fs::read_dir(&series)?.count();
    let run = series.join(index.to_string());
    fs::create_dir(&run)?;
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_run_creates_index_zero() {
        let root = TempDir::new().unwrap();
        let run = create_results_dir(root.path(), 2, "equal_snap").unwrap();

        assert_eq!(run, root.path().join("k_2").join("equal_snap").join("0"));
        assert!(run.is_dir());
    }

    #[test]
    fn test_reruns_auto_increment() {
        let root = TempDir::new().unwrap();
        let first = create_results_dir(root.path(), 2, "equal_snap").unwrap();
        let second = create_results_dir(root.path(), 2, "equal_snap").unwrap();
        let third = create_results_dir(root.path(), 2, "equal_snap").unwrap();

        assert!(first.ends_with("0"));
        assert!(second.ends_with("1"));
        assert!(third.ends_with("2"));
        assert!(third.is_dir());
    }

    #[test]
    fn test_series_are_separated_by_k_and_label() {
        let root = TempDir::new().unwrap();
        let a = create_results_dir(root.path(), 2, "alpha").unwrap();
        let b = create_results_dir(root.path(), 4, "alpha").unwrap();
        let c = create_results_dir(root.path(), 2, "beta").unwrap();

        assert!(a.ends_with("0"));
        assert!(b.ends_with("0"));
        assert!(c.ends_with("0"));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
