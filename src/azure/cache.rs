//! Snapshot cache.
//!
//! Reuses a saved snapshot when asked to, otherwise discovers afresh and
//! writes the result back so the next run can skip Azure entirely.

use crate::models::{load_snapshot, save_snapshot, Snapshot};
use std::error::Error;
use std::path::Path;

/// Read a snapshot from `cache_file`, or run `discover` and save its result.
///
/// # Arguments
/// * `cache_file` - Snapshot JSON path, read and written
/// * `use_cache` - Try the file before discovering
/// * `discover` - Produces a fresh snapshot (normally a live Azure query)
///
/// # Returns
/// * `Ok((Snapshot, bool))` - The snapshot and whether it came from the file
/// * `Err` - If discovery fails or the fresh snapshot cannot be written
pub fn read_snapshot_cache<F>(
    cache_file: &Path,
    use_cache: bool,
    discover: F,
) -> Result<(Snapshot, bool), Box<dyn Error>>
where
    F: FnOnce() -> Result<Snapshot, Box<dyn Error>>,
{
    if use_cache {
        match load_snapshot(cache_file) {
            Ok(snapshot) => {
                log::info!("Using snapshot file: {}", cache_file.display());
                return Ok((snapshot, true));
            }
            Err(e) => log::warn!("Snapshot unusable, querying Azure instead: {e}"),
        }
    }

    let snapshot = discover()?;
    log::warn!("Writing snapshot to cache file: {}", cache_file.display());
    save_snapshot(&snapshot, cache_file)?;
    Ok((snapshot, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DependencySet;

    fn empty_snapshot(sub: &str) -> Snapshot {
        Snapshot::new(sub, vec![], vec![], DependencySet::default(), false, 0, None)
    }

    #[test]
    fn test_cache_miss_discovers_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        let (snapshot, cached) =
            read_snapshot_cache(&path, true, || Ok(empty_snapshot("live"))).unwrap();
        assert!(!cached);
        assert_eq!(snapshot.subscription_id, "live");
        assert!(path.exists());

        let (snapshot, cached) = read_snapshot_cache(&path, true, || {
            Err("discover should not run".into())
        })
        .unwrap();
        assert!(cached);
        assert_eq!(snapshot.subscription_id, "live");
    }

    #[test]
    fn test_cache_ignored_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        save_snapshot(&empty_snapshot("old"), &path).unwrap();
        let (snapshot, cached) =
            read_snapshot_cache(&path, false, || Ok(empty_snapshot("new"))).unwrap();
        assert!(!cached);
        assert_eq!(snapshot.subscription_id, "new");
    }

    #[test]
    fn test_corrupt_cache_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        std::fs::write(&path, "{ not json").unwrap();
        let (snapshot, cached) =
            read_snapshot_cache(&path, true, || Ok(empty_snapshot("fresh"))).unwrap();
        assert!(!cached);
        assert_eq!(snapshot.subscription_id, "fresh");
    }
}
