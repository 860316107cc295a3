//! Per-call de-duplication of emitted paths.

use std::path::PathBuf;

use dashmap::DashSet;

/// Tracks the absolute paths already emitted by one resolve call.
///
/// Overlapping patterns and overlapping task bases can reach the same entry
/// more than once. Every task of a call shares one tracker, so concurrent
/// tasks race on a single atomic insert.
#[derive(Debug, Default)]
pub struct UniqueTracker {
    seen: DashSet<PathBuf>,
}

impl UniqueTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
        }
    }

    /// Record a path. Returns `true` if this is the first time seeing it.
    pub fn track(&self, path: impl Into<PathBuf>) -> bool {
        self.seen.insert(path.into())
    }

    /// Number of distinct paths tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if nothing has been tracked.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_track_new_path() {
        let tracker = UniqueTracker::new();

        assert!(tracker.track("/tmp/a.txt"));
        assert!(!tracker.track("/tmp/a.txt")); // Second time returns false
        assert!(tracker.track("/tmp/b.txt"));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_concurrent_insert_single_winner() {
        let tracker = Arc::new(UniqueTracker::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || tracker.track("/tmp/shared"))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(tracker.len(), 1);
    }
}
