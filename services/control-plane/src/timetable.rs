//! Rough mapping from wall-clock time to log index.
//!
//! Records carry the log index of their last write, not a timestamp. To
//! answer "is this record older than an hour?" the store periodically
//! witnesses `(index, now)` pairs, and GC asks for the newest index that was
//! already current at the cutoff time.
//!
//! The mapping is approximate by construction: a lookup returns an index at
//! or before the requested time, never after, so a caller comparing
//! `modify_index <= nearest_index(cutoff)` may under-collect but will not
//! treat a recent record as old.

use std::collections::VecDeque;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use drover_id::Index;

/// Converts a wall-clock cutoff into a log index threshold.
pub trait IndexOracle: Send + Sync {
    /// Newest index known to be current at or before `when`.
    ///
    /// Monotonic non-decreasing in `when`. Returns [`Index::ZERO`] when no
    /// index is known to be that old.
    fn nearest_index(&self, when: DateTime<Utc>) -> Index;
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    index: Index,
    time: DateTime<Utc>,
}

/// Rolling table of witnessed `(index, time)` pairs, newest first.
#[derive(Debug)]
pub struct TimeTable {
    granularity: TimeDelta,
    limit: TimeDelta,
    entries: RwLock<VecDeque<Entry>>,
}

impl TimeTable {
    /// Creates a table keeping at most one entry per `granularity` and no
    /// entry more than `limit` older than the newest.
    pub fn new(granularity: Duration, limit: Duration) -> Self {
        Self {
            granularity: TimeDelta::from_std(granularity).unwrap_or(TimeDelta::MAX),
            limit: TimeDelta::from_std(limit).unwrap_or(TimeDelta::MAX),
            entries: RwLock::new(VecDeque::new()),
        }
    }

    /// Records that `index` was current at `when`.
    ///
    /// Witnesses that go backwards in index, or arrive within `granularity`
    /// of the newest entry, are ignored.
    pub fn witness(&self, index: Index, when: DateTime<Utc>) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(newest) = entries.front() {
            if newest.index > index || when - newest.time < self.granularity {
                return;
            }
        }

        entries.push_front(Entry { index, time: when });
        while entries
            .back()
            .is_some_and(|oldest| when - oldest.time > self.limit)
        {
            entries.pop_back();
        }
    }

    /// Time at which the newest entry at or below `index` was witnessed.
    pub fn nearest_time(&self, index: Index) -> Option<DateTime<Utc>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let pos = entries.partition_point(|entry| entry.index > index);
        entries.get(pos).map(|entry| entry.time)
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IndexOracle for TimeTable {
    fn nearest_index(&self, when: DateTime<Utc>) -> Index {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let pos = entries.partition_point(|entry| entry.time > when);
        entries.get(pos).map_or(Index::ZERO, |entry| entry.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    #[test]
    fn test_nearest_index_before_first_witness() {
        let table = TimeTable::new(Duration::from_secs(1), Duration::from_secs(60));
        table.witness(Index::new(10), at(100));
        assert_eq!(table.nearest_index(at(50)), Index::ZERO);
        assert_eq!(table.nearest_index(at(100)), Index::new(10));
        assert_eq!(table.nearest_index(at(500)), Index::new(10));
    }

    #[test]
    fn test_nearest_index_picks_newest_not_after() {
        let table = TimeTable::new(Duration::from_secs(1), Duration::from_secs(600));
        table.witness(Index::new(10), at(0));
        table.witness(Index::new(20), at(10));
        table.witness(Index::new(30), at(20));

        assert_eq!(table.nearest_index(at(5)), Index::new(10));
        assert_eq!(table.nearest_index(at(10)), Index::new(20));
        assert_eq!(table.nearest_index(at(19)), Index::new(20));
        assert_eq!(table.nearest_index(at(25)), Index::new(30));
    }

    #[test]
    fn test_witness_respects_granularity() {
        let table = TimeTable::new(Duration::from_secs(10), Duration::from_secs(600));
        table.witness(Index::new(1), at(0));
        table.witness(Index::new(2), at(5));
        table.witness(Index::new(3), at(10));
        assert_eq!(table.len(), 2);
        assert_eq!(table.nearest_index(at(9)), Index::new(1));
    }

    #[test]
    fn test_witness_ignores_older_index() {
        let table = TimeTable::new(Duration::from_secs(1), Duration::from_secs(600));
        table.witness(Index::new(5), at(0));
        table.witness(Index::new(4), at(10));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_witness_trims_to_limit() {
        let table = TimeTable::new(Duration::from_secs(10), Duration::from_secs(30));
        for i in 0..10 {
            table.witness(Index::new(i + 1), at(i as i64 * 10));
        }
        assert_eq!(table.len(), 4);
        // History older than the limit has been forgotten.
        assert_eq!(table.nearest_index(at(10)), Index::ZERO);
    }

    #[test]
    fn test_sparse_witnesses_trimmed_by_age() {
        let table = TimeTable::new(Duration::from_secs(1), Duration::from_secs(60));
        table.witness(Index::new(1), at(0));
        table.witness(Index::new(2), at(30));
        assert_eq!(table.len(), 2);

        // Far fewer entries than the limit could hold, but both are too old.
        table.witness(Index::new(3), at(1000));
        assert_eq!(table.len(), 1);
        assert_eq!(table.nearest_index(at(500)), Index::ZERO);
        assert_eq!(table.nearest_index(at(1000)), Index::new(3));
    }

    #[test]
    fn test_nearest_time() {
        let table = TimeTable::new(Duration::from_secs(1), Duration::from_secs(600));
        table.witness(Index::new(10), at(0));
        table.witness(Index::new(20), at(10));

        assert_eq!(table.nearest_time(Index::new(5)), None);
        assert_eq!(table.nearest_time(Index::new(15)), Some(at(0)));
        assert_eq!(table.nearest_time(Index::new(20)), Some(at(10)));
    }
}
