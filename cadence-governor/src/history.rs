use cadence_common::clock::sub_duration;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;

pub const HOUR: Duration = Duration::from_secs(60 * 60);
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Time-ordered record of when actions of one kind were committed.
///
/// Entries are non-decreasing: an append earlier than the newest entry is
/// clamped up to it, so the backward scans in [`count_within`](Self::count_within)
/// and the front pops in [`prune`](Self::prune) stay valid even if the clock
/// steps back.
#[derive(Debug, Default, Clone)]
pub struct ActionHistory {
    entries: VecDeque<DateTime<Utc>>,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `at`, returning the timestamp actually stored.
    pub fn push(&mut self, at: DateTime<Utc>) -> DateTime<Utc> {
        let at = match self.entries.back() {
            Some(&last) if last > at => last,
            _ => at,
        };
        self.entries.push_back(at);
        at
    }

    /// Drop entries that are not strictly inside `(now - window, ..]`.
    /// Returns how many were removed.
    pub fn prune(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        let cutoff = sub_duration(now, window);
        let mut removed = 0;
        while self.entries.front().is_some_and(|t| *t <= cutoff) {
            self.entries.pop_front();
            removed += 1;
        }
        removed
    }

    /// Count entries newer than `now - window`, scanning from the newest and
    /// stopping at the first entry outside the window.
    pub fn count_within(&self, now: DateTime<Utc>, window: Duration) -> u32 {
        let cutoff = sub_duration(now, window);
        let n = self
            .entries
            .iter()
            .rev()
            .take_while(|t| **t > cutoff)
            .count();
        u32::try_from(n).unwrap_or(u32::MAX)
    }

    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.entries.back().copied()
    }

    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.entries.front().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
