use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Per-key "last ran at" bookkeeping for the read-only query path's live
/// DNS checks. Garbage-collected once it exceeds 10,000 entries, the same
/// cap the in-memory job-queue/rate-limit maps use.
pub struct ReadOnlyDebounce {
    last_run: DashMap<String, DateTime<Utc>>,
}

impl ReadOnlyDebounce {
    pub fn new() -> Self {
        Self {
            last_run: DashMap::new(),
        }
    }

    /// Returns whether a live check is allowed for `key` right now, and if
    /// so records `now` as the new last-run time. Check-and-insert happens
    /// under a single `entry()` call so two concurrent callers for the same
    /// key can't both observe a stale last-run time and both proceed.
    pub fn try_acquire(&self, key: &str, now: DateTime<Utc>, min_interval_secs: u64) -> bool {
        let min_interval = chrono::Duration::seconds(min_interval_secs as i64);
        let allowed = match self.last_run.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.signed_duration_since(*entry.get()) < min_interval {
                    false
                } else {
                    entry.insert(now);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        };
        if allowed {
            self.gc(now, min_interval_secs);
        }
        allowed
    }

    fn gc(&self, now: DateTime<Utc>, min_interval_secs: u64) {
        if self.last_run.len() <= 10_000 {
            return;
        }
        let cutoff = chrono::Duration::seconds((min_interval_secs * 2) as i64);
        self.last_run.retain(|_, ts| now.signed_duration_since(*ts) < cutoff);
    }
}

impl Default for ReadOnlyDebounce {
    fn default() -> Self {
        Self::new()
    }
}
