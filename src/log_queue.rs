//! Throttled live-log display queue.
//!
//! Polls and reveals are decoupled: every poll merges the fetched entries into
//! a rolling window and queues the ones never seen before, while a separate
//! reveal tick moves one queued entry at a time onto the visible list. When
//! there is nothing new to reveal the newest visible entry blinks instead.
//!
//! [`LogDisplayQueue`] is a plain owned value with synchronous transitions and
//! no clocks of its own; [`crate::log_feed`] drives it with timers.
//!
//! Invariants held after every transition:
//!
//! - `all_logs` holds each id at most once, sorted newest first, at most
//!   [`MAX_ALL_LOGS`] entries
//! - `displayed` is newest first with at most [`MAX_DISPLAYED_LOGS`] entries
//! - an id is never queued while it is displayed or already queued
//! - entries of one merge batch are revealed oldest first

use crate::config::{MAX_ALL_LOGS, MAX_DISPLAYED_LOGS};
use crate::types::LogEntry;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::collections::VecDeque;

/// What a merge did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Entries newly added to the rolling window
    pub added: usize,
    /// Entries appended to the reveal queue
    pub queued: usize,
    /// Entry revealed straight away because nothing had been shown yet
    pub revealed_immediately: Option<u64>,
}

/// What a reveal tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// The queue head (by id) moved to the top of the visible list
    Revealed(u64),
    /// Nothing queued; the newest visible entry should blink
    Blink,
    /// Nothing queued and nothing visible
    Idle,
}

/// Serializable view of the visible state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot {
    pub displayed: Vec<LogEntry>,
    pub queued: usize,
    pub blinking: bool,
    pub error: Option<String>,
}

/// Display state of one live log session
#[derive(Debug, Clone, Default)]
pub struct LogDisplayQueue {
    all_logs: Vec<LogEntry>,
    displayed: VecDeque<LogEntry>,
    queue: VecDeque<LogEntry>,
    blinking: bool,
    error: Option<String>,
    has_revealed: bool,
}

impl LogDisplayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rolling window, newest first
    pub fn all_logs(&self) -> &[LogEntry] {
        &self.all_logs
    }

    /// Visible entries, newest first
    pub fn displayed(&self) -> impl Iterator<Item = &LogEntry> {
        self.displayed.iter()
    }

    pub fn displayed_len(&self) -> usize {
        self.displayed.len()
    }

    /// Entries waiting to be revealed, oldest first
    pub fn queued(&self) -> impl Iterator<Item = &LogEntry> {
        self.queue.iter()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_blinking(&self) -> bool {
        self.blinking
    }

    /// Transient error from the most recent failed fetch
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Merge a freshly fetched batch.
    ///
    /// Known ids are ignored, the window is re-sorted and trimmed, and entries
    /// seen for the first time are queued oldest first. If nothing has ever
    /// been revealed, the first queued entry is revealed immediately.
    pub fn merge(&mut self, fetched: Vec<LogEntry>) -> MergeOutcome {
        self.error = None;

        let mut known: FxHashSet<u64> = self.all_logs.iter().map(|e| e.id).collect();
        known.extend(self.displayed.iter().map(|e| e.id));
        known.extend(self.queue.iter().map(|e| e.id));

        let mut fresh: Vec<LogEntry> = Vec::new();
        for entry in fetched {
            if known.insert(entry.id) {
                fresh.push(entry);
            }
        }

        let mut outcome = MergeOutcome {
            added: fresh.len(),
            ..MergeOutcome::default()
        };
        if fresh.is_empty() {
            return outcome;
        }

        self.all_logs.extend(fresh.iter().cloned());
        // stable: equal timestamps keep arrival order
        self.all_logs.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        self.all_logs.truncate(MAX_ALL_LOGS);

        // Entries that fell straight out of the window are too old to show.
        let retained: FxHashSet<u64> = self.all_logs.iter().map(|e| e.id).collect();
        fresh.retain(|e| retained.contains(&e.id));
        fresh.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        outcome.queued = fresh.len();
        self.queue.extend(fresh);

        if !self.has_revealed {
            if let RevealOutcome::Revealed(id) = self.reveal_next() {
                outcome.revealed_immediately = Some(id);
            }
        }

        outcome
    }

    /// One firing of the reveal timer
    pub fn reveal_tick(&mut self) -> RevealOutcome {
        match self.reveal_next() {
            RevealOutcome::Idle if !self.displayed.is_empty() => {
                self.blinking = true;
                RevealOutcome::Blink
            }
            outcome => outcome,
        }
    }

    /// Clear the blink highlight
    pub fn end_blink(&mut self) {
        self.blinking = false;
    }

    /// Record a failed fetch. Display state is left untouched.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            displayed: self.displayed.iter().cloned().collect(),
            queued: self.queue.len(),
            blinking: self.blinking,
            error: self.error.clone(),
        }
    }

    fn reveal_next(&mut self) -> RevealOutcome {
        let Some(entry) = self.queue.pop_front() else {
            return RevealOutcome::Idle;
        };

        let id = entry.id;
        self.displayed.push_front(entry);
        self.displayed.truncate(MAX_DISPLAYED_LOGS);
        self.blinking = false;
        self.has_revealed = true;
        RevealOutcome::Revealed(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, date: &str, time: &str) -> LogEntry {
        LogEntry {
            id,
            date: date.to_string(),
            time: time.to_string(),
            run_prefix: "run-1".to_string(),
            cycle: Some(1),
            message: format!("message {}", id),
            full_message: None,
            module: "tracker-bot".to_string(),
            function: "main".to_string(),
            level: "info".to_string(),
            tag: None,
            data: None,
        }
    }

    fn at(id: u64, secs: u32) -> LogEntry {
        entry(
            id,
            "2024-01-01",
            &format!("10:{:02}:{:02}", secs / 60, secs % 60),
        )
    }

    fn ids<'a>(entries: impl Iterator<Item = &'a LogEntry>) -> Vec<u64> {
        entries.map(|e| e.id).collect()
    }

    #[test]
    fn test_first_entry_revealed_immediately() {
        let mut q = LogDisplayQueue::new();
        let outcome = q.merge(vec![entry(1, "2024-01-01", "10:00:00")]);

        assert_eq!(outcome.revealed_immediately, Some(1));
        assert_eq!(ids(q.displayed()), vec![1]);
        assert_eq!(q.queued_len(), 0);
    }

    #[test]
    fn test_second_poll_queues_only_new_entry() {
        let mut q = LogDisplayQueue::new();
        q.merge(vec![entry(1, "2024-01-01", "10:00:00")]);

        let outcome = q.merge(vec![
            entry(1, "2024-01-01", "10:00:00"),
            entry(2, "2024-01-01", "10:00:05"),
        ]);

        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.queued, 1);
        assert_eq!(outcome.revealed_immediately, None);
        assert_eq!(ids(q.all_logs().iter()), vec![2, 1]);
        assert_eq!(ids(q.queued()), vec![2]);
        assert_eq!(ids(q.displayed()), vec![1]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut q = LogDisplayQueue::new();
        let batch = vec![at(1, 0), at(2, 1), at(3, 2)];
        q.merge(batch.clone());
        let second = q.merge(batch.clone());
        let third = q.merge(batch);

        assert_eq!(second, MergeOutcome::default());
        assert_eq!(third, MergeOutcome::default());
        assert_eq!(q.all_logs().len(), 3);
        assert_eq!(q.displayed_len() + q.queued_len(), 3);
    }

    #[test]
    fn test_duplicates_within_a_batch_are_dropped() {
        let mut q = LogDisplayQueue::new();
        q.merge(vec![at(1, 0), at(2, 1), at(2, 1), at(1, 0)]);
        assert_eq!(ids(q.all_logs().iter()), vec![2, 1]);
        assert_eq!(q.displayed_len() + q.queued_len(), 2);
    }

    #[test]
    fn test_all_logs_sorted_descending_across_days() {
        let mut q = LogDisplayQueue::new();
        q.merge(vec![
            entry(1, "2024-01-02", "00:00:01"),
            entry(2, "2024-01-01", "23:59:59"),
        ]);
        q.merge(vec![entry(3, "2024-01-01", "12:00:00"), entry(4, "2024-01-02", "08:00:00")]);

        assert_eq!(ids(q.all_logs().iter()), vec![4, 1, 2, 3]);
        let keys: Vec<_> = q.all_logs().iter().map(|e| e.sort_key()).collect();
        assert!(keys.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_batch_revealed_in_chronological_order() {
        let mut q = LogDisplayQueue::new();
        // Upstream returns newest first
        q.merge(vec![at(3, 30), at(2, 20), at(1, 10)]);

        assert_eq!(ids(q.displayed()), vec![1]);
        assert_eq!(q.reveal_tick(), RevealOutcome::Revealed(2));
        assert_eq!(q.reveal_tick(), RevealOutcome::Revealed(3));
        assert_eq!(ids(q.displayed()), vec![3, 2, 1]);
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        let mut q = LogDisplayQueue::new();
        q.merge(vec![at(1, 0)]);
        q.merge(vec![at(7, 5), at(5, 5), at(6, 5)]);
        assert_eq!(ids(q.queued()), vec![7, 5, 6]);
    }

    #[test]
    fn test_displayed_and_queued_never_requeued() {
        let mut q = LogDisplayQueue::new();
        q.merge(vec![at(1, 0), at(2, 1), at(3, 2)]);
        assert_eq!(ids(q.displayed()), vec![1]);
        assert_eq!(ids(q.queued()), vec![2, 3]);

        q.merge(vec![at(1, 0), at(2, 1), at(3, 2), at(4, 3)]);
        assert_eq!(ids(q.queued()), vec![2, 3, 4]);
        assert_eq!(ids(q.displayed()), vec![1]);
    }

    #[test]
    fn test_displayed_capped_at_ten() {
        let mut q = LogDisplayQueue::new();
        q.merge((1..=15).map(|i| at(i, i as u32)).collect());
        while let RevealOutcome::Revealed(_) = q.reveal_tick() {}

        assert_eq!(q.displayed_len(), MAX_DISPLAYED_LOGS);
        assert_eq!(q.displayed().next().map(|e| e.id), Some(15));
        assert_eq!(q.displayed().last().map(|e| e.id), Some(6));
    }

    #[test]
    fn test_evicted_display_entries_not_revealed_twice() {
        let mut q = LogDisplayQueue::new();
        let batch: Vec<_> = (1..=15).map(|i| at(i, i as u32)).collect();
        q.merge(batch.clone());
        while let RevealOutcome::Revealed(_) = q.reveal_tick() {}

        // ids 1..=5 have scrolled off the visible list
        let outcome = q.merge(batch);
        assert_eq!(outcome.queued, 0);
        assert_eq!(q.queued_len(), 0);
    }

    #[test]
    fn test_all_logs_capped_at_fifty() {
        let mut q = LogDisplayQueue::new();
        for chunk in (1..=120u64).collect::<Vec<_>>().chunks(20) {
            q.merge(chunk.iter().map(|&i| at(i, i as u32)).collect());
            assert!(q.all_logs().len() <= MAX_ALL_LOGS);
        }
        assert_eq!(q.all_logs().len(), MAX_ALL_LOGS);
        assert_eq!(q.all_logs()[0].id, 120);
        assert_eq!(q.all_logs()[MAX_ALL_LOGS - 1].id, 71);
    }

    #[test]
    fn test_entries_older_than_window_are_not_queued() {
        let mut q = LogDisplayQueue::new();
        q.merge((100..150).map(|i| at(i, i as u32)).collect());
        let outcome = q.merge(vec![at(1, 1)]);

        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.queued, 0);
        assert!(q.all_logs().iter().all(|e| e.id != 1));
    }

    #[test]
    fn test_blink_when_queue_empty() {
        let mut q = LogDisplayQueue::new();
        q.merge(vec![at(1, 0)]);

        assert_eq!(q.reveal_tick(), RevealOutcome::Blink);
        assert!(q.is_blinking());
        assert_eq!(q.displayed_len(), 1);

        q.end_blink();
        assert!(!q.is_blinking());
    }

    #[test]
    fn test_reveal_clears_blink() {
        let mut q = LogDisplayQueue::new();
        q.merge(vec![at(1, 0)]);
        q.reveal_tick();
        assert!(q.is_blinking());

        q.merge(vec![at(2, 1)]);
        assert_eq!(q.reveal_tick(), RevealOutcome::Revealed(2));
        assert!(!q.is_blinking());
    }

    #[test]
    fn test_idle_when_empty() {
        let mut q = LogDisplayQueue::new();
        assert_eq!(q.reveal_tick(), RevealOutcome::Idle);
        assert!(!q.is_blinking());

        q.merge(Vec::new());
        assert_eq!(q.reveal_tick(), RevealOutcome::Idle);
    }

    #[test]
    fn test_fast_path_only_once() {
        let mut q = LogDisplayQueue::new();
        q.merge(vec![at(1, 0)]);
        let outcome = q.merge(vec![at(2, 1)]);
        assert_eq!(outcome.revealed_immediately, None);
        assert_eq!(ids(q.queued()), vec![2]);
    }

    #[test]
    fn test_failure_leaves_state_untouched() {
        let mut q = LogDisplayQueue::new();
        q.merge(vec![at(1, 0), at(2, 1)]);
        let before = q.snapshot();

        q.record_failure("Failed to fetch logs");
        let after = q.snapshot();
        assert_eq!(after.error.as_deref(), Some("Failed to fetch logs"));
        assert_eq!(after.displayed, before.displayed);
        assert_eq!(after.queued, before.queued);

        q.merge(vec![at(3, 2)]);
        assert!(q.error().is_none());
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut q = LogDisplayQueue::new();
        q.merge(vec![at(1, 0), at(2, 1)]);
        let json = serde_json::to_value(q.snapshot()).unwrap();
        assert_eq!(json["queued"], 1);
        assert_eq!(json["blinking"], false);
        assert_eq!(json["displayed"][0]["id"], 1);
    }
}
