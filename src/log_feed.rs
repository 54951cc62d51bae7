//! Timer-driven live log session.
//!
//! A session owns one [`LogDisplayQueue`] and multiplexes three clocks on a
//! single task: the poll interval, the reveal interval and the blink timeout.
//! It is exposed as a [`Stream`] of [`FeedSnapshot`]s, one per visible state
//! change. Dropping the stream ends the session: the timers and any fetch
//! still in flight are dropped with it, so nothing fires afterwards.

use crate::config::{LIVE_LOGS_LIMIT, LOG_BLINK_DURATION, LOG_POLL_INTERVAL, LOG_REVEAL_INTERVAL};
use crate::log_queue::{FeedSnapshot, LogDisplayQueue, RevealOutcome};
use crate::types::LiveLogsPage;
use crate::upstream::{LogSource, UpstreamResult};
use async_stream::stream;
use futures::future::{BoxFuture, OptionFuture};
use futures::stream::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Message shown while the upstream cannot be reached
pub const FEED_ERROR_MESSAGE: &str = "Failed to fetch logs";

/// Session timing
#[derive(Debug, Clone)]
pub struct LogFeedConfig {
    pub poll_interval: Duration,
    pub reveal_interval: Duration,
    pub blink_duration: Duration,
    /// Entries requested per poll
    pub limit: u32,
}

impl Default for LogFeedConfig {
    fn default() -> Self {
        Self {
            poll_interval: LOG_POLL_INTERVAL,
            reveal_interval: LOG_REVEAL_INTERVAL,
            blink_duration: LOG_BLINK_DURATION,
            limit: LIVE_LOGS_LIMIT,
        }
    }
}

/// Start a live log session reading from `source`.
///
/// The first poll is issued immediately. A poll tick that arrives while the
/// previous fetch is still running is skipped.
pub fn log_feed<S>(source: Arc<S>, config: LogFeedConfig) -> impl Stream<Item = FeedSnapshot>
where
    S: LogSource + ?Sized + 'static,
{
    stream! {
        let mut queue = LogDisplayQueue::new();

        let mut poll_timer = interval(config.poll_interval);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut reveal_timer = interval_at(
            Instant::now() + config.reveal_interval,
            config.reveal_interval,
        );
        reveal_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut in_flight: Option<BoxFuture<'static, UpstreamResult<LiveLogsPage>>> = None;
        let mut blink_until: Option<Instant> = None;

        loop {
            let changed = tokio::select! {
                biased;

                _ = poll_timer.tick() => {
                    if in_flight.is_some() {
                        debug!("Live log poll skipped, previous fetch still running");
                    } else {
                        let source = source.clone();
                        let limit = config.limit;
                        in_flight = Some(Box::pin(async move { source.fetch_logs(limit).await }));
                    }
                    false
                }

                Some(result) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                    in_flight = None;
                    match result {
                        Ok(page) => {
                            let outcome = queue.merge(page.logs);
                            debug!(
                                "Live logs merged: {} new, {} queued",
                                outcome.added, outcome.queued
                            );
                            if outcome.revealed_immediately.is_some() {
                                blink_until = None;
                            }
                        }
                        Err(e) => {
                            warn!("Live log poll failed: {}", e);
                            queue.record_failure(FEED_ERROR_MESSAGE);
                        }
                    }
                    true
                }

                _ = reveal_timer.tick() => {
                    match queue.reveal_tick() {
                        RevealOutcome::Revealed(id) => {
                            debug!("Revealed log entry {}", id);
                            blink_until = None;
                            true
                        }
                        RevealOutcome::Blink => {
                            blink_until = Some(Instant::now() + config.blink_duration);
                            true
                        }
                        RevealOutcome::Idle => false,
                    }
                }

                Some(()) = OptionFuture::from(blink_until.map(sleep_until)), if blink_until.is_some() => {
                    blink_until = None;
                    queue.end_blink();
                    true
                }
            };

            if changed {
                yield queue.snapshot();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogEntry;
    use crate::upstream::UpstreamError;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn entry(id: u64, time: &str) -> LogEntry {
        LogEntry {
            id,
            date: "2024-01-01".to_string(),
            time: time.to_string(),
            run_prefix: "run".to_string(),
            cycle: None,
            message: format!("entry {}", id),
            full_message: None,
            module: "tracker-bot".to_string(),
            function: "poll".to_string(),
            level: "info".to_string(),
            tag: None,
            data: None,
        }
    }

    /// Replays scripted pages; once exhausted it keeps returning the last one
    struct ScriptedSource {
        pages: Mutex<VecDeque<UpstreamResult<Vec<LogEntry>>>>,
        last: Mutex<Vec<LogEntry>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedSource {
        fn new(pages: Vec<UpstreamResult<Vec<LogEntry>>>) -> Arc<Self> {
            Self::with_delay(pages, Duration::ZERO)
        }

        fn with_delay(pages: Vec<UpstreamResult<Vec<LogEntry>>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                pages: Mutex::new(pages.into()),
                last: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LogSource for ScriptedSource {
        async fn fetch_logs(&self, _limit: u32) -> UpstreamResult<LiveLogsPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.pages.lock().unwrap().pop_front();
            let logs = match next {
                Some(Ok(logs)) => {
                    *self.last.lock().unwrap() = logs.clone();
                    logs
                }
                Some(Err(e)) => return Err(e),
                None => self.last.lock().unwrap().clone(),
            };
            Ok(LiveLogsPage {
                logs,
                tags: Vec::new(),
            })
        }
    }

    fn displayed_ids(snapshot: &FeedSnapshot) -> Vec<u64> {
        snapshot.displayed.iter().map(|e| e.id).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_entry_shown_without_waiting_for_reveal() {
        let source = ScriptedSource::new(vec![Ok(vec![entry(1, "10:00:00")])]);
        let feed = log_feed(source.clone(), LogFeedConfig::default());
        tokio::pin!(feed);

        let start = Instant::now();
        let first = feed.next().await.unwrap();
        assert_eq!(displayed_ids(&first), vec![1]);
        assert!(start.elapsed() < LOG_REVEAL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_cadence_and_blink() {
        let source = ScriptedSource::new(vec![Ok(vec![
            entry(2, "10:00:05"),
            entry(1, "10:00:00"),
        ])]);
        let feed = log_feed(source.clone(), LogFeedConfig::default());
        tokio::pin!(feed);

        let start = Instant::now();

        let snap = feed.next().await.unwrap();
        assert_eq!(displayed_ids(&snap), vec![1]);
        assert_eq!(snap.queued, 1);

        // 5s reveal tick moves id 2 onto the list
        let snap = feed.next().await.unwrap();
        assert_eq!(displayed_ids(&snap), vec![2, 1]);
        assert_eq!(snap.queued, 0);
        assert_eq!(start.elapsed(), Duration::from_secs(5));

        // 10s poll returns nothing new
        let snap = feed.next().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert!(!snap.blinking);

        // 10s reveal tick with an empty queue blinks
        let snap = feed.next().await.unwrap();
        assert!(snap.blinking);
        assert_eq!(displayed_ids(&snap), vec![2, 1]);

        // ...and the blink clears 2.5s later
        let snap = feed.next().await.unwrap();
        assert!(!snap.blinking);
        assert_eq!(start.elapsed(), Duration::from_millis(12_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_poll_is_recorded_and_retried() {
        let source = ScriptedSource::new(vec![
            Err(UpstreamError::Rejected("down".to_string())),
            Ok(vec![entry(1, "10:00:00")]),
        ]);
        let config = LogFeedConfig {
            reveal_interval: Duration::from_secs(60),
            ..LogFeedConfig::default()
        };
        let feed = log_feed(source.clone(), config);
        tokio::pin!(feed);

        let snap = feed.next().await.unwrap();
        assert_eq!(snap.error.as_deref(), Some(FEED_ERROR_MESSAGE));
        assert!(snap.displayed.is_empty());

        let snap = feed.next().await.unwrap();
        assert!(snap.error.is_none());
        assert_eq!(displayed_ids(&snap), vec![1]);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_is_not_overlapped() {
        let source = ScriptedSource::with_delay(
            vec![Ok(vec![entry(1, "10:00:00")])],
            Duration::from_secs(25),
        );
        let config = LogFeedConfig {
            reveal_interval: Duration::from_secs(600),
            ..LogFeedConfig::default()
        };
        let feed = log_feed(source.clone(), config);
        tokio::pin!(feed);

        let snap = feed.next().await.unwrap();
        assert_eq!(displayed_ids(&snap), vec![1]);
        // poll ticks at 10s and 20s fell inside the 25s fetch
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_feed_stops_polling() {
        let source = ScriptedSource::new(vec![Ok(vec![entry(1, "10:00:00")])]);
        {
            let feed = log_feed(source.clone(), LogFeedConfig::default());
            tokio::pin!(feed);
            feed.next().await.unwrap();
        }
        let calls = source.calls();

        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert_eq!(source.calls(), calls);
    }
}
