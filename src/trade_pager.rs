//! Incremental trade history loading.
//!
//! The pager appends fixed-size pages as the reader scrolls. A page shorter
//! than the page size marks the end of the history; after that no further
//! requests are made. Only one request may be in flight at a time.

use crate::config::TRADE_PAGE_SIZE;
use crate::types::Trade;
use crate::upstream::TradeSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Result of a `load_next` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
    /// A page was appended
    Loaded { rows: usize, end_of_data: bool },
    /// Another load was already running
    Skipped,
    /// The history is exhausted; nothing was requested
    Exhausted,
    /// The request failed; rows and offset are unchanged
    Failed,
}

#[derive(Debug, Default)]
struct PagerState {
    trades: Vec<Trade>,
    next_offset: u32,
    has_more: bool,
    error: Option<String>,
}

/// Trade history pager over any [`TradeSource`]
pub struct TradePager<S> {
    source: S,
    page_size: u32,
    state: Mutex<PagerState>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the load ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: TradeSource> TradePager<S> {
    pub fn new(source: S) -> Self {
        Self::with_page_size(source, TRADE_PAGE_SIZE)
    }

    pub fn with_page_size(source: S, page_size: u32) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            state: Mutex::new(PagerState {
                has_more: true,
                ..PagerState::default()
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetch and append the next page
    pub async fn load_next(&self) -> PageLoad {
        let offset = {
            let state = self.lock_state();
            if !state.has_more {
                return PageLoad::Exhausted;
            }
            state.next_offset
        };

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Trade page at offset {} skipped, load in flight", offset);
            return PageLoad::Skipped;
        }
        let _guard = InFlightGuard(&self.in_flight);

        match self.source.fetch_trades(offset, self.page_size).await {
            Ok(page) => {
                let rows = page.len();
                let next_offset = offset.checked_add(self.page_size);
                let end_of_data = rows < self.page_size as usize || next_offset.is_none();

                let mut state = self.lock_state();
                state.trades.extend(page);
                state.next_offset = next_offset.unwrap_or(u32::MAX);
                state.has_more = !end_of_data;
                state.error = None;

                debug!(
                    "Loaded {} trades at offset {} (end of data: {})",
                    rows, offset, end_of_data
                );
                PageLoad::Loaded { rows, end_of_data }
            }
            Err(e) => {
                warn!("Failed to load trades at offset {}: {}", offset, e);
                self.lock_state().error = Some("Failed to fetch trading history data".to_string());
                PageLoad::Failed
            }
        }
    }

    /// Drop everything loaded so far and start again from the first page
    pub fn reset(&self) {
        let mut state = self.lock_state();
        *state = PagerState {
            has_more: true,
            ..PagerState::default()
        };
    }

    /// Trades loaded so far, in load order
    pub fn trades(&self) -> Vec<Trade> {
        self.lock_state().trades.clone()
    }

    pub fn len(&self) -> usize {
        self.lock_state().trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_more(&self) -> bool {
        self.lock_state().has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn error(&self) -> Option<String> {
        self.lock_state().error.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PagerState> {
        // State stays consistent even if a holder panicked mid-update.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
