//! Server-Sent Events for the live log feed.
//!
//! Each connection runs its own log feed session. Every visible change is
//! pushed twice: a `feed` event carrying the rendered HTML panel (consumed by
//! the HTMX SSE extension) and a `snapshot` event carrying the same state as
//! JSON. Closing the connection drops the stream and with it the session.

use crate::dashboard::render::render_feed;
use crate::dashboard::state::DashboardState;
use crate::log_feed::log_feed;
use crate::log_queue::FeedSnapshot;
use async_stream::stream;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Create the live log SSE stream for a client connection
pub fn create_log_feed_stream(
    state: Arc<DashboardState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let feed = log_feed(state.upstream.clone(), state.feed.clone());

    let stream = stream! {
        debug!("Live log session started");
        futures::pin_mut!(feed);

        while let Some(snapshot) = feed.next().await {
            for event in snapshot_events(&snapshot) {
                yield Ok(event);
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// SSE events for one snapshot: the HTML panel, then the JSON state
pub fn snapshot_events(snapshot: &FeedSnapshot) -> Vec<Event> {
    let mut events = vec![Event::default().event("feed").data(render_feed(snapshot))];

    match serde_json::to_string(snapshot) {
        Ok(json) => events.push(Event::default().event("snapshot").data(json)),
        Err(e) => warn!("Failed to serialize feed snapshot: {}", e),
    }
    events
}
