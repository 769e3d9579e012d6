//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE implementation that forwards [`PixmatchEvent`]s from an
//! [`EventBus`] to a browser.

use crate::events::{EventBus, PixmatchEvent};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Heartbeat interval for SSE connections
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Convert an event into an SSE frame
///
/// Returns `None` if the event cannot be serialized.
pub fn to_sse_event(event: &PixmatchEvent) -> Option<Event> {
    let event_type = event.event_type();
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event_type).data(json)),
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
            None
        }
    }
}

/// Create an SSE stream that forwards events accepted by `filter`
///
/// Sends a `ConnectionStatus: connected` frame first, then forwards events
/// until the bus is closed. Lagging clients skip the missed events and keep
/// streaming.
///
/// # Arguments
/// * `service_name` - Name of the service for logging (e.g., "pixmatch-scan")
/// * `event_bus` - Source of events
/// * `filter` - Predicate selecting which events this stream forwards
pub fn create_event_sse_stream(
    service_name: &'static str,
    event_bus: &EventBus,
    filter: fn(&PixmatchEvent) -> bool,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} events", service_name);

    let mut rx = event_bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !filter(&event) {
                        continue;
                    }
                    debug!("SSE: Broadcasting {} event: {}", service_name, event.event_type());
                    if let Some(frame) = to_sse_event(&event) {
                        yield Ok(frame);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: {} client lagged, skipped {} events", service_name, skipped);
                }
                Err(RecvError::Closed) => {
                    info!("SSE: {} event bus closed, ending stream", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
