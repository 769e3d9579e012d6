//! Server-Sent Events for scan progress and workspace changes

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use pixmatch_common::events::PixmatchEvent;
use pixmatch_common::sse::create_event_sse_stream;
use std::convert::Infallible;

/// GET /events
///
/// Streams every [`PixmatchEvent`]: scan lifecycle (started, progress,
/// completed, failed) and workspace changes (reference, library, reset).
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    create_event_sse_stream("pixmatch-scan", &state.event_bus, forward_all)
}

fn forward_all(_event: &PixmatchEvent) -> bool {
    true
}
