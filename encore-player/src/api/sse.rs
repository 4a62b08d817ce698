//! SSE event stream for player observers.
//!
//! Every [`SessionEvent`] on the bus is forwarded to each connected
//! client as a named SSE event whose payload is the event's JSON
//! serialization. The portal front-end keeps its player widget in
//! sync from this stream alone.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use encore_common::SessionEvent;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::api::AppState;

/// GET /events - subscribe to the session event stream
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let bus = state.controller.events();
    info!(
        subscribers = bus.subscriber_count() + 1,
        "SSE client connected"
    );

    let stream = BroadcastStream::new(bus.subscribe()).filter_map(|result| async move {
        match result {
            Ok(event) => to_sse_event(&event).map(Ok),
            Err(e) => {
                // Slow client fell behind the broadcast buffer; skip
                // the lagged range and keep streaming.
                warn!(error = ?e, "SSE subscriber lagged");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}

fn to_sse_event(event: &SessionEvent) -> Option<Event> {
    Event::default()
        .event(event.event_type())
        .json_data(event)
        .ok()
}
