//! Registry Event Stream
//!
//! Server-Sent Events relay of the coordinator's notifications. There is no
//! replay: a client that connects late or falls behind should re-read
//! `/v1/multisig/pending` and `/v1/multisig/last-update`.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::sync::Arc;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};
use tracing::{debug, warn};

use crate::api::handlers::AppState;

/// Subscribe to registry events
///
/// GET /v1/events
pub async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    debug!(subscribers = state.notifier.subscriber_count() + 1, "Event stream opened");

    let stream = BroadcastStream::new(state.notifier.subscribe()).filter_map(|item| match item {
        Ok(event) => Some(Event::default().event(event.name()).json_data(&event)),
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            warn!(missed, "Event stream subscriber fell behind");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
