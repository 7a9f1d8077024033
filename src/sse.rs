use std::convert::Infallible;
use warp::sse::Event;

use crate::models::ErrorResponse;
use crate::progress::types::{OperationSnapshot, ProgressSummary};

/// Create a progress SSE event carrying the current summary
pub fn create_progress_event(snapshot: &OperationSnapshot) -> Result<Event, Infallible> {
    let payload = serde_json::to_value(ProgressSummary::from(snapshot)).unwrap_or_default();

    Ok(Event::default()
        .id(snapshot.updated_at.timestamp_millis().to_string())
        .event("progress")
        .data(payload.to_string()))
}

/// Create a done SSE event to signal stream completion
pub fn create_done_event(snapshot: &OperationSnapshot) -> Result<Event, Infallible> {
    let payload = serde_json::json!({
        "operation_id": snapshot.operation_id,
        "status": snapshot.status,
        "persisted": snapshot.persisted,
    });

    Ok(Event::default().event("done").data(payload.to_string()))
}

/// Create an error SSE event
pub fn create_error_event(error: &str, message: impl Into<String>) -> Result<Event, Infallible> {
    let payload = serde_json::to_value(ErrorResponse::new(error, message)).unwrap_or_default();

    Ok(Event::default().event("error").data(payload.to_string()))
}

/// Render one snapshot, followed by a done event when it is terminal
pub fn snapshot_events(snapshot: &OperationSnapshot) -> Vec<Result<Event, Infallible>> {
    let mut events = vec![create_progress_event(snapshot)];
    if snapshot.status.is_terminal() {
        events.push(create_done_event(snapshot));
    }
    events
}
