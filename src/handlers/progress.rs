// GET /generations/{id} and GET /generations/{id}/events handlers

use futures_util::stream::{self, StreamExt};
use std::convert::Infallible;
use uuid::Uuid;
use warp::Reply;

use crate::pipeline::{Orchestrator, PipelineError};
use crate::progress::types::ProgressSummary;
use crate::sse::{create_error_event, snapshot_events};

use super::error_reply;

pub async fn get_progress_handler(
    operation_id: Uuid,
    orchestrator: Orchestrator,
) -> Result<warp::reply::Response, Infallible> {
    match orchestrator.get_progress(operation_id.into()) {
        Ok(snapshot) => Ok(warp::reply::json(&ProgressSummary::from(&snapshot)).into_response()),
        Err(err) => Ok(error_reply(&err)),
    }
}

pub async fn stream_progress_handler(
    operation_id: Uuid,
    orchestrator: Orchestrator,
) -> Result<warp::reply::Response, Infallible> {
    let reply = match orchestrator.stream_progress(operation_id.into()) {
        Ok(updates) => {
            let events = updates.flat_map(|snapshot| stream::iter(snapshot_events(&snapshot)));
            warp::sse::reply(warp::sse::keep_alive().stream(events)).into_response()
        }
        Err(err @ PipelineError::NotFound(_)) => {
            // Unknown ids still get a well-formed event stream
            let events = stream::iter(vec![create_error_event(err.kind(), err.to_string())]);
            warp::sse::reply(events).into_response()
        }
        Err(err) => error_reply(&err),
    };
    Ok(reply)
}
