// POST /generations/{id}/cancel and DELETE /generations/{id} handlers

use std::convert::Infallible;
use tracing::info;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::Reply;

use crate::pipeline::Orchestrator;
use crate::progress::types::ProgressSummary;

use super::error_reply;

pub async fn cancel_handler(
    operation_id: Uuid,
    orchestrator: Orchestrator,
) -> Result<warp::reply::Response, Infallible> {
    match orchestrator.cancel(operation_id.into()) {
        Ok(snapshot) => Ok(warp::reply::with_status(
            warp::reply::json(&ProgressSummary::from(&snapshot)),
            StatusCode::ACCEPTED,
        )
        .into_response()),
        Err(err) => Ok(error_reply(&err)),
    }
}

pub async fn acknowledge_handler(
    operation_id: Uuid,
    orchestrator: Orchestrator,
) -> Result<warp::reply::Response, Infallible> {
    match orchestrator.acknowledge(operation_id.into()) {
        Ok(()) => {
            info!(%operation_id, "operation acknowledged by client");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        Err(err) => Ok(error_reply(&err)),
    }
}
