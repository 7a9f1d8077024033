// POST /generations handler

use std::convert::Infallible;
use tracing::debug;
use warp::http::StatusCode;
use warp::Reply;

use crate::models::SubmitGenerationResponse;
use crate::partition::GenerationRequest;
use crate::pipeline::Orchestrator;

use super::error_reply;

pub async fn submit_generation_handler(
    request: GenerationRequest,
    orchestrator: Orchestrator,
) -> Result<warp::reply::Response, Infallible> {
    debug!(kind = request.kind.as_str(), count = request.count, "POST /generations");

    let accepted = match orchestrator.submit(request) {
        Ok(snapshot) => snapshot,
        Err(err) => return Ok(error_reply(&err)),
    };

    let response = SubmitGenerationResponse {
        operation_id: accepted.operation_id,
        status: accepted.status,
        total_units: accepted.total_units,
    };

    Ok(warp::reply::with_status(warp::reply::json(&response), StatusCode::ACCEPTED).into_response())
}
