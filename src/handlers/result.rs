// GET /generations/{id}/result handler

use std::convert::Infallible;
use uuid::Uuid;
use warp::Reply;

use crate::pipeline::Orchestrator;

use super::error_reply;

pub async fn get_result_handler(
    operation_id: Uuid,
    orchestrator: Orchestrator,
) -> Result<warp::reply::Response, Infallible> {
    match orchestrator.get_result(operation_id.into()).await {
        Ok(artifact) => Ok(warp::reply::json(&artifact).into_response()),
        Err(err) => Ok(error_reply(&err)),
    }
}
