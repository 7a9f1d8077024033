// GET /health handler

use std::convert::Infallible;
use warp::http::StatusCode;
use warp::Reply;

use crate::models::HealthResponse;
use crate::pipeline::Orchestrator;

pub async fn health_handler(orchestrator: Orchestrator) -> Result<warp::reply::Response, Infallible> {
    let health = HealthResponse::from_pipeline(orchestrator.health());
    let status = if health.pipeline.shutting_down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    Ok(warp::reply::with_status(warp::reply::json(&health), status).into_response())
}
