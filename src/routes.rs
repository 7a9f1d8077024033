// Route definitions

use std::convert::Infallible;
use uuid::Uuid;
use warp::Filter;

use crate::handlers;
use crate::pipeline::Orchestrator;

/// Maximum accepted request body (source text included)
const MAX_BODY_BYTES: u64 = 1024 * 1024;

fn with_orchestrator(
    orchestrator: Orchestrator,
) -> impl Filter<Extract = (Orchestrator,), Error = Infallible> + Clone {
    warp::any().map(move || orchestrator.clone())
}

pub fn configure_routes(
    orchestrator: Orchestrator,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    let api = warp::path("api").and(warp::path("v1"));

    // POST /generations
    let submit = api
        .and(warp::path("generations"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_orchestrator(orchestrator.clone()))
        .and_then(handlers::submit_generation_handler);

    // GET /generations/{id}
    let get_progress = api
        .and(warp::path("generations"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_orchestrator(orchestrator.clone()))
        .and_then(handlers::get_progress_handler);

    // GET /generations/{id}/events
    let stream_progress = api
        .and(warp::path("generations"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path("events"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_orchestrator(orchestrator.clone()))
        .and_then(handlers::stream_progress_handler);

    // GET /generations/{id}/result
    let get_result = api
        .and(warp::path("generations"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path("result"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_orchestrator(orchestrator.clone()))
        .and_then(handlers::get_result_handler);

    // POST /generations/{id}/cancel
    let cancel = api
        .and(warp::path("generations"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path("cancel"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_orchestrator(orchestrator.clone()))
        .and_then(handlers::cancel_handler);

    // DELETE /generations/{id}
    let acknowledge = api
        .and(warp::path("generations"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_orchestrator(orchestrator.clone()))
        .and_then(handlers::acknowledge_handler);

    // GET /health
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_orchestrator(orchestrator))
        .and_then(handlers::health_handler);

    // Combine routes
    submit
        .or(get_progress)
        .or(stream_progress)
        .or(get_result)
        .or(cancel)
        .or(acknowledge)
        .or(health)
        .recover(handlers::handle_rejection)
}
