// Handlers module

pub mod control;
pub mod health;
pub mod progress;
pub mod rejection;
pub mod result;
pub mod submit;

pub use control::{acknowledge_handler, cancel_handler};
pub use health::health_handler;
pub use progress::{get_progress_handler, stream_progress_handler};
pub use rejection::handle_rejection;
pub use result::get_result_handler;
pub use submit::submit_generation_handler;

use warp::http::StatusCode;
use warp::Reply;

use crate::models::ErrorResponse;
use crate::pipeline::PipelineError;

/// Status code for a pipeline error
pub fn error_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::NotReady(_) => StatusCode::CONFLICT,
        PipelineError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::Store(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Progress(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error body with the matching status
pub fn error_reply(err: &PipelineError) -> warp::reply::Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorResponse::new(err.kind(), err.to_string())),
        error_status(err),
    )
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::PartitionError;
    use crate::progress::types::OperationId;

    #[test]
    fn test_error_status_mapping() {
        let id = OperationId::new();
        assert_eq!(
            error_status(&PipelineError::InvalidInput(PartitionError::EmptyTopic)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(error_status(&PipelineError::NotFound(id)), StatusCode::NOT_FOUND);
        assert_eq!(error_status(&PipelineError::NotReady(id)), StatusCode::CONFLICT);
        assert_eq!(
            error_status(&PipelineError::ShuttingDown),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
