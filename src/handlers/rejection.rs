// Rejection recovery: render warp rejections as JSON error bodies

use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::models::ErrorResponse;

pub async fn handle_rejection(rejection: Rejection) -> Result<warp::reply::Response, Infallible> {
    let (status, error, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found", "no such route".to_string())
    } else if let Some(e) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "invalid_input", e.to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "method not allowed".to_string(),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            format!("unhandled rejection: {:?}", rejection),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&ErrorResponse::new(error, message)), status)
        .into_response())
}
