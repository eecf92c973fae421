//! Wire responses for each [`Decision`].
//!
//! The invoking proxy reads only the status code. Bodies are fixed strings;
//! failure detail stays in the server log.

use crate::gate::Decision;
use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use http::{HeaderValue, StatusCode};

/// Body of every 401 response.
pub const DENIED_BODY: &str = "401 Access Denied";

/// Body of every 500 response.
pub const FAILED_BODY: &str = "500 Internal Server Error";

/// `WWW-Authenticate` challenge sent with every 401 response.
pub fn www_authenticate() -> HeaderValue {
    HeaderValue::from_static("Bearer realm=\"\"")
}

fn text_plain() -> HeaderValue {
    HeaderValue::from_static("text/plain")
}

/// 200 with an empty body.
pub fn authorized_response() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .body(Body::empty())
        .expect("valid response")
}

/// 401 with the Bearer challenge.
pub fn denied_response() -> Response {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header(WWW_AUTHENTICATE, www_authenticate())
        .header(CONTENT_TYPE, text_plain())
        .body(Body::from(DENIED_BODY))
        .expect("valid response")
}

/// 500 without any failure detail.
pub fn failed_response() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(CONTENT_TYPE, text_plain())
        .body(Body::from(FAILED_BODY))
        .expect("valid response")
}

impl IntoResponse for Decision {
    fn into_response(self) -> Response {
        match self {
            Decision::Authorized(_) => authorized_response(),
            Decision::Denied(_) => denied_response(),
            Decision::Failed(_) => failed_response(),
        }
    }
}
