//! axum <-> instrumentation glue.
//!
//! Converts an axum request into the middleware's `Request`, runs the
//! instrumented handler against a `BufferedResponse`, and turns the buffer
//! back into an axum response.

use axum::extract::{MatchedPath, Request as HttpRequest};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reqscope_core::instrument::{BufferedResponse, Handler, InstrumentedHandler, Request};

/// Path label value for requests no route matched.
pub const UNMATCHED_PATH: &str = "unmatched";

/// Label-safe view of an axum request: the matched route template, never
/// the raw URI path.
pub fn to_request(req: &HttpRequest) -> Request {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_PATH.to_owned());

    let request = Request::new(req.method().as_str(), path);
    match req.uri().query() {
        Some(q) => request.with_query(q),
        None => request,
    }
}

pub async fn serve<H: Handler>(handler: &InstrumentedHandler<H>, req: HttpRequest) -> Response {
    let request = to_request(&req);
    drop(req);

    let mut buf = BufferedResponse::new();
    let result = handler.handle(&request, &mut buf).await;

    match result {
        Ok(()) => {
            let (status, body) = buf.into_parts();
            (status_code(status), body).into_response()
        }
        Err(e) => match buf.explicit_status() {
            Some(status) => {
                let (_, body) = buf.into_parts();
                let body = if body.is_empty() { e.to_string().into_bytes() } else { body };
                (status_code(status), body).into_response()
            }
            None => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        },
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
