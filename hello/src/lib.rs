//! `GET /hello` answered from AWS Lambda.
//!
//! [`function_handler`] is what the `bootstrap` binary runs for every
//! invocation; the HTTP adapter has already turned the gateway event into a
//! plain `http::Request` by the time it is called. Routing is an axum
//! [`Router`] driven one request at a time.

pub mod greeting;

use axum::{
    http::{header::ALLOW, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use hyper::body::Bytes;
use hello_lambda_http::{http, lambda::Error, Body, Context, Request, Response};
use tower::ServiceExt;
use tracing::info;

/// Methods `/hello` answers, in the form axum reports on a 405.
pub const HELLO_METHODS: &str = "GET,HEAD,OPTIONS";

/// The function's only route table.
///
/// `get` also serves `HEAD` with the body stripped, and a known path with an
/// unrouted method gets a 405 carrying `allow`.
pub fn app() -> Router {
    Router::new()
        .route("/hello", get(greeting::hello).options(hello_options))
        .fallback(not_found)
}

async fn hello_options() -> impl IntoResponse {
    [(ALLOW, HELLO_METHODS)]
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404 Not Found")
}

/// Routes one request.
pub async fn function_handler(request: Request, _: Context) -> Result<Response<Body>, Error> {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let (parts, body) = request.into_parts();
    let body = match body {
        Body::Empty => hyper::Body::empty(),
        Body::Text(text) => hyper::Body::from(text),
        Body::Binary(bytes) => hyper::Body::from(bytes),
    };
    let response = app().oneshot(http::Request::from_parts(parts, body)).await?;
    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        "handled request"
    );

    let (parts, body) = response.into_parts();
    let body = hyper::body::to_bytes(body).await?;
    Ok(Response::from_parts(parts, lambda_body(body)))
}

fn lambda_body(bytes: Bytes) -> Body {
    if bytes.is_empty() {
        return Body::Empty;
    }
    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => Body::Text(text),
        Err(err) => Body::Binary(err.into_bytes()),
    }
}
