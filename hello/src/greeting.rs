use axum::Json;
use serde::Serialize;

/// Text every greeting carries.
pub const GREETING_MESSAGE: &str = "Hello from Flask on Lambda!";

/// Payload of `GET /hello`: a single `message` key with a fixed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Greeting {
    pub message: &'static str,
}

impl Default for Greeting {
    fn default() -> Self {
        Greeting {
            message: GREETING_MESSAGE,
        }
    }
}

/// Handler for `GET /hello`. Consumes nothing from the request.
pub async fn hello() -> Json<Greeting> {
    Json(Greeting::default())
}
