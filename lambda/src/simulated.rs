//! An in-process stand-in for the Lambda Runtime API.
//!
//! Tests queue events on a [`RuntimeApi`], point a [`Runtime`](crate::Runtime)
//! at it and read back what the function posted for each request id.

use crate::{
    config::Config,
    types::{DEADLINE_MS, FUNCTION_ARN, FUNCTION_ERROR_TYPE, REQUEST_ID, TRACE_ID},
    Error,
};
use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Server,
};
use std::{
    collections::{HashMap, VecDeque},
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::{sync::Notify, task::JoinHandle};

const INVOCATION_TIMEOUT: Duration = Duration::from_secs(3);

/// What the function posted back for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Body of `POST /invocation/{id}/response`.
    Response(Bytes),
    /// Body and `lambda-runtime-function-error-type` of `POST /invocation/{id}/error`.
    Error { error_type: Option<String>, body: Bytes },
}

impl Outcome {
    /// The posted body parsed as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Outcome::Response(body) | Outcome::Error { body, .. } => serde_json::from_slice(body),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error { .. })
    }
}

struct Invocation {
    request_id: String,
    trace_id: Option<String>,
    body: Bytes,
}

#[derive(Default)]
struct State {
    pending: Mutex<VecDeque<Invocation>>,
    outcomes: Mutex<HashMap<String, Outcome>>,
    arrived: Notify,
}

// A panicking test thread must not take the other assertions down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A Runtime API listening on an ephemeral localhost port.
pub struct RuntimeApi {
    addr: SocketAddr,
    state: Arc<State>,
    server: JoinHandle<()>,
}

impl RuntimeApi {
    /// Binds and starts serving. Must be called inside a tokio runtime.
    pub fn start() -> Result<Self, Error> {
        let state = Arc::new(State::default());
        let shared = Arc::clone(&state);
        let make_svc = make_service_fn(move |_conn| {
            let state = Arc::clone(&shared);
            async move {
                Ok::<_, Infallible>(service_fn(move |req| handle(Arc::clone(&state), req)))
            }
        });

        let server = Server::try_bind(&SocketAddr::from(([127, 0, 0, 1], 0)))?.serve(make_svc);
        let addr = server.local_addr();
        let server = tokio::spawn(async move {
            if let Err(err) = server.await {
                tracing::error!(error = %err, "simulated runtime api stopped");
            }
        });

        Ok(Self { addr, state, server })
    }

    /// The `host:port` the API answers on, as `AWS_LAMBDA_RUNTIME_API` would carry it.
    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    /// A function configuration pointing at this API.
    pub fn config(&self) -> Config {
        Config {
            endpoint: self.endpoint(),
            function_name: "hello".to_string(),
            memory: 128,
            version: "$LATEST".to_string(),
            log_stream: "simulated".to_string(),
            log_group: "/aws/lambda/hello".to_string(),
        }
    }

    /// Queues an event to be handed out by the next `invocation/next` poll.
    pub fn enqueue(&self, request_id: &str, event: impl Into<Bytes>) {
        self.enqueue_traced(request_id, None, event)
    }

    /// Like [`enqueue`](Self::enqueue) with an X-Ray trace header attached.
    pub fn enqueue_traced(&self, request_id: &str, trace_id: Option<&str>, event: impl Into<Bytes>) {
        lock(&self.state.pending).push_back(Invocation {
            request_id: request_id.to_string(),
            trace_id: trace_id.map(str::to_string),
            body: event.into(),
        });
        self.state.arrived.notify_one();
    }

    /// What the function posted for `request_id`, if anything yet.
    pub fn outcome(&self, request_id: &str) -> Option<Outcome> {
        lock(&self.state.outcomes).get(request_id).cloned()
    }
}

impl Drop for RuntimeApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(state: Arc<State>, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let error_type = req
        .headers()
        .get(FUNCTION_ERROR_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = hyper::body::to_bytes(req.into_body()).await.unwrap_or_default();

    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let rsp = match (method, segments.as_slice()) {
        (Method::GET, ["2018-06-01", "runtime", "invocation", "next"]) => next_invocation(&state).await,
        (Method::POST, ["2018-06-01", "runtime", "invocation", request_id, "response"]) => {
            record(&state, request_id, Outcome::Response(body))
        }
        (Method::POST, ["2018-06-01", "runtime", "invocation", request_id, "error"]) => {
            record(&state, request_id, Outcome::Error { error_type, body })
        }
        _ => status(StatusCode::NOT_FOUND),
    };
    Ok(rsp)
}

async fn next_invocation(state: &State) -> Response<Body> {
    loop {
        let next = lock(&state.pending).pop_front();
        if let Some(invocation) = next {
            return invocation_response(invocation);
        }
        state.arrived.notified().await;
    }
}

fn invocation_response(invocation: Invocation) -> Response<Body> {
    let deadline = (SystemTime::now() + INVOCATION_TIMEOUT)
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(REQUEST_ID, invocation.request_id)
        .header(DEADLINE_MS, deadline.to_string())
        .header(FUNCTION_ARN, "arn:aws:lambda:us-east-1:123456789012:function:hello");
    if let Some(trace_id) = invocation.trace_id {
        builder = builder.header(TRACE_ID, trace_id);
    }
    builder
        .body(Body::from(invocation.body))
        .unwrap_or_else(|_| status(StatusCode::INTERNAL_SERVER_ERROR))
}

fn record(state: &State, request_id: &str, outcome: Outcome) -> Response<Body> {
    lock(&state.outcomes).insert(request_id.to_string(), outcome);
    status(StatusCode::ACCEPTED)
}

fn status(code: StatusCode) -> Response<Body> {
    let mut rsp = Response::new(Body::empty());
    *rsp.status_mut() = code;
    rsp
}
