#![deny(clippy::all)]
#![warn(nonstandard_style, rust_2018_idioms)]

//! The runtime client that drives the hello function on AWS Lambda.
//!
//! It polls the [Runtime API](https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html)
//! for invocations, hands each event to a [`Handler`] and posts the result
//! (or a [`Diagnostic`]) back.
//!
//! - An event handler is a type that implements [`Handler`], or an async
//!   function wrapped with [`handler_fn`].
//! - [`run`] reads the [`Config`] from the environment and loops forever.
//! - With the `derive` feature, `#[lambda]` generates `main` for you.
use futures_core::stream::Stream;
use futures_util::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    convert::TryFrom,
    env, fmt,
    future::Future,
    panic::AssertUnwindSafe,
};
use tracing::{error, info, trace};
use tracing_futures::Instrument;

mod client;
mod config;
mod error;
pub mod logging;
mod requests;
#[cfg(any(test, feature = "simulated"))]
pub mod simulated;
mod types;

use client::Client;
use requests::{EventCompletionRequest, EventErrorRequest, IntoRequest, NextEventRequest};

pub use crate::{
    config::Config,
    error::{ConfigError, RuntimeError},
    types::{ClientApplication, ClientContext, CognitoIdentity, Context, Diagnostic},
};
#[cfg(feature = "derive")]
pub use hello_lambda_attributes::lambda;

/// Error type that lambdas may result in
pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

const TRACE_ENV: &str = "_X_AMZN_TRACE_ID";

/// A trait describing an asynchronous function `A` to `B`.
pub trait Handler<A, B> {
    /// Errors returned by this handler.
    type Error;
    /// Response of this handler.
    type Fut: Future<Output = Result<B, Self::Error>>;
    /// Handle the incoming event.
    fn call(&mut self, event: A, context: Context) -> Self::Fut;
}

/// Returns a new [`HandlerFn`] with the given closure.
pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn { f }
}

/// A [`Handler`] implemented by a closure.
#[derive(Clone, Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F, A, B, E, Fut> Handler<A, B> for HandlerFn<F>
where
    F: Fn(A, Context) -> Fut,
    Fut: Future<Output = Result<B, E>>,
    E: fmt::Display,
{
    type Error = E;
    type Fut = Fut;

    fn call(&mut self, req: A, ctx: Context) -> Self::Fut {
        (self.f)(req, ctx)
    }
}

/// A client bound to one Runtime API endpoint.
#[derive(Debug)]
pub struct Runtime {
    client: Client,
    config: Config,
}

impl Runtime {
    /// Creates a runtime talking to `config.endpoint`.
    pub fn new(config: Config) -> Result<Self, Error> {
        let client = Client::for_endpoint(&config.endpoint)?;
        Ok(Self { client, config })
    }

    /// The configuration every [`Context`] is stamped with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serves invocations until the Runtime API or the process goes away.
    pub async fn run<F, A, B>(&self, handler: F) -> Result<(), Error>
    where
        F: Handler<A, B>,
        F::Error: fmt::Display,
        A: for<'de> Deserialize<'de>,
        B: Serialize,
    {
        self.serve(incoming(&self.client), handler).await
    }

    /// Serves exactly `invocations` invocations, then returns.
    pub async fn run_for<F, A, B>(&self, handler: F, invocations: usize) -> Result<(), Error>
    where
        F: Handler<A, B>,
        F::Error: fmt::Display,
        A: for<'de> Deserialize<'de>,
        B: Serialize,
    {
        self.serve(incoming(&self.client).take(invocations), handler).await
    }

    async fn serve<F, A, B>(
        &self,
        incoming: impl Stream<Item = Result<http::Response<hyper::Body>, Error>>,
        mut handler: F,
    ) -> Result<(), Error>
    where
        F: Handler<A, B>,
        F::Error: fmt::Display,
        A: for<'de> Deserialize<'de>,
        B: Serialize,
    {
        futures_util::pin_mut!(incoming);
        while let Some(event) = incoming.next().await {
            let event = event?;
            let (parts, body) = event.into_parts();
            let ctx = Context::try_from(parts.headers)?.with_config(&self.config);
            let body = hyper::body::to_bytes(body).await?;
            let request_id = ctx.request_id.clone();

            match &ctx.xray_trace_id {
                Some(trace_id) => env::set_var(TRACE_ENV, trace_id),
                None => env::remove_var(TRACE_ENV),
            }

            let span = tracing::info_span!("invocation", request_id = %request_id);
            let outcome = invoke(&mut handler, &body, ctx).instrument(span).await;

            let req = match outcome.and_then(|rsp| complete(&request_id, rsp)) {
                Ok(req) => req,
                Err(diagnostic) => EventErrorRequest {
                    request_id: &request_id,
                    diagnostic,
                }
                .into_req()?,
            };
            self.client.call(req).await?;
        }
        Ok(())
    }
}

async fn invoke<F, A, B>(handler: &mut F, body: &[u8], ctx: Context) -> Result<B, Diagnostic>
where
    F: Handler<A, B>,
    F::Error: fmt::Display,
    A: for<'de> Deserialize<'de>,
{
    let mut de = serde_json::Deserializer::from_slice(body);
    let event: A = serde_path_to_error::deserialize(&mut de).map_err(|err| {
        error!(error = %err, "event did not deserialize");
        Diagnostic {
            error_type: "Runtime.UnmarshalError".to_string(),
            error_message: err.to_string(),
        }
    })?;

    trace!("invoking handler");
    match AssertUnwindSafe(handler.call(event, ctx)).catch_unwind().await {
        Ok(Ok(rsp)) => {
            info!("invocation succeeded");
            Ok(rsp)
        }
        Ok(Err(err)) => {
            error!(error = %err, "handler failed");
            Err(Diagnostic {
                error_type: "Runtime.HandlerError".to_string(),
                error_message: err.to_string(),
            })
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(panic = %message, "handler panicked");
            Err(Diagnostic {
                error_type: "Runtime.HandlerPanic".to_string(),
                error_message: message,
            })
        }
    }
}

fn complete<B: Serialize>(request_id: &str, rsp: B) -> Result<http::Request<hyper::Body>, Diagnostic> {
    EventCompletionRequest { request_id, body: rsp }
        .into_req()
        .map_err(|err| {
            error!(error = %err, "response did not serialize");
            Diagnostic {
                error_type: "Runtime.SerializationError".to_string(),
                error_message: err.to_string(),
            }
        })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn incoming(client: &Client) -> impl Stream<Item = Result<http::Response<hyper::Body>, Error>> + '_ {
    async_stream::stream! {
        loop {
            trace!("waiting for next event");
            let next = match NextEventRequest.into_req() {
                Ok(req) => client.call(req).await,
                Err(err) => Err(err),
            };
            yield next;
        }
    }
}

/// Starts the Lambda runtime and begins polling for events on the [Lambda
/// Runtime APIs](https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html).
///
/// Returns only when the runtime itself fails; handler failures are reported
/// to the platform and the loop carries on.
pub async fn run<A, B, F>(handler: F) -> Result<(), Error>
where
    F: Handler<A, B>,
    F::Error: fmt::Display,
    A: for<'de> Deserialize<'de>,
    B: Serialize,
{
    trace!("loading config from env");
    let config = Config::from_env()?;
    info!(function = %config.function_name, version = %config.version, "runtime starting");
    Runtime::new(config)?.run(handler).await
}
