//! Enriches the runtime crate with [http](https://github.com/hyperium/http)
//! types targeting ALB and API Gateway proxy events.
//!
//! The [`handler`] adapter turns an event into an `http::Request`, calls an
//! async `fn(Request, Context)` with it and turns whatever
//! [`IntoResponse`] value comes back into the envelope the originating
//! gateway expects. Events that do not convert are reported to the platform
//! as invocation errors.
//!
//! Gateway specific data (query string and path parameters, stage
//! variables, the request context) is available through [`RequestExt`].

pub use http::{self, Response};
pub use hello_lambda_runtime::{self as lambda, Context};

use hello_lambda_runtime::Handler as LambdaHandler;

mod ext;
pub mod request;
mod response;
mod strmap;

pub use crate::{
    ext::RequestExt,
    request::RequestError,
    response::IntoResponse,
    strmap::StrMap,
};
use crate::{
    request::{LambdaRequest, RequestOrigin},
    response::LambdaResponse,
};
pub use aws_lambda_events::encodings::Body;
use std::{
    convert::TryFrom,
    future::{self, Future},
    pin::Pin,
    task::{Context as TaskContext, Poll},
};

/// Error type that lambdas may result in
pub(crate) type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Type alias for `http::Request`s with a fixed [`Body`](enum.Body.html) type
pub type Request = http::Request<Body>;

/// Functions serving as ALB and API Gateway REST and HTTP API handlers must conform to this type.
///
/// This can be viewed as a `lambda::Handler` constrained to `http` crate `Request` and `Response` types
pub trait Handler: Sized {
    /// The type of Error that this Handler will return
    type Error;
    /// The type of Response this Handler will return
    type Response: IntoResponse;
    /// The type of Future this Handler will return
    type Fut: Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
    /// Function used to execute handler behavior
    fn call(&mut self, event: Request, context: Context) -> Self::Fut;
}

/// Adapts a [`Handler`](trait.Handler.html) to the `lambda::run` interface
pub fn handler<H: Handler>(handler: H) -> Adapter<H> {
    Adapter { handler }
}

/// An implementation of `Handler` for a given closure return a `Future` representing the computed response
impl<F, R, Fut> Handler for F
where
    F: FnMut(Request, Context) -> Fut,
    R: IntoResponse,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    type Response = R;
    type Error = Error;
    type Fut = Fut;
    fn call(&mut self, event: Request, context: Context) -> Self::Fut {
        (self)(event, context)
    }
}

#[doc(hidden)]
pub struct TransformResponse<R, E> {
    request_origin: RequestOrigin,
    fut: Pin<Box<dyn Future<Output = Result<R, E>> + Send>>,
}

impl<R, E> Future for TransformResponse<R, E>
where
    R: IntoResponse,
{
    type Output = Result<LambdaResponse, E>;
    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Result<LambdaResponse, E>> {
        match self.fut.as_mut().poll(cx) {
            Poll::Ready(result) => Poll::Ready(
                result.map(|resp| LambdaResponse::from_response(&self.request_origin, resp.into_response())),
            ),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Exists only to satisfy the trait cover rule for `lambda::Handler` impl
///
/// User code should never need to interact with this type directly. Since `Adapter` implements `Handler`
/// It serves as a opaque trait covering type.
///
/// See [this article](http://smallcultfollowing.com/babysteps/blog/2015/01/14/little-orphan-impls/)
/// for a larger explaination of why this is nessessary
pub struct Adapter<H: Handler> {
    handler: H,
}

impl<H> LambdaHandler<LambdaRequest, LambdaResponse> for Adapter<H>
where
    H: Handler,
    H::Response: Send + 'static,
    H::Error: From<RequestError> + Send + 'static,
{
    type Error = H::Error;
    type Fut = TransformResponse<H::Response, Self::Error>;

    fn call(&mut self, event: LambdaRequest, context: Context) -> Self::Fut {
        let request_origin = event.request_origin();
        let fut: Pin<Box<dyn Future<Output = Result<H::Response, H::Error>> + Send>> =
            match http::Request::try_from(event) {
                Ok(request) => Box::pin(self.handler.call(request, context)),
                Err(err) => {
                    tracing::error!(error = %err, "event does not convert to an http request");
                    Box::pin(future::ready(Err(H::Error::from(err))))
                }
            };
        TransformResponse { request_origin, fut }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hello_lambda_runtime::{simulated::RuntimeApi, Runtime};
    use serde_json::{json, Value};

    const APIGW_V2: &str = include_str!("../tests/data/apigw_v2_proxy_request.json");
    const ALB: &str = include_str!("../tests/data/alb_request.json");

    async fn echo_path(request: Request, _: Context) -> Result<Value, Error> {
        Ok(json!({ "path": request.uri().path() }))
    }

    #[tokio::test]
    async fn adapter_answers_in_the_origin_envelope() -> Result<(), Error> {
        let api = RuntimeApi::start()?;
        api.enqueue("v2", APIGW_V2);
        api.enqueue("alb", ALB);

        Runtime::new(api.config())?.run_for(handler(echo_path), 2).await?;

        let v2 = api.outcome("v2").expect("v2 response").json()?;
        assert_eq!(v2["statusCode"], 200);
        assert_eq!(v2["body"], r#"{"path":"/my/path"}"#);
        assert!(v2.get("statusDescription").is_none());

        let alb = api.outcome("alb").expect("alb response").json()?;
        assert_eq!(alb["statusCode"], 200);
        assert_eq!(alb["statusDescription"], "200 OK");
        assert_eq!(alb["body"], r#"{"path":"/lambda"}"#);
        Ok(())
    }

    #[tokio::test]
    async fn unconvertible_events_are_reported_as_errors() -> Result<(), Error> {
        let api = RuntimeApi::start()?;
        let mut event: Value = serde_json::from_str(APIGW_V2)?;
        event["body"] = Value::from("%%% not base64 %%%");
        api.enqueue("bad", event.to_string());

        Runtime::new(api.config())?.run_for(handler(echo_path), 1).await?;

        let outcome = api.outcome("bad").expect("error posted");
        assert!(outcome.is_error());
        assert_eq!(outcome.json()?["errorType"], "Runtime.HandlerError");
        assert!(outcome.json()?["errorMessage"]
            .as_str()
            .unwrap_or_default()
            .contains("base64"));
        Ok(())
    }
}
