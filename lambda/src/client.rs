use crate::{error::RuntimeError, Error};
use http::{uri::PathAndQuery, Request, Response, Uri};
use hyper::{client::HttpConnector, Body};
use std::convert::TryFrom;

/// Thin wrapper pinning every request to the Runtime API origin.
#[derive(Debug)]
pub(crate) struct Client {
    base: Uri,
    client: hyper::Client<HttpConnector>,
}

impl Client {
    pub(crate) fn new(base: Uri) -> Self {
        Self {
            base,
            client: hyper::Client::new(),
        }
    }

    /// Builds a client for an `AWS_LAMBDA_RUNTIME_API` style `host:port` endpoint.
    pub(crate) fn for_endpoint(endpoint: &str) -> Result<Self, Error> {
        let base = Uri::try_from(format!("http://{}", endpoint))?;
        Ok(Self::new(base))
    }

    fn set_origin(&self, req: Request<Body>) -> Result<Request<Body>, Error> {
        let (mut parts, body) = req.into_parts();
        let path = parts
            .uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        let mut uri = Uri::builder().path_and_query(path);
        if let Some(scheme) = self.base.scheme() {
            uri = uri.scheme(scheme.clone());
        }
        if let Some(authority) = self.base.authority() {
            uri = uri.authority(authority.clone());
        }
        parts.uri = uri.build()?;

        Ok(Request::from_parts(parts, body))
    }

    /// Sends `req` and fails on any non-2xx answer.
    pub(crate) async fn call(&self, req: Request<Body>) -> Result<Response<Body>, Error> {
        let req = self.set_origin(req)?;
        let path = req.uri().path().to_owned();
        let rsp = self.client.request(req).await?;
        if !rsp.status().is_success() {
            return Err(RuntimeError::UnexpectedStatus {
                status: rsp.status(),
                path,
            }
            .into());
        }
        Ok(rsp)
    }
}
