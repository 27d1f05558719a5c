//! ALB and API Gateway request adaptations
//!
//! Typically these are exposed via the `request_context`
//! request extension method provided by [`RequestExt`](crate::RequestExt)
//!
use crate::{
    ext::{PathParameters, QueryStringParameters, StageVariables},
    strmap::StrMap,
    Body,
};
use aws_lambda_events::event::alb::{AlbTargetGroupRequest, AlbTargetGroupRequestContext};
use aws_lambda_events::event::apigw::{
    ApiGatewayProxyRequest, ApiGatewayProxyRequestContext, ApiGatewayV2httpRequest, ApiGatewayV2httpRequestContext,
};
use http::{
    header::{HeaderName, HeaderValue, COOKIE, HOST},
    request::Builder,
    HeaderMap, Method,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::Value;
use std::convert::TryFrom;

/// Bytes a raw request path may not carry into a `Uri` unescaped.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// REST API paths arrive already decoded, so a literal `%` is data too.
const DECODED_PATH: &AsciiSet = &PATH.add(b'%');

/// Reasons an event can not be turned into an `http::Request`.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("event is not an ALB or API Gateway request: {0}")]
    Event(#[from] serde_json::Error),

    #[error("event does not describe a valid http request: {0}")]
    Http(#[from] http::Error),

    #[error("event body is flagged as base64 but does not decode: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Internal representation of an Lambda http event from
/// ALB, API Gateway REST and HTTP API proxy event perspectives
///
/// This is not intended to be a type consumed by crate users directly.
#[doc(hidden)]
#[derive(Debug)]
pub enum LambdaRequest {
    ApiGatewayV1(ApiGatewayProxyRequest),
    ApiGatewayV2(ApiGatewayV2httpRequest),
    Alb(AlbTargetGroupRequest),
}

impl LambdaRequest {
    /// Return the `RequestOrigin` of the request to determine where the `LambdaRequest`
    /// originated from, so that the appropriate response can be selected based on what
    /// type of response the request origin expects.
    pub fn request_origin(&self) -> RequestOrigin {
        match self {
            LambdaRequest::ApiGatewayV1 { .. } => RequestOrigin::ApiGatewayV1,
            LambdaRequest::ApiGatewayV2 { .. } => RequestOrigin::ApiGatewayV2,
            LambdaRequest::Alb { .. } => RequestOrigin::Alb,
        }
    }
}

// The three payloads overlap too much for an untagged enum to tell them
// apart reliably, so the origin is picked from the fields only it carries.
impl<'de> Deserialize<'de> for LambdaRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let event = Value::deserialize(deserializer)?;
        let parsed = match RequestOrigin::detect(&event) {
            RequestOrigin::ApiGatewayV1 => serde_json::from_value(event).map(LambdaRequest::ApiGatewayV1),
            RequestOrigin::ApiGatewayV2 => serde_json::from_value(event).map(LambdaRequest::ApiGatewayV2),
            RequestOrigin::Alb => serde_json::from_value(event).map(LambdaRequest::Alb),
        };
        parsed.map_err(D::Error::custom)
    }
}

/// Represents the origin from which the lambda was requested from.
#[doc(hidden)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestOrigin {
    /// API Gateway proxy request origin
    ApiGatewayV1,
    /// API Gateway v2 request origin
    ApiGatewayV2,
    /// ALB request origin
    Alb,
}

impl RequestOrigin {
    fn detect(event: &Value) -> Self {
        let context = &event["requestContext"];
        if !context["elb"].is_null() {
            RequestOrigin::Alb
        } else if event["version"] == "2.0" || !context["http"].is_null() {
            RequestOrigin::ApiGatewayV2
        } else {
            RequestOrigin::ApiGatewayV1
        }
    }
}

/// Event request context as an enumeration of request contexts
/// for both ALB and API Gateway and HTTP API events
#[derive(Debug, Clone)]
pub enum RequestContext {
    /// API Gateway proxy request context
    ApiGatewayV1(ApiGatewayProxyRequestContext),
    /// API Gateway v2 request context
    ApiGatewayV2(ApiGatewayV2httpRequestContext),
    /// ALB request context
    Alb(AlbTargetGroupRequestContext),
}

/// Converts LambdaRequest types into `http::Request<Body>` types
impl TryFrom<LambdaRequest> for http::Request<Body> {
    type Error = RequestError;

    fn try_from(value: LambdaRequest) -> Result<Self, Self::Error> {
        match value {
            LambdaRequest::ApiGatewayV2(ag) => into_api_gateway_v2_request(ag),
            LambdaRequest::ApiGatewayV1(ag) => into_proxy_request(ag),
            LambdaRequest::Alb(alb) => into_alb_request(alb),
        }
    }
}

fn into_api_gateway_v2_request(ag: ApiGatewayV2httpRequest) -> Result<http::Request<Body>, RequestError> {
    let http_method = ag.request_context.http.method.clone();
    let builder = http::Request::builder()
        .uri({
            let host = header_str(&ag.headers, HOST)
                .or_else(|| ag.request_context.domain_name.as_deref())
                .unwrap_or("localhost");

            let mut url = format!(
                "{}://{}{}",
                scheme(&ag.headers),
                host,
                utf8_percent_encode(ag.raw_path.as_deref().unwrap_or("/"), PATH)
            );
            if let Some(query) = ag.raw_query_string.as_deref().filter(|q| !q.is_empty()) {
                url.push('?');
                url.push_str(query);
            }
            url
        })
        .extension(QueryStringParameters(StrMap::from(ag.query_string_parameters)))
        .extension(PathParameters(StrMap::from(ag.path_parameters)))
        .extension(StageVariables(StrMap::from(ag.stage_variables)))
        .extension(RequestContext::ApiGatewayV2(ag.request_context));

    let mut headers = ag.headers;
    if let Some(cookies) = ag.cookies.filter(|c| !c.is_empty()) {
        let cookie = HeaderValue::from_str(&cookies.join(";")).map_err(http::Error::from)?;
        headers.append(COOKIE, cookie);
    }

    finish(builder, http_method, headers, ag.body.as_deref(), ag.is_base64_encoded)
}

fn into_proxy_request(ag: ApiGatewayProxyRequest) -> Result<http::Request<Body>, RequestError> {
    let http_method = ag.http_method;
    let builder = http::Request::builder()
        .uri(format!(
            "{}://{}{}",
            scheme(&ag.headers),
            header_str(&ag.headers, HOST).unwrap_or("localhost"),
            utf8_percent_encode(ag.path.as_deref().unwrap_or("/"), DECODED_PATH)
        ))
        // multi-valued query string parameters are always a super
        // set of singly valued query string parameters,
        // when present, multi-valued query string parameters are preferred
        .extension(QueryStringParameters(
            if ag.multi_value_query_string_parameters.is_empty() {
                StrMap::from(ag.query_string_parameters)
            } else {
                StrMap::from(ag.multi_value_query_string_parameters)
            },
        ))
        .extension(PathParameters(StrMap::from(ag.path_parameters)))
        .extension(StageVariables(StrMap::from(ag.stage_variables)))
        .extension(RequestContext::ApiGatewayV1(ag.request_context));

    // merge headers into multi_value_headers and make
    // multi-value_headers our cannoncial source of request headers
    let mut headers = ag.multi_value_headers;
    headers.extend(ag.headers);

    let base64 = ag.is_base64_encoded.unwrap_or_default();
    finish(builder, http_method, headers, ag.body.as_deref(), base64)
}

fn into_alb_request(alb: AlbTargetGroupRequest) -> Result<http::Request<Body>, RequestError> {
    let http_method = alb.http_method;
    let builder = http::Request::builder()
        .uri(format!(
            "{}://{}{}",
            scheme(&alb.headers),
            header_str(&alb.headers, HOST).unwrap_or("localhost"),
            utf8_percent_encode(alb.path.as_deref().unwrap_or("/"), PATH)
        ))
        .extension(QueryStringParameters(
            if alb.multi_value_query_string_parameters.is_empty() {
                StrMap::from(alb.query_string_parameters)
            } else {
                StrMap::from(alb.multi_value_query_string_parameters)
            },
        ))
        .extension(RequestContext::Alb(alb.request_context));

    let mut headers = alb.multi_value_headers;
    headers.extend(alb.headers);

    finish(builder, http_method, headers, alb.body.as_deref(), alb.is_base64_encoded)
}

fn finish(
    builder: Builder,
    method: Method,
    headers: HeaderMap,
    body: Option<&str>,
    is_base64_encoded: bool,
) -> Result<http::Request<Body>, RequestError> {
    let body = match body {
        None | Some("") => Body::Empty,
        Some(encoded) if is_base64_encoded => Body::Binary(base64::decode(encoded)?),
        Some(text) => Body::Text(text.to_owned()),
    };
    let mut req = builder.body(body)?;

    // no builder method that sets headers in batch
    *req.headers_mut() = headers;
    *req.method_mut() = method;

    Ok(req)
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn scheme(headers: &HeaderMap) -> &str {
    header_str(headers, HeaderName::from_static("x-forwarded-proto")).unwrap_or("https")
}

/// Deserializes a `Request` from a string of JSON text.
pub fn from_str(s: &str) -> Result<crate::Request, RequestError> {
    let event: LambdaRequest = serde_json::from_str(s)?;
    http::Request::try_from(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestExt;

    const APIGW_V1: &str = include_str!("../tests/data/apigw_proxy_request.json");
    const APIGW_V2: &str = include_str!("../tests/data/apigw_v2_proxy_request.json");
    const ALB: &str = include_str!("../tests/data/alb_request.json");

    #[test]
    fn origin_is_detected_from_shape() {
        let origin = |s: &str| serde_json::from_str::<LambdaRequest>(s).map(|e| e.request_origin());
        assert_eq!(origin(APIGW_V1).expect("v1"), RequestOrigin::ApiGatewayV1);
        assert_eq!(origin(APIGW_V2).expect("v2"), RequestOrigin::ApiGatewayV2);
        assert_eq!(origin(ALB).expect("alb"), RequestOrigin::Alb);
    }

    #[test]
    fn deserializes_apigw_request_events() {
        let req = from_str(APIGW_V1).expect("failed to parse request");
        assert_eq!(req.method(), Method::POST);
        assert_eq!(
            req.uri(),
            "https://wt6mne2s9k.execute-api.us-west-2.amazonaws.com/test/hello"
        );
        assert_eq!(req.query_string_parameters().get_all("name"), Some(vec!["me", "you"]));
        assert_eq!(req.path_parameters().get("proxy"), Some("hello"));
        assert_eq!(req.stage_variables().get("stageVarName"), Some("stageVarValue"));
        assert!(matches!(req.request_context(), Some(RequestContext::ApiGatewayV1(_))));
        match req.body() {
            Body::Text(text) => assert_eq!(text, r#"{"hello":"world"}"#),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn deserializes_apigw_v2_request_events() {
        let req = from_str(APIGW_V2).expect("failed to parse request");
        assert_eq!(req.method(), Method::GET);
        assert_eq!(
            req.uri(),
            "https://id.execute-api.us-east-1.amazonaws.com/my/path?parameter1=value1&parameter1=value2&parameter2=value"
        );
        assert_eq!(
            req.headers().get(COOKIE).and_then(|v| v.to_str().ok()),
            Some("cookie1=value1;cookie2=value2")
        );
        assert_eq!(req.query_string_parameters().get("parameter2"), Some("value"));
        assert!(matches!(req.request_context(), Some(RequestContext::ApiGatewayV2(_))));
        match req.body() {
            Body::Binary(bytes) => assert_eq!(bytes.as_slice(), b"hello from lambda"),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn deserializes_alb_request_events() {
        let req = from_str(ALB).expect("failed to parse request");
        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.uri(), "https://lambda-alb-123578498.us-east-2.elb.amazonaws.com/lambda");
        assert_eq!(req.query_string_parameters().get("query"), Some("1234ABCD"));
        assert!(req.path_parameters().is_empty());
        assert!(matches!(req.request_context(), Some(RequestContext::Alb(_))));
        assert!(matches!(req.body(), Body::Empty));
    }

    #[test]
    fn decoded_apigw_paths_are_escaped() {
        let mut event: Value = serde_json::from_str(APIGW_V1).expect("fixture");
        event["path"] = Value::from("/héllo wörld/100%");
        let req = from_str(&event.to_string()).expect("failed to parse request");
        assert_eq!(req.uri().path(), "/h%C3%A9llo%20w%C3%B6rld/100%25");
    }

    #[test]
    fn raw_paths_keep_their_escapes() {
        let mut event: Value = serde_json::from_str(ALB).expect("fixture");
        event["path"] = Value::from("/lambda%20fn/a b");
        let req = from_str(&event.to_string()).expect("failed to parse request");
        assert_eq!(req.uri().path(), "/lambda%20fn/a%20b");

        let mut event: Value = serde_json::from_str(APIGW_V2).expect("fixture");
        event["rawPath"] = Value::from("/my/p%C3%A4th");
        let req = from_str(&event.to_string()).expect("failed to parse request");
        assert_eq!(req.uri().path(), "/my/p%C3%A4th");
    }

    #[test]
    fn bad_base64_is_an_error_not_a_panic() {
        let mut event: Value = serde_json::from_str(APIGW_V2).expect("fixture");
        event["body"] = Value::from("%%% not base64 %%%");
        let err = from_str(&event.to_string()).unwrap_err();
        assert!(matches!(err, RequestError::Base64(_)));
    }

    #[test]
    fn non_json_events_are_rejected() {
        let err = from_str("<xml/>").unwrap_err();
        assert!(matches!(err, RequestError::Event(_)));
    }
}
