use crate::{config::Config, error::RuntimeError};
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    convert::TryFrom,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

pub(crate) const REQUEST_ID: &str = "lambda-runtime-aws-request-id";
pub(crate) const DEADLINE_MS: &str = "lambda-runtime-deadline-ms";
pub(crate) const FUNCTION_ARN: &str = "lambda-runtime-invoked-function-arn";
pub(crate) const TRACE_ID: &str = "lambda-runtime-trace-id";
pub(crate) const CLIENT_CONTEXT: &str = "lambda-runtime-client-context";
pub(crate) const COGNITO_IDENTITY: &str = "lambda-runtime-cognito-identity";
pub(crate) const FUNCTION_ERROR_TYPE: &str = "lambda-runtime-function-error-type";

/// Error body posted to the Runtime API when an invocation fails.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub error_type: String,
    pub error_message: String,
}

/// Client context sent by the AWS Mobile SDK.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ClientContext {
    /// Information about the mobile application invoking the function.
    pub client: ClientApplication,
    /// Custom properties attached to the mobile event context.
    pub custom: HashMap<String, String>,
    /// Environment settings from the mobile client.
    pub environment: HashMap<String, String>,
}

/// AWS Mobile SDK client fields.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClientApplication {
    pub installation_id: String,
    pub app_title: String,
    pub app_version_name: String,
    pub app_version_code: String,
    pub app_package_name: String,
}

/// Cognito identity information sent with the event
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CognitoIdentity {
    pub identity_id: String,
    pub identity_pool_id: String,
}

/// The Lambda function execution context. The values in this struct
/// are populated using the [Lambda environment variables](https://docs.aws.amazon.com/lambda/latest/dg/current-supported-versions.html)
/// and the headers returned by the poll request to the Runtime APIs.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Context {
    /// The AWS request ID generated by the Lambda service.
    pub request_id: String,
    /// The execution deadline for the current invocation in milliseconds.
    pub deadline: u64,
    /// The ARN of the Lambda function being invoked.
    pub invoked_function_arn: String,
    /// The X-Ray trace ID for the current invocation.
    pub xray_trace_id: Option<String>,
    /// The client context object sent by the AWS mobile SDK.
    pub client_context: Option<ClientContext>,
    /// The Cognito identity that invoked the function.
    pub identity: Option<CognitoIdentity>,
    /// Lambda function configuration from the local environment variables.
    pub env_config: Config,
}

impl TryFrom<HeaderMap> for Context {
    type Error = RuntimeError;

    fn try_from(headers: HeaderMap) -> Result<Self, Self::Error> {
        let request_id = header_str(&headers, REQUEST_ID)?.ok_or(RuntimeError::MissingHeader(REQUEST_ID))?;
        let deadline = header_str(&headers, DEADLINE_MS)?
            .ok_or(RuntimeError::MissingHeader(DEADLINE_MS))?
            .parse::<u64>()
            .map_err(|_| RuntimeError::InvalidHeader(DEADLINE_MS))?;

        let ctx = Context {
            request_id: request_id.to_owned(),
            deadline,
            invoked_function_arn: header_str(&headers, FUNCTION_ARN)?.unwrap_or_default().to_owned(),
            xray_trace_id: header_str(&headers, TRACE_ID)?.map(str::to_owned),
            client_context: parse_json_header(header_str(&headers, CLIENT_CONTEXT)?, CLIENT_CONTEXT),
            identity: parse_json_header(header_str(&headers, COGNITO_IDENTITY)?, COGNITO_IDENTITY),
            env_config: Config::default(),
        };
        Ok(ctx)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<Option<&'a str>, RuntimeError> {
    headers
        .get(name)
        .map(|value| value.to_str().map_err(|_| RuntimeError::InvalidHeader(name)))
        .transpose()
}

// A mangled optional header should not cost the invocation.
fn parse_json_header<T>(value: Option<&str>, name: &'static str) -> Option<T>
where
    T: for<'de> Deserialize<'de>,
{
    let value = value?;
    match serde_json::from_str(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::warn!(header = name, error = %err, "ignoring unparseable header");
            None
        }
    }
}

impl Context {
    pub(crate) fn with_config(self, config: &Config) -> Self {
        Self {
            env_config: config.clone(),
            ..self
        }
    }

    /// The execution deadline as a point in time.
    pub fn deadline(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn base_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID, HeaderValue::from_static("my-id"));
        headers.insert(DEADLINE_MS, HeaderValue::from_static("123"));
        headers
    }

    #[test]
    fn round_trip_lambda_error() {
        let expected = serde_json::json!({
            "errorType": "InvalidEventDataError",
            "errorMessage": "Error parsing event data.",
        });

        let actual = Diagnostic {
            error_type: "InvalidEventDataError".into(),
            error_message: "Error parsing event data.".into(),
        };
        let actual: serde_json::Value = serde_json::to_value(actual).expect("failed to serialize diagnostic");
        assert_eq!(expected, actual);
    }

    #[test]
    fn context_with_expected_values_and_types_resolves() {
        let mut headers = base_headers();
        headers.insert(FUNCTION_ARN, HeaderValue::from_static("arn::myarn"));
        headers.insert(TRACE_ID, HeaderValue::from_static("Root=1-5759e988"));

        let ctx = Context::try_from(headers).expect("context");
        assert_eq!(ctx.request_id, "my-id");
        assert_eq!(ctx.deadline, 123);
        assert_eq!(ctx.invoked_function_arn, "arn::myarn");
        assert_eq!(ctx.xray_trace_id.as_deref(), Some("Root=1-5759e988"));
        assert_eq!(ctx.deadline(), UNIX_EPOCH + Duration::from_millis(123));
    }

    #[test]
    fn context_with_client_context_and_identity_resolves() {
        let mut headers = base_headers();
        headers.insert(
            COGNITO_IDENTITY,
            HeaderValue::from_static(r#"{"identityId":"id","identityPoolId":"pool"}"#),
        );
        headers.insert(
            CLIENT_CONTEXT,
            HeaderValue::from_static(
                r#"{"client":{"installationId":"i","appTitle":"t","appVersionName":"n","appVersionCode":"c","appPackageName":"p"},"custom":{},"environment":{}}"#,
            ),
        );

        let ctx = Context::try_from(headers).expect("context");
        assert_eq!(
            ctx.identity,
            Some(CognitoIdentity {
                identity_id: "id".into(),
                identity_pool_id: "pool".into(),
            })
        );
        assert_eq!(ctx.client_context.map(|c| c.client.app_title), Some("t".to_string()));
    }

    #[test]
    fn garbled_client_context_is_dropped() {
        let mut headers = base_headers();
        headers.insert(CLIENT_CONTEXT, HeaderValue::from_static("{not json"));
        let ctx = Context::try_from(headers).expect("context");
        assert!(ctx.client_context.is_none());
    }

    #[test]
    fn context_without_request_id_fails() {
        let mut headers = base_headers();
        headers.remove(REQUEST_ID);
        assert!(matches!(
            Context::try_from(headers),
            Err(RuntimeError::MissingHeader(REQUEST_ID))
        ));
    }

    #[test]
    fn context_with_bad_deadline_fails() {
        let mut headers = base_headers();
        headers.insert(DEADLINE_MS, HeaderValue::from_static("soon"));
        assert!(matches!(
            Context::try_from(headers),
            Err(RuntimeError::InvalidHeader(DEADLINE_MS))
        ));
    }
}
