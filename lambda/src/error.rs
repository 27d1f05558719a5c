//! Typed failures raised by the runtime itself, as opposed to failures of
//! the function it drives.

/// Problems reading the function configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for environment variable {name}")]
    Invalid { name: &'static str, value: String },
}

/// Problems talking to the Runtime API.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("next invocation is missing the {0} header")]
    MissingHeader(&'static str),

    #[error("next invocation has an invalid {0} header")]
    InvalidHeader(&'static str),

    #[error("runtime api answered {status} on {path}")]
    UnexpectedStatus { status: http::StatusCode, path: String },
}
