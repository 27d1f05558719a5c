use crate::error::ConfigError;
use std::env;

const RUNTIME_API: &str = "AWS_LAMBDA_RUNTIME_API";
const FUNCTION_NAME: &str = "AWS_LAMBDA_FUNCTION_NAME";
const MEMORY_SIZE: &str = "AWS_LAMBDA_FUNCTION_MEMORY_SIZE";
const FUNCTION_VERSION: &str = "AWS_LAMBDA_FUNCTION_VERSION";
const LOG_STREAM: &str = "AWS_LAMBDA_LOG_STREAM_NAME";
const LOG_GROUP: &str = "AWS_LAMBDA_LOG_GROUP_NAME";

/// Configuration derived from environment variables.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Config {
    /// The host and port of the [runtime API](https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html).
    pub endpoint: String,
    /// The name of the function.
    pub function_name: String,
    /// The amount of memory available to the function in MB.
    pub memory: i32,
    /// The version of the function being executed.
    pub version: String,
    /// The name of the Amazon CloudWatch Logs stream for the function.
    pub log_stream: String,
    /// The name of the Amazon CloudWatch Logs group for the function.
    pub log_group: String,
}

impl Config {
    /// Attempts to read configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let memory = require(MEMORY_SIZE)?;
        let memory = memory.parse().map_err(|_| ConfigError::Invalid {
            name: MEMORY_SIZE,
            value: memory,
        })?;

        Ok(Config {
            endpoint: require(RUNTIME_API)?,
            function_name: require(FUNCTION_NAME)?,
            memory,
            version: require(FUNCTION_VERSION)?,
            log_stream: require(LOG_STREAM)?,
            log_group: require(LOG_GROUP)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;
    use std::collections::HashMap;

    fn platform_env() -> HashMap<&'static str, &'static str> {
        hashmap! {
            "AWS_LAMBDA_RUNTIME_API" => "127.0.0.1:9001",
            "AWS_LAMBDA_FUNCTION_NAME" => "hello",
            "AWS_LAMBDA_FUNCTION_MEMORY_SIZE" => "128",
            "AWS_LAMBDA_FUNCTION_VERSION" => "$LATEST",
            "AWS_LAMBDA_LOG_STREAM_NAME" => "2021/01/01/[$LATEST]abc",
            "AWS_LAMBDA_LOG_GROUP_NAME" => "/aws/lambda/hello",
        }
    }

    #[test]
    fn reads_every_variable() {
        let vars = platform_env();
        let config = Config::from_lookup(|name| vars.get(name).map(|v| v.to_string())).expect("valid config");
        assert_eq!(config.endpoint, "127.0.0.1:9001");
        assert_eq!(config.function_name, "hello");
        assert_eq!(config.memory, 128);
        assert_eq!(config.version, "$LATEST");
        assert_eq!(config.log_group, "/aws/lambda/hello");
    }

    #[test]
    fn missing_variable_is_named() {
        let mut vars = platform_env();
        vars.remove("AWS_LAMBDA_RUNTIME_API");
        let err = Config::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("AWS_LAMBDA_RUNTIME_API")));
    }

    #[test]
    fn memory_must_be_numeric() {
        let mut vars = platform_env();
        vars.insert("AWS_LAMBDA_FUNCTION_MEMORY_SIZE", "lots");
        let err = Config::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"invalid value "lots" for environment variable AWS_LAMBDA_FUNCTION_MEMORY_SIZE"#
        );
    }
}
