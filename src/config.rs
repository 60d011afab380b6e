//! Configuration Management
//!
//! Resolves the endpoint configuration for the DSPC client. Each attribute
//! falls back from the explicit value, to the environment, to a default.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Environment variable overriding the API endpoint
pub const ENV_ENDPOINT: &str = "DSPC_ENDPOINT";
/// Environment variable overriding the API key
pub const ENV_API_KEY: &str = "DSPC_API_KEY";
/// Environment variable overriding the request timeout, in seconds
pub const ENV_TIMEOUT: &str = "DSPC_TIMEOUT";

/// Request timeout used when neither config nor environment sets one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider configuration as supplied by the caller.
///
/// `None` means "not specified"; an empty string is treated the same way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the DSPC VM Deployer API
    #[serde(default)]
    pub endpoint: Option<String>,
    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,
    /// Timeout in seconds for API requests
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// Resolve against the process environment
    pub fn resolve(&self) -> Result<EndpointConfig> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` for environment overrides.
    pub fn resolve_with<F>(&self, lookup: F) -> Result<EndpointConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = first_non_empty(self.endpoint.as_deref(), lookup(ENV_ENDPOINT)).ok_or_else(|| {
            Error::Config(format!(
                "endpoint is required but not provided. Please set the 'endpoint' attribute \
                 in the provider configuration or set the {ENV_ENDPOINT} environment variable"
            ))
        })?;

        let api_key = first_non_empty(self.api_key.as_deref(), lookup(ENV_API_KEY)).ok_or_else(|| {
            Error::Config(format!(
                "API key is required but not provided. Please set the 'api_key' attribute \
                 in the provider configuration or set the {ENV_API_KEY} environment variable"
            ))
        })?;

        let timeout = resolve_timeout(self.timeout_secs, lookup(ENV_TIMEOUT))?;

        tracing::debug!(
            "Resolved DSPC config: endpoint={}, timeout={}s",
            endpoint,
            timeout.as_secs()
        );

        EndpointConfig::new(endpoint, api_key, timeout)
    }
}

fn first_non_empty(explicit: Option<&str>, env: Option<String>) -> Option<String> {
    explicit
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| env.filter(|v| !v.is_empty()))
}

/// Explicit timeout, then `DSPC_TIMEOUT`, then [`DEFAULT_TIMEOUT`].
fn resolve_timeout(explicit: Option<u64>, env: Option<String>) -> Result<Duration> {
    let secs = match (explicit, env.as_deref().map(str::trim)) {
        (Some(secs), _) => secs,
        (None, Some(raw)) if !raw.is_empty() => raw.parse::<u64>().map_err(|e| {
            Error::Config(format!("invalid {ENV_TIMEOUT} value '{raw}': {e}"))
        })?,
        _ => return Ok(DEFAULT_TIMEOUT),
    };

    if secs == 0 {
        return Err(Error::Config(
            "timeout must be at least 1 second; omit it to use the 30 second default".to_string(),
        ));
    }

    Ok(Duration::from_secs(secs))
}

/// Resolved, immutable endpoint configuration.
///
/// Endpoint and API key are guaranteed non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl EndpointConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        let api_key = api_key.into();

        if endpoint.is_empty() {
            return Err(Error::Config("endpoint must not be empty".to_string()));
        }
        if api_key.is_empty() {
            return Err(Error::Config("API key must not be empty".to_string()));
        }

        Ok(Self {
            endpoint,
            api_key,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
