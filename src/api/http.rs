//! HTTP transport for DSPC REST API calls

use crate::config::EndpointConfig;
use crate::error::{Error, Result};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let char_count = body.chars().count();
    let truncated = if char_count > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Transport-level failures. Status codes are never inspected here.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid endpoint URL '{input}': {source}")]
    InvalidEndpoint {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid path '{input}': {source}")]
    InvalidPath {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The call context was cancelled
    #[error("request cancelled: context canceled")]
    Cancelled,

    /// The call context's deadline passed
    #[error("request cancelled: context deadline exceeded")]
    DeadlineExceeded,

    /// The client-level request timeout fired
    #[error("request timed out: {0}")]
    TimedOut(#[source] reqwest::Error),

    #[error("failed to make request: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

impl TransportError {
    fn from_send(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::TimedOut(e)
        } else {
            TransportError::Connection(e)
        }
    }

    fn from_body(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::TimedOut(e)
        } else {
            TransportError::Body(e)
        }
    }
}

/// Per-call cancellation and deadline.
///
/// Cloning shares the cancellation token, so cancelling one clone cancels
/// every call running under any of them.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context driven by an externally owned token
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Add a deadline `timeout` from now. An earlier existing deadline is kept.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first. Cancellation wins over a ready deadline.
    pub async fn run<F>(&self, fut: F) -> std::result::Result<F::Output, TransportError>
    where
        F: Future,
    {
        if self.cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TransportError::Cancelled),
            _ = deadline => Err(TransportError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}

/// Parse the endpoint and treat its path as a directory, so relative paths
/// resolve underneath it.
pub fn parse_endpoint(endpoint: &str) -> std::result::Result<Url, TransportError> {
    let mut base = Url::parse(endpoint.trim()).map_err(|source| TransportError::InvalidEndpoint {
        input: endpoint.to_string(),
        source,
    })?;

    if base.cannot_be_a_base() {
        return Err(TransportError::InvalidEndpoint {
            input: endpoint.to_string(),
            source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
        });
    }

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.set_fragment(None);

    Ok(base)
}

/// Resolve `path` against `base` using standard reference resolution.
pub fn resolve_url(base: &Url, path: &str) -> std::result::Result<Url, TransportError> {
    base.join(path).map_err(|source| TransportError::InvalidPath {
        input: path.to_string(),
        source,
    })
}

/// HTTP client wrapper for DSPC API calls
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    base: Arc<Url>,
    api_key: Option<Arc<str>>,
}

impl HttpClient {
    /// Create a new HTTP client. An empty `api_key` is treated as absent.
    pub fn new(endpoint: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let base = parse_endpoint(endpoint)?;

        let client = Client::builder()
            .user_agent(concat!("dspc/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            client,
            base: Arc::new(base),
            api_key: api_key.filter(|k| !k.is_empty()).map(Arc::from),
        })
    }

    pub fn from_config(config: &EndpointConfig) -> Result<Self> {
        Self::new(config.endpoint(), Some(config.api_key()), config.timeout())
    }

    /// Normalized base endpoint
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(resolve_url(&self.base, path)?)
    }

    /// Send one request and return the raw response.
    pub async fn request<B>(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;

        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(Error::Encode)?;

        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        if let Some(payload) = payload {
            request = request.body(payload);
        }

        let response = ctx
            .run(request.send())
            .await?
            .map_err(TransportError::from_send)?;

        Ok(response)
    }

    /// Read the whole response body under the call context
    pub async fn read_body(&self, ctx: &CallContext, response: Response) -> Result<String> {
        let body = ctx
            .run(response.text())
            .await?
            .map_err(TransportError::from_body)?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.contains("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_handles_multibyte_boundaries() {
        let body = "é".repeat(300);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("truncated"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("bad\nbody\t!"), "badbody!");
    }

    #[test]
    fn test_url_construction() {
        let cases = [
            ("https://api.example.com/", "/virtualmachine", "https://api.example.com/virtualmachine"),
            ("https://api.example.com", "/virtualmachine", "https://api.example.com/virtualmachine"),
            ("http://localhost:8080", "/virtualmachine", "http://localhost:8080/virtualmachine"),
            ("https://api.example.com", "virtualmachine", "https://api.example.com/virtualmachine"),
            ("https://api.example.com/", "virtualmachine", "https://api.example.com/virtualmachine"),
        ];

        for (endpoint, path, expected) in cases {
            let base = parse_endpoint(endpoint).unwrap();
            assert_eq!(resolve_url(&base, path).unwrap().as_str(), expected, "{endpoint} + {path}");
        }
    }

    #[test]
    fn test_relative_path_appends_under_base_path() {
        let base = parse_endpoint("https://h/api").unwrap();
        assert_eq!(resolve_url(&base, "r").unwrap().as_str(), "https://h/api/r");
        assert_eq!(resolve_url(&base, "/r").unwrap().as_str(), "https://h/r");
    }

    #[test]
    fn test_absolute_url_replaces_base() {
        let base = parse_endpoint("https://h/api/").unwrap();
        assert_eq!(
            resolve_url(&base, "https://other/r").unwrap().as_str(),
            "https://other/r"
        );
    }

    #[test]
    fn test_malformed_endpoint_is_rejected() {
        assert!(matches!(
            parse_endpoint("not a url"),
            Err(TransportError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            parse_endpoint("mailto:ops@example.com"),
            Err(TransportError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_malformed_path_is_rejected() {
        let base = parse_endpoint("https://h").unwrap();
        assert!(matches!(
            resolve_url(&base, "http://[::1"),
            Err(TransportError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_empty_api_key_is_treated_as_absent() {
        let client = HttpClient::new("http://x", Some(""), Duration::from_secs(1)).unwrap();
        assert!(client.api_key.is_none());
    }

    #[tokio::test]
    async fn test_run_reports_cancellation_before_polling() {
        let ctx = CallContext::new();
        ctx.cancel();
        let result = ctx.run(async { 1 }).await;
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }

    #[tokio::test]
    async fn test_run_reports_deadline() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(20));
        let result = ctx.run(tokio::time::sleep(Duration::from_secs(5))).await;
        assert!(matches!(result, Err(TransportError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_run_passes_output_through() {
        let ctx = CallContext::new().with_timeout(Duration::from_secs(5));
        assert_eq!(ctx.run(async { 7 }).await.unwrap(), 7);
    }

    #[test]
    fn test_external_token_cancels_context() {
        let token = CancellationToken::new();
        let ctx = CallContext::with_token(token.clone());
        let clone = ctx.clone();
        assert!(!ctx.is_cancelled());

        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_with_deadline_keeps_earliest() {
        let now = Instant::now();
        let ctx = CallContext::new()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }
}
