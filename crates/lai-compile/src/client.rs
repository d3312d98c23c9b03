//! Build service client
//!
//! One synchronous build per request: `POST {base_url}/builds/sync` with the
//! document as the single main resource. A success body is the compiled
//! document; failures carry a JSON `message`, plain text, or nothing.

use crate::error::BuildError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default LaTeX engine requested from the build service
pub const DEFAULT_COMPILER: &str = "pdflatex";

/// Default build service root
pub const DEFAULT_BASE_URL: &str = "http://localhost:2345";

/// Path of the synchronous build endpoint
pub const BUILD_PATH: &str = "/builds/sync";

/// Build request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Engine name, e.g. `pdflatex`
    pub compiler: String,
    /// Source files; exactly one is `main`
    pub resources: Vec<BuildResource>,
}

/// One source file in a build request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResource {
    /// Whether this is the entry point
    pub main: bool,
    /// File content
    pub content: String,
}

impl BuildRequest {
    /// Request compiling `content` as the only, main resource
    #[must_use]
    pub fn single(compiler: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
            resources: vec![BuildResource {
                main: true,
                content: content.into(),
            }],
        }
    }

    /// Content of the main resource
    #[must_use]
    pub fn main_content(&self) -> Option<&str> {
        self.resources
            .iter()
            .find(|r| r.main)
            .map(|r| r.content.as_str())
    }
}

/// Compiles documents
#[async_trait]
pub trait BuildService: Send + Sync {
    /// Run one build and return the compiled bytes
    ///
    /// # Errors
    /// Any failure to obtain a compiled document.
    async fn build(&self, request: BuildRequest) -> Result<Bytes, BuildError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// HTTP build service client
#[derive(Debug, Clone)]
pub struct HttpBuildService {
    base_url: String,
    timeout: Duration,
    http_client: Client,
}

impl HttpBuildService {
    /// Create a client with default settings
    ///
    /// # Errors
    /// Returns `BuildError::InvalidConfig` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, BuildError> {
        Self::builder().build()
    }

    /// Create a client builder
    #[must_use]
    pub fn builder() -> HttpBuildServiceBuilder {
        HttpBuildServiceBuilder::new()
    }

    /// Get the base URL
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the build endpoint
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), BUILD_PATH)
    }

    fn map_transport(&self, err: &reqwest::Error) -> BuildError {
        if err.is_timeout() {
            BuildError::Timeout(self.timeout.as_secs())
        } else {
            BuildError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl BuildService for HttpBuildService {
    async fn build(&self, request: BuildRequest) -> Result<Bytes, BuildError> {
        let url = self.endpoint();
        tracing::debug!(
            %url,
            compiler = %request.compiler,
            bytes = request.main_content().map_or(0, str::len),
            "sending build request"
        );

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let message = failure_message(status, response).await;
            return Err(BuildError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                BuildError::Timeout(self.timeout.as_secs())
            } else {
                BuildError::Body(e.to_string())
            }
        })
    }
}

/// Resolve a human-readable message for a failed build
///
/// JSON `message` first, then a plain-text body, then the reason phrase,
/// then a generic status line.
async fn failure_message(status: StatusCode, response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    message_from_body(status, &body)
}

pub(crate) fn message_from_body(status: StatusCode, body: &str) -> String {
    let body = body.trim();

    let from_body = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => serde_json::from_value::<ErrorBody>(value)
            .ok()
            .and_then(|b| b.message),
        Err(_) => Some(body.to_string()),
    };

    from_body
        .filter(|m| !m.trim().is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()))
}

/// Builder for [`HttpBuildService`]
#[derive(Debug, Default)]
pub struct HttpBuildServiceBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl HttpBuildServiceBuilder {
    /// Create builder with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build service root, e.g. `http://localhost:2345`
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Whole-request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client
    ///
    /// # Errors
    /// Returns `BuildError::InvalidConfig` for an empty URL or if the HTTP
    /// client cannot be built.
    pub fn build(self) -> Result<HttpBuildService, BuildError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if base_url.trim().is_empty() {
            return Err(BuildError::InvalidConfig("empty build service URL".to_string()));
        }
        let timeout = self.timeout.unwrap_or(Duration::from_secs(120));

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BuildError::InvalidConfig(e.to_string()))?;

        Ok(HttpBuildService {
            base_url,
            timeout,
            http_client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_body_shape() {
        let request = BuildRequest::single(DEFAULT_COMPILER, "\\documentclass{article}");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "compiler": "pdflatex",
                "resources": [{ "main": true, "content": "\\documentclass{article}" }]
            })
        );
        assert_eq!(request.main_content(), Some("\\documentclass{article}"));
    }

    #[test]
    fn message_prefers_json_field() {
        let msg = message_from_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"message":"syntax error"}"#,
        );
        assert_eq!(msg, "syntax error");
    }

    #[test]
    fn message_uses_plain_text_body() {
        let msg = message_from_body(StatusCode::BAD_REQUEST, "missing \\begin{document}\n");
        assert_eq!(msg, "missing \\begin{document}");
    }

    #[test]
    fn message_falls_back_to_reason_phrase() {
        assert_eq!(
            message_from_body(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"x"}"#),
            "Internal Server Error"
        );
        assert_eq!(
            message_from_body(StatusCode::SERVICE_UNAVAILABLE, ""),
            "Service Unavailable"
        );
    }

    #[test]
    fn message_falls_back_to_status_line() {
        let status = StatusCode::from_u16(599).unwrap();
        assert_eq!(message_from_body(status, ""), "Request failed with status 599");
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = HttpBuildService::builder()
            .base_url("http://build.local:2345/")
            .build()
            .unwrap();
        assert_eq!(client.endpoint(), "http://build.local:2345/builds/sync");
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let err = HttpBuildService::builder().base_url(" ").build().unwrap_err();
        assert!(matches!(err, BuildError::InvalidConfig(_)));
    }
}
