//! Hosted OpenAI-compatible chat-completion client.
//!
//! `POST {base_url}/chat/completions` with a bearer token and, when
//! configured, an `OpenAI-Organization` header. Works against OpenAI and
//! any server that speaks the same wire format.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::instrument;

use super::sse;
use super::traits::{ChatRequest, Completion, CompletionTransport};
use crate::config::DEFAULT_BASE_URL;
use crate::credentials::Credential;
use crate::{AssayError, Result};

/// Client for the hosted chat-completion API.
#[derive(Clone)]
pub struct HostedClient {
    http: Client,
    base_url: String,
    organization: Option<String>,
}

impl HostedClient {
    /// Client for the default OpenAI endpoint.
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssayError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            organization: None,
        })
    }

    /// Send an `OpenAI-Organization` header with every request.
    pub fn organization(mut self, organization: Option<String>) -> Self {
        self.organization = organization;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, credential: &Credential, request: &ChatRequest) -> Result<Response> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self
            .http
            .post(&url)
            .bearer_auth(credential.expose())
            .json(request);
        if let Some(org) = &self.organization {
            builder = builder.header("OpenAI-Organization", org);
        }

        let response = builder.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AssayError::Api {
            status: status.as_u16(),
            message: error_message(&body)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| status.to_string()),
        })
    }
}

/// `error.message` from an OpenAI-style error body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl CompletionTransport for HostedClient {
    fn name(&self) -> &str {
        "hosted"
    }

    #[instrument(name = "hosted.complete", skip(self, credential, request), fields(model = %request.model, stream = request.stream))]
    async fn complete(
        &self,
        credential: &Credential,
        request: &ChatRequest,
    ) -> Result<Completion> {
        let response = self.send(credential, request).await?;

        if request.stream {
            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(AssayError::from));
            return Ok(Completion::Streamed(sse::content_stream(Box::pin(body))));
        }

        let payload: Value = response.json().await?;
        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(|content| Completion::Complete(content.to_string()))
            .ok_or_else(|| AssayError::Model("completion has no message content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_from_openai_body() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(
            error_message(body).as_deref(),
            Some("Incorrect API key provided")
        );
        assert_eq!(error_message("<html>bad gateway</html>"), None);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client =
            HostedClient::with_base_url("http://localhost:1234/v1/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234/v1");
    }
}
