//! Client for self-hosted inference endpoints.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::Value;
use tracing::instrument;

use super::hosted::error_message;
use super::traits::{LocalReply, LocalRequest, LocalTransport};
use crate::{AssayError, Result};

/// Posts chat requests to a local HTTP endpoint (llama.cpp server,
/// LM Studio, vLLM and the like).
#[derive(Clone)]
pub struct LocalClient {
    http: Client,
}

impl LocalClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssayError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

fn local_error(e: reqwest::Error) -> AssayError {
    AssayError::LocalModel(e.to_string())
}

#[async_trait]
impl LocalTransport for LocalClient {
    #[instrument(name = "local.post", skip(self, request), fields(stream = request.stream))]
    async fn post(&self, endpoint: &str, request: &LocalRequest) -> Result<LocalReply> {
        let response = self
            .http
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(local_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssayError::LocalModel(
                error_message(&body)
                    .or_else(|| status.canonical_reason().map(str::to_string))
                    .unwrap_or_else(|| status.to_string()),
            ));
        }

        if request.stream {
            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(local_error));
            return Ok(LocalReply::Streamed(Box::pin(body)));
        }

        let payload: Value = response.json().await.map_err(local_error)?;
        Ok(LocalReply::Complete(payload))
    }
}
