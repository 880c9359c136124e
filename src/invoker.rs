//! Model invocation: one request in, one complete answer out.
//!
//! [`ModelInvoker`] routes a prepared exchange to the local endpoint when one
//! is configured and to the hosted API otherwise. With a chunk callback the
//! call streams: each chunk is handed to the callback in order, before the
//! next one is read, and the returned text is their concatenation.
//!
//! Failures on the two paths are treated differently:
//!
//! - hosted failures propagate as errors;
//! - local failures never do. They become a low-confidence placeholder
//!   response tagged [`Source::Degraded`], which callers must not cache.

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::credentials::CredentialResolver;
use crate::providers::{
    ByteStream, ChatRequest, ChunkStream, Completion, CompletionTransport, LocalReply,
    LocalRequest, LocalTransport,
};
use crate::telemetry;
use crate::types::{
    AiRequest, AiResponse, DEGRADED_CONFIDENCE, MODEL_CONFIDENCE, Message, exchange,
};
use crate::{AssayError, Result};

const REMOTE_EXPLANATION: &str = "AI-generated suggestion";
const LOCAL_STREAM_EXPLANATION: &str = "Local model response";
const DEGRADED_EXPLANATION: &str = "Local model error";

/// Per-chunk streaming callback. `None` means single-shot.
pub type OnChunk<'a> = Option<&'a mut (dyn FnMut(&str) + Send)>;

/// Model parameters for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
}

impl InvokeOptions {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens: None,
            stop: None,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn stop<S: Into<String>>(mut self, stop: impl IntoIterator<Item = S>) -> Self {
        self.stop = Some(stop.into_iter().map(Into::into).collect());
        self
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Local,
    /// Placeholder for a failed local call.
    Degraded,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Remote => "remote",
            Source::Local => "local",
            Source::Degraded => "degraded",
        }
    }

    /// Whether a response from this source may be cached.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, Source::Degraded)
    }
}

/// Result of [`ModelInvoker::invoke`].
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub response: AiResponse,
    pub source: Source,
}

/// Local endpoint plus the transport used to reach it.
pub struct LocalRoute {
    pub endpoint: String,
    pub transport: Arc<dyn LocalTransport>,
}

/// Sends exchanges to the configured model backend.
pub struct ModelInvoker {
    credentials: CredentialResolver,
    hosted: Arc<dyn CompletionTransport>,
    local: Option<LocalRoute>,
}

impl ModelInvoker {
    pub fn new(
        credentials: CredentialResolver,
        hosted: Arc<dyn CompletionTransport>,
        local: Option<LocalRoute>,
    ) -> Self {
        Self {
            credentials,
            hosted,
            local,
        }
    }

    /// Whether task requests go to a local endpoint.
    pub fn uses_local_model(&self) -> bool {
        self.local.is_some()
    }

    /// Run a task-specific request: `system_prompt` as the system turn,
    /// the request context as the user turn.
    pub async fn invoke(
        &self,
        system_prompt: &str,
        request: &AiRequest,
        options: &InvokeOptions,
        on_chunk: OnChunk<'_>,
    ) -> Result<Invocation> {
        let messages = exchange(system_prompt, &request.context);

        if let Some(route) = &self.local {
            return Ok(self.invoke_local(route, messages, options, on_chunk).await);
        }

        let text = self.invoke_remote(messages, options, on_chunk).await?;
        Ok(Invocation {
            response: AiResponse::from_text(text, REMOTE_EXPLANATION, MODEL_CONFIDENCE),
            source: Source::Remote,
        })
    }

    /// Send `messages` to the hosted API and return the full text.
    ///
    /// Resolves the credential on first use; a missing key fails before any
    /// network traffic.
    pub async fn invoke_remote(
        &self,
        messages: Vec<Message>,
        options: &InvokeOptions,
        mut on_chunk: OnChunk<'_>,
    ) -> Result<String> {
        debug!(phase = "credential_check", "resolving credential");
        let credential = self.credentials.resolve().await.inspect_err(|e| {
            debug!(phase = "credential_check", error = %e, "invocation failed");
        })?;

        let request = ChatRequest {
            model: options.model.clone(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stop: options.stop.clone(),
            stream: on_chunk.is_some(),
        };

        debug!(
            phase = "remote_call",
            transport = self.hosted.name(),
            model = %request.model,
            stream = request.stream,
            "sending completion request"
        );
        let completion = self
            .hosted
            .complete(&credential, &request)
            .await
            .inspect_err(|e| debug!(phase = "remote_call", error = %e, "invocation failed"))?;

        match completion {
            Completion::Complete(text) => {
                deliver(&text, &mut on_chunk, Source::Remote);
                Ok(text)
            }
            Completion::Streamed(chunks) => {
                debug!(phase = "streaming", "aggregating streamed completion");
                collect_chunks(chunks, on_chunk)
                    .await
                    .inspect_err(|e| debug!(phase = "streaming", error = %e, "invocation failed"))
            }
        }
    }

    /// Forget the memoised credential and delete the stored key.
    pub async fn forget_credential(&self) -> Result<()> {
        self.credentials.clear().await
    }

    async fn invoke_local(
        &self,
        route: &LocalRoute,
        messages: Vec<Message>,
        options: &InvokeOptions,
        on_chunk: OnChunk<'_>,
    ) -> Invocation {
        match self.try_local(route, messages, options, on_chunk).await {
            Ok(response) => Invocation {
                response,
                source: Source::Local,
            },
            Err(e) => {
                let detail = match &e {
                    AssayError::LocalModel(message) => message.clone(),
                    other => other.to_string(),
                };
                warn!(endpoint = %route.endpoint, error = %detail, "local model failed; returning degraded response");
                metrics::counter!(telemetry::LOCAL_DEGRADED_TOTAL).increment(1);
                Invocation {
                    response: AiResponse::from_text(
                        format!("Error querying local model: {detail}"),
                        DEGRADED_EXPLANATION,
                        DEGRADED_CONFIDENCE,
                    ),
                    source: Source::Degraded,
                }
            }
        }
    }

    async fn try_local(
        &self,
        route: &LocalRoute,
        messages: Vec<Message>,
        options: &InvokeOptions,
        mut on_chunk: OnChunk<'_>,
    ) -> Result<AiResponse> {
        if !route.endpoint.starts_with("http") {
            return Err(AssayError::LocalModel(format!(
                "Invalid local model endpoint: {}",
                route.endpoint
            )));
        }

        let request = LocalRequest {
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens.unwrap_or_default(),
            stream: on_chunk.is_some(),
        };

        debug!(phase = "local_call", endpoint = %route.endpoint, stream = request.stream, "posting to local model");
        match route.transport.post(&route.endpoint, &request).await? {
            LocalReply::Streamed(body) => {
                debug!(phase = "streaming", "aggregating local stream");
                let text = collect_utf8(body, on_chunk).await?;
                Ok(AiResponse::from_text(
                    text,
                    LOCAL_STREAM_EXPLANATION,
                    MODEL_CONFIDENCE,
                ))
            }
            LocalReply::Complete(payload) => {
                let response = local_payload_response(&payload);
                if let Some(text) = response.primary() {
                    deliver(text, &mut on_chunk, Source::Local);
                }
                Ok(response)
            }
        }
    }
}

/// Build a response from a single-shot local payload.
///
/// Reads `choices[0].message` (empty content and role `assistant` when
/// absent) and carries a top-level `tests` value through unchanged.
fn local_payload_response(payload: &Value) -> AiResponse {
    let message = payload.pointer("/choices/0/message");
    let content = message
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let role = message
        .and_then(|m| m.get("role"))
        .and_then(Value::as_str)
        .unwrap_or("assistant");

    AiResponse {
        tests: payload.get("tests").cloned(),
        ..AiResponse::from_text(content, role, MODEL_CONFIDENCE)
    }
}

/// Hand one chunk to the callback, if any. Empty chunks are delivered too,
/// so the callback runs once per transport read.
fn deliver(chunk: &str, on_chunk: &mut OnChunk<'_>, source: Source) {
    if let Some(callback) = on_chunk.as_deref_mut() {
        metrics::counter!(telemetry::STREAM_CHUNKS_TOTAL, "source" => source.as_str())
            .increment(1);
        callback(chunk);
    }
}

async fn collect_chunks(mut chunks: ChunkStream, mut on_chunk: OnChunk<'_>) -> Result<String> {
    let mut text = String::new();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        deliver(&chunk, &mut on_chunk, Source::Remote);
        text.push_str(&chunk);
    }
    Ok(text)
}

/// Aggregate a raw byte stream, decoding UTF-8 incrementally so characters
/// split across chunks reach the callback whole.
async fn collect_utf8(mut body: ByteStream, mut on_chunk: OnChunk<'_>) -> Result<String> {
    let mut pending = Vec::new();
    let mut text = String::new();
    while let Some(bytes) = body.next().await {
        pending.extend_from_slice(&bytes?);
        let decoded = take_utf8(&mut pending);
        deliver(&decoded, &mut on_chunk, Source::Local);
        text.push_str(&decoded);
    }
    if !pending.is_empty() {
        let tail = String::from_utf8_lossy(&pending).into_owned();
        deliver(&tail, &mut on_chunk, Source::Local);
        text.push_str(&tail);
    }
    Ok(text)
}

/// Decode the longest valid prefix of `buf`, leaving an incomplete trailing
/// sequence in place. Invalid bytes are replaced.
fn take_utf8(buf: &mut Vec<u8>) -> String {
    match std::str::from_utf8(buf) {
        Ok(text) => {
            let text = text.to_string();
            buf.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let text = String::from_utf8_lossy(&buf[..valid]).into_owned();
            buf.drain(..valid);
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(buf).into_owned();
            buf.clear();
            text
        }
    }
}
