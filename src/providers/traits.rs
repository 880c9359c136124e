//! Transport traits for the two model backends.
//!
//! The invoker never inspects a response at runtime to decide whether it
//! streamed: transports say so through [`Completion`] and [`LocalReply`].
//!
//! - [`CompletionTransport`]: a hosted, OpenAI-compatible chat API.
//!   Authenticated with a [`Credential`]; streamed replies arrive as
//!   already-decoded text deltas.
//! - [`LocalTransport`]: a self-hosted HTTP endpoint. Unauthenticated;
//!   streamed replies arrive as raw body bytes.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::Serialize;

use crate::Result;
use crate::credentials::Credential;
use crate::types::Message;

/// Ordered text deltas from a streamed completion.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Raw body chunks from a streamed local reply. Chunk boundaries may split
/// multi-byte characters.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Chat-completion request in the OpenAI wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    pub stream: bool,
}

/// Hosted completion result.
pub enum Completion {
    /// The whole message text.
    Complete(String),
    Streamed(ChunkStream),
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::Complete(text) => f.debug_tuple("Complete").field(text).finish(),
            Completion::Streamed(_) => f.write_str("Streamed(..)"),
        }
    }
}

/// Body posted to a local inference endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalRequest {
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

/// Local endpoint result.
pub enum LocalReply {
    /// Parsed JSON payload (OpenAI-style `choices`, optional `tests`).
    Complete(serde_json::Value),
    Streamed(ByteStream),
}

impl std::fmt::Debug for LocalReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalReply::Complete(payload) => f.debug_tuple("Complete").field(payload).finish(),
            LocalReply::Streamed(_) => f.write_str("Streamed(..)"),
        }
    }
}

/// Hosted chat-completion backend.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Transport name for logging/debugging.
    fn name(&self) -> &str;

    /// Send one chat completion. Streams when `request.stream` is set.
    ///
    /// Errors: [`Network`](crate::AssayError::Network) for transport
    /// failures, [`Api`](crate::AssayError::Api) for non-2xx replies,
    /// [`Model`](crate::AssayError::Model) for unusable payloads.
    async fn complete(&self, credential: &Credential, request: &ChatRequest)
    -> Result<Completion>;
}

/// Self-hosted inference backend.
#[async_trait]
pub trait LocalTransport: Send + Sync {
    /// POST `request` to `endpoint`. Every failure is a
    /// [`LocalModel`](crate::AssayError::LocalModel) error.
    async fn post(&self, endpoint: &str, request: &LocalRequest) -> Result<LocalReply>;
}
