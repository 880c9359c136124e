//! Model backends.
//!
//! - [`HostedClient`]: OpenAI-compatible chat completions over HTTPS,
//!   single-shot or streamed as server-sent events.
//! - [`LocalClient`]: a self-hosted inference endpoint.
//!
//! Both are reached through the traits in [`traits`], so tests and embedders
//! can substitute their own transports.

pub mod hosted;
pub mod local;
pub mod sse;
pub mod traits;

pub use hosted::HostedClient;
pub use local::LocalClient;
pub use traits::{
    ByteStream, ChatRequest, ChunkStream, Completion, CompletionTransport, LocalReply,
    LocalRequest, LocalTransport,
};
