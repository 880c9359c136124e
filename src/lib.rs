//! Assay - request orchestration for in-editor code assistance
//!
//! This crate sits between an editor extension and a language model. It
//! turns source-code context into suggestions, generated tests,
//! explanations and architecture reviews, and owns the plumbing around
//! each model call:
//!
//! - sliding-window rate limiting ([`RateLimiter`])
//! - a bounded response cache with TTL expiry and FIFO eviction
//!   ([`ResponseCache`])
//! - lazy API key resolution ([`credentials`])
//! - hosted (OpenAI-compatible) or local endpoint invocation, single-shot or
//!   streamed ([`invoker`], [`providers`])
//! - parsing of free-text reviews into an [`ArchitectureReview`]
//!
//! # Example
//!
//! ```rust,no_run
//! use assay::{AiRequest, Assay, Language, MapConfig};
//!
//! #[tokio::main]
//! async fn main() -> assay::Result<()> {
//!     let config = MapConfig::new()
//!         .set("apiKey", "sk-your-key")
//!         .set("model", "gpt-4-turbo");
//!     let assay = Assay::builder().config(&config).build()?;
//!
//!     let request = AiRequest::new("fn add(a: i32, b: i32) -> i32 { a + b }", Language::Rust);
//!     let response = assay.explain_code(&request, None).await?;
//!     println!("{}", response.primary().unwrap_or_default());
//!
//!     let mut print = |chunk: &str| print!("{chunk}");
//!     let tests = assay.generate_tests(&request, Some(&mut print)).await?;
//!     assert_eq!(tests.suggestions.len(), 1);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod invoker;
pub mod limiter;
pub mod providers;
pub mod review;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheKey, CachedResponse, OperationKind, ResponseCache};
pub use config::{ConfigProvider, FileConfig, MapConfig, Settings};
pub use credentials::{
    API_KEY_SECRET, Credential, CredentialResolver, FileSecretStore, MemorySecretStore, NoPrompt,
    Prompter, SecretStore,
};
pub use error::{AssayError, Result};
pub use gateway::{Assay, OnProgress, Orchestrator, OrchestratorBuilder};
pub use invoker::{Invocation, InvokeOptions, ModelInvoker, OnChunk, Source};
pub use limiter::{RateLimitConfig, RateLimiter};
pub use review::parse_architecture_review;
pub use version::{PKG_VERSION, version_string};

// Re-export all types
pub use types::{
    AiRequest, AiResponse, ArchitectureReview, CursorPosition, DocumentRef, Language, Message,
    Role,
};
