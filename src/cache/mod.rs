//! Caching subsystem.
//!
//! - [`response::ResponseCache`]: bounded store with lazy TTL expiry and
//!   FIFO eviction. One instance lives inside each
//!   [`Orchestrator`](crate::Orchestrator) and is shared by every operation.
//!
//! - [`key::CacheKey`]: deterministic key derivation from request shape.

pub mod key;
pub mod response;

pub use key::{CONTEXT_PREFIX_CHARS, CacheKey, OperationKind, context_prefix};
pub use response::{CacheConfig, CachedResponse, ResponseCache};
