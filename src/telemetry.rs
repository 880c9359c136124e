//! Telemetry metric name constants.
//!
//! Centralised metric names for assay operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `assay_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation`: orchestrator entry point (e.g. "suggestion", "test",
//!   "explanation", "arch-review", "prompt")
//! - `status`: outcome: "ok" or "error"
//! - `source`: where a response came from: "remote", "local" or "degraded"

/// Total orchestrated requests that reached the model invoker.
///
/// Labels: `operation`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "assay_requests_total";

/// Model invocation duration in seconds.
///
/// Labels: `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "assay_request_duration_seconds";

/// Total response cache hits.
///
/// Labels: `operation`.
pub const CACHE_HITS_TOTAL: &str = "assay_cache_hits_total";

/// Total response cache misses (including expired entries).
///
/// Labels: `operation`.
pub const CACHE_MISSES_TOTAL: &str = "assay_cache_misses_total";

/// Total requests rejected by the rate limiter.
pub const RATE_LIMITED_TOTAL: &str = "assay_rate_limited_total";

/// Total streamed chunks delivered to callers.
///
/// Labels: `source`.
pub const STREAM_CHUNKS_TOTAL: &str = "assay_stream_chunks_total";

/// Total local-model failures converted into degraded responses.
pub const LOCAL_DEGRADED_TOTAL: &str = "assay_local_degraded_total";
