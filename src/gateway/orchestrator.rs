//! The request orchestrator.
//!
//! Every operation runs the same pipeline:
//!
//! ```text
//! rate limiter ─▶ response cache ─▶ model invoker ─▶ (review parser) ─▶ cache store
//! ```
//!
//! Admission happens first, so a rejected call never touches the cache or
//! the network. Cache lookups are skipped for streaming task requests so the
//! caller sees a live response; the result still populates the cache for
//! later single-shot callers.
//!
//! Concurrent identical requests are not de-duplicated: both can miss the
//! cache and both invoke the model.

use std::time::Instant;

use tracing::{error, info};

use super::prompts;
use crate::cache::{CacheKey, CachedResponse, OperationKind, ResponseCache};
use crate::config::Settings;
use crate::invoker::{InvokeOptions, ModelInvoker, OnChunk};
use crate::limiter::RateLimiter;
use crate::review::parse_architecture_review;
use crate::telemetry;
use crate::types::{AiRequest, AiResponse, ArchitectureReview, Language, Message, exchange};
use crate::{AssayError, Result};

/// Progress callback for long-running operations.
pub type OnProgress<'a> = Option<&'a mut (dyn FnMut(&str) + Send)>;

/// Token cap for simple suggestions.
pub const SUGGESTION_MAX_TOKENS: u32 = 100;
/// Stop sequences for simple suggestions.
pub const SUGGESTION_STOP: [&str; 3] = ["\n\n", "//", "/*"];
/// Sampling temperature for architecture reviews.
pub const REVIEW_TEMPERATURE: f32 = 0.3;
/// Message passed to the progress callback when a review starts.
pub const REVIEW_PROGRESS: &str = "Analyzing architecture...";

const PROMPT_OPERATION: &str = "prompt";
const REVIEW_OPERATION: &str = "arch-review";

/// Composes admission, caching and model invocation. Construct with
/// [`Assay::builder()`](super::Assay::builder).
///
/// All state (cache, limiter window, memoised credential) belongs to the
/// instance and is dropped with it.
pub struct Orchestrator {
    settings: Settings,
    limiter: RateLimiter,
    cache: ResponseCache,
    invoker: ModelInvoker,
}

impl Orchestrator {
    pub(crate) fn new(settings: Settings, invoker: ModelInvoker) -> Self {
        Self {
            limiter: RateLimiter::new(settings.rate_limit.clone()),
            cache: ResponseCache::new(&settings.cache),
            settings,
            invoker,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The shared response cache.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Complete a raw prompt with the hosted model.
    ///
    /// Uses a single user message, at most [`SUGGESTION_MAX_TOKENS`] tokens
    /// and the [`SUGGESTION_STOP`] sequences. Single-shot text is trimmed;
    /// streamed text is returned exactly as delivered. Cached on the prompt.
    pub async fn get_suggestions(&self, prompt: &str, on_chunk: OnChunk<'_>) -> Result<String> {
        self.admit()?;

        let key = CacheKey::Prompt(prompt).render();
        if let Some(text) = self.cached(PROMPT_OPERATION, &key, |value| match value {
            CachedResponse::Text(text) => Some(text),
            _ => None,
        }) {
            return Ok(text);
        }

        let streaming = on_chunk.is_some();
        let options = InvokeOptions::new(&self.settings.model, self.settings.temperature)
            .max_tokens(SUGGESTION_MAX_TOKENS)
            .stop(SUGGESTION_STOP);

        let started = Instant::now();
        let result = self
            .invoker
            .invoke_remote(vec![Message::user(prompt)], &options, on_chunk)
            .await;
        let text = self.observe(PROMPT_OPERATION, "Getting AI Suggestions", started, result)?;

        let text = if streaming {
            text
        } else {
            text.trim().to_string()
        };
        self.cache.insert(key, CachedResponse::Text(text.clone()));
        Ok(text)
    }

    /// Single-shot alias for [`get_suggestions`](Self::get_suggestions).
    pub async fn process_query(&self, query: &str) -> Result<String> {
        self.get_suggestions(query, None).await
    }

    /// Code suggestions for the request context.
    pub async fn get_enhanced_suggestions(
        &self,
        request: &AiRequest,
        on_chunk: OnChunk<'_>,
    ) -> Result<AiResponse> {
        let prompt = prompts::suggestion(request.language);
        self.process(OperationKind::Suggestion, &prompt, request, on_chunk)
            .await
    }

    /// Unit tests for the request context.
    pub async fn generate_tests(
        &self,
        request: &AiRequest,
        on_chunk: OnChunk<'_>,
    ) -> Result<AiResponse> {
        let prompt = prompts::tests(&request.context);
        self.process(OperationKind::Test, &prompt, request, on_chunk)
            .await
    }

    /// A structured explanation of the request context.
    pub async fn explain_code(
        &self,
        request: &AiRequest,
        on_chunk: OnChunk<'_>,
    ) -> Result<AiResponse> {
        let prompt = prompts::explanation(request.language);
        self.process(OperationKind::Explanation, &prompt, request, on_chunk)
            .await
    }

    /// Critique `context` as a system architecture.
    ///
    /// Always uses the hosted model, single-shot, at
    /// [`REVIEW_TEMPERATURE`]. `on_progress` receives [`REVIEW_PROGRESS`]
    /// once the call is known to need the model.
    pub async fn review_architecture(
        &self,
        context: &str,
        language: Language,
        on_progress: OnProgress<'_>,
    ) -> Result<ArchitectureReview> {
        self.admit()?;

        let key = CacheKey::Review { language, context }.render();
        if let Some(review) = self.cached(REVIEW_OPERATION, &key, |value| match value {
            CachedResponse::Review(review) => Some(review),
            _ => None,
        }) {
            return Ok(review);
        }

        if let Some(progress) = on_progress {
            progress(REVIEW_PROGRESS);
        }

        let options = InvokeOptions::new(&self.settings.model, REVIEW_TEMPERATURE);
        let messages = exchange(&prompts::architecture_review(language), context);

        let started = Instant::now();
        let result = self.invoker.invoke_remote(messages, &options, None).await;
        let text = self.observe(REVIEW_OPERATION, "Architecture Review", started, result)?;

        let review = parse_architecture_review(&text);
        self.cache
            .insert(key, CachedResponse::Review(review.clone()));
        Ok(review)
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("response cache cleared");
    }

    /// Delete the stored API key, forget the resolved one and clear the
    /// cache. The next remote call resolves the key again.
    ///
    /// The credential is forgotten before the cache is cleared, so results
    /// cached under the old key up to that point are dropped. A remote call
    /// already in flight when this runs can still cache its result.
    pub async fn clear_api_key(&self) -> Result<()> {
        let forgotten = self.invoker.forget_credential().await;
        self.cache.clear();
        forgotten?;
        info!("API key cleared");
        Ok(())
    }

    async fn process(
        &self,
        kind: OperationKind,
        system_prompt: &str,
        request: &AiRequest,
        on_chunk: OnChunk<'_>,
    ) -> Result<AiResponse> {
        self.admit()?;

        let operation = kind.as_str();
        let key = CacheKey::for_request(kind, request).render();
        if on_chunk.is_none() {
            if let Some(response) = self.cached(operation, &key, |value| match value {
                CachedResponse::Response(response) => Some(response),
                _ => None,
            }) {
                return Ok(response);
            }
        }

        let options = InvokeOptions::new(&self.settings.model, self.settings.temperature)
            .max_tokens(self.settings.max_tokens);

        let started = Instant::now();
        let result = self
            .invoker
            .invoke(system_prompt, request, &options, on_chunk)
            .await;
        let invocation = self.observe(operation, "AI Processing", started, result)?;

        if invocation.source.is_cacheable() {
            self.cache
                .insert(key, CachedResponse::Response(invocation.response.clone()));
        }
        Ok(invocation.response)
    }

    fn admit(&self) -> Result<()> {
        if self.limiter.admit() {
            Ok(())
        } else {
            Err(AssayError::RateLimitExceeded)
        }
    }

    /// Typed cache lookup. A value of the wrong shape counts as a miss.
    fn cached<T>(
        &self,
        operation: &'static str,
        key: &str,
        extract: impl FnOnce(CachedResponse) -> Option<T>,
    ) -> Option<T> {
        let hit = self.cache.get(key).and_then(extract);
        if hit.is_some() {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "operation" => operation).increment(1);
        } else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "operation" => operation)
                .increment(1);
        }
        hit
    }

    /// Record metrics for a finished invocation and log failures.
    fn observe<T>(
        &self,
        operation: &'static str,
        context: &'static str,
        started: Instant,
        result: Result<T>,
    ) -> Result<T> {
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "operation" => operation)
            .record(started.elapsed().as_secs_f64());
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::REQUESTS_TOTAL, "operation" => operation, "status" => status)
            .increment(1);

        if let Err(e) = &result {
            error!(context, operation, error = %e, "model request failed");
        }
        result
    }
}
