//! Cache key derivation.
//!
//! Keys are built from the request shape, not from a content hash: the
//! simple-suggestion path uses the prompt verbatim, enhanced requests use a
//! composite of operation, language, a bounded prefix of the context and
//! the cursor line. Two requests that differ only past the prefix share a
//! key; that imprecision is accepted in exchange for cheap keys.

use std::fmt;

use crate::types::{AiRequest, Language};

/// Number of context characters that participate in a key.
pub const CONTEXT_PREFIX_CHARS: usize = 100;

/// Operation whose response is being cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Suggestion,
    Test,
    Explanation,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Suggestion => "suggestion",
            OperationKind::Test => "test",
            OperationKind::Explanation => "explanation",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key for one cached response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey<'a> {
    /// Simple suggestions: the raw prompt.
    Prompt(&'a str),
    /// Suggestion, test and explanation requests.
    Request {
        kind: OperationKind,
        language: Language,
        context: &'a str,
        line: u32,
    },
    /// Architecture reviews.
    Review { language: Language, context: &'a str },
}

impl<'a> CacheKey<'a> {
    /// Composite key for an enhanced request.
    pub fn for_request(kind: OperationKind, request: &'a AiRequest) -> Self {
        CacheKey::Request {
            kind,
            language: request.language,
            context: &request.context,
            line: request.cursor.line,
        }
    }

    /// Render the key to the string stored in the cache.
    pub fn render(&self) -> String {
        match self {
            CacheKey::Prompt(prompt) => (*prompt).to_string(),
            CacheKey::Request {
                kind,
                language,
                context,
                line,
            } => format!("{kind}:{language}:{}:{line}", context_prefix(context)),
            CacheKey::Review { language, context } => {
                format!("arch-review:{language}:{}", context_prefix(context))
            }
        }
    }
}

/// First [`CONTEXT_PREFIX_CHARS`] characters of `context`, cut on a char
/// boundary.
pub fn context_prefix(context: &str) -> &str {
    match context.char_indices().nth(CONTEXT_PREFIX_CHARS) {
        Some((idx, _)) => &context[..idx],
        None => context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_key_is_verbatim() {
        assert_eq!(CacheKey::Prompt("fn add(").render(), "fn add(");
    }

    #[test]
    fn request_key_layout() {
        let request = AiRequest::new("let x = 1;", Language::Rust).cursor(7, 3);
        let key = CacheKey::for_request(OperationKind::Test, &request).render();
        assert_eq!(key, "test:rust:let x = 1;:7");
    }

    #[test]
    fn requests_differing_past_prefix_collide() {
        let base = "a".repeat(CONTEXT_PREFIX_CHARS);
        let r1 = AiRequest::new(format!("{base}one"), Language::Go);
        let r2 = AiRequest::new(format!("{base}two"), Language::Go);
        assert_eq!(
            CacheKey::for_request(OperationKind::Suggestion, &r1).render(),
            CacheKey::for_request(OperationKind::Suggestion, &r2).render()
        );
    }

    #[test]
    fn key_differs_on_kind_language_and_line() {
        let request = AiRequest::new("ctx", Language::Python);
        let base = CacheKey::for_request(OperationKind::Suggestion, &request).render();
        assert_ne!(
            base,
            CacheKey::for_request(OperationKind::Explanation, &request).render()
        );
        let other_lang = AiRequest::new("ctx", Language::Java);
        assert_ne!(
            base,
            CacheKey::for_request(OperationKind::Suggestion, &other_lang).render()
        );
        let other_line = AiRequest::new("ctx", Language::Python).cursor(1, 0);
        assert_ne!(
            base,
            CacheKey::for_request(OperationKind::Suggestion, &other_line).render()
        );
    }

    #[test]
    fn prefix_respects_char_boundaries() {
        let context = "é".repeat(CONTEXT_PREFIX_CHARS + 5);
        let prefix = context_prefix(&context);
        assert_eq!(prefix.chars().count(), CONTEXT_PREFIX_CHARS);
    }

    #[test]
    fn review_key_layout() {
        let key = CacheKey::Review {
            language: Language::Java,
            context: "class A {}",
        };
        assert_eq!(key.render(), "arch-review:java:class A {}");
    }
}
