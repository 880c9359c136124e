//! Assay error types

/// Assay error types
#[derive(Debug, thiserror::Error)]
pub enum AssayError {
    // Admission errors, raised before any network attempt
    #[error("API key required - please configure one in settings")]
    CredentialMissing,

    #[error("rate limit exceeded. Please wait before making more requests.")]
    RateLimitExceeded,

    // Remote transport errors
    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Malformed or empty model payload.
    #[error("model error: {0}")]
    Model(String),

    // Local inference errors. Converted into a low-confidence response by
    // the invoker, so callers of the orchestrator never see this variant.
    #[error("local model error: {0}")]
    LocalModel(String),

    // Collaborator errors
    #[error("secret store error: {0}")]
    SecretStore(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AssayError {
    /// Classify a transport failure message from the hosted API path.
    ///
    /// Anything mentioning the network becomes [`AssayError::Network`];
    /// other failures are reported as malformed model output.
    pub fn from_transport_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.to_lowercase().contains("network") {
            AssayError::Network(message)
        } else {
            AssayError::Model(message)
        }
    }

    /// Whether this error was raised by admission control rather than a
    /// model call (no request left the process).
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            AssayError::CredentialMissing | AssayError::RateLimitExceeded
        )
    }
}

impl From<reqwest::Error> for AssayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            AssayError::Network(err.to_string())
        } else if err.is_decode() {
            AssayError::Model(err.to_string())
        } else {
            AssayError::from_transport_message(err.to_string())
        }
    }
}

/// Result type alias for Assay operations
pub type Result<T> = std::result::Result<T, AssayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_heuristic_matches_case_insensitively() {
        assert!(matches!(
            AssayError::from_transport_message("Network unreachable"),
            AssayError::Network(_)
        ));
        assert!(matches!(
            AssayError::from_transport_message("unexpected end of body"),
            AssayError::Model(_)
        ));
    }

    #[test]
    fn admission_errors() {
        assert!(AssayError::CredentialMissing.is_admission());
        assert!(AssayError::RateLimitExceeded.is_admission());
        assert!(!AssayError::Network("down".into()).is_admission());
    }
}
