use assay::{AssayError, Result};

#[test]
fn test_error_display() {
    let err = AssayError::Api {
        status: 429,
        message: "slow down".to_string(),
    };
    assert_eq!(err.to_string(), "API error (429): slow down");
}

#[test]
fn test_admission_messages() {
    assert!(
        AssayError::CredentialMissing
            .to_string()
            .contains("API key required")
    );
    assert!(
        AssayError::RateLimitExceeded
            .to_string()
            .contains("rate limit exceeded")
    );
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(AssayError::RateLimitExceeded)
    }
    assert!(returns_error().is_err());
}

#[test]
fn test_json_error_conversion() {
    fn parse() -> Result<serde_json::Value> {
        Ok(serde_json::from_str("{not json")?)
    }
    assert!(matches!(parse(), Err(AssayError::Json(_))));
}

// ============================================================================
// Transport classification
// ============================================================================

#[test]
fn transport_messages_mentioning_network_are_network_errors() {
    assert!(matches!(
        AssayError::from_transport_message("network timeout while reading body"),
        AssayError::Network(_)
    ));
    assert!(matches!(
        AssayError::from_transport_message("invalid JSON in response"),
        AssayError::Model(_)
    ));
}

#[test]
fn only_admission_errors_are_admission() {
    assert!(AssayError::CredentialMissing.is_admission());
    assert!(AssayError::RateLimitExceeded.is_admission());
    assert!(!AssayError::LocalModel("down".into()).is_admission());
    assert!(
        !AssayError::Api {
            status: 500,
            message: String::new()
        }
        .is_admission()
    );
}
