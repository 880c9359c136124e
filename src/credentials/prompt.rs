//! Interactive credential entry.

use async_trait::async_trait;

use crate::Result;
#[cfg(feature = "cli")]
use crate::AssayError;

/// Asks a human for a secret.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Show `message` and return what was entered; `None` when the user
    /// dismissed the prompt or entered nothing.
    async fn request_secret(&self, message: &str) -> Result<Option<String>>;
}

/// Never prompts. Used for headless orchestrators.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

#[async_trait]
impl Prompter for NoPrompt {
    async fn request_secret(&self, _message: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Reads a secret from the terminal without echo.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

#[cfg(feature = "cli")]
#[async_trait]
impl Prompter for TerminalPrompter {
    async fn request_secret(&self, message: &str) -> Result<Option<String>> {
        let message = message.to_string();
        let entered = tokio::task::spawn_blocking(move || {
            dialoguer::Password::new()
                .with_prompt(message)
                .allow_empty_password(true)
                .interact()
        })
        .await
        .map_err(|e| AssayError::SecretStore(format!("prompt task failed: {e}")))?
        .map_err(|e| AssayError::SecretStore(format!("prompt failed: {e}")))?;

        let entered = entered.trim().to_string();
        Ok((!entered.is_empty()).then_some(entered))
    }
}
