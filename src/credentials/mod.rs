//! API key resolution.
//!
//! [`CredentialResolver`] finds the hosted-API key the first time a remote
//! call needs it and remembers it for the lifetime of the orchestrator.
//! Lookup order:
//!
//! 1. `apiKey` from configuration
//! 2. the [`SecretStore`] entry [`API_KEY_SECRET`]
//! 3. the [`Prompter`]; a key entered there is persisted to the store
//!
//! Nothing found means [`AssayError::CredentialMissing`]. Local-model-only
//! orchestrators never reach the resolver.

mod prompt;
mod store;

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{AssayError, Result};

pub use prompt::{NoPrompt, Prompter};
#[cfg(feature = "cli")]
pub use prompt::TerminalPrompter;
pub use store::{FileSecretStore, MemorySecretStore, SecretStore};

/// Secret-store name of the hosted API key.
pub const API_KEY_SECRET: &str = "assay.apiKey";

const PROMPT_MESSAGE: &str = "Enter your OpenAI API key";

/// A resolved API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for building an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Lazily resolves and memoises the hosted-API credential.
pub struct CredentialResolver {
    configured: Option<String>,
    store: Arc<dyn SecretStore>,
    prompter: Arc<dyn Prompter>,
    // Async mutex: concurrent first calls wait for a single resolution.
    resolved: Mutex<Option<Credential>>,
}

impl CredentialResolver {
    pub fn new(
        configured: Option<String>,
        store: Arc<dyn SecretStore>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            configured: configured.filter(|key| !key.is_empty()),
            store,
            prompter,
            resolved: Mutex::new(None),
        }
    }

    /// Return the memoised credential, resolving it on first use.
    pub async fn resolve(&self) -> Result<Credential> {
        let mut resolved = self.resolved.lock().await;
        if let Some(credential) = resolved.as_ref() {
            return Ok(credential.clone());
        }
        let credential = self.lookup().await?;
        *resolved = Some(credential.clone());
        Ok(credential)
    }

    /// Delete the stored key and forget the memoised one.
    ///
    /// A configured `apiKey` is not affected and will be picked up again by
    /// the next [`resolve`](Self::resolve).
    pub async fn clear(&self) -> Result<()> {
        self.resolved.lock().await.take();
        self.store.delete(API_KEY_SECRET).await
    }

    async fn lookup(&self) -> Result<Credential> {
        if let Some(key) = &self.configured {
            debug!(source = "config", "using configured API key");
            return Ok(Credential::new(key.clone()));
        }

        match self.store.get(API_KEY_SECRET).await {
            Ok(Some(key)) if !key.is_empty() => {
                debug!(source = "secret_store", "using stored API key");
                return Ok(Credential::new(key));
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to read API key from secret store"),
        }

        let entered = match self.prompter.request_secret(PROMPT_MESSAGE).await {
            Ok(entered) => entered.filter(|key| !key.is_empty()),
            Err(e) => {
                warn!(error = %e, "API key prompt failed");
                None
            }
        };
        let key = entered.ok_or(AssayError::CredentialMissing)?;

        if let Err(e) = self.store.store(API_KEY_SECRET, &key).await {
            warn!(error = %e, "failed to persist API key; it will be requested again next session");
        } else {
            info!("API key stored");
        }
        Ok(Credential::new(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("sk-secret");
        assert_eq!(format!("{credential:?}"), "Credential(***)");
        assert_eq!(credential.expose(), "sk-secret");
    }

    #[tokio::test]
    async fn configured_key_wins() {
        let store = Arc::new(MemorySecretStore::with_secret(API_KEY_SECRET, "sk-stored"));
        let resolver = CredentialResolver::new(Some("sk-config".into()), store, Arc::new(NoPrompt));
        assert_eq!(resolver.resolve().await.unwrap().expose(), "sk-config");
    }

    #[tokio::test]
    async fn missing_everywhere() {
        let resolver =
            CredentialResolver::new(None, Arc::new(MemorySecretStore::new()), Arc::new(NoPrompt));
        assert!(matches!(
            resolver.resolve().await,
            Err(AssayError::CredentialMissing)
        ));
    }

    #[tokio::test]
    async fn empty_configured_key_is_ignored() {
        let store = Arc::new(MemorySecretStore::with_secret(API_KEY_SECRET, "sk-stored"));
        let resolver = CredentialResolver::new(Some(String::new()), store, Arc::new(NoPrompt));
        assert_eq!(resolver.resolve().await.unwrap().expose(), "sk-stored");
    }
}
