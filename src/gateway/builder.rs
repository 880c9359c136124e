//! Builder for configuring orchestrator instances

use std::sync::Arc;

use tracing::info;

use super::Orchestrator;
use crate::config::{ConfigProvider, Settings};
use crate::credentials::{CredentialResolver, MemorySecretStore, NoPrompt, Prompter, SecretStore};
use crate::invoker::{LocalRoute, ModelInvoker};
use crate::providers::{CompletionTransport, HostedClient, LocalClient, LocalTransport};
use crate::{AssayError, Result};

/// Main entry point for creating orchestrators.
pub struct Assay;

impl Assay {
    /// Create a new builder for configuring an orchestrator.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }
}

/// Builder for configuring orchestrator instances.
///
/// Collaborators left unset get defaults: an in-memory secret store, no
/// prompting, and reqwest-backed transports built from the settings.
#[derive(Default)]
pub struct OrchestratorBuilder {
    settings: Option<Settings>,
    secret_store: Option<Arc<dyn SecretStore>>,
    prompter: Option<Arc<dyn Prompter>>,
    hosted_transport: Option<Arc<dyn CompletionTransport>>,
    local_transport: Option<Arc<dyn LocalTransport>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use explicit settings.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Read settings from a configuration provider.
    pub fn config(mut self, provider: &dyn ConfigProvider) -> Self {
        self.settings = Some(Settings::from_provider(provider));
        self
    }

    /// Where the API key is persisted.
    pub fn secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secret_store = Some(store);
        self
    }

    /// How to ask for an API key when none is configured or stored.
    pub fn prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    /// Replace the hosted chat-completion transport.
    pub fn hosted_transport(mut self, transport: Arc<dyn CompletionTransport>) -> Self {
        self.hosted_transport = Some(transport);
        self
    }

    /// Replace the local endpoint transport.
    pub fn local_transport(mut self, transport: Arc<dyn LocalTransport>) -> Self {
        self.local_transport = Some(transport);
        self
    }

    /// Build the orchestrator.
    ///
    /// Fails when the local model is enabled without an endpoint, or when
    /// an HTTP client cannot be constructed. No credential is resolved
    /// here; that happens on the first remote call.
    pub fn build(self) -> Result<Orchestrator> {
        let settings = self.settings.unwrap_or_default();

        let local = match &settings.local {
            Some(endpoint) if endpoint.url.is_empty() => {
                return Err(AssayError::LocalModel(
                    "Local model endpoint not configured - set localModelEndpoint in settings"
                        .to_string(),
                ));
            }
            Some(endpoint) => {
                let transport: Arc<dyn LocalTransport> = match self.local_transport {
                    Some(transport) => transport,
                    None => Arc::new(LocalClient::new(settings.timeout)?),
                };
                Some(LocalRoute {
                    endpoint: endpoint.url.clone(),
                    transport,
                })
            }
            None => None,
        };

        let hosted: Arc<dyn CompletionTransport> = match self.hosted_transport {
            Some(transport) => transport,
            None => Arc::new(
                HostedClient::with_base_url(settings.base_url.clone(), settings.timeout)?
                    .organization(settings.organization.clone()),
            ),
        };

        let credentials = CredentialResolver::new(
            settings.api_key.clone(),
            self.secret_store
                .unwrap_or_else(|| Arc::new(MemorySecretStore::new())),
            self.prompter.unwrap_or_else(|| Arc::new(NoPrompt)),
        );

        info!(
            model = %settings.model,
            local = local.is_some(),
            cache_size = settings.cache.max_entries,
            rate_limit = settings.rate_limit.limit,
            "orchestrator ready"
        );

        Ok(Orchestrator::new(
            settings,
            ModelInvoker::new(credentials, hosted, local),
        ))
    }
}
