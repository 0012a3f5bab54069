//! Provider Client: one `generate` call over every supported backend.

use crate::config::Config;
use crate::llm_providers::{GenerationOptions, LLMProviderConfig, create_provider};
use crate::providers::{Provider, ProviderConfig, ProviderError};
use crate::{log_debug, log_warn};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Immutable description of a single LLM call
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub provider: Provider,
    /// Model identifier; empty means the provider's configured or default model
    pub model: String,
    pub prompt: String,
    /// Explicit credential, preferred over config and environment
    pub credential: Option<String>,
    pub temperature: Option<f32>,
}

impl ProviderRequest {
    pub fn new(provider: Provider, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            prompt: prompt.into(),
            credential: None,
            temperature: None,
        }
    }

    #[must_use]
    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Anything that can answer a [`ProviderRequest`].
///
/// The orchestrator and the explainers only ever see this trait, which is
/// what lets tests swap the network out for a stub.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, request: &ProviderRequest) -> Result<String, ProviderError>;
}

/// The real client, talking HTTP to Ollama or Gemini
pub struct ProviderClient {
    providers: HashMap<String, ProviderConfig>,
    http: Client,
}

impl ProviderClient {
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.performance.request_timeout_seconds);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            providers: config.providers.clone(),
            http,
        })
    }

    fn provider_config(&self, provider: Provider) -> ProviderConfig {
        self.providers
            .get(provider.name())
            .cloned()
            .unwrap_or_else(|| ProviderConfig::with_defaults(provider))
    }

    /// Resolve the credential for `provider`: explicit, then configured, then environment.
    ///
    /// Returns `Ok(None)` for providers that need no key.
    pub fn resolve_credential(
        &self,
        provider: Provider,
        explicit: Option<&str>,
    ) -> Result<Option<String>, ProviderError> {
        self.resolve_credential_with(provider, explicit, |var| std::env::var(var).ok())
    }

    fn resolve_credential_with(
        &self,
        provider: Provider,
        explicit: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<String>, ProviderError> {
        let Some(env_var) = provider.api_key_env() else {
            return Ok(None);
        };

        let configured = self.provider_config(provider).api_key;

        [explicit.map(ToString::to_string), Some(configured), env(env_var)]
            .into_iter()
            .flatten()
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
            .map(Some)
            .ok_or(ProviderError::MissingCredential { provider, env_var })
    }
}

#[async_trait]
impl LlmClient for ProviderClient {
    async fn generate(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
        let provider = request.provider;
        let api_key = self
            .resolve_credential(provider, request.credential.as_deref())?
            .unwrap_or_default();

        let provider_config = self.provider_config(provider);
        let model = if request.model.trim().is_empty() {
            provider_config.effective_model(provider).to_string()
        } else {
            request.model.clone()
        };
        let endpoint = provider_config.effective_host(provider);

        log_debug!(
            "Calling {} at {} with model {} ({} prompt chars)",
            provider,
            endpoint,
            model,
            request.prompt.len()
        );

        let backend = create_provider(
            provider,
            LLMProviderConfig {
                model,
                api_key,
                endpoint,
                additional_params: provider_config.additional_params,
            },
            self.http.clone(),
        );
        let options = GenerationOptions {
            temperature: request.temperature,
        };

        let text = backend
            .generate_message(&request.prompt, &options)
            .await
            .inspect_err(|e| log_debug!("Provider call failed: {}", e))?;

        if text.trim().is_empty() {
            log_warn!("{} returned an empty reply", provider);
        } else {
            log_debug!("Received {} characters from {}", text.len(), provider);
        }
        Ok(text)
    }
}
