//! LLM Provider configuration.
//!
//! Single source of truth for supported providers and their defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Default address of a local Ollama server
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
/// Environment variable overriding the Ollama host
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";
/// Default base URL of the Gemini REST API
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Local Ollama server
    #[default]
    Ollama,
    /// Google Gemini API
    Gemini,
}

impl Provider {
    /// All available providers
    pub const ALL: &'static [Provider] = &[Provider::Ollama, Provider::Gemini];

    /// Provider name as used in config files and CLI
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Gemini => "gemini",
        }
    }

    /// Default model when none is configured
    pub const fn default_model(&self) -> &'static str {
        match self {
            Self::Ollama => "llama3",
            Self::Gemini => "gemini-1.5-flash",
        }
    }

    /// Environment variable holding the API key, for providers that need one
    pub const fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Ollama => None,
            Self::Gemini => Some("GEMINI_API_KEY"),
        }
    }

    /// Whether calls must carry a credential
    pub const fn requires_api_key(&self) -> bool {
        self.api_key_env().is_some()
    }

    /// Endpoint used when the configuration does not name one
    pub const fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Ollama => DEFAULT_OLLAMA_HOST,
            Self::Gemini => DEFAULT_GEMINI_BASE_URL,
        }
    }

    /// Get all provider names as strings
    pub fn all_names() -> Vec<&'static str> {
        Self::ALL.iter().map(Self::name).collect()
    }
}

impl FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        // Accept the vendor name as an alias
        let normalized = if lower == "google" { "gemini" } else { &lower };

        Self::ALL
            .iter()
            .find(|p| p.name() == normalized)
            .copied()
            .ok_or_else(|| ProviderError::Unknown(s.to_string()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Errors surfaced by the provider client.
///
/// Every backend-specific failure collapses into `Unavailable` so callers
/// never branch on the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Unknown provider: {0}. Supported: ollama, gemini")]
    Unknown(String),
    #[error(
        "API key required for provider {provider}. Pass --api-key or set the {env_var} environment variable."
    )]
    MissingCredential {
        provider: Provider,
        env_var: &'static str,
    },
    #[error("{provider} is unavailable: {detail}")]
    Unavailable { provider: Provider, detail: String },
}

impl ProviderError {
    pub fn unavailable(provider: Provider, detail: impl Into<String>) -> Self {
        Self::Unavailable {
            provider,
            detail: detail.into(),
        }
    }
}

/// Per-provider configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key (loaded from env or config)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    /// Model used for both the base explanation and explainer follow-ups
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// Server or API base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Additional provider-specific params, forwarded into the request options
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub additional_params: HashMap<String, String>,
}

impl ProviderConfig {
    /// Create config with defaults for a provider
    pub fn with_defaults(provider: Provider) -> Self {
        Self {
            model: provider.default_model().to_string(),
            ..Self::default()
        }
    }

    /// Get effective model (configured or default)
    pub fn effective_model(&self, provider: Provider) -> &str {
        if self.model.is_empty() {
            provider.default_model()
        } else {
            &self.model
        }
    }

    /// Get effective endpoint: configured host, then `OLLAMA_HOST` for Ollama, then the default
    pub fn effective_host(&self, provider: Provider) -> String {
        if let Some(host) = self.host.as_deref().filter(|h| !h.trim().is_empty()) {
            return host.trim_end_matches('/').to_string();
        }
        if provider == Provider::Ollama
            && let Ok(host) = std::env::var(OLLAMA_HOST_ENV)
            && !host.trim().is_empty()
        {
            return host.trim_end_matches('/').to_string();
        }
        provider.default_endpoint().to_string()
    }

    /// Check if this config has an API key set
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
