use crate::config::Config;
use crate::providers::{Provider, ProviderConfig};
use crate::render::ImageFormat;
use anyhow::Result;
use clap::Args;
use url::Url;

/// Provider selection shared by `explain` and `config`
#[derive(Args, Clone, Default, Debug)]
pub struct ProviderParams {
    /// Override default LLM provider
    #[arg(long, help = "Override default LLM provider", value_parser = available_providers_parser)]
    pub provider: Option<String>,

    /// Model name for the selected provider
    #[arg(long, help = "Model name for the selected provider")]
    pub model: Option<String>,

    /// Server or API base URL for the selected provider
    #[arg(long, help = "Server or API base URL (e.g. http://localhost:11434)", value_parser = host_parser)]
    pub host: Option<String>,

    /// API key for providers that need one
    #[arg(long, help = "API key for providers that need one")]
    pub api_key: Option<String>,
}

impl ProviderParams {
    /// The provider named on the command line, if any
    pub fn provider(&self) -> Result<Option<Provider>> {
        self.provider
            .as_deref()
            .map(str::parse::<Provider>)
            .transpose()
            .map_err(Into::into)
    }

    /// Apply the host override for this run only; models and keys travel with the request
    pub fn apply_to_config(&self, config: &mut Config) -> Result<Provider> {
        let provider = self.provider()?.unwrap_or(config.default_provider);

        if let Some(host) = &self.host {
            config
                .providers
                .entry(provider.name().to_string())
                .or_insert_with(|| ProviderConfig::with_defaults(provider))
                .host = Some(host.clone());
        }

        Ok(provider)
    }
}

/// Validates provider names
pub fn available_providers_parser(s: &str) -> Result<String, String> {
    s.parse::<Provider>()
        .map(|p| p.name().to_string())
        .map_err(|_| {
            format!(
                "Invalid provider '{}'. Available providers: {}",
                s,
                Provider::all_names().join(", ")
            )
        })
}

/// Hosts must be absolute http(s) URLs
pub fn host_parser(s: &str) -> Result<String, String> {
    let url = Url::parse(s).map_err(|e| format!("Invalid host '{s}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(s.trim_end_matches('/').to_string()),
        scheme => Err(format!(
            "Invalid host '{s}': unsupported scheme '{scheme}', use http or https"
        )),
    }
}

pub fn image_format_parser(s: &str) -> Result<ImageFormat, String> {
    s.parse()
}
