use crate::log_debug;
use crate::providers::{Provider, ProviderConfig};
use crate::render::{ImageFormat, RenderEngine, Renderer};
use crate::source::SourceOptions;

use anyhow::{Context, Result, anyhow};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration structure for code-explainer
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    /// Provider used when the command line names none
    #[serde(default)]
    pub default_provider: Provider,
    /// Provider-specific configurations, keyed by provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Which files a directory walk picks up
    #[serde(default)]
    pub source: SourceOptions,
    /// Where and how diagrams are rendered
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub explainers: ExplainerConfig,
    /// Performance and execution settings
    #[serde(default)]
    pub performance: PerformanceConfig,
    /// Flag indicating if this config is from a project file
    #[serde(skip)]
    pub is_project_config: bool,
}

/// Diagram output settings
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory rendered images are written to
    pub directory: PathBuf,
    pub image_format: ImageFormat,
    /// Background passed to the Mermaid CLI
    pub mermaid_background: String,
    /// Override for the Graphviz executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphviz_command: Option<String>,
    /// Override for the Mermaid CLI executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mermaid_command: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("generated_images"),
            image_format: ImageFormat::Png,
            mermaid_background: "white".to_string(),
            graphviz_command: None,
            mermaid_command: None,
        }
    }
}

/// Explainer selection settings
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ExplainerConfig {
    /// Key preselected in the interactive menu
    pub default: String,
    /// Keys left out of the registry
    pub disabled: Vec<String>,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            default: DEFAULT_EXPLAINER.to_string(),
            disabled: Vec::new(),
        }
    }
}

/// Performance and execution configuration
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PerformanceConfig {
    /// HTTP timeout for a single LLM call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Whether to enable verbose logging (includes HTTP client internals)
    #[serde(default)]
    pub verbose_logging: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            verbose_logging: false,
        }
    }
}

fn default_request_timeout() -> u64 {
    300
}

// Project sections are parsed with serde defaults, so a field still at its
// default is treated as unset and the personal value survives.

impl SourceOptions {
    fn merge(&mut self, project: Self) {
        let defaults = Self::default();
        if project.extensions != defaults.extensions {
            self.extensions = project.extensions;
        }
        if project.excluded_dirs != defaults.excluded_dirs {
            self.excluded_dirs = project.excluded_dirs;
        }
        if project.respect_gitignore != defaults.respect_gitignore {
            self.respect_gitignore = project.respect_gitignore;
        }
    }
}

impl OutputConfig {
    fn merge(&mut self, project: Self) {
        let defaults = Self::default();
        if project.directory != defaults.directory {
            self.directory = project.directory;
        }
        if project.image_format != defaults.image_format {
            self.image_format = project.image_format;
        }
        if project.mermaid_background != defaults.mermaid_background {
            self.mermaid_background = project.mermaid_background;
        }
        if project.graphviz_command.is_some() {
            self.graphviz_command = project.graphviz_command;
        }
        if project.mermaid_command.is_some() {
            self.mermaid_command = project.mermaid_command;
        }
    }
}

impl ExplainerConfig {
    fn merge(&mut self, project: Self) {
        if project.default != DEFAULT_EXPLAINER {
            self.default = project.default;
        }
        if !project.disabled.is_empty() {
            self.disabled = project.disabled;
        }
    }
}

impl PerformanceConfig {
    fn merge(&mut self, project: Self) {
        if project.request_timeout_seconds != default_request_timeout() {
            self.request_timeout_seconds = project.request_timeout_seconds;
        }
        if project.verbose_logging {
            self.verbose_logging = true;
        }
    }
}

/// Project configuration filename
pub const PROJECT_CONFIG_FILENAME: &str = ".explainerconfig";

/// Explainer preselected when nothing else is configured
pub const DEFAULT_EXPLAINER: &str = "simple_summary";

impl Config {
    /// Load the personal configuration, then merge the project file from the working directory
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let mut config = Self::load_personal_from(&config_path)?;

        let cwd = std::env::current_dir().context("Failed to read the working directory")?;
        if let Some(project_config) = Self::load_project_config(&cwd)? {
            config.merge_with_project_config(project_config);
        }

        log_debug!("Configuration loaded from {}", config_path.display());
        Ok(config)
    }

    /// Personal configuration at `path` without project overrides; defaults when the file is missing
    pub fn load_personal_from(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse a configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid configuration file format in {}", path.display()))
    }

    /// Load `.explainerconfig` from `dir` if there is one
    pub fn load_project_config(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(PROJECT_CONFIG_FILENAME);
        if !config_path.exists() {
            return Ok(None);
        }

        let mut config = Self::load_from(&config_path).with_context(|| {
            format!("Please check your {PROJECT_CONFIG_FILENAME} file for syntax errors")
        })?;
        config.is_project_config = true;
        Ok(Some(config))
    }

    /// Merge this config with project-specific config, with project config taking precedence
    /// But never allow API keys from project config
    pub fn merge_with_project_config(&mut self, project_config: Self) {
        log_debug!("Merging with project configuration");

        if project_config.default_provider != Provider::default() {
            self.default_provider = project_config.default_provider;
        }

        for (provider, proj_provider_config) in project_config.providers {
            let entry = self.providers.entry(provider).or_default();

            if !proj_provider_config.model.is_empty() {
                entry.model = proj_provider_config.model;
            }
            if proj_provider_config.host.is_some() {
                entry.host = proj_provider_config.host;
            }
            entry
                .additional_params
                .extend(proj_provider_config.additional_params);
        }

        self.source.merge(project_config.source);
        self.output.merge(project_config.output);
        self.explainers.merge(project_config.explainers);
        self.performance.merge(project_config.performance);
    }

    /// Save the configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let config_content = toml::to_string_pretty(self)?;
        fs::write(path, config_content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        log_debug!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let mut path =
            config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
        path.push("code-explainer");
        fs::create_dir_all(&path)?;
        path.push("config.toml");
        Ok(path)
    }

    /// Configuration for `provider`, falling back to its defaults
    pub fn provider_config(&self, provider: Provider) -> ProviderConfig {
        self.providers
            .get(provider.name())
            .cloned()
            .unwrap_or_else(|| ProviderConfig::with_defaults(provider))
    }

    /// Model used for `provider` when the command line names none
    pub fn model_for(&self, provider: Provider) -> String {
        self.provider_config(provider)
            .effective_model(provider)
            .to_string()
    }

    /// Renderer bridge configured from the `[output]` section
    pub fn renderer(&self) -> Renderer {
        let mut renderer = Renderer::default().with_background(&self.output.mermaid_background);
        if let Some(program) = &self.output.graphviz_command {
            renderer = renderer.with_program(RenderEngine::Graphviz, program);
        }
        if let Some(program) = &self.output.mermaid_command {
            renderer = renderer.with_program(RenderEngine::Mermaid, program);
        }
        renderer
    }

    /// Update the configuration with new values
    pub fn update(
        &mut self,
        provider: Option<Provider>,
        api_key: Option<String>,
        model: Option<String>,
        host: Option<String>,
    ) {
        if let Some(provider) = provider {
            self.default_provider = provider;
        }

        let provider = self.default_provider;
        let provider_config = self
            .providers
            .entry(provider.name().to_string())
            .or_insert_with(|| ProviderConfig::with_defaults(provider));

        if let Some(key) = api_key {
            provider_config.api_key = key;
        }
        if let Some(model) = model {
            provider_config.model = model;
        }
        if let Some(host) = host {
            provider_config.host = Some(host).filter(|h| !h.trim().is_empty());
        }

        log_debug!("Configuration updated for provider {}", provider);
    }
}

impl Default for Config {
    fn default() -> Self {
        let providers = Provider::ALL
            .iter()
            .map(|p| (p.name().to_string(), ProviderConfig::with_defaults(*p)))
            .collect();

        Self {
            default_provider: Provider::default(),
            providers,
            source: SourceOptions::default(),
            output: OutputConfig::default(),
            explainers: ExplainerConfig::default(),
            performance: PerformanceConfig::default(),
            is_project_config: false,
        }
    }
}
