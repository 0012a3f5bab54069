//! Dispatch Orchestrator.
//!
//! Runs one request through `Idle -> SourceLoaded -> BaseExplained ->
//! Formatted -> Done`, stopping at `Failed` on source or provider errors.
//! Anything that goes wrong inside the chosen explainer, panics included,
//! becomes an error result next to the base explanation.

use crate::config::Config;
use crate::explainers::{ExplainContext, ExplainOptions, ExplanationResult, Requirements};
use crate::llm::{LlmClient, ProviderRequest};
use crate::prompts::create_base_prompt;
use crate::providers::{Provider, ProviderError};
use crate::registry::ExplainerRegistry;
use crate::render::{ImageFormat, Renderer};
use crate::source::{self, SourceError};
use crate::{log_debug, log_error, log_warn};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Pipeline states; `Done` and `Failed` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Idle,
    SourceLoaded,
    BaseExplained,
    Formatted,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::SourceLoaded => "source loaded",
            Self::BaseExplained => "base explained",
            Self::Formatted => "formatted",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Errors that end a request without a result
#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Unknown explainer '{0}'. Run `code-explainer list` to see the available explainers.")]
    UnknownExplainer(String),
}

impl ExplainError {
    /// The transition that could not be completed
    pub fn failed_transition(&self) -> Stage {
        match self {
            Self::Source(_) => Stage::SourceLoaded,
            Self::Provider(_) => Stage::BaseExplained,
            Self::UnknownExplainer(_) => Stage::Formatted,
        }
    }
}

/// What to explain and how
#[derive(Debug, Clone, Default)]
pub struct ExplainRequest {
    pub path: PathBuf,
    pub explainer: String,
    /// Falls back to the configured default provider
    pub provider: Option<Provider>,
    /// Falls back to the provider's configured model
    pub model: Option<String>,
    pub credential: Option<String>,
    pub requirements: Option<Requirements>,
    pub output_dir: Option<PathBuf>,
    pub image_format: Option<ImageFormat>,
}

impl ExplainRequest {
    pub fn new(path: impl Into<PathBuf>, explainer: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            explainer: explainer.into(),
            ..Self::default()
        }
    }
}

/// A finished request
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub explainer: String,
    pub provider: Provider,
    pub model: String,
    pub files: Vec<PathBuf>,
    pub base_explanation: String,
    pub result: ExplanationResult,
}

pub struct Orchestrator {
    config: Config,
    client: Arc<dyn LlmClient>,
    registry: Arc<ExplainerRegistry>,
    renderer: Arc<Renderer>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        client: Arc<dyn LlmClient>,
        registry: Arc<ExplainerRegistry>,
        renderer: Arc<Renderer>,
    ) -> Self {
        Self {
            config,
            client,
            registry,
            renderer,
        }
    }

    pub fn registry(&self) -> &ExplainerRegistry {
        &self.registry
    }

    pub async fn explain(&self, request: &ExplainRequest) -> Result<Explanation, ExplainError> {
        self.explain_with_progress(request, |_| {}).await
    }

    /// Like [`Self::explain`], reporting every state entered to `progress`
    pub async fn explain_with_progress(
        &self,
        request: &ExplainRequest,
        progress: impl Fn(Stage) + Send + Sync,
    ) -> Result<Explanation, ExplainError> {
        let span = tracing::info_span!(
            "explain",
            path = %request.path.display(),
            explainer = %request.explainer
        );

        progress(Stage::Idle);
        let outcome = self.run(request, &progress).instrument(span).await;
        match &outcome {
            Ok(_) => progress(Stage::Done),
            Err(e) => {
                log_error!("Request failed at {}: {}", e.failed_transition(), e);
                progress(Stage::Failed);
            }
        }
        outcome
    }

    async fn run(
        &self,
        request: &ExplainRequest,
        progress: &(impl Fn(Stage) + Send + Sync),
    ) -> Result<Explanation, ExplainError> {
        let bundle = source::aggregate(&request.path, &self.config.source)?;
        progress(Stage::SourceLoaded);

        let provider = request.provider.unwrap_or(self.config.default_provider);
        let model = request
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.config.model_for(provider));

        let base_request =
            ProviderRequest::new(provider, model.clone(), create_base_prompt(bundle.as_text()))
                .with_credential(request.credential.clone());
        let base_explanation = self.client.generate(&base_request).await?;
        if base_explanation.trim().is_empty() {
            log_warn!("Base explanation is empty; continuing with it as-is");
        }
        progress(Stage::BaseExplained);

        let descriptor = self
            .registry
            .get(&request.explainer)
            .ok_or_else(|| ExplainError::UnknownExplainer(request.explainer.clone()))?;

        let output_dir = request
            .output_dir
            .clone()
            .unwrap_or_else(|| self.config.output.directory.clone());
        let options = ExplainOptions {
            requirements: request.requirements.clone(),
            output_base: output_dir.join(unique_stem(&descriptor.key)),
            image_format: request
                .image_format
                .unwrap_or(self.config.output.image_format),
        };
        let ctx = ExplainContext {
            base_explanation: &base_explanation,
            client: self.client.as_ref(),
            model: &model,
            provider,
            source: bundle.as_text(),
            credential: request.credential.as_deref(),
            options: &options,
            renderer: &self.renderer,
        };

        log_debug!("Running explainer {}", descriptor.key);
        let result = match AssertUnwindSafe(descriptor.explainer.explain(&ctx))
            .catch_unwind()
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                log_warn!("Explainer {} failed: {:#}", descriptor.key, e);
                ExplanationResult::error(format!("{e:#}"))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log_error!("Explainer {} panicked: {}", descriptor.key, message);
                ExplanationResult::error(format!(
                    "Explainer '{}' crashed: {message}",
                    descriptor.key
                ))
            }
        };
        progress(Stage::Formatted);

        Ok(Explanation {
            explainer: descriptor.key.clone(),
            provider,
            model,
            files: bundle.paths().into_iter().map(PathBuf::from).collect(),
            base_explanation,
            result,
        })
    }
}

/// `<key>_<8 hex>`, so concurrent requests never share an image path
fn unique_stem(key: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{key}_{}", &id[..8])
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
