//! Explainers turn a base explanation into the result the user asked for.
//!
//! Every explainer implements [`Explainer`]. Text explainers return prose,
//! possibly after a follow-up LLM call; diagram explainers ask the LLM for
//! markup and hand it to the [`Renderer`].

mod diagram;
mod gap_analysis;
mod text;
mod uml;

pub use diagram::{DiagramExplainer, MarkupKind, extract_dot, extract_mermaid};
pub use gap_analysis::GapAnalysis;
pub use text::{FollowUpExplainer, SimpleSummary, clean_reply};
pub use uml::{ClassInfo, Relationship, UmlClassDiagram, generate_class_dot, parse_class_structure};

use crate::llm::{LlmClient, ProviderRequest};
use crate::providers::Provider;
use crate::render::{ImageFormat, RenderEngine, Renderer};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of an explainer, tagged by `kind` when serialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExplanationResult {
    Text { content: String },
    Image { path: PathBuf, message: String },
    Error { detail: String },
}

impl ExplanationResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self::Error {
            detail: detail.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Functional requirements handed to the gap analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirements {
    /// Where the text came from, quoted in the prompt and the report heading
    pub label: String,
    pub text: String,
}

/// Per-request options shared by all explainers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainOptions {
    pub requirements: Option<Requirements>,
    /// Image path without extension; unique per request
    pub output_base: PathBuf,
    pub image_format: ImageFormat,
}

/// Everything an explainer may use while running
pub struct ExplainContext<'a> {
    pub base_explanation: &'a str,
    pub client: &'a dyn LlmClient,
    pub model: &'a str,
    pub provider: Provider,
    /// The aggregated source bundle text
    pub source: &'a str,
    pub credential: Option<&'a str>,
    pub options: &'a ExplainOptions,
    pub renderer: &'a Renderer,
}

impl ExplainContext<'_> {
    /// Issue a follow-up call with the same provider, model and credential as the base call
    pub async fn ask(&self, prompt: String, temperature: Option<f32>) -> Result<String> {
        let mut request = ProviderRequest::new(self.provider, self.model, prompt)
            .with_credential(self.credential.map(ToString::to_string));
        request.temperature = temperature;
        Ok(self.client.generate(&request).await?)
    }
}

/// A named transform from base explanation to [`ExplanationResult`]
#[async_trait]
pub trait Explainer: Send + Sync {
    /// Registry key, `snake_case`
    fn key(&self) -> &str;

    /// External renderer this explainer needs, if any
    fn renderer(&self) -> Option<RenderEngine> {
        None
    }

    async fn explain(&self, ctx: &ExplainContext<'_>) -> Result<ExplanationResult>;
}

/// The explainers shipped with the tool
pub fn builtin_explainers() -> Vec<Arc<dyn Explainer>> {
    let mut explainers: Vec<Arc<dyn Explainer>> = vec![Arc::new(SimpleSummary)];
    explainers.extend(
        text::builtin()
            .into_iter()
            .map(|e| Arc::new(e) as Arc<dyn Explainer>),
    );
    explainers.push(Arc::new(GapAnalysis));
    explainers.extend(
        diagram::builtin()
            .into_iter()
            .map(|e| Arc::new(e) as Arc<dyn Explainer>),
    );
    explainers.push(Arc::new(UmlClassDiagram));
    explainers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serializes_with_kind_tag() {
        let json = serde_json::to_value(ExplanationResult::text("hello")).expect("serialize");
        assert_eq!(json["kind"], "text");
        assert_eq!(json["content"], "hello");

        let json = serde_json::to_value(ExplanationResult::error("boom")).expect("serialize");
        assert_eq!(json["kind"], "error");
        assert_eq!(json["detail"], "boom");
    }

    #[test]
    fn test_builtin_keys_are_unique() {
        let explainers = builtin_explainers();
        let mut keys: Vec<&str> = explainers.iter().map(|e| e.key()).collect();
        assert_eq!(keys.len(), 14);
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 14);
    }
}
