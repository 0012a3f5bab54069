//! Code Explainer - LLM-powered explanations and diagrams for source code
//!
//! A file or directory is aggregated into one source bundle, explained once by
//! an LLM provider (Ollama or Gemini), and the explanation is then reshaped by
//! an explainer into text, a rendered diagram, or an error result.

#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::format_push_string)] // Performance improvement but stylistic
#![allow(clippy::return_self_not_must_use)] // Builder pattern is clear enough

pub mod cli;
pub mod commands;
pub mod common;
pub mod config;
pub mod explainers;
pub mod llm;
pub mod llm_providers;
pub mod logger;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod registry;
pub mod render;
pub mod source;
pub mod ui;

// Re-export important structs and functions for easier testing
pub use config::Config;
pub use explainers::{ExplainContext, Explainer, ExplanationResult};
pub use llm::{LlmClient, ProviderClient, ProviderRequest};
pub use orchestrator::{ExplainError, ExplainRequest, Explanation, Orchestrator, Stage};
pub use providers::{Provider, ProviderConfig, ProviderError};
pub use registry::ExplainerRegistry;
pub use render::{ImageFormat, RenderEngine, RenderError, Renderer};
pub use source::{SourceBundle, SourceError, SourceOptions};
