use super::text::clean_reply;
use super::{ExplainContext, Explainer, ExplanationResult};
use crate::{log_info, prompts};
use anyhow::{Result, bail};
use async_trait::async_trait;

/// Compares the code against a functional requirements document
pub struct GapAnalysis;

const PREAMBLES: &[&str] = &["Gap Analysis Report:", "Here is the gap analysis report:"];

#[async_trait]
impl Explainer for GapAnalysis {
    fn key(&self) -> &str {
        "functional_gap_analysis"
    }

    async fn explain(&self, ctx: &ExplainContext<'_>) -> Result<ExplanationResult> {
        let Some(requirements) = &ctx.options.requirements else {
            bail!("Functional gap analysis needs a requirements file; pass one with --requirements");
        };
        if requirements.text.trim().is_empty() {
            log_info!(
                "Requirements from {} are empty; running the analysis anyway",
                requirements.label
            );
        }

        let prompt = prompts::gap_analysis_prompt(
            &requirements.label,
            &requirements.text,
            ctx.base_explanation,
            ctx.source,
        );
        let reply = ctx.ask(prompt, Some(0.2)).await?;

        let report = clean_reply(&reply, PREAMBLES);
        if report.is_empty() {
            bail!("The model did not return any report content");
        }

        Ok(ExplanationResult::text(format!(
            "Functional Gap Analysis Report (Code vs. Requirements from '{}'):\n\n{report}",
            requirements.label
        )))
    }
}
