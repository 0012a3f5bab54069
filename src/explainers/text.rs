use super::{ExplainContext, Explainer, ExplanationResult};
use crate::prompts;
use anyhow::{Result, bail};
use async_trait::async_trait;

/// Hands the base explanation back unchanged
pub struct SimpleSummary;

#[async_trait]
impl Explainer for SimpleSummary {
    fn key(&self) -> &str {
        "simple_summary"
    }

    async fn explain(&self, ctx: &ExplainContext<'_>) -> Result<ExplanationResult> {
        Ok(ExplanationResult::text(ctx.base_explanation))
    }
}

/// One follow-up LLM call built from the base explanation (and sometimes the source)
pub struct FollowUpExplainer {
    pub key: &'static str,
    pub build_prompt: fn(&str, &str) -> String,
    pub temperature: Option<f32>,
    /// Prepended to the reply, separated by a blank line
    pub heading: Option<&'static str>,
    /// Lead-ins the model tends to add despite being told not to
    pub preambles: &'static [&'static str],
}

#[async_trait]
impl Explainer for FollowUpExplainer {
    fn key(&self) -> &str {
        self.key
    }

    async fn explain(&self, ctx: &ExplainContext<'_>) -> Result<ExplanationResult> {
        let prompt = (self.build_prompt)(ctx.base_explanation, ctx.source);
        let reply = ctx.ask(prompt, self.temperature).await?;

        let cleaned = clean_reply(&reply, self.preambles);
        if cleaned.is_empty() {
            bail!("The model returned no content for {}", self.key);
        }

        Ok(ExplanationResult::text(match self.heading {
            Some(heading) => format!("{heading}\n\n{cleaned}"),
            None => cleaned,
        }))
    }
}

/// Strip a wrapping code fence and the first matching preamble from a reply
pub fn clean_reply(reply: &str, preambles: &[&str]) -> String {
    let mut cleaned = reply.trim();

    if cleaned.starts_with("```") && cleaned.ends_with("```") && cleaned.len() >= 6 {
        cleaned = &cleaned[3..cleaned.len() - 3];
        // Drop the language tag on the opening fence
        cleaned = match cleaned.split_once('\n') {
            Some((tag, rest)) if !tag.trim().contains(' ') => rest,
            _ => cleaned,
        };
        cleaned = cleaned.trim();
    }

    for preamble in preambles {
        if cleaned.len() >= preamble.len()
            && cleaned.is_char_boundary(preamble.len())
            && cleaned[..preamble.len()].eq_ignore_ascii_case(preamble)
        {
            cleaned = cleaned[preamble.len()..].trim_start_matches([':', ' ', '\n']);
            break;
        }
    }

    cleaned.trim().to_string()
}

pub(super) fn builtin() -> Vec<FollowUpExplainer> {
    vec![
        FollowUpExplainer {
            key: "key_components",
            build_prompt: |base, _| prompts::key_components_prompt(base),
            temperature: None,
            heading: None,
            preambles: &["Key Components:"],
        },
        FollowUpExplainer {
            key: "metaphor_analogy",
            build_prompt: |base, _| prompts::metaphor_prompt(base),
            temperature: Some(0.7),
            heading: None,
            preambles: &["Metaphor/Analogy Explanation:"],
        },
        FollowUpExplainer {
            key: "edge_cases",
            build_prompt: prompts::edge_cases_prompt,
            temperature: Some(0.2),
            heading: None,
            preambles: &["Edge Cases for Automated Testing:"],
        },
        FollowUpExplainer {
            key: "flowchart_text",
            build_prompt: |base, _| prompts::flowchart_text_prompt(base),
            temperature: Some(0.1),
            heading: None,
            preambles: &[],
        },
        FollowUpExplainer {
            key: "code_rap",
            build_prompt: prompts::code_rap_prompt,
            temperature: Some(0.7),
            heading: Some("Code Explainer Rap:"),
            preambles: &[
                "Rap Lyrics:",
                "Here's a rap about the code:",
                "Code Rap:",
                "Alright, check the mic, one two, this is how the code do:",
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_reply_strips_fence_and_preamble() {
        let reply = "```text\nRap Lyrics:\nYo, this loop goes round\n```";
        assert_eq!(
            clean_reply(reply, &["Rap Lyrics:"]),
            "Yo, this loop goes round"
        );
    }

    #[test]
    fn test_clean_reply_preamble_is_case_insensitive() {
        assert_eq!(
            clean_reply("code rap: verse one", &["Code Rap:"]),
            "verse one"
        );
    }

    #[test]
    fn test_clean_reply_leaves_plain_text() {
        assert_eq!(clean_reply("  * `main`: entry  ", &[]), "* `main`: entry");
    }
}
