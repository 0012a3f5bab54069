use super::{ExplainContext, Explainer, ExplanationResult};
use crate::render::{RenderEngine, RenderJob};
use crate::{log_debug, prompts};
use anyhow::{Result, bail};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

// A fenced block holding a complete digraph
static FENCED_DOT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)```(?:dot|graphviz)?\s*(digraph\b[^{]*\{.*?\})\s*```")
        .expect("Should compile: FENCED_DOT_RE")
});
static DIGRAPH_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bdigraph\b").expect("Should compile: DIGRAPH_START_RE"));
static FENCED_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\n?(.*?)```").expect("Should compile: FENCED_BLOCK_RE")
});

/// Which markup language a diagram explainer asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupKind {
    Dot,
    /// Mermaid, with the header lines the diagram must start with
    Mermaid(&'static [&'static str]),
}

impl MarkupKind {
    pub const fn engine(&self) -> RenderEngine {
        match self {
            Self::Dot => RenderEngine::Graphviz,
            Self::Mermaid(_) => RenderEngine::Mermaid,
        }
    }

    fn extract(&self, reply: &str) -> Option<String> {
        match self {
            Self::Dot => extract_dot(reply),
            Self::Mermaid(headers) => extract_mermaid(reply, headers),
        }
    }

    const fn language(&self) -> &'static str {
        match self {
            Self::Dot => "DOT",
            Self::Mermaid(_) => "Mermaid",
        }
    }
}

/// Pull a `digraph` out of an LLM reply.
///
/// Prefers a fenced block; otherwise takes everything from the first
/// `digraph` keyword up to its matching closing brace.
pub fn extract_dot(reply: &str) -> Option<String> {
    if let Some(captures) = FENCED_DOT_RE.captures(reply) {
        return Some(captures[1].trim().to_string());
    }

    let start = DIGRAPH_START_RE.find(reply)?.start();
    let open = start + reply[start..].find('{')?;

    let mut depth = 0usize;
    for (offset, ch) in reply[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(reply[start..=open + offset].trim().to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn starts_with_header(text: &str, headers: &[&str]) -> bool {
    let lower = text.trim_start().to_lowercase();
    headers
        .iter()
        .any(|header| lower.starts_with(&header.to_lowercase()))
}

/// Pull Mermaid markup starting with one of `headers` out of an LLM reply
pub fn extract_mermaid(reply: &str, headers: &[&str]) -> Option<String> {
    for captures in FENCED_BLOCK_RE.captures_iter(reply) {
        let block = captures[1].trim();
        if starts_with_header(block, headers) {
            return Some(block.to_string());
        }
    }

    let lines: Vec<&str> = reply.lines().collect();
    let first = lines
        .iter()
        .position(|line| starts_with_header(line, headers))?;
    let body: Vec<&str> = lines[first..]
        .iter()
        .take_while(|line| !line.trim_start().starts_with("```"))
        .copied()
        .collect();
    Some(body.join("\n").trim().to_string())
}

fn preview(text: &str, max_chars: usize) -> String {
    text.trim().chars().take(max_chars).collect()
}

/// Render extracted markup; a renderer failure becomes an error result carrying the markup
pub(super) async fn render_markup(
    ctx: &ExplainContext<'_>,
    engine: RenderEngine,
    markup: String,
    subject: &str,
) -> ExplanationResult {
    let job = RenderJob::new(
        markup,
        engine,
        ctx.options.image_format,
        &ctx.options.output_base,
    );
    match ctx.renderer.render(&job).await {
        Ok(path) => {
            let path = std::path::absolute(&path).unwrap_or(path);
            ExplanationResult::Image {
                message: format!("{subject} saved to: {}", path.display()),
                path,
            }
        }
        Err(e) => ExplanationResult::error(format!(
            "Failed to render {}: {e}\n\n{} source:\n{}",
            subject.to_lowercase(),
            engine,
            job.markup
        )),
    }
}

/// Asks the LLM for diagram markup and renders it
pub struct DiagramExplainer {
    pub key: &'static str,
    /// Human description used in messages, e.g. "Call graph"
    pub subject: &'static str,
    pub markup: MarkupKind,
    pub build_prompt: fn(&str, &str) -> String,
    pub temperature: f32,
}

#[async_trait]
impl Explainer for DiagramExplainer {
    fn key(&self) -> &str {
        self.key
    }

    fn renderer(&self) -> Option<RenderEngine> {
        Some(self.markup.engine())
    }

    async fn explain(&self, ctx: &ExplainContext<'_>) -> Result<ExplanationResult> {
        let prompt = (self.build_prompt)(ctx.base_explanation, ctx.source);
        let reply = ctx.ask(prompt, Some(self.temperature)).await?;

        let Some(markup) = self.markup.extract(&reply) else {
            bail!(
                "The model did not return valid {} markup for the {}. Output started with: '{}...'",
                self.markup.language(),
                self.subject.to_lowercase(),
                preview(&reply, 100)
            );
        };
        log_debug!("Extracted {} characters of {} markup", markup.len(), self.markup.language());

        Ok(render_markup(ctx, self.markup.engine(), markup, self.subject).await)
    }
}

const GRAPH_HEADERS: &[&str] = &["graph TD", "graph LR", "flowchart TD", "flowchart LR"];
const ACTIVITY_HEADERS: &[&str] = &[
    "graph TD",
    "graph LR",
    "flowchart TD",
    "flowchart LR",
    "activityDiagram",
];

pub(super) fn builtin() -> Vec<DiagramExplainer> {
    vec![
        DiagramExplainer {
            key: "call_graph_image",
            subject: "Call graph",
            markup: MarkupKind::Dot,
            build_prompt: prompts::call_graph_prompt,
            temperature: 0.05,
        },
        DiagramExplainer {
            key: "dependency_graph",
            subject: "Dependency graph",
            markup: MarkupKind::Dot,
            build_prompt: prompts::dependency_graph_prompt,
            temperature: 0.1,
        },
        DiagramExplainer {
            key: "flowchart_graphical",
            subject: "Graphical flowchart",
            markup: MarkupKind::Dot,
            build_prompt: prompts::flowchart_graphical_prompt,
            temperature: 0.1,
        },
        DiagramExplainer {
            key: "sequence_diagram_mermaid",
            subject: "Sequence diagram",
            markup: MarkupKind::Mermaid(&["sequenceDiagram"]),
            build_prompt: prompts::sequence_diagram_prompt,
            temperature: 0.1,
        },
        DiagramExplainer {
            key: "activity_diagram_mermaid_image",
            subject: "Activity diagram",
            markup: MarkupKind::Mermaid(ACTIVITY_HEADERS),
            build_prompt: prompts::activity_diagram_prompt,
            temperature: 0.05,
        },
        DiagramExplainer {
            key: "architecture_diagram_mermaid_image",
            subject: "Architecture diagram",
            markup: MarkupKind::Mermaid(GRAPH_HEADERS),
            build_prompt: prompts::architecture_diagram_prompt,
            temperature: 0.1,
        },
    ]
}
