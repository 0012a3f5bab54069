use super::diagram::render_markup;
use super::{ExplainContext, Explainer, ExplanationResult};
use crate::render::RenderEngine;
use crate::{log_warn, prompts};
use anyhow::{Result, bail};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\*\*)?CLASS:(?:\*\*)?\s*([A-Za-z_][\w.]*)").expect("Should compile: CLASS_RE")
});
static ATTRIBUTES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\*\*)?ATTRIBUTES:(?:\*\*)?").expect("Should compile: ATTRIBUTES_RE")
});
static METHODS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\*\*)?METHODS:(?:\*\*)?").expect("Should compile: METHODS_RE")
});
static RELATIONSHIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^(?:\*\*)?RELATIONSHIP:(?:\*\*)?\s*([A-Za-z_][\w.]*)\s*->\s*([A-Za-z_][\w.]*)\s*\[type=(\w+)(?:,\s*label="(.*?)")?\]"#,
    )
    .expect("Should compile: RELATIONSHIP_RE")
});
static RELATIONSHIP_NONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\*\*)?RELATIONSHIP:(?:\*\*)?\s*None")
        .expect("Should compile: RELATIONSHIP_NONE_RE")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub attributes: Vec<String>,
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    /// Lower-cased: inheritance, aggregation, composition, association or dependency
    pub kind: String,
    pub label: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Attributes,
    Methods,
}

/// Parse the `CLASS:` / `ATTRIBUTES:` / `METHODS:` / `RELATIONSHIP:` listing.
///
/// Classes keep the order they were first seen in.
pub fn parse_class_structure(text: &str) -> (Vec<ClassInfo>, Vec<Relationship>) {
    let mut classes: Vec<ClassInfo> = Vec::new();
    let mut relationships = Vec::new();
    let mut current: Option<usize> = None;
    let mut section = Section::None;

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("```") {
            continue;
        }

        if let Some(captures) = CLASS_RE.captures(line) {
            let name = &captures[1];
            let index = classes.iter().position(|c| c.name == name).unwrap_or_else(|| {
                classes.push(ClassInfo {
                    name: name.to_string(),
                    ..ClassInfo::default()
                });
                classes.len() - 1
            });
            current = Some(index);
            section = Section::None;
        } else if ATTRIBUTES_RE.is_match(line) && current.is_some() {
            section = Section::Attributes;
        } else if METHODS_RE.is_match(line) && current.is_some() {
            section = Section::Methods;
        } else if RELATIONSHIP_NONE_RE.is_match(line) {
            section = Section::None;
        } else if let Some(captures) = RELATIONSHIP_RE.captures(line) {
            relationships.push(Relationship {
                source: captures[1].to_string(),
                target: captures[2].to_string(),
                kind: captures[3].to_lowercase(),
                label: captures
                    .get(4)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
            });
            section = Section::None;
        } else if line.starts_with("---") {
            current = None;
            section = Section::None;
        } else if let Some(index) = current {
            let lower = line.to_lowercase();
            if lower.starts_with("(no ") || lower.starts_with("omitted") {
                continue;
            }
            let Some(class) = classes.get_mut(index) else {
                continue;
            };
            match section {
                Section::Attributes => class.attributes.push(line.to_string()),
                Section::Methods => class.methods.push(line.to_string()),
                Section::None => {}
            }
        }
    }

    (classes, relationships)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn member_cell(members: &[String], empty: &str) -> String {
    if members.is_empty() {
        format!("<I>{empty}</I>")
    } else {
        members
            .iter()
            .map(|m| escape_html(m))
            .collect::<Vec<_>>()
            .join("<BR ALIGN=\"LEFT\"/>")
    }
}

/// Build a Graphviz class diagram with HTML-table nodes
pub fn generate_class_dot(classes: &[ClassInfo], relationships: &[Relationship]) -> String {
    let mut dot = String::from(
        "digraph UMLClassDiagram {\n  rankdir=TB;\n  graph [concentrate=true];\n  \
         node [shape=none, margin=0, fontname=\"Helvetica\"];\n  \
         edge [fontname=\"Helvetica\", fontsize=10];\n\n",
    );

    for class in classes {
        let _ = writeln!(
            dot,
            "  \"{}_Node\" [label=<\n    <TABLE BORDER=\"0\" CELLBORDER=\"1\" CELLSPACING=\"0\" CELLPADDING=\"5\">\n      \
             <TR><TD BGCOLOR=\"lightblue\" ALIGN=\"CENTER\"><B>{}</B></TD></TR>\n      \
             <TR><TD ALIGN=\"LEFT\" VALIGN=\"TOP\">{}</TD></TR>\n      \
             <TR><TD ALIGN=\"LEFT\" VALIGN=\"TOP\">{}</TD></TR>\n    </TABLE>>];",
            class.name,
            escape_html(&class.name),
            member_cell(&class.attributes, "No attributes"),
            member_cell(&class.methods, "No methods"),
        );
    }

    dot.push('\n');
    for rel in relationships {
        let known = |name: &str| classes.iter().any(|c| c.name == name);
        if !known(&rel.source) || !known(&rel.target) {
            log_warn!(
                "Skipping relationship {} -> {}: class not in the parsed listing",
                rel.source,
                rel.target
            );
            continue;
        }

        let attrs = match rel.kind.as_str() {
            "inheritance" => "arrowhead=empty, style=solid".to_string(),
            "aggregation" => "arrowhead=odiamond, style=solid, label=\"has a\"".to_string(),
            "composition" => "arrowhead=diamond, style=solid, label=\"owns a\"".to_string(),
            "association" | "dependency" if rel.label.is_empty() => {
                "arrowhead=open, style=dashed".to_string()
            }
            "association" | "dependency" => format!(
                "arrowhead=open, style=dashed, label=\"{}\"",
                escape_html(&rel.label)
            ),
            _ => continue,
        };
        let _ = writeln!(
            dot,
            "  \"{}_Node\" -> \"{}_Node\" [{attrs}];",
            rel.source, rel.target
        );
    }

    dot.push('}');
    dot
}

/// Class diagram built from a structured listing rather than raw DOT
pub struct UmlClassDiagram;

#[async_trait]
impl Explainer for UmlClassDiagram {
    fn key(&self) -> &str {
        "uml_class_diagram"
    }

    fn renderer(&self) -> Option<RenderEngine> {
        Some(RenderEngine::Graphviz)
    }

    async fn explain(&self, ctx: &ExplainContext<'_>) -> Result<ExplanationResult> {
        let prompt = prompts::uml_structure_prompt(ctx.base_explanation, ctx.source);
        let reply = ctx.ask(prompt, Some(0.0)).await?;
        if reply.trim().is_empty() {
            bail!("The model returned empty structured class information");
        }

        let (classes, relationships) = parse_class_structure(&reply);
        if classes.is_empty() {
            bail!(
                "Failed to parse class structure from the model's output. Output started with: '{}...'",
                reply.trim().chars().take(100).collect::<String>()
            );
        }

        let dot = generate_class_dot(&classes, &relationships);
        Ok(render_markup(ctx, RenderEngine::Graphviz, dot, "UML class diagram").await)
    }
}
