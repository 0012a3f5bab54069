use code_explainer::config::Config;
use code_explainer::explainers::Explainer;
use code_explainer::registry::ExplainerRegistry;
use code_explainer::render::RenderEngine;
use std::sync::Arc;

use test_utils::{Behavior, StubExplainer};

fn stub(key: &'static str) -> Arc<dyn Explainer> {
    StubExplainer::new(key, Behavior::Echo)
}

#[test]
fn test_invalid_and_duplicate_keys_are_skipped() {
    let registry = ExplainerRegistry::from_candidates(vec![
        stub("zeta_view"),
        stub("Bad Key"),
        stub("alpha_view"),
        stub("zeta_view"),
        stub(""),
    ]);

    assert_eq!(registry.keys(), vec!["alpha_view", "zeta_view"]);
    assert_eq!(registry.default_key(), None);
}

#[test]
fn test_menu_numbers_follow_catalog_order() {
    let registry = ExplainerRegistry::from_candidates(vec![
        stub("simple_summary"),
        stub("code_rap"),
        stub("edge_cases"),
    ]);

    assert_eq!(registry.default_key(), Some("simple_summary"));
    let numbered: Vec<(usize, &str)> = (1..=registry.len())
        .filter_map(|n| registry.by_number(n).map(|e| (n, e.key.as_str())))
        .collect();
    assert_eq!(
        numbered,
        vec![(1, "code_rap"), (2, "edge_cases"), (3, "simple_summary")]
    );
    assert!(registry.by_number(0).is_none());
    assert!(registry.by_number(4).is_none());
}

#[test]
fn test_builtin_renderer_requirements() {
    let registry = ExplainerRegistry::builtin(&Config::default());

    let needs = |engine: RenderEngine| -> Vec<&str> {
        let mut keys: Vec<&str> = registry
            .catalog()
            .iter()
            .filter(|e| e.renderer == Some(engine))
            .map(|e| e.key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    };

    assert_eq!(
        needs(RenderEngine::Graphviz),
        vec![
            "call_graph_image",
            "dependency_graph",
            "flowchart_graphical",
            "uml_class_diagram"
        ]
    );
    assert_eq!(
        needs(RenderEngine::Mermaid),
        vec![
            "activity_diagram_mermaid_image",
            "architecture_diagram_mermaid_image",
            "sequence_diagram_mermaid"
        ]
    );

    let text_only = registry
        .catalog()
        .iter()
        .filter(|e| !e.requires_renderer())
        .count();
    assert_eq!(text_only, 7);
}

#[test]
fn test_configured_default_explainer() {
    let mut config = Config::default();
    config.explainers.default = "edge_cases".to_string();
    assert_eq!(
        ExplainerRegistry::builtin(&config).default_key(),
        Some("edge_cases")
    );

    config.explainers.default = "not_registered".to_string();
    assert_eq!(
        ExplainerRegistry::builtin(&config).default_key(),
        Some("simple_summary")
    );

    config.explainers.disabled = vec!["simple_summary".to_string()];
    let registry = ExplainerRegistry::builtin(&config);
    assert_eq!(registry.default_key(), None);
    assert!(registry.get("simple_summary").is_none());
}

#[test]
fn test_display_names_in_catalog() {
    let registry = ExplainerRegistry::builtin(&Config::default());
    let entry = registry
        .get("metaphor_analogy")
        .expect("metaphor_analogy is built in");
    assert_eq!(entry.display_name, "Metaphor Analogy");
    assert!(format!("{entry:?}").contains("metaphor_analogy"));
}
