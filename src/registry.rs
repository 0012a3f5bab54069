//! Explainer registry.
//!
//! Holds the validated, alphabetically ordered catalog of explainers for the
//! lifetime of the process.

use crate::config::{Config, DEFAULT_EXPLAINER};
use crate::explainers::{Explainer, builtin_explainers};
use crate::log_warn;
use crate::render::RenderEngine;
use std::collections::HashSet;
use std::sync::Arc;

/// One catalog entry, fixed once the registry is built
#[derive(Clone)]
pub struct ExplainerDescriptor {
    pub key: String,
    pub display_name: String,
    /// External renderer the explainer needs; availability is checked at render time
    pub renderer: Option<RenderEngine>,
    pub explainer: Arc<dyn Explainer>,
}

impl ExplainerDescriptor {
    pub fn requires_renderer(&self) -> bool {
        self.renderer.is_some()
    }
}

impl std::fmt::Debug for ExplainerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplainerDescriptor")
            .field("key", &self.key)
            .field("display_name", &self.display_name)
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

/// Ordered, read-only catalog of explainers
#[derive(Debug, Clone)]
pub struct ExplainerRegistry {
    entries: Vec<ExplainerDescriptor>,
    default_key: Option<String>,
}

/// Human label for a registry key: separators become spaces, each word is title-cased
pub fn display_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    let mut previous_alphabetic = false;
    for ch in key.chars() {
        let ch = if ch == '_' || ch == '-' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if previous_alphabetic {
                name.extend(ch.to_lowercase());
            } else {
                name.extend(ch.to_uppercase());
            }
            previous_alphabetic = true;
        } else {
            name.push(ch);
            previous_alphabetic = false;
        }
    }
    name
}

/// Keys are non-empty lower-case `snake_case`
pub fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl ExplainerRegistry {
    /// Build the catalog from candidates, skipping invalid or duplicate keys
    pub fn from_candidates(candidates: impl IntoIterator<Item = Arc<dyn Explainer>>) -> Self {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for explainer in candidates {
            let key = explainer.key().to_string();
            if !is_valid_key(&key) {
                log_warn!("Skipping explainer with invalid key '{}'", key);
                continue;
            }
            if !seen.insert(key.clone()) {
                log_warn!("Skipping duplicate explainer '{}'", key);
                continue;
            }

            entries.push(ExplainerDescriptor {
                display_name: display_name(&key),
                renderer: explainer.renderer(),
                key,
                explainer,
            });
        }

        entries.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.key.cmp(&b.key))
        });

        let default_key = entries
            .iter()
            .any(|e| e.key == DEFAULT_EXPLAINER)
            .then(|| DEFAULT_EXPLAINER.to_string());

        Self {
            entries,
            default_key,
        }
    }

    /// The built-in explainers minus the ones the configuration disables
    pub fn builtin(config: &Config) -> Self {
        let disabled: HashSet<&str> = config
            .explainers
            .disabled
            .iter()
            .map(String::as_str)
            .collect();
        let mut registry = Self::from_candidates(
            builtin_explainers()
                .into_iter()
                .filter(|e| !disabled.contains(e.key())),
        );
        if registry.get(&config.explainers.default).is_some() {
            registry.default_key = Some(config.explainers.default.clone());
        }
        registry
    }

    /// Entries in display order
    pub fn catalog(&self) -> &[ExplainerDescriptor] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&ExplainerDescriptor> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Entry for a 1-based menu number
    pub fn by_number(&self, number: usize) -> Option<&ExplainerDescriptor> {
        number.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Preselected key for menus
    pub fn default_key(&self) -> Option<&str> {
        self.default_key.as_deref()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("simple_summary"), "Simple Summary");
        assert_eq!(display_name("uml_class_diagram"), "Uml Class Diagram");
        assert_eq!(display_name("code-rap"), "Code Rap");
        assert_eq!(display_name("abc2def"), "Abc2Def");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("edge_cases"));
        assert!(is_valid_key("graph2"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("Edge_Cases"));
        assert!(!is_valid_key("_hidden"));
        assert!(!is_valid_key("edge cases"));
    }

    #[test]
    fn test_builtin_catalog_is_sorted_by_display_name() {
        let registry = ExplainerRegistry::builtin(&Config::default());
        assert_eq!(registry.len(), 14);
        let names: Vec<&str> = registry
            .catalog()
            .iter()
            .map(|e| e.display_name.as_str())
            .collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert_eq!(registry.default_key(), Some("simple_summary"));
        assert_eq!(
            registry.get("call_graph_image").and_then(|e| e.renderer),
            Some(RenderEngine::Graphviz)
        );
    }

    #[test]
    fn test_disabled_explainers_are_left_out() {
        let mut config = Config::default();
        config.explainers.disabled = vec!["code_rap".to_string()];
        let registry = ExplainerRegistry::builtin(&config);
        assert_eq!(registry.len(), 13);
        assert!(registry.get("code_rap").is_none());
    }
}
