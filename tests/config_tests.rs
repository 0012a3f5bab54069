use code_explainer::commands::update_personal_config;
use code_explainer::common::ProviderParams;
use code_explainer::config::{Config, PROJECT_CONFIG_FILENAME};
use code_explainer::providers::Provider;
use code_explainer::render::{ImageFormat, RenderEngine};
use serial_test::serial;
use std::path::PathBuf;

use test_utils::source_tree;

const PERSONAL: &str = r#"
default_provider = "gemini"

[providers.gemini]
api_key = "personal-key"
model = "gemini-1.5-pro"

[providers.ollama]
model = "codellama"
host = "http://gpu-box:11434"

[output]
directory = "diagrams"
image_format = "svg"
mermaid_command = "/opt/mermaid/bin/mmdc"

[explainers]
default = "key_components"
disabled = ["code_rap"]

[performance]
request_timeout_seconds = 60
"#;

#[test]
fn test_load_from_reads_every_section() {
    let dir = source_tree(&[("config.toml", PERSONAL)]);
    let config = Config::load_from(&dir.path().join("config.toml")).expect("load");

    assert_eq!(config.default_provider, Provider::Gemini);
    assert_eq!(config.model_for(Provider::Gemini), "gemini-1.5-pro");
    assert_eq!(config.model_for(Provider::Ollama), "codellama");
    assert_eq!(
        config
            .provider_config(Provider::Ollama)
            .effective_host(Provider::Ollama),
        "http://gpu-box:11434"
    );
    assert_eq!(config.output.directory, PathBuf::from("diagrams"));
    assert_eq!(config.output.image_format, ImageFormat::Svg);
    assert_eq!(config.output.mermaid_background, "white");
    assert_eq!(config.explainers.default, "key_components");
    assert_eq!(config.explainers.disabled, vec!["code_rap"]);
    assert_eq!(config.performance.request_timeout_seconds, 60);
    assert!(!config.performance.verbose_logging);
    assert!(config.source.respect_gitignore);
    assert!(!config.is_project_config);

    let renderer = config.renderer();
    assert_eq!(renderer.program(RenderEngine::Mermaid), "/opt/mermaid/bin/mmdc");
    assert_eq!(renderer.program(RenderEngine::Graphviz), "dot");
}

#[test]
fn test_empty_file_gives_defaults() {
    let dir = source_tree(&[("config.toml", "")]);
    let config = Config::load_from(&dir.path().join("config.toml")).expect("load");
    assert_eq!(config.default_provider, Provider::Ollama);
    assert_eq!(config.model_for(Provider::Ollama), "llama3");
    assert_eq!(config.model_for(Provider::Gemini), "gemini-1.5-flash");
    assert_eq!(config.performance.request_timeout_seconds, 300);
    assert_eq!(config.explainers.default, "simple_summary");
}

#[test]
fn test_invalid_toml_is_reported_with_path() {
    let dir = source_tree(&[("config.toml", "default_provider = [unclosed")]);
    let err = Config::load_from(&dir.path().join("config.toml")).expect_err("invalid");
    assert!(format!("{err:#}").contains("config.toml"));
}

#[test]
fn test_project_config_never_supplies_api_keys() {
    let dir = source_tree(&[(
        PROJECT_CONFIG_FILENAME,
        r#"
[providers.gemini]
api_key = "leaked-key"
model = "gemini-1.5-flash-8b"

[source]
extensions = ["py"]
excluded_dirs = ["venv"]
"#,
    )]);

    let mut config = Config::default();
    config.update(Some(Provider::Gemini), Some("personal-key".to_string()), None, None);

    let project = Config::load_project_config(dir.path())
        .expect("load")
        .expect("project file exists");
    assert!(project.is_project_config);
    config.merge_with_project_config(project);

    let gemini = config.provider_config(Provider::Gemini);
    assert_eq!(gemini.api_key, "personal-key");
    assert_eq!(gemini.model, "gemini-1.5-flash-8b");
    assert_eq!(config.source.extensions, vec!["py"]);
    assert_eq!(config.source.excluded_dirs, vec!["venv"]);
    assert_eq!(config.default_provider, Provider::Gemini);
}

#[test]
fn test_missing_project_config_is_none() {
    let dir = source_tree(&[]);
    assert!(
        Config::load_project_config(dir.path())
            .expect("load")
            .is_none()
    );
}

#[test]
fn test_save_to_round_trips_through_toml() {
    let dir = source_tree(&[]);
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.update(
        Some(Provider::Ollama),
        None,
        Some("qwen2.5-coder".to_string()),
        Some("http://10.0.0.5:11434".to_string()),
    );
    config.output.image_format = ImageFormat::Pdf;
    config.save_to(&path).expect("save");

    let written = std::fs::read_to_string(&path).expect("read back");
    assert!(written.contains("qwen2.5-coder"));
    assert!(!written.contains("api_key"));

    let loaded = Config::load_from(&path).expect("load");
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_project_file_keeps_personal_fields() {
    let dir = source_tree(&[
        ("config.toml", PERSONAL),
        (
            PROJECT_CONFIG_FILENAME,
            r#"
[output]
directory = "docs/diagrams"

[explainers]
disabled = ["metaphor_analogy"]

[performance]
verbose_logging = true
"#,
        ),
    ]);

    let mut config = Config::load_from(&dir.path().join("config.toml")).expect("load");
    let project = Config::load_project_config(dir.path())
        .expect("load")
        .expect("project file exists");
    config.merge_with_project_config(project);

    assert_eq!(config.output.directory, PathBuf::from("docs/diagrams"));
    assert_eq!(config.output.image_format, ImageFormat::Svg);
    assert_eq!(
        config.output.mermaid_command.as_deref(),
        Some("/opt/mermaid/bin/mmdc")
    );
    assert_eq!(config.explainers.default, "key_components");
    assert_eq!(config.explainers.disabled, vec!["metaphor_analogy"]);
    assert_eq!(config.performance.request_timeout_seconds, 60);
    assert!(config.performance.verbose_logging);
    assert_eq!(config.model_for(Provider::Gemini), "gemini-1.5-pro");
}

#[test]
#[serial]
fn test_config_command_never_saves_project_settings() {
    let project = source_tree(&[(
        PROJECT_CONFIG_FILENAME,
        r#"
[providers.ollama]
model = "project-only-model"

[output]
directory = "project_out"
"#,
    )]);
    let personal_dir = source_tree(&[("config.toml", PERSONAL)]);
    let personal = personal_dir.path().join("config.toml");

    let previous = std::env::current_dir().expect("cwd");
    std::env::set_current_dir(project.path()).expect("enter project");
    let params = ProviderParams {
        provider: Some("ollama".to_string()),
        api_key: Some("k".to_string()),
        ..ProviderParams::default()
    };
    let outcome = update_personal_config(&personal, &params, None);
    std::env::set_current_dir(previous).expect("restore cwd");

    let (config, changed) = outcome.expect("update");
    assert!(changed);
    assert_eq!(config.default_provider, Provider::Ollama);

    let written = std::fs::read_to_string(&personal).expect("read back");
    assert!(!written.contains("project-only-model"));
    assert!(!written.contains("project_out"));

    let saved = Config::load_from(&personal).expect("reload");
    assert_eq!(saved.model_for(Provider::Ollama), "codellama");
    assert_eq!(saved.output.directory, PathBuf::from("diagrams"));
    assert_eq!(saved.provider_config(Provider::Ollama).api_key, "k");
}

#[test]
fn test_config_command_starts_from_defaults_without_personal_file() {
    let dir = source_tree(&[]);
    let path = dir.path().join("config.toml");
    let params = ProviderParams {
        model: Some("llama3.1".to_string()),
        ..ProviderParams::default()
    };

    let (config, changed) = update_personal_config(&path, &params, None).expect("update");
    assert!(changed);
    assert_eq!(config.model_for(Provider::Ollama), "llama3.1");
    assert_eq!(Config::load_from(&path).expect("saved"), config);
}
