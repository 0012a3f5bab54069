use crate::common::ProviderParams;
use crate::config::Config;
use crate::llm::ProviderClient;
use crate::log_debug;
use crate::providers::Provider;
use crate::registry::ExplainerRegistry;
use crate::render::RenderEngine;
use crate::ui::{self, rgb};
use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Handle the 'config' command
pub fn handle_config_command(params: &ProviderParams, param: Option<Vec<String>>) -> Result<()> {
    log_debug!(
        "Starting 'config' command with provider: {:?}, model: {:?}, host: {:?}, param: {:?}",
        params.provider,
        params.model,
        params.host,
        param
    );

    let (config, changes_made) =
        update_personal_config(&Config::get_config_path()?, params, param)?;

    if changes_made {
        ui::print_success("Configuration updated successfully.");
        ui::print_newline();
    }

    print_configuration(&config);
    Ok(())
}

/// Apply changes to the personal config at `path` and save it when anything changed.
/// Project files are never read here, so their settings cannot leak into the personal file.
pub fn update_personal_config(
    path: &Path,
    params: &ProviderParams,
    param: Option<Vec<String>>,
) -> Result<(Config, bool)> {
    let mut config = Config::load_personal_from(path)?;
    let changes_made = apply_config_changes(&mut config, params, param)?;
    if changes_made {
        config.save_to(path)?;
    }
    Ok((config, changes_made))
}

fn apply_config_changes(
    config: &mut Config,
    params: &ProviderParams,
    param: Option<Vec<String>>,
) -> Result<bool> {
    let before = config.clone();
    config.update(
        params.provider()?,
        params.api_key.clone(),
        params.model.clone(),
        params.host.clone(),
    );

    if let Some(params) = param {
        let additional_params = parse_additional_params(&params);
        let provider = config.default_provider;
        config
            .providers
            .entry(provider.name().to_string())
            .or_default()
            .additional_params
            .extend(additional_params);
    }

    Ok(*config != before)
}

/// Handle the 'list' command
pub fn handle_list_command(registry: &ExplainerRegistry) {
    println!();
    println!(
        "{}",
        ui::create_gradient_text("Available explainers").bold()
    );
    println!();

    let (r, g, b) = rgb::NEON_CYAN;
    for (index, entry) in registry.catalog().iter().enumerate() {
        let marker = if registry.default_key() == Some(entry.key.as_str()) {
            " ✦"
        } else {
            ""
        };
        let requirement = entry
            .renderer
            .map(|engine| format!("  (needs {engine})"))
            .unwrap_or_default();
        println!(
            "  {:>2}. {}{}  {}{}",
            index + 1,
            entry.display_name.truecolor(r, g, b).bold(),
            marker,
            ui::dim(&entry.key),
            ui::create_secondary_gradient_text(&requirement)
        );
    }
    println!();
}

/// Handle the 'check' command: report what a run would need
pub async fn handle_check_command(config: &Config) -> Result<()> {
    print_section_header("PROVIDERS");

    let ollama_host = config
        .provider_config(Provider::Ollama)
        .effective_host(Provider::Ollama);
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .context("Failed to build HTTP client")?;
    match http.get(format!("{ollama_host}/api/tags")).send().await {
        Ok(response) if response.status().is_success() => {
            print_status_row("Ollama", true, &format!("reachable at {ollama_host}"));
        }
        Ok(response) => print_status_row(
            "Ollama",
            false,
            &format!("{ollama_host} answered HTTP {}", response.status()),
        ),
        Err(e) => {
            log_debug!("Ollama check failed: {}", e);
            print_status_row("Ollama", false, &format!("not reachable at {ollama_host}"));
        }
    }

    let client = ProviderClient::new(config)?;
    match client.resolve_credential(Provider::Gemini, None) {
        Ok(_) => print_status_row("Gemini", true, "API key found"),
        Err(e) => print_status_row("Gemini", false, &e.to_string()),
    }

    println!();
    print_section_header("RENDERERS");
    let renderer = config.renderer();
    for engine in RenderEngine::ALL {
        match renderer.locate(*engine) {
            Ok(path) => print_status_row(engine.name(), true, &path.display().to_string()),
            Err(e) => print_status_row(engine.name(), false, &e.to_string()),
        }
    }
    println!();

    Ok(())
}

fn print_status_row(label: &str, ok: bool, detail: &str) {
    let mark = if ok { "✓".green().bold() } else { "✗".red().bold() };
    println!("  {mark} {:<10} {}", label, ui::dim(detail));
}

/// Display the current configuration
fn print_configuration(config: &Config) {
    let (pr, pg, pb) = rgb::ELECTRIC_PURPLE;
    let cyan = rgb::NEON_CYAN;
    let coral = rgb::CORAL;
    let yellow = rgb::ELECTRIC_YELLOW;

    println!();
    println!(
        "{}  {}  {}",
        "━━━".truecolor(pr, pg, pb),
        "CODE EXPLAINER CONFIGURATION"
            .truecolor(cyan.0, cyan.1, cyan.2)
            .bold(),
        "━━━".truecolor(pr, pg, pb)
    );
    println!();

    print_section_header("GLOBAL");
    print_config_row("Provider", config.default_provider.name(), cyan, true);
    print_config_row("Explainer", &config.explainers.default, yellow, false);
    if !config.explainers.disabled.is_empty() {
        print_config_row("Disabled", &config.explainers.disabled.join(", "), coral, false);
    }
    print_config_row(
        "Timeout",
        &format!("{}s", config.performance.request_timeout_seconds),
        coral,
        false,
    );

    println!();
    print_section_header("OUTPUT");
    print_config_row(
        "Directory",
        &config.output.directory.display().to_string(),
        cyan,
        false,
    );
    print_config_row("Format", config.output.image_format.extension(), yellow, false);
    let renderer = config.renderer();
    for engine in RenderEngine::ALL {
        print_config_row(engine.name(), renderer.program(*engine), cyan, false);
    }

    let mut providers: Vec<_> = config.providers.iter().collect();
    providers.sort_by_key(|(name, _)| name.as_str());

    for (provider_name, provider_config) in providers {
        let Ok(provider) = provider_name.parse::<Provider>() else {
            continue;
        };
        println!();
        let header = if provider == config.default_provider {
            format!("{} ✦", provider_name.to_uppercase())
        } else {
            provider_name.to_uppercase()
        };
        print_section_header(&header);

        print_config_row("Model", provider_config.effective_model(provider), cyan, true);
        print_config_row("Host", &provider_config.effective_host(provider), cyan, false);
        if provider.requires_api_key() {
            let key_state = if provider_config.has_api_key() {
                "configured"
            } else {
                "not set"
            };
            print_config_row("API Key", key_state, coral, false);
        }

        if !provider_config.additional_params.is_empty() {
            let mut params: Vec<_> = provider_config.additional_params.iter().collect();
            params.sort();
            println!("  {} {}", ui::dim("Params"), ui::dim("─"));
            for (key, value) in params {
                println!(
                    "    {} {} {}",
                    key.truecolor(cyan.0, cyan.1, cyan.2),
                    ui::dim("→"),
                    ui::dim(value)
                );
            }
        }
    }

    println!();
    println!("{}", ui::dim(&"─".repeat(40)));
    println!();
}

fn print_section_header(name: &str) {
    let (r, g, b) = rgb::ELECTRIC_PURPLE;
    println!(
        "{} {} {}",
        "─".truecolor(r, g, b),
        name.truecolor(r, g, b).bold(),
        ui::dim(&"─".repeat(30 - name.len().min(28)))
    );
}

fn print_config_row(label: &str, value: &str, value_color: (u8, u8, u8), highlight: bool) {
    let label_styled = ui::dim(&format!("{label:>12}"));
    let value_styled = if highlight {
        value
            .truecolor(value_color.0, value_color.1, value_color.2)
            .bold()
    } else {
        value.truecolor(value_color.0, value_color.1, value_color.2)
    };
    println!("{label_styled}  {value_styled}");
}

/// Parse `key=value` parameters from the command line
fn parse_additional_params(params: &[String]) -> HashMap<String, String> {
    params
        .iter()
        .filter_map(|param| {
            param
                .split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
