use crate::commands;
use crate::common::{ProviderParams, image_format_parser};
use crate::config::Config;
use crate::explainers::{ExplanationResult, Requirements};
use crate::llm::ProviderClient;
use crate::log_debug;
use crate::orchestrator::{ExplainRequest, Explanation, Orchestrator, Stage};
use crate::providers::Provider;
use crate::registry::ExplainerRegistry;
use crate::render::ImageFormat;
use crate::ui;
use anyhow::{Context, Result, anyhow, bail};
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand, crate_version};
use colored::Colorize;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOG_FILE: &str = "code-explainer-debug.log";

/// CLI structure defining the available commands and global arguments
#[derive(Parser)]
#[command(
    author,
    version = crate_version!(),
    about = "Code Explainer: LLM-powered explanations and diagrams for source code",
    long_about = "Code Explainer reads a file or a directory tree, asks a local or hosted LLM to explain it, and reshapes that explanation into summaries, analogies, edge cases, gap analyses or rendered diagrams.",
    disable_version_flag = true,
    after_help = get_dynamic_help(),
    styles = get_styles(),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log debug messages to a file
    #[arg(
        short = 'l',
        long = "log",
        global = true,
        help = "Log debug messages to a file"
    )]
    pub log: bool,

    /// Specify a custom log file path
    #[arg(
        long = "log-file",
        global = true,
        help = "Specify a custom log file path"
    )]
    pub log_file: Option<String>,

    /// Suppress non-essential output (spinners, waiting messages, etc.)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress non-essential output"
    )]
    pub quiet: bool,

    /// Display the version
    #[arg(
        short = 'v',
        long = "version",
        global = true,
        help = "Display the version"
    )]
    pub version: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Explain a file or directory
    #[command(
        about = "Explain a source file or directory",
        long_about = "Generate a base explanation of the code at PATH, then run one explainer over it. Without --explainer an interactive terminal gets a numbered menu.",
        after_help = get_dynamic_help()
    )]
    Explain {
        /// File or directory to explain
        path: PathBuf,

        #[command(flatten)]
        provider: ProviderParams,

        /// Explainer key (see `code-explainer list`)
        #[arg(short, long, help = "Explainer key (see `code-explainer list`)")]
        explainer: Option<String>,

        /// Requirements document for the functional gap analysis
        #[arg(long, help = "Requirements document for functional_gap_analysis")]
        requirements: Option<PathBuf>,

        /// Directory rendered diagrams are written to
        #[arg(long, help = "Directory rendered diagrams are written to")]
        output_dir: Option<PathBuf>,

        /// Image format for rendered diagrams
        #[arg(long, help = "Image format for rendered diagrams (png, svg, pdf)", value_parser = image_format_parser)]
        format: Option<ImageFormat>,

        /// Print the full result as JSON
        #[arg(long, help = "Print the full result as JSON")]
        json: bool,

        /// Skip printing the base explanation
        #[arg(long, help = "Skip printing the base explanation")]
        no_base: bool,
    },

    /// List the available explainers
    #[command(about = "List the available explainers")]
    List,

    /// Check providers and renderers
    #[command(
        about = "Check provider reachability and renderer availability",
        long_about = "Report whether Ollama answers, whether a Gemini API key is available, and whether the Graphviz and Mermaid executables are on PATH."
    )]
    Check {
        /// Ollama host to probe instead of the configured one
        #[arg(long, help = "Ollama host to probe instead of the configured one", value_parser = crate::common::host_parser)]
        host: Option<String>,
    },

    /// Configure providers and defaults
    #[command(about = "Configure Code Explainer settings and providers")]
    Config {
        #[command(flatten)]
        provider: ProviderParams,

        /// Set additional parameters for the specified provider
        #[arg(
            long,
            help = "Set additional parameters for the specified provider (key=value)"
        )]
        param: Option<Vec<String>>,
    },
}

/// Define custom styles for Clap
fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Magenta.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Blue.on_default().bold())
        .invalid(AnsiColor::Red.on_default().bold())
        .error(AnsiColor::Red.on_default().bold())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Generate dynamic help including available LLM providers
fn get_dynamic_help() -> String {
    let providers_list = Provider::all_names()
        .iter()
        .map(|p| format!("{}", p.bold()))
        .collect::<Vec<_>>()
        .join(" • ");

    format!("\nAvailable LLM Providers: {providers_list}")
}

/// Main function to parse arguments and handle the command
pub async fn main() -> Result<()> {
    let cli = parse_args();

    if cli.version {
        ui::print_version(crate_version!());
        return Ok(());
    }

    if cli.log {
        crate::logger::enable_logging();
        let log_file = cli.log_file.as_deref().unwrap_or(LOG_FILE);
        crate::logger::set_log_file(log_file)?;

        if let Ok(config) = Config::load() {
            crate::logger::set_verbose_logging(config.performance.verbose_logging);
        }
    } else {
        crate::logger::disable_logging();
    }

    if cli.quiet {
        ui::set_quiet_mode(true);
    }

    if let Some(command) = cli.command {
        handle_command(command).await
    } else {
        let _ = Cli::parse_from(["code-explainer", "--help"]);
        Ok(())
    }
}

/// Dispatch a parsed subcommand
pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Explain {
            path,
            provider,
            explainer,
            requirements,
            output_dir,
            format,
            json,
            no_base,
        } => {
            let options = ExplainArgs {
                path,
                explainer,
                requirements,
                output_dir,
                format,
                json,
                no_base,
            };
            handle_explain(&provider, options).await
        }
        Commands::List => {
            let config = Config::load()?;
            commands::handle_list_command(&ExplainerRegistry::builtin(&config));
            Ok(())
        }
        Commands::Check { host } => {
            let mut config = Config::load()?;
            if let Some(host) = host {
                ProviderParams {
                    provider: Some(Provider::Ollama.name().to_string()),
                    host: Some(host),
                    ..ProviderParams::default()
                }
                .apply_to_config(&mut config)?;
            }
            commands::handle_check_command(&config).await
        }
        Commands::Config { provider, param } => {
            commands::handle_config_command(&provider, param)
        }
    }
}

/// Options of the `explain` subcommand that are not provider selection
#[derive(Debug)]
struct ExplainArgs {
    path: PathBuf,
    explainer: Option<String>,
    requirements: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    format: Option<ImageFormat>,
    json: bool,
    no_base: bool,
}

async fn handle_explain(params: &ProviderParams, args: ExplainArgs) -> Result<()> {
    log_debug!("Handling 'explain' command with {:?}", args);
    if args.json {
        ui::set_quiet_mode(true);
    }

    let mut config = Config::load()?;
    let provider = params.apply_to_config(&mut config)?;

    let registry = Arc::new(ExplainerRegistry::builtin(&config));
    let explainer = match args.explainer {
        Some(key) => key,
        None => choose_explainer(&registry)?,
    };

    let requirements = args
        .requirements
        .as_deref()
        .map(read_requirements)
        .transpose()?;

    let client = Arc::new(ProviderClient::new(&config)?);
    let renderer = Arc::new(config.renderer());
    let orchestrator = Orchestrator::new(config, client, registry, renderer);

    let request = ExplainRequest {
        path: args.path,
        explainer,
        provider: Some(provider),
        model: params.model.clone(),
        credential: params.api_key.clone(),
        requirements,
        output_dir: args.output_dir,
        image_format: args.format,
    };

    let spinner = ui::create_spinner("Reading source...");
    let outcome = orchestrator
        .explain_with_progress(&request, |stage| {
            if let Some(message) = stage_message(stage) {
                spinner.set_message(message);
            }
        })
        .await;
    spinner.finish_and_clear();

    let explanation = outcome?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&explanation)?);
    } else {
        print_explanation(&explanation, &orchestrator, args.no_base);
    }

    if explanation.result.is_error() {
        bail!("Explainer '{}' did not produce a result", explanation.explainer);
    }
    Ok(())
}

fn stage_message(stage: Stage) -> Option<&'static str> {
    match stage {
        Stage::SourceLoaded => Some("Asking the model for a base explanation..."),
        Stage::BaseExplained => Some("Running the explainer..."),
        Stage::Formatted => Some("Finishing up..."),
        Stage::Idle | Stage::Done | Stage::Failed => None,
    }
}

fn print_explanation(explanation: &Explanation, orchestrator: &Orchestrator, no_base: bool) {
    if !no_base {
        ui::print_section("Base Explanation", explanation.base_explanation.trim());
        ui::print_newline();
    }

    let title = orchestrator
        .registry()
        .get(&explanation.explainer)
        .map_or_else(|| explanation.explainer.clone(), |e| e.display_name.clone());

    match &explanation.result {
        ExplanationResult::Text { content } => {
            ui::print_section(&title, content.trim());
        }
        ExplanationResult::Image { message, .. } => ui::print_success(message),
        ExplanationResult::Error { detail } => ui::print_error(detail),
    }
}

fn read_requirements(path: &Path) -> Result<Requirements> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read requirements file {}", path.display()))?;
    let label = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    Ok(Requirements { label, text })
}

/// Numbered menu on an interactive terminal, the default explainer otherwise
fn choose_explainer(registry: &ExplainerRegistry) -> Result<String> {
    let default_key = registry
        .default_key()
        .or_else(|| registry.keys().first().copied())
        .ok_or_else(|| anyhow!("No explainers are enabled"))?
        .to_string();

    let stdin = std::io::stdin();
    if !stdin.is_terminal() || ui::is_quiet_mode() {
        return Ok(default_key);
    }

    commands::handle_list_command(registry);
    loop {
        print!(
            "{} [{}]: ",
            "Choose an explainer by number or key".cyan().bold(),
            default_key
        );
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(default_key);
        }
        match resolve_choice(registry, line.trim()) {
            Some(key) => return Ok(key.unwrap_or_else(|| default_key.clone())),
            None => ui::print_warning(&format!("'{}' is not a listed explainer", line.trim())),
        }
    }
}

/// `Some(None)` keeps the default; `None` means the answer matched nothing
fn resolve_choice(registry: &ExplainerRegistry, answer: &str) -> Option<Option<String>> {
    if answer.is_empty() {
        return Some(None);
    }
    let entry = match answer.parse::<usize>() {
        Ok(number) => registry.by_number(number),
        Err(_) => registry.get(answer),
    }?;
    Some(Some(entry.key.clone()))
}
