//! # gitpilot CLI
//!
//! Interactive assistant that edits and commits files in the current git
//! repository, driven by a local Ollama model.
//!
//! Usage:
//!   gitpilot
//!   gitpilot --model llama3.1 --style tools
//!   gitpilot --repo ../other-project -v
//!
//! Every flag can also be set through its `GITPILOT_*` environment variable.

mod logging;

use clap::{Parser, ValueEnum};
use gitpilot_agent::{Agent, AgentConfig, AgentStyle, Session};
use gitpilot_core::provider::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use gitpilot_core::{
    ActionKind, ActionRegistry, ErrorKind, OllamaProvider, ProviderConfig, Workspace,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gitpilot")]
#[command(author, version, about = "gitpilot - a local AI assistant for your git repository")]
struct Cli {
    /// Model to use for completions
    #[arg(short, long, env = "GITPILOT_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the Ollama server
    #[arg(long, env = "GITPILOT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// How the model selects actions
    #[arg(long, env = "GITPILOT_STYLE", value_enum, default_value_t = Style::React)]
    style: Style,

    /// Maximum model calls per request
    #[arg(long, env = "GITPILOT_MAX_STEPS", default_value_t = 15)]
    max_steps: usize,

    /// Request timeout in seconds (default: wait indefinitely)
    #[arg(long, env = "GITPILOT_TIMEOUT")]
    timeout: Option<u64>,

    /// Repository to work in (default: current directory)
    #[arg(long)]
    repo: Option<PathBuf>,

    /// Only offer write_file and commit_changes to the model
    #[arg(long)]
    no_read_file: bool,

    /// Print each thought, action and observation as it happens
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Style {
    /// Text protocol (Thought / Action / Action Input), works with any model
    React,
    /// Structured tool calls, needs a model with tool support
    Tools,
}

impl From<Style> for AgentStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::React => AgentStyle::React,
            Style::Tools => AgentStyle::ToolCalls,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let dir = match &cli.repo {
        Some(dir) => dir.clone(),
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("Error: cannot read current directory: {}", e);
                std::process::exit(1);
            }
        },
    };

    let workspace = match Workspace::open(&dir) {
        Ok(workspace) => workspace,
        Err(e) if e.kind() == ErrorKind::NotAWorkingTree => {
            eprintln!(
                "Error: Current directory is not a Git repository. \
                 Please run this inside a Git repository."
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(root = %workspace.root().display(), "bound working tree");

    let registry = if cli.no_read_file {
        ActionRegistry::with_actions(
            workspace,
            &[ActionKind::WriteFile, ActionKind::CommitChanges],
        )
    } else {
        ActionRegistry::new(workspace)
    };

    let mut provider_config = ProviderConfig::ollama()
        .with_base_url(&cli.base_url)
        .with_model(&cli.model);
    if let Some(secs) = cli.timeout {
        provider_config = provider_config.with_timeout(secs);
    }
    let provider = match OllamaProvider::new(provider_config) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    print_banner(&cli, registry.workspace().root().display().to_string());
    check_backend(&provider, &cli.model).await;

    let config = AgentConfig {
        model: Some(cli.model.clone()),
        style: cli.style.into(),
        max_steps: cli.max_steps,
        verbose: cli.verbose,
        ..AgentConfig::default()
    };
    let mut session = Session::new(Agent::with_config(provider, registry, config));

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    if let Err(e) = session.run(stdin.lock(), stdout.lock()).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if cli.verbose {
        let usage = session.agent().usage();
        println!(
            "Model calls: {}, tokens: {} ({} prompt / {} completion)",
            usage.total_calls,
            usage.total_tokens(),
            usage.total_prompt_tokens,
            usage.total_completion_tokens
        );
    }
}

fn print_banner(cli: &Cli, root: String) {
    println!("Git AI Assistant");
    println!("Repository: {}", root);
    println!("Model: {} ({:?} style)", cli.model, cli.style);
    println!("Make sure Ollama is running at {}", cli.base_url);
    println!("Type 'exit' to quit");
}

/// Best-effort reachability check; the session starts either way.
async fn check_backend(provider: &OllamaProvider, model: &str) {
    match provider.health_check().await {
        Ok(true) => {}
        Ok(false) => {
            println!(
                "Tip: Ollama at {} answered with an error. Is it healthy?",
                provider.config().base_url
            );
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            println!(
                "Tip: could not reach Ollama at {}. Start it with `ollama serve`.",
                provider.config().base_url
            );
            return;
        }
    }

    match provider.list_models().await {
        Ok(models) => {
            let pulled = models.iter().any(|m| {
                m == model || m.strip_prefix(model).is_some_and(|tag| tag.starts_with(':'))
            });
            if !pulled {
                println!(
                    "Tip: model '{}' is not pulled yet. Run `ollama pull {}`.",
                    model, model
                );
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not list models"),
    }
}
