use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scout_core::{Agent, AgentConfig, AgentProgressHandler, Provider, ToolRegistry};
use scout_providers::GroqProvider;
use scout_tools::create_research_tools;

mod chat;
mod config;
mod session;
mod view;

use config::Config;
use session::{ResearchSession, RESEARCH_SYSTEM_PROMPT};

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "scout")]
#[command(author, version, about = "Scout: a research assistant in your terminal", long_about = None)]
pub struct Cli {
    /// Model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Temperature (0.0-2.0)
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Base URL for the API (overrides config)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Disable live progress output (thinking and tool activity)
    #[arg(long)]
    pub no_progress: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long)]
    pub debug: bool,

    /// Write logs to file (JSON-lines format) instead of stderr
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // --debug overrides --log-level
    let log_level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };

    let filter = EnvFilter::new(log_level.as_filter());

    if let Some(log_path) = &cli.log_file {
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = Config::load()?;

    // Resolve settings: CLI > config file
    let model = cli.model.clone().unwrap_or_else(|| config.model.clone());
    let temperature = cli.temperature.unwrap_or(config.temperature);
    let base_url = cli.base_url.clone().or_else(|| config.base_url.clone());

    // Refuse to start without a credential.
    let api_key = config.resolve_api_key()?;

    let mut provider = GroqProvider::new(api_key).with_default_model(model.as_str());
    if let Some(url) = base_url {
        provider = provider.with_base_url(url);
    }
    let provider: Arc<dyn Provider> = Arc::new(provider);

    let mut registry = ToolRegistry::new();
    for tool in create_research_tools(config.lookup.to_limits()) {
        registry.register(tool);
    }

    let agent = Agent::new(
        Arc::clone(&provider),
        Arc::new(registry),
        AgentConfig::new("research")
            .with_system_prompt(RESEARCH_SYSTEM_PROMPT)
            .with_temperature(temperature),
    );

    tracing::info!(
        model = %model,
        temperature,
        tools = ?agent.tool_names(),
        "Scout starting"
    );

    let session = ResearchSession::new(provider, Some(agent), model, temperature);

    // Live progress only makes sense on a terminal.
    let progress: Option<Arc<dyn AgentProgressHandler>> =
        if cli.no_progress || !atty::is(atty::Stream::Stdout) {
            None
        } else {
            Some(Arc::new(view::ConsoleProgress))
        };

    chat::run(session, progress).await
}
