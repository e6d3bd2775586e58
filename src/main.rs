use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parley::{builtin_toolkit, repl, Agent, AgentConfig, OpenAIClient, ToolRouter};

#[derive(Parser)]
#[command(name = "parley")]
#[command(author, version, about = "Chat with a language model that can answer with built-in tools", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model to use (overrides config and PARLEY_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Number of prior memory entries sent to the model
    #[arg(long)]
    history: Option<usize>,

    /// Let the model think about each request before answering
    #[arg(long)]
    reflect: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "parley=debug" } else { "parley=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = AgentConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(model) = cli.model {
        config.model.model = model;
    }
    if let Some(history) = cli.history {
        config.agent.history_window = history;
    }
    if cli.reflect {
        config.agent.reflect = true;
    }

    let model = Arc::new(OpenAIClient::from_config(&config.model)?);
    tracing::info!(model = model.model(), "starting agent");
    let mut agent = Agent::new(config, model)?
        .with_tools(builtin_toolkit()?)
        .with_router(ToolRouter::builtin()?);

    let mut stdout = tokio::io::stdout();
    repl::write_banner(&agent, &mut stdout).await?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    repl::run(&mut agent, stdin, &mut stdout).await?;
    Ok(())
}
