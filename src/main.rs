use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adaptive_reasoning::{
    config::{Config, LogFormat},
    llm::ChatClient,
    reasoning::{ComplexityClassifier, KeywordClassifier, ReasoningMode, StrategyName},
    runner::{ReasoningRunner, RunnerSettings},
};

/// Adaptive reasoning-strategy runner
#[derive(Parser)]
#[command(name = "adaptive-reasoning", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a task through the adaptive reasoning loop
    Run {
        /// Task description
        task: String,

        /// Reasoning mode: adaptive, chain or tree
        #[arg(long, default_value = "adaptive")]
        mode: ReasoningMode,

        /// Start from this strategy instead of the complexity estimate
        #[arg(long)]
        strategy: Option<StrategyName>,

        /// Override the escalation budget
        #[arg(long)]
        max_escalations: Option<u32>,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the effective strategy catalog
    Strategies,

    /// Estimate task complexity and the starting strategy
    Classify {
        /// Task description
        task: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    match cli.command {
        Command::Run {
            task,
            mode,
            strategy,
            max_escalations,
            json,
        } => run_task(config, task, mode, strategy, max_escalations, json).await,
        Command::Strategies => {
            for strategy in config.catalog.iter() {
                println!(
                    "{:<16} iterations={:<3} temperature={:.1} timeout={}s  {}",
                    strategy.name,
                    strategy.max_iterations,
                    strategy.temperature,
                    strategy.timeout_seconds,
                    strategy.description
                );
            }
            Ok(())
        }
        Command::Classify { task } => {
            let level = KeywordClassifier::default().classify(&task);
            println!("complexity: {}", level);
            println!("strategy:   {}", level.initial_strategy());
            Ok(())
        }
    }
}

async fn run_task(
    config: Config,
    task: String,
    mode: ReasoningMode,
    strategy: Option<StrategyName>,
    max_escalations: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        model = %config.llm.model,
        "Adaptive reasoning runner starting..."
    );

    let client = match ChatClient::new(&config.llm, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.llm.base_url, "LLM client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize LLM client");
            return Err(e.into());
        }
    };

    let mut settings = RunnerSettings::from_config(&config).with_mode(mode);
    if let Some(strategy) = strategy {
        settings = settings.with_initial_strategy(strategy);
    }
    if let Some(max_escalations) = max_escalations {
        settings = settings.with_max_escalations(max_escalations);
    }

    let runner = ReasoningRunner::new(Arc::new(client), Arc::new(config.catalog), settings);
    let outcome = runner.run(&task).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.summary());
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
