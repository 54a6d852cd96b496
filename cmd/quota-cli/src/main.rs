use anyhow::Result;
use clap::{Parser, Subcommand};
use quota_optimizer::{CoveragePolicy, EngineConfig, OptimizationParams, OptimizerEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod utils;

use commands::*;
use config::CliConfig;

#[derive(Parser)]
#[command(
    name = "qopt",
    version,
    about = "Quota optimizer for AI workflows",
    long_about = "Finds and applies cost optimizations (batching, caching, vibe-to-spec, decomposition)\n\n\
                  Examples:\n  \
                  qopt optimize workflow.json --issues issues.json\n  \
                  qopt decompose workflow.json --output json\n  \
                  qopt list\n\n\
                  For more help: qopt help",
    after_help = "Use 'qopt <command> --help' for more information about a command."
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    output: OutputFormat,

    /// Log level for stderr logging
    #[arg(long, global = true, env = "QOPT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Handling of optimizations naming steps removed by an earlier merge
    /// (lenient, warn, strict)
    #[arg(long, global = true, env = "QOPT_COVERAGE_POLICY")]
    coverage_policy: Option<CoveragePolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Compact,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify and apply optimizations to a workflow
    ///
    /// Examples:
    ///   qopt optimize workflow.json
    ///   qopt optimize workflow.json --issues analysis.json --params params.json
    Optimize {
        /// Path to workflow JSON file
        workflow: String,

        /// Issue array or analysis object JSON file
        #[arg(long)]
        issues: Option<String>,

        /// Tuning parameters JSON file (overrides QOPT_* defaults)
        #[arg(long)]
        params: Option<String>,
    },

    /// List optimization opportunities without applying them
    Identify {
        /// Path to workflow JSON file
        workflow: String,

        /// Issue array or analysis object JSON file
        #[arg(long)]
        issues: Option<String>,

        /// Tuning parameters JSON file (overrides QOPT_* defaults)
        #[arg(long)]
        params: Option<String>,
    },

    /// Group similar steps into batches
    Batch {
        /// Path to workflow JSON file
        workflow: String,
    },

    /// Plan cache points for deterministic steps
    Cache {
        /// Path to workflow JSON file
        workflow: String,
    },

    /// Split a workflow into smaller specs
    Decompose {
        /// Path to workflow JSON file
        workflow: String,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        workflow: String,
    },

    /// List registered optimizers
    List,
}

/// Log to stderr so stdout stays machine-readable
fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("quota_optimizer={0},qopt={0}", config.log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn resolve_params(path: Option<&str>, config: &CliConfig) -> Result<Option<OptimizationParams>> {
    match path {
        Some(path) => Ok(Some(utils::load_json(path)?)),
        None => Ok(config.engine_params()),
    }
}

fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = CliConfig::load_from_env()?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(policy) = cli.coverage_policy {
        config.coverage_policy = policy;
    }
    let config = config.validate()?;

    init_tracing(&config);
    tracing::debug!(coverage_policy = %config.coverage_policy, "Starting qopt");

    let engine = OptimizerEngine::with_config(EngineConfig {
        coverage_policy: config.coverage_policy,
    });

    match cli.command {
        Commands::Optimize { workflow, issues, params } => {
            let params = resolve_params(params.as_deref(), &config)?;
            optimize::handle_optimize(&engine, &workflow, issues.as_deref(), params, &cli.output)?
        }
        Commands::Identify { workflow, issues, params } => {
            let params = resolve_params(params.as_deref(), &config)?;
            optimize::handle_identify(&engine, &workflow, issues.as_deref(), params, &cli.output)?
        }
        Commands::Batch { workflow } => plan::handle_batch(&engine, &workflow, &cli.output)?,
        Commands::Cache { workflow } => plan::handle_cache(&engine, &workflow, &cli.output)?,
        Commands::Decompose { workflow } => plan::handle_decompose(&engine, &workflow, &cli.output)?,
        Commands::Validate { workflow: path } => workflow::handle_validate(&path, &cli.output)?,
        Commands::List => workflow::handle_list(&engine, &cli.output)?,
    }

    Ok(())
}
