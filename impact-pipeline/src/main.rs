//! Impact Pipeline CLI
//!
//! Runs one pipeline operation against the configured database and prints
//! the tagged result as JSON on stdout. Logs go to stderr.

use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use impact_metrics::AnalyticsPeriod;
use impact_pipeline::{ApiOutcome, Args, Command, Pipeline, PipelineConfig, PipelineError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    if args.command == Command::InitConfig {
        print!("{}", PipelineConfig::default().to_yaml()?);
        return Ok(());
    }

    let config = args.resolve_config()?;
    init_tracing(&config.general.log_level, args.log_json);

    info!(
        database = %config.database.path,
        scoring = config.scoring.enabled,
        "Starting impact pipeline"
    );

    let pipeline = match Pipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Failed to initialize pipeline: {}", e);
            return Err(e.into());
        }
    };

    let success = match &args.command {
        Command::Portfolio => emit(pipeline.portfolio_metrics().await)?,
        Command::Recalculate { venture: Some(id) } => emit(pipeline.recalculate_venture(id).await)?,
        Command::Recalculate { venture: None } => emit(pipeline.recalculate_all().await)?,
        Command::Analytics { period } => {
            emit(pipeline.analytics_overview(AnalyticsPeriod::from_param(period)).await)?
        }
        Command::Score { venture } => emit(pipeline.score_venture(venture).await)?,
        Command::Trends { venture } => emit(pipeline.metric_trends(venture.as_deref()).await)?,
        Command::InitConfig => true,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("impact_pipeline={},info", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Print the outcome as JSON; returns whether it was a success.
fn emit<T: Serialize>(result: Result<T, PipelineError>) -> anyhow::Result<bool> {
    let outcome = ApiOutcome::from(result);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(outcome.is_success())
}
