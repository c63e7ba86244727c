//! lakeflow - Lakehouse ETL Orchestrator
//!
//! CLI entry point for running the daily pipeline and the incremental sync.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use lakeflow::cli::{Cli, Command, OutputFormat};
use lakeflow::config::Config;
use lakeflow::ingest::{AirbyteClient, HealthProbe};
use lakeflow::pipeline::{PipelineError, PipelineOrchestrator};
use lakeflow::{PipelineRun, PipelineRunStatus, StepStatus};

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, to_stderr: bool) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if to_stderr {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        let log_path = lakeflow::cli::get_log_path();
        let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&log_dir).context("Failed to create log directory")?;
        let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref(), cli.stderr)
        .context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(sources = config.ingestion.sources.len(), steps = config.transform.steps.len(), "lakeflow loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            no_ingestion,
            no_transformations,
            sources,
            format,
        } => {
            debug!(no_ingestion, no_transformations, ?sources, ?format, "main: matched Run command");
            let config = apply_run_overrides(config, no_ingestion, no_transformations, sources);
            cmd_run(&config, format).await
        }
        Command::Incremental { format } => {
            debug!(?format, "main: matched Incremental command");
            cmd_incremental(&config, format).await
        }
        Command::Health => {
            debug!("main: matched Health command");
            cmd_health(&config).await
        }
        Command::Config => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
        Command::Steps => {
            debug!("main: matched Steps command");
            cmd_steps(&config);
            Ok(())
        }
    }
}

fn apply_run_overrides(mut config: Config, no_ingestion: bool, no_transformations: bool, sources: Vec<String>) -> Config {
    if no_ingestion {
        config.pipeline.run_ingestion = false;
    }
    if no_transformations {
        config.pipeline.run_transformations = false;
    }
    if !sources.is_empty() {
        config.ingestion.sources = sources;
    }
    config
}

/// Build the orchestrator and cancel its in-flight polling on Ctrl-C
fn build_orchestrator(config: &Config) -> Result<PipelineOrchestrator> {
    config.validate().context("Invalid configuration")?;
    let orchestrator = PipelineOrchestrator::from_config(config).context("Failed to build pipeline")?;

    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling pipeline");
            cancel.cancel();
        }
    });
    Ok(orchestrator)
}

/// Run the daily pipeline
async fn cmd_run(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_run: called");
    let orchestrator = build_orchestrator(config)?;
    report(orchestrator.run().await, format)
}

/// Run the incremental sync
async fn cmd_incremental(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_incremental: called");
    let orchestrator = build_orchestrator(config)?;
    report(orchestrator.run_incremental().await, format)
}

/// Print the run record, then surface a failure as the process exit status
fn report(outcome: Result<PipelineRun, PipelineError>, format: OutputFormat) -> Result<()> {
    let run = match &outcome {
        Ok(run) => run,
        Err(e) => e.run.as_ref(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(run)?),
        OutputFormat::Text => print_run(run),
    }

    outcome.map(|_| ()).map_err(eyre::Report::new)
}

fn print_run(run: &PipelineRun) {
    let status = match run.status {
        PipelineRunStatus::Succeeded => run.status.to_string().green().bold(),
        PipelineRunStatus::Failed => run.status.to_string().red().bold(),
        PipelineRunStatus::Running => run.status.to_string().yellow(),
    };
    println!("Pipeline {} ({}): {}", run.kind.title(), run.id, status);
    println!("-----------------");

    if !run.ingestion_results.is_empty() || !run.failed_sources.is_empty() || !run.skipped_sources.is_empty() {
        println!("Ingestion:");
        for job in run.ingestion_results.iter().chain(run.failed_sources.iter()) {
            let label = if job.is_succeeded() {
                job.status.to_string().green()
            } else {
                job.status.to_string().red()
            };
            match &job.error {
                Some(e) => println!("  {:<40} {:<10} job {} ({})", job.source_id, label, job.job_id, e),
                None => println!("  {:<40} {:<10} job {}", job.source_id, label, job.job_id),
            }
        }
        for source in &run.skipped_sources {
            println!("  {:<40} {}", source, "skipped".yellow());
        }
    }

    if !run.transformation_results.is_empty() {
        println!("Transformations:");
        for step in &run.transformation_results {
            let label = match step.status {
                StepStatus::Succeeded => step.status.to_string().green(),
                StepStatus::Failed => step.status.to_string().red(),
            };
            println!("  {:<50} {}", step.command, label);
        }
    }

    if let Some(e) = &run.error {
        println!();
        println!("{} {}", "Error:".red().bold(), e);
    }
}

/// Probe the ingestion service
async fn cmd_health(config: &Config) -> Result<()> {
    debug!("cmd_health: called");
    let client = AirbyteClient::from_config(&config.ingestion).context("Failed to build ingestion client")?;
    match client.check().await {
        Ok(true) => {
            println!("{} {}", "available".green().bold(), client.base_url());
            Ok(())
        }
        Ok(false) => {
            println!("{} {}", "unavailable".red().bold(), client.base_url());
            Err(eyre::eyre!("Ingestion service reported unavailable"))
        }
        Err(e) => {
            println!("{} {}", "unreachable".red().bold(), client.base_url());
            Err(eyre::Report::new(e)).context("Health check failed")
        }
    }
}

/// Print the resolved configuration
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    print!("{}", yaml);
    Ok(())
}

/// List transform steps with their criticality
fn cmd_steps(config: &Config) {
    debug!("cmd_steps: called");
    println!("Transform steps ({}):", config.transform.project_dir.display());
    for (i, step) in config.transform.steps.iter().enumerate() {
        let marker = if step.critical { "critical".red().to_string() } else { String::new() };
        println!("  {:>2}. {:<50} {}", i + 1, step.command, marker);
    }
    println!();
    println!("Incremental steps:");
    for (i, step) in config.transform.incremental_steps.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, step.command);
    }
}
