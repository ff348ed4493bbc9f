//! saas-orchestrator - Micro-SaaS Deployment Orchestrator
//!
//! Turns a declarative deployment request into a provisioned, monitored and
//! billed service instance, and runs the periodic operations around it.
//!
//! ## Features
//!
//! - Staged deploys: validation, provisioning, monitoring setup, finalization
//! - Structured outcomes naming the failing stage and reason
//! - Optional rollback of completed stages
//! - Concurrent batch deploys with per-name single-flight protection
//! - Health reports, billing cycles, alerts and a knowledge store
//!
//! ## Usage
//!
//! ```bash
//! # Deploy everything in a file
//! saas-orchestrator deploy services.yaml
//!
//! # Check health and export it as CSV
//! saas-orchestrator health --export health.csv
//!
//! # Run health checks and billing cycles until ctrl-c
//! saas-orchestrator run
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

mod adapters;
mod cli;
mod config;
mod deploy;
mod error;
mod gateway;
mod models;
mod output;
mod schedule;
mod utils;

use cli::Args;
use config::env::EnvConfig;
use config::AppConfig;
use deploy::BatchDeployer;
use output::{OutputFormat, ResultFormatter};
use schedule::Scheduler;
use utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    init_logger(LogLevel::resolve(args.verbose, env.log_level.as_deref()));

    let mut app_config = AppConfig::resolve(args.config.as_deref(), &env)?;

    match args.command {
        cli::Command::Deploy(deploy_args) => {
            run_deploy(&mut app_config, &env, deploy_args).await?;
        }
        cli::Command::Health(health_args) => {
            show_health(&app_config, &env, health_args).await?;
        }
        cli::Command::Subscriptions(format_args) => {
            let orchestrator = adapters::build_orchestrator(&app_config)?;
            let result = orchestrator.manage_subscriptions().await?;
            let formatter = formatter(&env, &format_args);
            println!("{}", formatter.format_subscriptions(&result));
        }
        cli::Command::Knowledge(knowledge_args) => {
            manage_knowledge(&app_config, knowledge_args).await?;
        }
        cli::Command::Alert(alert_args) => {
            let orchestrator = adapters::build_orchestrator(&app_config)?;
            orchestrator
                .trigger_alert(&alert_args.name, &alert_args.alert_type)
                .await?;
            println!(
                "✓ Alert '{}' raised for {}",
                alert_args.alert_type, alert_args.name
            );
        }
        cli::Command::Run(run_args) => {
            run_scheduler(&mut app_config, run_args).await?;
        }
        cli::Command::Config(config_args) => {
            manage_config(&app_config, config_args)?;
        }
    }

    Ok(())
}

fn formatter(env: &EnvConfig, args: &cli::FormatArgs) -> ResultFormatter {
    let name = args.format.clone().unwrap_or_else(|| env.format_or("table"));
    let format = OutputFormat::from_str(&name).unwrap_or_else(|| {
        warn!("Unknown output format '{}', using table", name);
        OutputFormat::Table
    });
    ResultFormatter::new(format)
}

async fn run_deploy(
    app_config: &mut AppConfig,
    env: &EnvConfig,
    args: cli::DeployArgs,
) -> Result<()> {
    if args.rollback {
        app_config.orchestrator.rollback_on_failure = true;
    }
    if let Some(secs) = args.stage_timeout {
        app_config.orchestrator.stage_timeout_secs = secs;
    }
    if let Some(n) = args.concurrent {
        app_config.orchestrator.max_concurrent = n;
    }
    app_config.validate()?;

    let requests = config::spec_file::load_requests(&args.file)?;
    if requests.is_empty() {
        anyhow::bail!("No deployments found in {}", args.file.display());
    }

    let orchestrator = Arc::new(adapters::build_orchestrator(app_config)?);
    let formatter = formatter(env, &args.output);

    info!(
        "Deploying {} service(s) from {}",
        requests.len(),
        args.file.display()
    );

    let all_succeeded = if let [request] = requests.as_slice() {
        let outcome = orchestrator.deploy(request).await;
        println!("{}", formatter.format_outcome(&outcome));
        outcome.succeeded()
    } else {
        let deployer = BatchDeployer::new(orchestrator, app_config.orchestrator.max_concurrent);
        let outcomes = deployer.deploy_all(&requests).await;
        let summary = BatchDeployer::summarize(&outcomes);
        println!("{}", formatter.format_batch(&outcomes, &summary));
        summary.all_succeeded()
    };

    if !all_succeeded {
        std::process::exit(1);
    }
    Ok(())
}

async fn show_health(app_config: &AppConfig, env: &EnvConfig, args: cli::HealthArgs) -> Result<()> {
    let orchestrator = adapters::build_orchestrator(app_config)?;
    let report = orchestrator.monitor_health().await?;

    println!("{}", formatter(env, &args.output).format_health(&report));

    if let Some(path) = &args.export {
        output::export_health_csv(path, &report)?;
    }

    if args.strict && !report.all_healthy() {
        std::process::exit(1);
    }
    Ok(())
}

async fn manage_knowledge(app_config: &AppConfig, args: cli::KnowledgeArgs) -> Result<()> {
    match args.action {
        cli::KnowledgeAction::Update { name, data, file } => {
            let data: Value = match (data, file) {
                (Some(inline), _) => {
                    serde_json::from_str(&inline).context("--data must be valid JSON")?
                }
                (None, Some(path)) => read_data_file(&path)?,
                (None, None) => anyhow::bail!("Provide --data or --file"),
            };

            let orchestrator = adapters::build_orchestrator(app_config)?;
            orchestrator.update_knowledge(&name, &data).await?;
            println!("✓ Knowledge entry updated: {name}");
        }

        cli::KnowledgeAction::Show { name, history } => {
            let store = adapters::knowledge_store(app_config);
            let entry = store
                .load(&name)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No knowledge entry for {name}"))?;

            if history {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&entry.current)?);
                println!(
                    "\nUpdated {} ({} revisions)",
                    entry.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    entry.history.len()
                );
            }
        }

        cli::KnowledgeAction::List => {
            let store = adapters::knowledge_store(app_config);
            let names = store.list().await?;
            if names.is_empty() {
                println!("No knowledge entries in {}", store.base_dir().display());
            }
            for name in names {
                println!("  {name}");
            }
        }
    }

    Ok(())
}

fn read_data_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = if config::is_yaml_file(path) {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML: {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON: {}", path.display()))?
    };
    Ok(value)
}

async fn run_scheduler(app_config: &mut AppConfig, args: cli::RunArgs) -> Result<()> {
    if let Some(secs) = args.health_interval {
        app_config.schedule.health_interval_secs = secs;
    }
    if let Some(secs) = args.billing_interval {
        app_config.schedule.billing_interval_secs = secs;
    }
    app_config.validate()?;

    let orchestrator = Arc::new(adapters::build_orchestrator(app_config)?);
    let scheduler = Scheduler::new(
        orchestrator,
        Duration::from_secs(app_config.schedule.health_interval_secs),
        Duration::from_secs(app_config.schedule.billing_interval_secs),
    )
    .with_max_cycles(args.cycles);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let stats = scheduler.run(shutdown_rx).await;
    println!(
        "Health checks: {} ({} failed), billing cycles: {} ({} failed)",
        stats.health_checks, stats.health_failures, stats.billing_cycles, stats.billing_failures
    );
    Ok(())
}

fn manage_config(app_config: &AppConfig, args: cli::ConfigArgs) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            if output.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    output.display()
                );
            }

            AppConfig::default().save(&output)?;
            println!("✓ Configuration file created: {}", output.display());
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { format, env } => {
            if env {
                EnvConfig::load().print_summary();
            } else {
                let output = if format == "json" {
                    serde_json::to_string_pretty(app_config)?
                } else {
                    serde_yaml::to_string(app_config)?
                };
                println!("{output}");
            }
        }

        cli::ConfigAction::Env => {
            config::env::print_env_help();
        }
    }

    Ok(())
}
