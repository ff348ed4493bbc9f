//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Micro-SaaS deployment orchestrator
#[derive(Parser, Debug)]
#[command(name = "saas-orchestrator")]
#[command(version)]
#[command(about = "Provision, monitor and bill hosted service deployments")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy services described in a YAML or JSON file
    Deploy(DeployArgs),

    /// Show the health of all deployments
    Health(HealthArgs),

    /// Run one billing cycle (invoices, then renewals)
    Subscriptions(FormatArgs),

    /// Read and write per-deployment metadata
    Knowledge(KnowledgeArgs),

    /// Raise an alert for a deployment
    Alert(AlertArgs),

    /// Run health checks and billing cycles periodically
    Run(RunArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Shared output format option
#[derive(Parser, Debug)]
pub struct FormatArgs {
    /// Output format (table, json, json-pretty, summary)
    #[arg(short, long)]
    pub format: Option<String>,
}

/// Arguments for deploy command
#[derive(Parser, Debug)]
pub struct DeployArgs {
    /// Deployment file: one mapping, a list, or a `deployments` list
    pub file: PathBuf,

    #[command(flatten)]
    pub output: FormatArgs,

    /// Maximum deployments running at once
    #[arg(long)]
    pub concurrent: Option<usize>,

    /// Undo completed stages when a later one fails
    #[arg(long)]
    pub rollback: bool,

    /// Timeout per stage in seconds
    #[arg(long)]
    pub stage_timeout: Option<u64>,
}

/// Arguments for health command
#[derive(Parser, Debug)]
pub struct HealthArgs {
    #[command(flatten)]
    pub output: FormatArgs,

    /// Also write the report as CSV
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// Exit with an error unless every deployment is healthy
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for knowledge command
#[derive(Parser, Debug)]
pub struct KnowledgeArgs {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Record metadata for a deployment
    Update {
        /// Deployment name
        name: String,

        /// Inline JSON data
        #[arg(short, long, conflicts_with = "file")]
        data: Option<String>,

        /// Read data from a JSON or YAML file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show the stored entry for a deployment
    Show {
        /// Deployment name
        name: String,

        /// Include revision history
        #[arg(long)]
        history: bool,
    },

    /// List deployments with stored entries
    List,
}

/// Arguments for alert command
#[derive(Parser, Debug)]
pub struct AlertArgs {
    /// Deployment name
    pub name: String,

    /// Alert type
    #[arg(short = 't', long = "type", default_value = "manual")]
    pub alert_type: String,
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Seconds between health checks
    #[arg(long)]
    pub health_interval: Option<u64>,

    /// Seconds between billing cycles
    #[arg(long)]
    pub billing_interval: Option<u64>,

    /// Stop after each job has run this many times
    #[arg(long)]
    pub cycles: Option<u64>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a configuration file with default values
    Init {
        /// Output file path
        #[arg(short, long, default_value = "./saas-orchestrator.yaml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Show environment variable overrides instead
        #[arg(short, long)]
        env: bool,
    },

    /// List supported environment variables
    Env,
}
