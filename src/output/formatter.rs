//! Output formatters for orchestrator results
//!
//! Provides JSON, Table, and summary output formats.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::deploy::BatchSummary;
use crate::models::{DeploymentOutcome, HealthReport, HealthState, SubscriptionCycleResult};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn json<T: Serialize + ?Sized>(&self, value: &T) -> String {
        if self.format == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.colorize {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn status_label(&self, succeeded: bool) -> String {
        if succeeded {
            self.paint("✓ OK", "32")
        } else {
            self.paint("✗ FAILED", "31")
        }
    }

    /// Format a single deploy outcome
    pub fn format_outcome(&self, outcome: &DeploymentOutcome) -> String {
        match self.format {
            OutputFormat::Table => self.format_outcome_table(outcome),
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(outcome),
            OutputFormat::Summary => self.format_outcome_line(outcome),
        }
    }

    fn format_outcome_line(&self, outcome: &DeploymentOutcome) -> String {
        match outcome.failure() {
            None => format!(
                "{} {} ({}ms)",
                self.status_label(true),
                outcome.display_name(),
                outcome.duration_ms
            ),
            Some(failure) => format!(
                "{} {}: {} ({}ms)",
                self.status_label(false),
                outcome.display_name(),
                failure,
                outcome.duration_ms
            ),
        }
    }

    fn format_outcome_table(&self, outcome: &DeploymentOutcome) -> String {
        let mut output = String::new();

        output.push_str("\n═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            " Deployment: {}  {}\n",
            outcome.display_name(),
            self.status_label(outcome.succeeded())
        ));
        output.push_str("═══════════════════════════════════════════════════════════════\n");

        for record in &outcome.stages {
            let mark = if record.succeeded {
                self.paint("✓", "32")
            } else {
                self.paint("✗", "31")
            };
            output.push_str(&format!(
                " {} {:20} [{:>6}ms]\n",
                mark,
                record.stage.name(),
                record.duration_ms
            ));
        }

        if let Some(failure) = outcome.failure() {
            output.push_str(" ───────────────────────────────────────────────────────────\n");
            output.push_str(&format!(" Failed at: {}\n", failure.stage));
            output.push_str(&format!(" Reason:    {}\n", failure.reason));
        }

        if !outcome.compensations.is_empty() {
            output.push_str(" ───────────────────────────────────────────────────────────\n");
            output.push_str(" Rollback:\n");
            for comp in &outcome.compensations {
                match &comp.error {
                    None => output.push_str(&format!("   - {} undone\n", comp.stage.name())),
                    Some(err) => output.push_str(&format!(
                        "   - {} {}\n",
                        comp.stage.name(),
                        self.paint(&format!("not undone: {err}"), "33")
                    )),
                }
            }
        }

        output.push_str(&format!(" Duration: {}ms\n", outcome.duration_ms));
        output
    }

    /// Format a batch of outcomes with its summary
    pub fn format_batch(&self, outcomes: &[DeploymentOutcome], summary: &BatchSummary) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                #[derive(Serialize)]
                struct BatchJson<'a> {
                    total: usize,
                    succeeded: usize,
                    failed: usize,
                    outcomes: &'a [DeploymentOutcome],
                }

                self.json(&BatchJson {
                    total: summary.total,
                    succeeded: summary.succeeded,
                    failed: summary.failed,
                    outcomes,
                })
            }
            OutputFormat::Summary => {
                let mut output: Vec<String> = outcomes
                    .iter()
                    .map(|o| self.format_outcome_line(o))
                    .collect();
                output.push(self.format_batch_line(summary));
                output.join("\n")
            }
            OutputFormat::Table => self.format_batch_table(outcomes, summary),
        }
    }

    fn format_batch_line(&self, summary: &BatchSummary) -> String {
        format!(
            "{}/{} deployments succeeded",
            summary.succeeded, summary.total
        )
    }

    fn format_batch_table(&self, outcomes: &[DeploymentOutcome], summary: &BatchSummary) -> String {
        let mut output = String::new();

        output.push_str(
            "\n┌─────────────────────────┬────────────┬──────────────────┬───────────────┐\n",
        );
        output.push_str(
            "│ Deployment              │ Status     │ Failed Stage     │ Duration      │\n",
        );
        output.push_str(
            "├─────────────────────────┼────────────┼──────────────────┼───────────────┤\n",
        );

        for outcome in outcomes {
            let status = if outcome.succeeded() {
                self.paint(&format!("{:10}", "succeeded"), "32")
            } else {
                self.paint(&format!("{:10}", "failed"), "31")
            };
            let stage = outcome.failed_stage().map(|s| s.name()).unwrap_or("-");
            output.push_str(&format!(
                "│ {:23} │ {} │ {:16} │ {:>10}ms │\n",
                truncate(outcome.display_name(), 23),
                status,
                stage,
                outcome.duration_ms
            ));
        }

        output.push_str(
            "└─────────────────────────┴────────────┴──────────────────┴───────────────┘\n",
        );
        output.push_str(&format!(" {}\n", self.format_batch_line(summary)));

        for (stage, count) in &summary.failed_by_stage {
            output.push_str(&format!("   {} failed at {}\n", count, stage.name()));
        }

        output
    }

    /// Format a health report
    pub fn format_health(&self, report: &HealthReport) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(report),
            OutputFormat::Summary => format!(
                "{} deployments: {} healthy, {} degraded, {} unhealthy, {} unknown",
                report.len(),
                report.count(HealthState::Healthy),
                report.count(HealthState::Degraded),
                report.count(HealthState::Unhealthy),
                report.count(HealthState::Unknown)
            ),
            OutputFormat::Table => {
                if report.is_empty() {
                    return "No deployments reported".to_string();
                }
                let mut output = String::new();
                output.push_str(&format!("{:30} STATUS\n", "DEPLOYMENT"));
                for (name, state) in report.iter() {
                    let status = format!("{} {}", state.symbol(), state.as_str());
                    let color = match state {
                        HealthState::Healthy => "32",
                        HealthState::Degraded | HealthState::Unknown => "33",
                        HealthState::Unhealthy => "31",
                    };
                    output.push_str(&format!("{:30} {}\n", name, self.paint(&status, color)));
                }
                output
            }
        }
    }

    /// Format a subscription cycle result
    pub fn format_subscriptions(&self, result: &SubscriptionCycleResult) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(result),
            OutputFormat::Table | OutputFormat::Summary => format!(
                "Subscription cycle: {} invoices processed, {} renewals handled ({}ms)",
                result.invoices_processed, result.renewals_handled, result.duration_ms
            ),
        }
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Write a health report as CSV (`deployment,status`)
pub fn write_health_csv<W: Write>(writer: W, report: &HealthReport) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["deployment", "status"])?;
    for (name, state) in report.iter() {
        writer.write_record([name.as_str(), state.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Export a health report to a CSV file
pub fn export_health_csv(path: &Path, report: &HealthReport) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_health_csv(file, report)?;
    info!("Exported health report to {}", path.display());
    Ok(())
}
