//! # transcripts-cli
//!
//! Command-line interface for splitting a student workbook into per-intake
//! transcript workbooks.

mod archive;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use transcripts_core::{
    build_alerts, load_input, run_book, validate_book, Alert, RunConfig, RunReport, Severity,
    StudentOutcome, ValidationReport, ValidationScope,
};
use transcripts_notify::AlertNotifier;

/// Request timeout for the alert store, in seconds.
const NOTIFY_TIMEOUT_SECS: u64 = 30;

/// transcripts - split a student workbook into per-intake transcripts
#[derive(Parser)]
#[command(name = "transcripts")]
#[command(author, version, about = "Per-intake transcript generation from a raw student sheet", long_about = None)]
struct Cli {
    /// Source workbook (.xlsx) with a raw sheet and one template per intake
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory receiving the generated workbooks
    #[arg(short = 'o', long = "output", default_value = "transcripts_output")]
    output: PathBuf,

    /// Run configuration (YAML or JSON)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Generate transcripts even if validation reports errors
    #[arg(long)]
    skip_validation: bool,

    /// Only validate the raw sheet
    #[arg(long, conflicts_with = "skip_validation")]
    validate_only: bool,

    /// Do not package the generated workbooks into a zip archive
    #[arg(long)]
    no_zip: bool,

    /// Base URL of the alert store; enables threshold fetch and alert push
    #[arg(long, value_name = "URL")]
    notify_url: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Everything one invocation produced, for `--json`.
#[derive(Serialize)]
struct CliReport<'a> {
    validation: &'a ValidationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    run: Option<&'a RunReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    archive: Option<&'a Path>,
    alerts: &'a [Alert],
}

impl<'a> CliReport<'a> {
    fn validation_only(validation: &'a ValidationReport) -> Self {
        CliReport {
            validation,
            run: None,
            archive: None,
            alerts: &[],
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => RunConfig::default(),
    };

    let book = load_input(&cli.input)
        .with_context(|| format!("Failed to read workbook: {}", cli.input.display()))?;

    let validation = validate_book(&book, ValidationScope::Sheet(&config.raw_sheet))?;
    validation_gate(&cli, &validation)?;
    if cli.validate_only {
        return Ok(());
    }

    let report = run_book(&book, &cli.input, &cli.output, &config)?;

    let archive = if cli.no_zip || report.files.is_empty() {
        None
    } else {
        let path = archive::package(&report.files, &cli.output, &config.archive_name)?;
        println!("PROCESSED_FILE::{}", config.archive_name);
        Some(path)
    };

    let alerts = match &cli.notify_url {
        Some(url) => notify(url, &cli.input, &report, &config).await?,
        None => build_alerts(&report.outcomes, &config.thresholds),
    };

    if cli.json {
        print_json(&CliReport {
            validation: &validation,
            run: Some(&report),
            archive: archive.as_deref(),
            alerts: &alerts,
        })?;
    } else {
        print_summary(&report, archive.as_deref(), &alerts);
    }

    Ok(())
}

/// Report validation and decide whether the run goes ahead. A blocked run
/// still prints its report, as JSON when asked.
fn validation_gate(cli: &Cli, validation: &ValidationReport) -> Result<()> {
    let blocked = validation.has_errors() && (cli.validate_only || !cli.skip_validation);

    if cli.json {
        if cli.validate_only || blocked {
            print_json(&CliReport::validation_only(validation))?;
        }
    } else if cli.validate_only || !validation.is_clean() {
        print_validation(validation);
    }

    if blocked {
        if cli.validate_only {
            bail!("{} failed validation", cli.input.display());
        }
        bail!(
            "{} failed validation (use --skip-validation to run anyway)",
            cli.input.display()
        );
    }
    if validation.has_errors() {
        tracing::warn!("validation reported errors, continuing");
    }
    Ok(())
}

/// Notifier for `url`, falling back to the configured thresholds.
fn notifier_for(url: &str, config: &RunConfig) -> Result<AlertNotifier> {
    let notifier = AlertNotifier::with_timeout(url, NOTIFY_TIMEOUT_SECS)
        .context("Failed to create alert notifier")?;
    Ok(notifier.with_fallback(config.thresholds))
}

/// Fetch remote thresholds, build alerts against them and push them under
/// the input file's name. A failed push is reported but does not fail the run.
async fn notify(
    url: &str,
    input: &Path,
    report: &RunReport,
    config: &RunConfig,
) -> Result<Vec<Alert>> {
    let notifier = notifier_for(url, config)?;
    let thresholds = notifier.fetch_thresholds().await;
    let alerts = build_alerts(&report.outcomes, &thresholds);

    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("transcripts");
    if let Err(e) = notifier.push_alerts(file_name, &alerts).await {
        tracing::warn!("failed to push alerts: {e}");
        eprintln!("{} failed to push alerts: {e}", "Warning:".yellow().bold());
    }
    Ok(alerts)
}

fn print_json(report: &CliReport<'_>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}

fn print_validation(report: &ValidationReport) {
    if report.is_clean() {
        println!("{}", "Validation passed".green().bold());
        return;
    }
    for (sheet, issue) in report.issues() {
        let label = match issue.severity() {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        println!("{label} [{sheet}] {issue}");
    }
}

fn print_summary(report: &RunReport, archive: Option<&Path>, alerts: &[Alert]) {
    for outcome in &report.outcomes {
        match outcome {
            StudentOutcome::Written {
                intake,
                student_no,
                averages,
                field_issues,
            } => {
                println!("{} {intake}/{student_no} {averages}", "ok".green());
                for issue in field_issues {
                    println!("   {} {issue}", "!".yellow());
                }
            }
            StudentOutcome::Skipped {
                row,
                student_no,
                reason,
                ..
            } => {
                let who = student_no.as_deref().unwrap_or("-");
                println!("{} row {row} ({who}): {reason}", "skipped".yellow());
            }
        }
    }

    println!();
    println!(
        "{} {} written, {} skipped, {} field issues",
        "Summary:".bold(),
        report.written_count(),
        report.skipped_count(),
        report.field_issue_count()
    );
    for file in &report.files {
        println!("  {}", file.display());
    }
    if let Some(path) = archive {
        println!("{} {}", "Archive:".bold(), path.display());
    }
    if !alerts.is_empty() {
        println!("{} {}", "Alerts:".bold(), alerts.len());
        for alert in alerts {
            println!("  {} {}: {}", alert.student_id, alert.title.red(), alert.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcripts_core::{SheetReport, Thresholds, ValidationIssue};

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["transcripts", "students.xlsx"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("students.xlsx"));
        assert_eq!(cli.output, PathBuf::from("transcripts_output"));
        assert!(cli.config.is_none());
        assert!(!cli.no_zip);
        assert!(cli.notify_url.is_none());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "transcripts",
            "students.xlsx",
            "-o",
            "out",
            "-c",
            "run.yaml",
            "--no-zip",
            "--notify-url",
            "http://localhost:9000",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.output, PathBuf::from("out"));
        assert_eq!(cli.config, Some(PathBuf::from("run.yaml")));
        assert!(cli.no_zip);
        assert!(cli.json);
        assert_eq!(cli.notify_url.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn test_validate_only_conflicts_with_skip() {
        assert!(Cli::try_parse_from([
            "transcripts",
            "students.xlsx",
            "--validate-only",
            "--skip-validation"
        ])
        .is_err());
    }

    fn failing_report() -> ValidationReport {
        ValidationReport {
            sheets: vec![SheetReport {
                sheet: "Raw".to_string(),
                issues: vec![ValidationIssue::UnnamedColumns { positions: vec![3] }],
            }],
        }
    }

    fn parse(args: &[&str]) -> Cli {
        let argv = ["transcripts", "students.xlsx"].iter().chain(args).copied();
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_gate_blocks_on_errors() {
        let report = failing_report();
        assert!(validation_gate(&parse(&[]), &report).is_err());
        assert!(validation_gate(&parse(&["--json"]), &report).is_err());
        assert!(validation_gate(&parse(&["--validate-only"]), &report).is_err());
        assert!(validation_gate(&parse(&["--skip-validation", "--json"]), &report).is_ok());
        assert!(validation_gate(&parse(&["--json"]), &ValidationReport::default()).is_ok());
    }

    #[test]
    fn test_validation_only_json() {
        let report = failing_report();
        let json = serde_json::to_value(CliReport::validation_only(&report)).unwrap();
        assert_eq!(json["validation"]["sheets"][0]["sheet"], "Raw");
        assert_eq!(
            json["validation"]["sheets"][0]["issues"][0]["kind"],
            "unnamed_columns"
        );
        assert!(json.get("run").is_none());
        assert_eq!(json["alerts"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_notifier_falls_back_to_configured_thresholds() {
        let config = RunConfig {
            thresholds: Thresholds {
                min_grade: 55.0,
                min_attendance: 75.0,
            },
            ..RunConfig::default()
        };
        // Nothing listens on the discard port
        let notifier = notifier_for("http://127.0.0.1:9", &config).unwrap();
        assert_eq!(notifier.fetch_thresholds().await, config.thresholds);
    }

    #[test]
    fn test_input_required() {
        assert!(Cli::try_parse_from(["transcripts"]).is_err());
    }
}
