//! CLI commands for severity-api.
//!
//! `serve` runs the API; the remaining subcommands are the terminal
//! counterparts of the dashboard screens, each one form input, one
//! network call, one rendered result.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::client::{ApiClient, CachedSession, HistorySource};
use crate::config::AppConfig;
use crate::features::ScenarioInput;
use crate::history::{
    derive_stats, filter_by_severity, page_count, paginate, weekly_series, SeverityFilter,
    PAGE_SIZE,
};
use crate::types::{
    ChangePasswordRequest, HistoryRecord, LoginRequest, RegisterRequest, SeverityLabel,
};

#[derive(Parser)]
#[command(name = "severity-api")]
#[command(version, about = "Road accident severity prediction API and dashboard CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value_t = 5000)]
        port: u16,
    },

    /// Register a new account
    Register {
        /// Display name
        #[arg(long)]
        name: String,

        /// Account email
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long)]
        password: String,
    },

    /// Log in and cache the session claim locally
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long)]
        password: String,
    },

    /// Drop the cached session claim
    Logout,

    /// Score a scenario JSON file
    Predict {
        /// Path to scenario JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output format (json, table)
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Show the prediction history table
    History {
        /// Severity filter (high, low)
        #[arg(long)]
        severity: Option<String>,

        /// Page number (page size 5)
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Read records from a local fixture file instead of the API
        #[arg(long)]
        fixture: Option<PathBuf>,
    },

    /// Show summary stats and the 7-day activity chart
    Dashboard {
        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Read records from a local fixture file instead of the API
        #[arg(long)]
        fixture: Option<PathBuf>,
    },

    /// Change the account password
    ChangePassword {
        /// Current password
        #[arg(long)]
        current: String,

        /// New password
        #[arg(long)]
        new: String,

        /// New password, repeated
        #[arg(long)]
        confirm: String,
    },
}

fn require_session(config: &AppConfig) -> anyhow::Result<CachedSession> {
    CachedSession::load(Path::new(&config.session_file))
        .context("Not logged in. Run `severity-api login` first")
}

/// Pick the record source for a history-reading command.
fn history_source(config: &AppConfig, fixture: Option<PathBuf>) -> anyhow::Result<HistorySource> {
    match fixture {
        Some(path) => Ok(HistorySource::Fixture { path }),
        None => {
            let session = require_session(config)?;
            Ok(HistorySource::Live {
                client: ApiClient::new(config.api.base_url.clone()),
                token: session.token,
            })
        }
    }
}

/// Normalize an `--format` value, warning and falling back to the
/// command's default when it is not a known format.
fn resolve_format(format: &str, default: &str) -> String {
    match format {
        "json" | "table" => format.to_string(),
        other => {
            eprintln!("Unknown format: {}. Using {}.", other, default);
            default.to_string()
        }
    }
}

pub async fn run_register(name: String, email: String, password: String) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let client = ApiClient::new(config.api.base_url);

    let response = client
        .register(&RegisterRequest {
            name,
            email,
            password,
        })
        .await?;
    println!("{}", response.message);
    Ok(())
}

pub async fn run_login(email: String, password: String) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let client = ApiClient::new(config.api.base_url.clone());

    let response = client.login(&LoginRequest { email, password }).await?;
    let session = CachedSession {
        email: response.user.email,
        name: response.user.name,
        token: response.token,
    };
    session.save(Path::new(&config.session_file))?;

    println!("{} Welcome back, {}.", response.message, session.name);
    Ok(())
}

pub async fn run_logout() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    CachedSession::clear(Path::new(&config.session_file));
    println!("Logged out.");
    Ok(())
}

/// Score a scenario file against the API.
pub async fn run_predict(input: PathBuf, format: String) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let session = require_session(&config)?;
    let client = ApiClient::new(config.api.base_url);

    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read scenario file: {}", input.display()))?;
    // Numeric strings coerce leniently here; a malformed field goes to
    // the server as null and comes back as a 400.
    let scenario: ScenarioInput = serde_json::from_str(&raw)?;

    let response = client.predict(&scenario, &session.token).await?;

    match resolve_format(&format, "json").as_str() {
        "table" => {
            println!("Severity risk: {:.2}%", response.severity_score);
            println!("Classification: {}", response.severity_label);
        }
        _ => println!("{}", serde_json::to_string_pretty(&response)?),
    }
    Ok(())
}

fn parse_filter(severity: Option<String>) -> anyhow::Result<Option<SeverityFilter>> {
    match severity.as_deref() {
        None => Ok(None),
        Some("high") => Ok(Some(SeverityFilter::High)),
        Some("low") => Ok(Some(SeverityFilter::Low)),
        Some(other) => bail!("Unknown severity filter: {} (expected high or low)", other),
    }
}

/// Render the history table, most recent first, page size 5.
pub async fn run_history(
    severity: Option<String>,
    page: usize,
    format: String,
    fixture: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let source = history_source(&config, fixture)?;
    let filter = parse_filter(severity)?;

    let mut records = source.fetch().await?;
    records.reverse();

    let filtered = filter_by_severity(&records, filter);
    let pages = page_count(filtered.len(), PAGE_SIZE);
    let current = paginate(&filtered, page, PAGE_SIZE);

    match resolve_format(&format, "table").as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&current)?),
        _ => println!("{}", render_history_table(current, page, pages, filtered.len())),
    }
    Ok(())
}

fn render_history_table(records: &[HistoryRecord], page: usize, pages: usize, total: usize) -> String {
    if records.is_empty() {
        return "No history found.".to_string();
    }
    let mut out = format!("{:<34} {:>10}  {}\n", "Timestamp", "Prediction", "Severity");
    for record in records {
        out.push_str(&format!(
            "{:<34} {:>10.2}  {}\n",
            record.timestamp,
            record.prediction,
            SeverityLabel::from_score(record.prediction)
        ));
    }
    let start = (page - 1) * PAGE_SIZE + 1;
    let end = start + records.len() - 1;
    out.push_str(&format!(
        "\nShowing {} to {} of {} entries (page {} of {})",
        start, end, total, page, pages
    ));
    out
}

/// Render summary stats and the trailing-week activity chart.
pub async fn run_dashboard(format: String, fixture: Option<PathBuf>) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let source = history_source(&config, fixture)?;

    let records = source.fetch().await?;
    let stats = derive_stats(&records);
    let series = weekly_series(&records, chrono::Local::now().date_naive());

    match resolve_format(&format, "table").as_str() {
        "json" => {
            let output = serde_json::json!({
                "stats": stats,
                "weekly": series,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("=== Predictions ===");
            println!("  Total:         {}", stats.total);
            println!(
                "  High severity: {} ({}% of total)",
                stats.high_severity, stats.high_pct
            );
            println!(
                "  Low severity:  {} ({}% of total)",
                stats.low_severity, stats.low_pct
            );
            println!();
            println!("=== Last 7 days ===");
            let max = series.iter().map(|b| b.count).max().unwrap_or(0).max(1);
            for bucket in &series {
                let width = bucket.count * 40 / max;
                println!("  {} {:>4}  {}", bucket.day_label, bucket.count, "#".repeat(width));
            }
        }
    }
    Ok(())
}

pub async fn run_change_password(
    current: String,
    new: String,
    confirm: String,
) -> anyhow::Result<()> {
    if new != confirm {
        bail!("New passwords do not match");
    }
    if new.len() < crate::auth::MIN_PASSWORD_LEN {
        bail!("Password must be at least 6 characters");
    }

    let config = AppConfig::load()?;
    let session = require_session(&config)?;
    let client = ApiClient::new(config.api.base_url);

    let response = client
        .change_password(
            &ChangePasswordRequest {
                email: session.email,
                current_password: current,
                new_password: new,
            },
            &session.token,
        )
        .await?;
    println!("{}", response.message);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter(None).unwrap(), None);
        assert_eq!(
            parse_filter(Some("high".into())).unwrap(),
            Some(SeverityFilter::High)
        );
        assert_eq!(
            parse_filter(Some("low".into())).unwrap(),
            Some(SeverityFilter::Low)
        );
        assert!(parse_filter(Some("medium".into())).is_err());
    }

    fn record(prediction: f64, timestamp: &str) -> HistoryRecord {
        HistoryRecord {
            input: serde_json::Value::Null,
            processed: serde_json::Value::Null,
            prediction,
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn test_history_table_empty_shows_placeholder() {
        let rendered = render_history_table(&[], 1, 0, 0);
        assert_eq!(rendered, "No history found.");
    }

    #[test]
    fn test_history_table_rows_and_footer() {
        let records = vec![
            record(61.5, "2026-08-28T10:00:00+00:00"),
            record(12.0, "2026-08-27T09:00:00+00:00"),
        ];
        let rendered = render_history_table(&records, 1, 1, 2);
        assert!(rendered.starts_with("Timestamp"));
        assert!(rendered.contains("61.50  high"));
        assert!(rendered.contains("12.00  low"));
        assert!(rendered.ends_with("Showing 1 to 2 of 2 entries (page 1 of 1)"));
    }

    #[test]
    fn test_resolve_format_falls_back_to_default() {
        assert_eq!(resolve_format("json", "table"), "json");
        assert_eq!(resolve_format("table", "json"), "table");
        assert_eq!(resolve_format("yaml", "table"), "table");
        assert_eq!(resolve_format("yaml", "json"), "json");
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["severity-api", "serve", "--port", "8080"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { port: 8080, .. }));

        let cli = Cli::try_parse_from([
            "severity-api",
            "history",
            "--severity",
            "high",
            "--page",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::History { severity, page, .. } => {
                assert_eq!(severity.as_deref(), Some("high"));
                assert_eq!(page, 2);
            }
            _ => panic!("expected history command"),
        }
    }
}
