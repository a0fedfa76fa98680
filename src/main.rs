//! Vigil - heuristic web target probe CLI

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tabled::builder::Builder;
use tabled::settings::Style;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use vigil::config;
use vigil::error::VigilError;
use vigil::history::{ScanHistory, ScanRecord, SqliteHistory};
use vigil::models::{HeaderStatus, ScanConfig, ScanReport};
use vigil::report;
use vigil::scanner::ScanEngine;

const DEFAULT_CONFIG_PATH: &str = "vigil.toml";

/// Vigil - quick heuristic security probe for a single web target
#[derive(Parser)]
#[command(name = "vigil", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe a target URL
    Scan {
        /// Target URL or bare host (http:// is assumed)
        target: String,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Candidate ports (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        ports: Option<Vec<u16>>,

        /// HTTP/HTTPS proxy URL
        #[arg(long)]
        proxy: Option<String>,

        /// User-Agent header sent with every request
        #[arg(long)]
        user_agent: Option<String>,

        /// Write the full report as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Scan history database path
        #[arg(long)]
        history_db: Option<PathBuf>,

        /// Do not record this scan in the history database
        #[arg(long)]
        no_history: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the most recent recorded scans
    History {
        /// Number of scans to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Scan history database path
        #[arg(long)]
        history_db: Option<PathBuf>,
    },

    /// List available probes
    Probes,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "vigil=debug" } else { "vigil=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();
}

fn resolve_config(path: Option<&Path>) -> vigil::error::Result<ScanConfig> {
    match path {
        Some(path) => config::load_config(path),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                config::load_config(default_path)
            } else {
                Ok(ScanConfig::default())
            }
        }
    }
}

fn print_banner() {
    let banner = r#"
    ╔═══════════════════════════════════╗
    ║  VIGIL v0.1.0                     ║
    ║  Heuristic web target probe       ║
    ╚═══════════════════════════════════╝
    "#;
    println!("{}", banner.cyan());
}

fn colored_status(status: HeaderStatus) -> String {
    match status {
        HeaderStatus::Present => "present".green().to_string(),
        HeaderStatus::Absent => "missing".red().to_string(),
        HeaderStatus::Undetermined => "undetermined".yellow().to_string(),
    }
}

fn yes_no(flag: bool) -> String {
    if flag {
        "yes".red().bold().to_string()
    } else {
        "no".green().to_string()
    }
}

fn print_report(report: &ScanReport) {
    println!("\n{}", "  Security Headers".bold());
    let mut builder = Builder::default();
    builder.push_record(["Header", "Status"]);
    for (name, status) in report.headers.entries() {
        builder.push_record([name.to_string(), colored_status(status)]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");

    println!("\n{}", "  Network".bold());
    let ip = report
        .ip_address
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unresolved".to_string());
    let ports = if report.open_ports.is_empty() {
        "none".to_string()
    } else {
        report
            .open_ports
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!("  {} {}", "IP address:".bold(), ip.cyan());
    println!("  {} {}", "Open ports:".bold(), ports.cyan());

    println!("\n{}", "  Forms".bold());
    println!(
        "  {} {} ({} found)",
        "Potential SQLi surface:".bold(),
        yes_no(report.sqli_test),
        report.forms.len()
    );
    if !report.forms.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Method", "Action", "Inputs"]);
        for form in &report.forms {
            let inputs = form
                .inputs
                .iter()
                .map(|i| format!("{}:{}", i.name, i.kind))
                .collect::<Vec<_>>()
                .join(", ");
            builder.push_record([form.method.clone(), form.action.clone(), inputs]);
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        println!("{table}");
    }

    println!("\n{}", "  Reflection".bold());
    println!("  {} {}", "Potential XSS:".bold(), yes_no(report.xss_test));
    println!("  {}", report.xss_detail);
    for finding in &report.reflections {
        println!(
            "  {} {} ({})",
            "Parameter:".bold(),
            finding.parameter.yellow(),
            finding.context
        );
        println!("  {} {}", "Test URL:".bold(), finding.test_url);
    }

    if report.has_errors() {
        println!("\n{}", "  Probe Errors".bold());
        for (probe, message) in &report.errors {
            println!("  {} {}", format!("{probe:12}").red().bold(), message);
        }
    }

    println!(
        "\n  {} {}",
        "Requests sent:".bold(),
        report.total_requests.to_string().cyan()
    );
}

fn print_history(records: &[ScanRecord]) {
    if records.is_empty() {
        println!("  {}", "No scans recorded yet.".yellow());
        return;
    }

    let mut builder = Builder::default();
    builder.push_record([
        "ID", "Scanned at", "Target", "SQLi", "XSS", "Open ports", "Errors",
    ]);
    for record in records {
        let ports = record
            .open_ports
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let errors = record.errors.as_ref().map(|e| e.len()).unwrap_or(0);
        builder.push_record([
            record.id.to_string(),
            record.scanned_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.target_url.clone(),
            record.sqli_potential.to_string(),
            record.xss_potential.to_string(),
            ports,
            errors.to_string(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            target,
            config: config_path,
            timeout,
            ports,
            proxy,
            user_agent,
            output,
            history_db,
            no_history,
            verbose,
        } => {
            init_tracing(verbose);
            print_banner();

            let mut scan_config = resolve_config(config_path.as_deref())?;
            config::merge_cli_args(
                &mut scan_config,
                timeout,
                ports,
                proxy,
                user_agent,
                history_db,
            );
            config::validate(&scan_config)?;

            println!("  {} {}", "Target:".bold(), target.green());
            let probes = ScanEngine::list_probes()
                .into_iter()
                .map(|(name, _)| name)
                .collect::<Vec<_>>()
                .join(", ");
            println!("  {} {}\n", "Probes:".bold(), probes.cyan());

            let engine = if no_history {
                ScanEngine::new(scan_config)
            } else {
                let store = SqliteHistory::open(&scan_config.history_path)?;
                ScanEngine::with_history(scan_config, Arc::new(store))
            };

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });

            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("  {spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message("Running probes...");
            pb.enable_steady_tick(Duration::from_millis(100));

            let outcome = engine.run_with_cancel(&target, cancel).await;
            pb.finish_and_clear();

            let report = match outcome {
                Ok(report) => report,
                Err(VigilError::NothingToScan(e)) => {
                    eprintln!("  {} nothing to scan: {}", "Error:".red().bold(), e);
                    std::process::exit(1);
                }
                Err(VigilError::Cancelled) => {
                    eprintln!("  {}", "Scan cancelled.".yellow());
                    std::process::exit(130);
                }
                Err(e) => return Err(e.into()),
            };

            println!("  {} {}", "Scanned:".bold(), report.target.green());
            print_report(&report);

            if let Some(path) = output {
                report::json::export(&report, &path)?;
                println!(
                    "\n  {} {}",
                    "Report saved to:".bold(),
                    path.display().to_string().green()
                );
            }
        }

        Commands::History {
            limit,
            config: config_path,
            history_db,
        } => {
            init_tracing(false);
            print_banner();

            let scan_config = resolve_config(config_path.as_deref())?;
            let path = history_db.unwrap_or(scan_config.history_path);
            let limit = limit.unwrap_or(scan_config.history_limit);

            let store = SqliteHistory::open(&path)?;
            let records = store.recent(limit)?;

            println!(
                "  {} {}\n",
                "History:".bold(),
                path.display().to_string().cyan()
            );
            print_history(&records);
        }

        Commands::Probes => {
            print_banner();

            println!("  {}\n", "Available Probes:".bold());
            for (name, description) in ScanEngine::list_probes() {
                println!("    {} {}", format!("{name:12}").cyan().bold(), description);
            }
            println!();
        }
    }

    Ok(())
}
