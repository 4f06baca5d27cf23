use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reqmeter::cli::{Cli, Command, SummaryFormat};
use reqmeter::config;
use reqmeter::ingest;
use reqmeter::output;
use reqmeter::report::{Report, ReportFormat};
use reqmeter::sink;
use reqmeter::tracker::MetricsTracker;
use reqmeter::types::Snapshot;

/// Discover and replay the usage logs, or report why there is nothing to
/// aggregate.
fn aggregate_logs(log_path: &Path, tracker: &MetricsTracker) -> Option<Snapshot> {
    let logs = ingest::discover_logs(log_path);
    if logs.is_empty() {
        eprintln!("No usage logs found under {}.", log_path.display());
        return None;
    }

    let recorded = ingest::replay(&logs, tracker);
    eprintln!("Recorded {recorded} requests from {} log file(s).", logs.len());

    Some(tracker.snapshot())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.effective_command();

    let config = config::load_config(cli.config.as_deref());
    let prices = config.price_table();

    match command {
        Command::Models => output::print_models(&prices),
        Command::Summary { format } => {
            let tracker = MetricsTracker::new(prices);
            let Some(snapshot) = aggregate_logs(&cli.log, &tracker) else {
                return Ok(());
            };

            match format {
                SummaryFormat::Table => output::print_summary_table(&snapshot),
                SummaryFormat::Json => output::print_summary_json(&snapshot),
            }
        }
        Command::Report { format, save, out } => {
            // Reject an unknown format before any aggregation work.
            let format: ReportFormat = format.parse()?;

            let tracker = MetricsTracker::new(prices);
            let Some(snapshot) = aggregate_logs(&cli.log, &tracker) else {
                return Ok(());
            };

            let report = Report::generate(&snapshot, format);
            println!("{}", report.render());

            if save || out.is_some() {
                let dir = out.unwrap_or_else(|| config.report_dir());
                let sink = sink::default_sink(dir);
                let location = report
                    .persist(sink.as_ref())
                    .context("report was generated (and printed above) but could not be saved")?;
                eprintln!("Saved report to {location}");
            }
        }
    }

    Ok(())
}
