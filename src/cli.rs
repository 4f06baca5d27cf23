use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "reqmeter",
    about = "Meter, price, and report token usage for text-generation requests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Usage log to aggregate: a .jsonl file or a directory of them
    #[arg(long, global = true, default_value = "usage")]
    pub log: PathBuf,

    /// Config file (default: the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Aggregate the usage log and print summary totals (default)
    Summary {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: SummaryFormat,
    },
    /// Export a point-in-time report
    Report {
        /// Report format: json or csv
        #[arg(long, default_value = "json")]
        format: String,
        /// Write the report into the configured report directory
        #[arg(long)]
        save: bool,
        /// Override the report output directory (implies --save)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List models with pricing entries
    Models,
}

#[derive(ValueEnum, Debug, Clone, PartialEq)]
pub enum SummaryFormat {
    Table,
    Json,
}

impl Cli {
    pub fn effective_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Summary {
            format: SummaryFormat::Table,
        })
    }
}
