use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "wordsync")]
#[command(about = "Inspect and maintain a Wordsync vocabulary store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the store's database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show word, device and last-sync counters
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List registered devices
    Devices {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recent sync audit entries
    Log {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export active words
    Export {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Apply a sync request file, as a device would send it
    Apply {
        /// JSON file with `device_id`, `device_name` and `words`
        #[arg(value_name = "PATH")]
        file: PathBuf,
        /// Override the request's device id
        #[arg(long, value_name = "ID")]
        device_id: Option<String>,
    },
    /// Replace `nan`/`None`/`<NA>` placeholders left by spreadsheet imports
    Cleanup,
    /// Back up the store, then delete every word and audit entry
    Erase {
        /// Confirm the erase
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl From<ExportFormat> for wordsync_core::export::ExportFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Json => Self::Json,
            ExportFormat::Markdown => Self::Markdown,
        }
    }
}
