//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Fetch full-text PDFs for the DOIs in Web of Science exports.
///
/// Reads every `.txt` export in the archive directory, extracts the DOIs and
/// downloads each article from the mirror into the output directory. Files
/// that already exist are skipped, so an interrupted run can simply be
/// started again.
///
/// Flags left unset fall back to the config file, then to built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "doihive")]
#[command(author, version, about)]
pub struct Args {
    /// Directory holding Web of Science `.txt` exports [default: archive]
    #[arg(short = 'a', long = "archive", value_name = "DIR")]
    pub archive_dir: Option<PathBuf>,

    /// Directory the PDFs are saved to [default: pdf]
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory for the error log and retry list [default: logs]
    #[arg(long, value_name = "DIR")]
    pub error_dir: Option<PathBuf>,

    /// Number of parallel downloads (1-100) [default: 3]
    #[arg(short = 'w', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub workers: Option<u8>,

    /// Only fetch the first N DOIs
    #[arg(short = 'b', long, value_name = "N")]
    pub budget: Option<usize>,

    /// Mirror base URL [default: https://sci-hub.se]
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Report archive coverage and exit without downloading
    #[arg(long)]
    pub check_only: bool,

    /// Config file [default: $XDG_CONFIG_HOME/doihive/config.toml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also write logs to a file in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
