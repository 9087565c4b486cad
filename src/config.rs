use clap::Parser;
use std::path::PathBuf;

use crate::documents::DEFAULT_MAX_UPLOAD_BYTES;

pub const DEFAULT_ERROR_DETAIL_LIMIT: usize = 10;

/// Attendance sidecar: JSON-lines requests on stdin, responses on stdout.
#[derive(Parser, Debug)]
#[command(name = "attendd", version, about, long_about = None)]
pub struct Cli {
    /// Workspace directory to open at start-up
    #[arg(long, env = "ATTENDD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Log level used when ATTENDD_LOG is unset
    #[arg(long, env = "ATTENDD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Largest accepted medical document, in MiB
    #[arg(long, default_value_t = 16)]
    pub max_upload_mb: u64,

    /// Row errors listed per reconciliation before summarizing the rest
    #[arg(long, default_value_t = DEFAULT_ERROR_DETAIL_LIMIT)]
    pub error_detail_limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub max_upload_bytes: u64,
    pub error_detail_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            error_detail_limit: DEFAULT_ERROR_DETAIL_LIMIT,
        }
    }
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Self {
            max_upload_bytes: cli.max_upload_mb.saturating_mul(1024 * 1024),
            error_detail_limit: cli.error_detail_limit,
        }
    }
}
