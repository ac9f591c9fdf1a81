//! Core configuration types.
//! - Config holds the knobs a transaction honours, with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::str::FromStr;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration for transactions and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Set the hidden attribute on lock directories and backups (Windows only)
    pub hide_artifacts: bool,
    /// fsync the target's directory after promotion
    pub sync_dir: bool,
    /// Console verbosity used by `logging::init_tracing`
    pub log_level: LogLevel,
    /// Emit logs as JSON
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hide_artifacts: true,
            sync_dir: true,
            log_level: LogLevel::Normal,
            json_logs: false,
        }
    }
}
