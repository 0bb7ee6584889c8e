//! Command-line surface. Parsing and environment binding via clap's
//! `derive` + `env` features.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Time-window scaling controller: maintains autoscaler minReplicas floors
/// against declared schedules.
#[derive(Debug, Parser)]
#[command(name = "floor-scheduler", version, about)]
pub struct Cli {
    /// Path to an optional TOML config file.
    #[arg(long, env = "FLOORCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// IANA policy timezone (e.g. "US/Central"). Overrides config file and
    /// environment.
    #[arg(long, env = "FLOORCTL_TIMEZONE")]
    pub timezone: Option<String>,

    /// Reconciliation tick interval, in seconds.
    #[arg(long)]
    pub tick_interval_secs: Option<u64>,

    /// Bounded input channel capacity.
    #[arg(long)]
    pub channel_capacity: Option<usize>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}
