//! Process configuration: layered defaults → config file → environment →
//! CLI flags, mirroring the override order the rest of this codebase's
//! config loaders use.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::calendar::parse_policy_timezone;
use crate::error::StartupError;
use crate::reconciler::ReconcilerConfig;

/// On-disk / env-overridable settings. Every field has a default so a
/// missing config file is never itself an error.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub policy_timezone: String,
    pub tick_interval_secs: u64,
    pub channel_capacity: usize,
    pub quarantine_duration_secs: u64,
    pub max_silent_duration_secs: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            policy_timezone: "US/Central".to_string(),
            tick_interval_secs: 10,
            channel_capacity: 64,
            quarantine_duration_secs: 60,
            max_silent_duration_secs: 5 * 60,
        }
    }
}

/// Fully resolved, validated process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub policy_timezone: chrono_tz::Tz,
    pub reconciler: ReconcilerConfig,
}

impl AppConfig {
    /// Layer defaults, then an optional config file, then `FLOORCTL_*`
    /// environment variables, then explicit CLI overrides (highest
    /// precedence). A malformed or unrecognized timezone is a fatal
    /// startup error.
    pub fn load(
        config_path: Option<&Path>,
        cli: &crate::cli::Cli,
    ) -> Result<Self, StartupError> {
        let mut file_cfg = match config_path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|e| StartupError::Config(format!("reading {}: {e}", path.display())))?;
                toml::from_str(&contents)
                    .map_err(|e| StartupError::Config(format!("parsing {}: {e}", path.display())))?
            }
            _ => FileConfig::default(),
        };

        if let Ok(tz) = std::env::var("FLOORCTL_TIMEZONE") {
            file_cfg.policy_timezone = tz;
        }
        if let Ok(secs) = std::env::var("FLOORCTL_TICK_INTERVAL_SECS") {
            file_cfg.tick_interval_secs = secs
                .parse()
                .map_err(|_| StartupError::Config(format!("invalid FLOORCTL_TICK_INTERVAL_SECS={secs}")))?;
        }
        if let Ok(cap) = std::env::var("FLOORCTL_CHANNEL_CAPACITY") {
            file_cfg.channel_capacity = cap
                .parse()
                .map_err(|_| StartupError::Config(format!("invalid FLOORCTL_CHANNEL_CAPACITY={cap}")))?;
        }

        if let Some(tz) = &cli.timezone {
            file_cfg.policy_timezone = tz.clone();
        }
        if let Some(secs) = cli.tick_interval_secs {
            file_cfg.tick_interval_secs = secs;
        }
        if let Some(cap) = cli.channel_capacity {
            file_cfg.channel_capacity = cap;
        }

        let policy_timezone = parse_policy_timezone(&file_cfg.policy_timezone)?;

        Ok(Self {
            policy_timezone,
            reconciler: ReconcilerConfig {
                tick_interval: Duration::from_secs(file_cfg.tick_interval_secs),
                channel_capacity: file_cfg.channel_capacity,
                quarantine_duration: Duration::from_secs(file_cfg.quarantine_duration_secs),
                max_silent_duration: Duration::from_secs(file_cfg.max_silent_duration_secs),
            },
        })
    }
}
