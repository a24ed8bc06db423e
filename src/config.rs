//! Switch configuration assembly so CLI flags, environment, and the config
//! file resolve consistently.
//!
//! Precedence is flag/env, then config file, then built-in default. A value
//! that parses but is out of range falls back to its default with a warning;
//! configuration is never fatal.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::gpio::Pin;

/// Voice level threshold magnitude in dBov.
pub const DEFAULT_THRESHOLD_DBOV: u32 = 60;
/// Push-to-talk hold time in milliseconds.
pub const DEFAULT_HOLD_TIME_MS: u64 = 1000;

const MIN_THRESHOLD_DBOV: u32 = 1;
const MAX_THRESHOLD_DBOV: u32 = 96;
const MAX_HOLD_TIME_MS: u64 = 600_000;

/// Command-line and environment schema for the switch settings.
///
/// Every field is optional here; [`VoxConfig::resolve`] layers these over
/// the config file and the built-in defaults.
#[derive(Debug, Clone, Parser)]
pub struct VoxCli {
    /// Voice level threshold magnitude in dBov (activates above -threshold)
    #[arg(long, env = "VOXSWITCH_THRESHOLD")]
    pub threshold: Option<u32>,

    /// Push-to-talk hold time in milliseconds
    #[arg(long = "hold-time-ms", env = "VOXSWITCH_HOLD_TIME_MS")]
    pub hold_time_ms: Option<u64>,

    /// Push-to-talk output pin; unset disables hardware writes
    #[arg(long = "ptt-pin", env = "VOXSWITCH_PTT_PIN")]
    pub ptt_pin: Option<Pin>,

    /// Squelch input pin; unset reads as not asserted
    #[arg(long = "squelch-pin", env = "VOXSWITCH_SQUELCH_PIN")]
    pub squelch_pin: Option<Pin>,

    /// Config file path (default: <config dir>/voxswitch/config.toml)
    #[arg(long = "config", env = "VOXSWITCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write a JSONL trace log for debugging
    #[arg(long = "logs", default_value_t = false)]
    pub logs: bool,

    /// Disable all logging even if --logs is set
    #[arg(long = "no-logs", default_value_t = false)]
    pub no_logs: bool,
}

impl VoxCli {
    /// Load the config file layer and produce the sanitized settings.
    pub fn resolved(&self) -> VoxConfig {
        let file = FileConfig::load(self.config.clone());
        VoxConfig::resolve(self, &file).sanitized()
    }
}

/// Config file schema; any subset of the settings may be present.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub threshold: Option<u32>,
    pub hold_time_ms: Option<u64>,
    pub ptt_pin: Option<Pin>,
    pub squelch_pin: Option<Pin>,
}

impl FileConfig {
    /// Read the file at `path`, or the default location when `path` is
    /// `None`. A missing or malformed file yields the empty layer; a parse
    /// failure is logged and absorbed.
    pub fn load(path: Option<PathBuf>) -> Self {
        let Some(path) = path.or_else(default_config_path) else {
            return Self::default();
        };
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
        };
        match toml::from_str(&text) {
            Ok(file) => file,
            Err(err) => {
                warn!(path = %path.display(), "ignoring malformed config file: {err}");
                Self::default()
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("voxswitch").join("config.toml"))
}

/// Resolved, immutable switch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxConfig {
    /// Activation threshold magnitude in dBov; the engine compares loudness
    /// against `-threshold`.
    pub threshold: u32,
    /// How long the output stays keyed after the last qualifying tick.
    pub hold_time_ms: u64,
    /// Transmit-enable output pin, if wired.
    pub ptt_pin: Option<Pin>,
    /// Squelch input pin, if wired.
    pub squelch_pin: Option<Pin>,
}

impl Default for VoxConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD_DBOV,
            hold_time_ms: DEFAULT_HOLD_TIME_MS,
            ptt_pin: None,
            squelch_pin: None,
        }
    }
}

impl VoxConfig {
    /// Layer flag/env values over the config file over the defaults.
    pub fn resolve(cli: &VoxCli, file: &FileConfig) -> Self {
        Self {
            threshold: cli
                .threshold
                .or(file.threshold)
                .unwrap_or(DEFAULT_THRESHOLD_DBOV),
            hold_time_ms: cli
                .hold_time_ms
                .or(file.hold_time_ms)
                .unwrap_or(DEFAULT_HOLD_TIME_MS),
            ptt_pin: cli.ptt_pin.or(file.ptt_pin),
            squelch_pin: cli.squelch_pin.or(file.squelch_pin),
        }
    }

    /// Replace out-of-range settings with their defaults, warning per field.
    #[must_use = "sanitized settings must be the ones handed to the engine"]
    pub fn sanitized(mut self) -> Self {
        if !(MIN_THRESHOLD_DBOV..=MAX_THRESHOLD_DBOV).contains(&self.threshold) {
            warn!(
                threshold = self.threshold,
                "threshold out of range, using {DEFAULT_THRESHOLD_DBOV}"
            );
            self.threshold = DEFAULT_THRESHOLD_DBOV;
        }
        if self.hold_time_ms > MAX_HOLD_TIME_MS {
            warn!(
                hold_time_ms = self.hold_time_ms,
                "hold time out of range, using {DEFAULT_HOLD_TIME_MS}"
            );
            self.hold_time_ms = DEFAULT_HOLD_TIME_MS;
        }
        self
    }
}
