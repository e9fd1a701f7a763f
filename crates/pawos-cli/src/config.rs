//! Host configuration – reads/writes `~/.pawos/config.toml`.
//!
//! ```toml
//! realtime = true
//! calibration_file = "/home/me/.pawos/calibration.toml"
//!
//! [control]
//! motion_period_us = 25000
//!
//! [control.balance]
//! grace_ticks = 20
//! ```

use pawos_runtime::ControlConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted host configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Pace the simulated clock against wall time. When false the loop runs
    /// as fast as the host allows.
    #[serde(default = "default_realtime")]
    pub realtime: bool,

    /// Servo offset file; `~/.pawos/calibration.toml` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_file: Option<PathBuf>,

    #[serde(default)]
    pub control: ControlConfig,
}

fn default_realtime() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            realtime: default_realtime(),
            calibration_file: None,
            control: ControlConfig::default(),
        }
    }
}

impl Config {
    pub fn calibration_path(&self) -> PathBuf {
        self.calibration_file
            .clone()
            .unwrap_or_else(|| pawos_dir_for_home(&home_dir()).join("calibration.toml"))
    }
}

fn home_dir() -> String {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string())
}

fn pawos_dir_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".pawos")
}

/// Return the path to `~/.pawos/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(&home_dir())
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    pawos_dir_for_home(home).join("config.toml")
}

/// Load the config from `~/.pawos/config.toml`, falling back to defaults
/// when the file does not exist. Environment overrides are applied either
/// way.
pub fn load() -> Result<Config, String> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    cfg.control
        .validate()
        .map_err(|e| format!("Invalid control settings: {e}"))?;
    Ok(cfg)
}

/// Load the config from a specific path. Returns `None` if the file does not
/// exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `PAWOS_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `PAWOS_REALTIME` | `realtime` (`true`/`false`/`1`/`0`) |
/// | `PAWOS_CALIBRATION_FILE` | `calibration_file` |
/// | `PAWOS_POWER_COOLDOWN_MS` | `control.power_cooldown_ms` |
/// | `PAWOS_MAX_TRIGGER_POLLS` | `control.max_trigger_polls` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("PAWOS_REALTIME") {
        match v.trim() {
            "1" | "true" => cfg.realtime = true,
            "0" | "false" => cfg.realtime = false,
            _ => {}
        }
    }
    if let Ok(v) = std::env::var("PAWOS_CALIBRATION_FILE")
        && !v.is_empty()
    {
        cfg.calibration_file = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("PAWOS_POWER_COOLDOWN_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.control.power_cooldown_ms = ms;
    }
    if let Ok(v) = std::env::var("PAWOS_MAX_TRIGGER_POLLS")
        && let Ok(polls) = v.parse::<u32>()
    {
        cfg.control.max_trigger_polls = polls;
    }
}

/// Write the config to `~/.pawos/config.toml`, creating the directory if
/// necessary.
pub fn save(cfg: &Config) -> Result<PathBuf, String> {
    let path = config_path();
    save_to(cfg, &path)?;
    Ok(path)
}

/// Write the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
