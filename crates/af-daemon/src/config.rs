// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effective configuration (§3.1): loaded from a TOML file with
//! environment-variable overrides for deployment-specific values, falling
//! back to built-in defaults whenever the file is absent or invalid.

use af_core::FailureKind;
use af_engine::{DeviceDescriptor, ExplorationConfig, GuidanceConfig, OrchestratorConfig, RestPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const ENV_CONFIG_PATH: &str = "APKFARM_CONFIG";
const ENV_STATE_DIR: &str = "APKFARM_STATE_DIR";
const ENV_LOG_DIR: &str = "APKFARM_LOG_DIR";
const ENV_WORKER_COUNT: &str = "APKFARM_WORKER_COUNT";
const ENV_ADB_BIN: &str = "APKFARM_ADB_BIN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("failed to write config file {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid environment override {var}={value}: {reason}")]
    InvalidEnvOverride { var: &'static str, value: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub worker_count: usize,
    pub adb_bin: String,
    pub state_dir: PathBuf,
    pub device_pool: DevicePoolConfig,
    pub retry: RetryConfig,
    pub static_analysis: StaticAnalysisConfig,
    pub ui: UiConfig,
    pub packer: PackerConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: 4,
            adb_bin: "adb".to_string(),
            state_dir: PathBuf::from("/var/lib/apkfarm"),
            device_pool: DevicePoolConfig::default(),
            retry: RetryConfig::default(),
            static_analysis: StaticAnalysisConfig::default(),
            ui: UiConfig::default(),
            packer: PackerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicePoolConfig {
    // `devices` (an array of tables) is declared last: TOML requires every
    // scalar key in a table to precede its nested/array-of-tables keys.
    pub default_rest_interval: u32,
    pub default_rest_duration_secs: u64,
    pub health_check_interval_secs: u64,
    pub k8s_namespace: String,
    pub devices: Vec<DeviceDescriptor>,
}

impl Default for DevicePoolConfig {
    fn default() -> Self {
        let defaults = RestPolicy::default();
        Self {
            devices: Vec::new(),
            default_rest_interval: defaults.interval,
            default_rest_duration_secs: defaults.duration.as_secs(),
            health_check_interval_secs: 60,
            k8s_namespace: "apkfarm".to_string(),
        }
    }
}

impl DevicePoolConfig {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }
}

/// Per-[`FailureKind`] retry ceiling overrides (§3.1), layered on top of
/// the built-in defaults in `af_core::failure::max_retry`. Unset entries
/// keep the built-in ceiling; wiring these into `retry_policy::outcome_for`
/// is left for a future change (see DESIGN.md).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub overrides: HashMap<FailureKind, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticAnalysisConfig {
    pub deep_stage_size_threshold: u64,
    pub deep_stage_activity_threshold: u32,
    pub deep_stage_permission_threshold: u32,
    pub force_deep: bool,
    pub deep_analysis_bin_path: Option<String>,
    pub pool: Option<StaticAnalysisPoolConfig>,
}

impl Default for StaticAnalysisConfig {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            deep_stage_size_threshold: defaults.deep_stage_size_threshold,
            deep_stage_activity_threshold: defaults.deep_stage_activity_threshold,
            deep_stage_permission_threshold: defaults.deep_stage_permission_threshold,
            force_deep: defaults.force_deep_stage,
            deep_analysis_bin_path: defaults.deep_analysis_bin_path,
            pool: None,
        }
    }
}

/// Schema for the long-lived deep-analysis worker pool backend (§3.1,
/// §4.9 mode (b)). When set, `afd` spawns `worker_count` long-lived
/// `bin_path` processes up front and dispatches deep-stage requests
/// through them instead of `deep_analysis_bin_path`'s one-shot subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticAnalysisPoolConfig {
    pub worker_count: usize,
    pub bin_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub guidance_max_rounds: u32,
    pub no_guidance_marker_rounds: u32,
    pub stable_hash_rounds: u32,
    pub background_monitor_window_secs: u64,
    pub exploration_inter_action_wait_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        let guidance = GuidanceConfig::default();
        let exploration = ExplorationConfig::default();
        let orchestrator = OrchestratorConfig::default();
        Self {
            guidance_max_rounds: guidance.max_rounds,
            no_guidance_marker_rounds: guidance.no_guidance_marker_rounds,
            stable_hash_rounds: guidance.stable_hash_rounds,
            background_monitor_window_secs: orchestrator.background_monitor_window.as_secs(),
            exploration_inter_action_wait_ms: exploration.inter_action_wait.as_millis() as u64,
        }
    }
}

/// Packer-detection rule thresholds and the DEX merge-tool path (§3.1).
/// The rule confidence thresholds are presently fixed in
/// `af_adapters::packer::detect`; `merge_tool_path` documents where a real
/// merge utility would be invoked once `choose_merge_fallback` grows
/// beyond its current first-candidate fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackerConfig {
    pub merge_tool_path: Option<String>,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self { merge_tool_path: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub log_level: String,
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_dir: PathBuf::from("/var/lib/apkfarm/logs"), log_level: "info".to_string(), stderr: true }
    }
}

impl Config {
    /// Resolve the config file per §3.1's search order and load it,
    /// applying environment overrides. Never panics or fails on a missing
    /// file: an absent config falls back to [`Config::default`].
    pub fn load() -> Self {
        match Self::resolve_path() {
            Some(path) => match Self::from_file(&path) {
                Ok(mut config) => {
                    config.apply_env_overrides();
                    config
                }
                Err(err) => {
                    tracing::warn!(%err, path = %path.display(), "failed to load config file, using defaults");
                    let mut config = Self::default();
                    config.apply_env_overrides();
                    config
                }
            },
            None => {
                tracing::warn!("no config file found in search path, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Serialize and write to `path`, creating parent directories as
    /// needed. Used by `af device add` to persist registry edits back to
    /// the config file the daemon will next load.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })?;
        }
        std::fs::write(path, text).map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })
    }

    /// Resolve the config file path per §3.1's search order, without
    /// requiring the file to already exist. Used by commands (like
    /// `af device add`) that need a path to write to even when no config
    /// file has been created yet — falls back to `./apkfarm.toml`.
    pub fn resolve_path_for_write() -> PathBuf {
        Self::resolve_path().unwrap_or_else(|| PathBuf::from("apkfarm.toml"))
    }

    pub fn resolve_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            return Some(PathBuf::from(path));
        }
        let cwd_candidate = PathBuf::from("apkfarm.toml");
        if cwd_candidate.is_file() {
            return Some(cwd_candidate);
        }
        let home_candidate = dirs::home_dir().map(|home| home.join(".config/apkfarm/config.toml"));
        home_candidate.filter(|path| path.is_file())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
            self.state_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var(ENV_LOG_DIR) {
            self.logging.log_dir = PathBuf::from(dir);
        }
        if let Ok(count) = std::env::var(ENV_WORKER_COUNT) {
            match count.parse::<usize>() {
                Ok(parsed) => self.worker_count = parsed,
                Err(err) => tracing::warn!(%err, value = %count, "ignoring invalid {}", ENV_WORKER_COUNT),
            }
        }
        if let Ok(bin) = std::env::var(ENV_ADB_BIN) {
            self.adb_bin = bin;
        }
    }

    /// Build the [`OrchestratorConfig`] this daemon's orchestrators are
    /// constructed with, folding in the deep-stage and UI settings loaded
    /// from this `Config`.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let defaults = OrchestratorConfig::default();
        OrchestratorConfig {
            guidance: GuidanceConfig {
                max_rounds: self.ui.guidance_max_rounds,
                no_guidance_marker_rounds: self.ui.no_guidance_marker_rounds,
                stable_hash_rounds: self.ui.stable_hash_rounds,
                ..GuidanceConfig::default()
            },
            exploration: ExplorationConfig {
                inter_action_wait: Duration::from_millis(self.ui.exploration_inter_action_wait_ms),
                ..ExplorationConfig::default()
            },
            background_monitor_window: Duration::from_secs(self.ui.background_monitor_window_secs),
            force_deep_stage: self.static_analysis.force_deep,
            deep_stage_size_threshold: self.static_analysis.deep_stage_size_threshold,
            deep_stage_activity_threshold: self.static_analysis.deep_stage_activity_threshold,
            deep_stage_permission_threshold: self.static_analysis.deep_stage_permission_threshold,
            deep_analysis_bin_path: self.static_analysis.deep_analysis_bin_path.clone(),
            capture_dir: self.state_dir.join("captures"),
            screenshot_dir: self.state_dir.join("screenshots"),
            log_dir: self.logging.log_dir.clone(),
            ..defaults
        }
    }

    pub fn rest_policy_default(&self) -> RestPolicy {
        RestPolicy { interval: self.device_pool.default_rest_interval, duration: Duration::from_secs(self.device_pool.default_rest_duration_secs) }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
