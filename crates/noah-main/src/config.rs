// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Noah Optimizer.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use anyhow::{Context, Result};
use noah_core::{
    ChargingWindow, ConfigResult, DEFAULT_ADJUSTMENT_INTERVAL_SECS, DeviceConfig, OptimizerConfig,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// HA add-on options written by the Supervisor
const ADDON_OPTIONS_PATH: &str = "/data/options.json";

/// Application configuration as stored in add-on options or a config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// How often to run the adjustment logic (seconds)
    #[serde(default = "default_adjustment_interval")]
    pub adjustment_interval: u64,

    /// Total household power consumption sensor
    #[serde(default)]
    pub consumption_sensor: Option<String>,

    /// No adjustments are made between these times (HH:MM:SS)
    #[serde(default = "default_charging_start_time")]
    pub charging_start_time: String,

    #[serde(default = "default_charging_end_time")]
    pub charging_end_time: String,

    /// Noah devices to control
    #[serde(default)]
    pub noah_devices: Vec<DeviceConfig>,

    /// Home Assistant base URL (optional, defaults to supervisor)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ha_base_url: Option<String>,

    /// Home Assistant token (optional, uses SUPERVISOR_TOKEN if not set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ha_token: Option<String>,

    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Only log output commands instead of sending them
    #[serde(default)]
    pub debug_mode: bool,
}

fn default_adjustment_interval() -> u64 {
    DEFAULT_ADJUSTMENT_INTERVAL_SECS
}

fn default_charging_start_time() -> String {
    "08:00:00".to_owned()
}

fn default_charging_end_time() -> String {
    "20:00:00".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            adjustment_interval: default_adjustment_interval(),
            consumption_sensor: None,
            charging_start_time: default_charging_start_time(),
            charging_end_time: default_charging_end_time(),
            noah_devices: Vec::new(),
            ha_base_url: None,
            ha_token: None,
            log_level: default_log_level(),
            debug_mode: false,
        }
    }
}

/// Where the configuration was loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Environment,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Environment => write!(f, "defaults with environment overrides"),
        }
    }
}

impl AppConfig {
    /// Load configuration from an explicit path, the HA add-on options, or a
    /// config file in the working directory.
    ///
    /// Runs before logging is set up, so the source is returned for the
    /// caller to report.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, ConfigSource::File(path.to_owned())));
        }

        for candidate in [
            PathBuf::from(ADDON_OPTIONS_PATH),
            PathBuf::from("config.toml"),
            PathBuf::from("config.json"),
        ] {
            if candidate.exists() {
                let config = Self::from_file(&candidate)?;
                return Ok((config, ConfigSource::File(candidate)));
            }
        }

        Ok((Self::from_env(), ConfigSource::Environment))
    }

    /// Parse a config file; `.toml` files are TOML, anything else JSON
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: AppConfig = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        };
        Ok(config)
    }

    /// Defaults with environment variable overrides (development/testing)
    fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(sensor) = std::env::var("CONSUMPTION_SENSOR") {
            config.consumption_sensor = Some(sensor);
        }
        if let Ok(interval) = std::env::var("ADJUSTMENT_INTERVAL")
            && let Ok(secs) = interval.parse::<u64>()
        {
            config.adjustment_interval = secs;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Ok(url) = std::env::var("HA_BASE_URL") {
            config.ha_base_url = Some(url);
        }
        if let Ok(token) = std::env::var("HA_TOKEN") {
            config.ha_token = Some(token);
        }

        config
    }

    /// Validate and convert into the immutable core configuration
    pub fn to_optimizer_config(&self) -> ConfigResult<OptimizerConfig> {
        let window = ChargingWindow::parse(&self.charging_start_time, &self.charging_end_time)?;

        OptimizerConfig::new(
            Duration::from_secs(self.adjustment_interval),
            self.consumption_sensor.clone().unwrap_or_default(),
            window,
            self.noah_devices.clone(),
        )
    }
}
