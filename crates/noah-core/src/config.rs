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

//! Validated optimizer configuration
//!
//! Built once at startup and never mutated afterwards. The raw file format is
//! owned by the binary; this module only holds the checked result.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::window::ChargingWindow;

/// Default adjustment interval when none is configured (seconds)
pub const DEFAULT_ADJUSTMENT_INTERVAL_SECS: u64 = 60;

/// Configuration for a single Noah battery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Friendly name used in log lines
    pub name: String,

    /// State of charge sensor (percent)
    pub soc_sensor: String,

    /// Writable number entity controlling output power (W)
    pub output_control_entity: String,

    /// Device is only used while its SoC is strictly above this value (percent)
    pub min_soc: f64,
}

impl DeviceConfig {
    pub fn new(
        name: impl Into<String>,
        soc_sensor: impl Into<String>,
        output_control_entity: impl Into<String>,
        min_soc: f64,
    ) -> Self {
        Self {
            name: name.into(),
            soc_sensor: soc_sensor.into(),
            output_control_entity: output_control_entity.into(),
            min_soc,
        }
    }

    fn validate(&self, index: usize) -> ConfigResult<()> {
        let invalid = |reason: &str| ConfigError::InvalidDevice {
            index,
            reason: reason.to_owned(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if self.soc_sensor.trim().is_empty() {
            return Err(invalid("soc_sensor cannot be empty"));
        }
        if self.output_control_entity.trim().is_empty() {
            return Err(invalid("output_control_entity cannot be empty"));
        }
        if !self.min_soc.is_finite() {
            return Err(invalid("min_soc must be a number"));
        }
        Ok(())
    }
}

/// Immutable, validated configuration of the optimizer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizerConfig {
    adjustment_interval: Duration,
    consumption_sensor: String,
    charging_window: ChargingWindow,
    devices: Vec<DeviceConfig>,
}

impl OptimizerConfig {
    /// Validate and freeze the configuration.
    ///
    /// Device order is kept as given; it only affects the order of log lines
    /// and commands.
    pub fn new(
        adjustment_interval: Duration,
        consumption_sensor: impl Into<String>,
        charging_window: ChargingWindow,
        devices: Vec<DeviceConfig>,
    ) -> ConfigResult<Self> {
        let consumption_sensor = consumption_sensor.into();

        if consumption_sensor.trim().is_empty() {
            return Err(ConfigError::MissingConsumptionSensor);
        }
        if devices.is_empty() {
            return Err(ConfigError::NoDevices);
        }
        if adjustment_interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }
        for (index, device) in devices.iter().enumerate() {
            device.validate(index)?;
        }

        Ok(Self {
            adjustment_interval,
            consumption_sensor,
            charging_window,
            devices,
        })
    }

    pub fn adjustment_interval(&self) -> Duration {
        self.adjustment_interval
    }

    pub fn consumption_sensor(&self) -> &str {
        &self.consumption_sensor
    }

    pub fn charging_window(&self) -> ChargingWindow {
        self.charging_window
    }

    pub fn devices(&self) -> &[DeviceConfig] {
        &self.devices
    }
}
