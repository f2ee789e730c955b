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

//! Control loop driver
//!
//! One call to [`ControlLoop::run_cycle`] is one evaluation: check the charging
//! window, read the household consumption and distribute it. Nothing is kept
//! between cycles; the caller decides how often cycles run.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::OptimizerConfig;
use crate::distribution::{self, DistributionReport};
use crate::error::{ConfigError, ConfigResult};
use crate::traits::{Clock, EntityStateSource, OutputController, parse_numeric_state};

/// How a single cycle ended
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CycleOutcome {
    /// Inside the charging window, nothing was read or commanded
    InExclusionWindow,
    /// Consumption sensor unreadable, no device was touched
    ConsumptionUnavailable,
    /// Distribution ran (possibly with no eligible device)
    Distributed(DistributionReport),
}

/// Configured optimizer, ready to be driven by a periodic scheduler
pub struct ControlLoop {
    config: OptimizerConfig,
    states: Arc<dyn EntityStateSource>,
    controller: Arc<dyn OutputController>,
    clock: Arc<dyn Clock>,
}

impl ControlLoop {
    /// Build the loop and run startup validation.
    ///
    /// Fails when the consumption sensor is unknown to the platform; in that
    /// case no cycle must ever run.
    pub async fn initialize(
        config: OptimizerConfig,
        states: Arc<dyn EntityStateSource>,
        controller: Arc<dyn OutputController>,
        clock: Arc<dyn Clock>,
    ) -> ConfigResult<Self> {
        let sensor = config.consumption_sensor().to_owned();
        match states.entity_exists(&sensor).await {
            Ok(true) => {}
            Ok(false) => {
                error!("Consumption sensor not found: {}", sensor);
                return Err(ConfigError::ConsumptionSensorNotFound(sensor));
            }
            Err(e) => {
                error!("Could not verify consumption sensor {}: {:#}", sensor, e);
                return Err(ConfigError::ConsumptionSensorCheckFailed {
                    entity_id: sensor,
                    reason: format!("{e:#}"),
                });
            }
        }

        let window = config.charging_window();
        if window.is_empty() {
            warn!(
                "Charging window {} is empty (start is not before end); overnight windows are not supported, output will be adjusted all day",
                window
            );
        }

        info!(
            "Noah Output Optimizer initialized. Adjusting every {} seconds.",
            config.adjustment_interval().as_secs()
        );
        info!(
            "Charging window is from {}. No adjustments will be made during this time.",
            window
        );
        for device in config.devices() {
            info!(
                "   Device '{}': soc={}, output={}, min_soc={}%",
                device.name, device.soc_sensor, device.output_control_entity, device.min_soc
            );
        }
        debug!(
            "States via {}, commands via {}",
            states.name(),
            controller.name()
        );

        Ok(Self {
            config,
            states,
            controller,
            clock,
        })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Run one evaluation cycle. Never fails; problems are logged and the
    /// next scheduled cycle is the retry.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let now = self.clock.local_time();
        if self.config.charging_window().contains(now) {
            debug!("Within charging window. Skipping adjustment.");
            return CycleOutcome::InExclusionWindow;
        }

        let Some(total_consumption) = self.read_consumption().await else {
            return CycleOutcome::ConsumptionUnavailable;
        };
        debug!("Current total consumption: {} W", total_consumption);

        let report = distribution::distribute(
            total_consumption,
            self.config.devices(),
            self.states.as_ref(),
            self.controller.as_ref(),
        )
        .await;
        CycleOutcome::Distributed(report)
    }

    async fn read_consumption(&self) -> Option<f64> {
        let sensor = self.config.consumption_sensor();
        match self.states.get_state(sensor).await {
            Ok(raw) => {
                let value = parse_numeric_state(&raw);
                if value.is_none() {
                    warn!(
                        "Could not get valid consumption value from {}: '{}'",
                        sensor, raw
                    );
                }
                value
            }
            Err(e) => {
                warn!(
                    "Could not get valid consumption value from {}: {:#}",
                    sensor, e
                );
                None
            }
        }
    }
}

impl fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlLoop")
            .field("config", &self.config)
            .field("states", &self.states.name())
            .field("controller", &self.controller.name())
            .finish_non_exhaustive()
    }
}
