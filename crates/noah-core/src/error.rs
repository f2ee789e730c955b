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

//! Error types for the optimizer core

use thiserror::Error;

/// Configuration problems detected before the control loop starts.
///
/// Any of these aborts initialization: no cycle is ever run with an invalid
/// configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("consumption sensor is not configured")]
    MissingConsumptionSensor,

    #[error("consumption sensor '{0}' does not exist in Home Assistant")]
    ConsumptionSensorNotFound(String),

    #[error("could not verify consumption sensor '{entity_id}': {reason}")]
    ConsumptionSensorCheckFailed { entity_id: String, reason: String },

    #[error("no Noah devices configured")]
    NoDevices,

    #[error("adjustment_interval must be greater than zero")]
    InvalidInterval,

    #[error("{field} has invalid time '{value}', expected HH:MM:SS")]
    InvalidTime { field: &'static str, value: String },

    #[error("noah_devices[{index}]: {reason}")]
    InvalidDevice { index: usize, reason: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
