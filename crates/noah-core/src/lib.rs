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

//! Noah Optimizer core - balances Growatt Noah battery discharge against
//! household consumption.

pub mod availability;
pub mod command;
pub mod config;
pub mod control_loop;
pub mod distribution;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod traits;
pub mod window;

pub use availability::Availability;
pub use config::{DEFAULT_ADJUSTMENT_INTERVAL_SECS, DeviceConfig, OptimizerConfig};
pub use control_loop::{ControlLoop, CycleOutcome};
pub use distribution::{DeviceEvaluation, DistributionReport, share_per_device};
pub use error::{ConfigError, ConfigResult};
pub use traits::{Clock, EntityStateSource, OutputController, SystemClock, parse_numeric_state};
pub use window::{ChargingWindow, is_excluded};
