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

//! Per-device availability check based on state of charge

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::command::set_device_output;
use crate::config::DeviceConfig;
use crate::traits::{EntityStateSource, OutputController, parse_numeric_state};

/// Result of checking one device for the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Availability {
    /// SoC above the configured minimum, device takes a share of the load
    Available { soc: f64 },
    /// SoC at or below the minimum, device has been commanded to 0 W
    BelowMinimum { soc: f64 },
    /// SoC could not be read, device left untouched
    Unreadable,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// Decide whether `device` may supply output this cycle.
///
/// A device at or below its minimum SoC is commanded to 0 W before this
/// returns. A device whose SoC cannot be read gets no command at all: missing
/// data is not a reason to switch a battery off.
pub async fn evaluate(
    device: &DeviceConfig,
    states: &dyn EntityStateSource,
    controller: &dyn OutputController,
) -> Availability {
    let raw = match states.get_state(&device.soc_sensor).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(
                "Could not get valid SoC from {} for '{}': {:#}",
                device.soc_sensor, device.name, e
            );
            return Availability::Unreadable;
        }
    };

    let Some(soc) = parse_numeric_state(&raw) else {
        warn!(
            "Could not get valid SoC from {} for '{}': '{}'",
            device.soc_sensor, device.name, raw
        );
        return Availability::Unreadable;
    };

    if soc > device.min_soc {
        debug!(
            "Device '{}' available ({}% > {}%)",
            device.name, soc, device.min_soc
        );
        return Availability::Available { soc };
    }

    info!(
        "Device '{}' is below minimum SoC ({}% <= {}%). Not using.",
        device.name, soc, device.min_soc
    );
    set_device_output(controller, device, 0).await;
    Availability::BelowMinimum { soc }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryStates, RecordingController};

    fn noah(min_soc: f64) -> DeviceConfig {
        DeviceConfig::new(
            "Noah Living Room",
            "sensor.noah_soc",
            "number.noah_output_power",
            min_soc,
        )
    }

    #[tokio::test]
    async fn test_available_above_minimum() {
        let states = InMemoryStates::new().with_state("sensor.noah_soc", "55.5");
        let controller = RecordingController::new();

        let result = evaluate(&noah(15.0), &states, &controller).await;

        assert_eq!(result, Availability::Available { soc: 55.5 });
        assert!(result.is_available());
        assert!(controller.commands().is_empty());
    }

    #[tokio::test]
    async fn test_below_minimum_commands_zero() {
        let states = InMemoryStates::new().with_state("sensor.noah_soc", "10");
        let controller = RecordingController::new();

        let result = evaluate(&noah(15.0), &states, &controller).await;

        assert_eq!(result, Availability::BelowMinimum { soc: 10.0 });
        assert_eq!(
            controller.commands(),
            vec![("number.noah_output_power".to_owned(), 0)]
        );
    }

    #[tokio::test]
    async fn test_equal_to_minimum_is_excluded() {
        let states = InMemoryStates::new().with_state("sensor.noah_soc", "15");
        let controller = RecordingController::new();

        let result = evaluate(&noah(15.0), &states, &controller).await;

        assert!(!result.is_available());
        assert_eq!(controller.commands_for("number.noah_output_power"), vec![0]);
    }

    #[tokio::test]
    async fn test_unavailable_sensor_issues_no_command() {
        let states = InMemoryStates::new().with_state("sensor.noah_soc", "unavailable");
        let controller = RecordingController::new();

        let result = evaluate(&noah(15.0), &states, &controller).await;

        assert_eq!(result, Availability::Unreadable);
        assert!(controller.commands().is_empty());
    }

    #[tokio::test]
    async fn test_missing_sensor_issues_no_command() {
        let states = InMemoryStates::new();
        let controller = RecordingController::new();

        let result = evaluate(&noah(15.0), &states, &controller).await;

        assert_eq!(result, Availability::Unreadable);
        assert!(controller.commands().is_empty());
    }

    #[tokio::test]
    async fn test_failed_zero_command_still_excludes() {
        let states = InMemoryStates::new().with_state("sensor.noah_soc", "5");
        let controller = RecordingController::new();
        controller.fail_on("number.noah_output_power");

        let result = evaluate(&noah(15.0), &states, &controller).await;

        assert_eq!(result, Availability::BelowMinimum { soc: 5.0 });
    }
}
