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

//! Load distribution across available Noah devices
//!
//! The household consumption is split equally between all devices that passed
//! the availability check. Every eligible device gets the same rounded share,
//! so the commanded total can differ from the consumption by up to
//! `eligible - 1` watts.

use serde::Serialize;
use tracing::{debug, info};

use crate::availability::{self, Availability};
use crate::command::set_device_output;
use crate::config::DeviceConfig;
use crate::traits::{EntityStateSource, OutputController};

/// Availability decision for one device in a cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEvaluation {
    pub name: String,
    pub output_control_entity: String,
    pub availability: Availability,
}

/// What a distribution pass decided and commanded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionReport {
    pub total_consumption_w: f64,
    pub evaluations: Vec<DeviceEvaluation>,
    /// Share commanded to each eligible device, `None` if nothing was eligible
    pub share_w: Option<i64>,
    /// Share commands that were accepted by the controller
    pub commands_sent: usize,
    /// Share commands that failed
    pub commands_failed: usize,
}

impl DistributionReport {
    pub fn eligible_count(&self) -> usize {
        self.evaluations
            .iter()
            .filter(|e| e.availability.is_available())
            .count()
    }

    pub fn eligible_names(&self) -> Vec<&str> {
        self.evaluations
            .iter()
            .filter(|e| e.availability.is_available())
            .map(|e| e.name.as_str())
            .collect()
    }
}

/// Per-device share of `total_w`, rounded half to even.
///
/// Negative totals (net export) are passed through unchanged.
pub fn share_per_device(total_w: f64, eligible: usize) -> Option<i64> {
    if eligible == 0 {
        return None;
    }
    Some((total_w / eligible as f64).round_ties_even() as i64)
}

/// Evaluate every device, then command the equal share to the eligible ones.
///
/// All availability checks (including their zero commands) complete before any
/// share is commanded, so a device never gets both in one cycle.
pub async fn distribute(
    total_consumption_w: f64,
    devices: &[DeviceConfig],
    states: &dyn EntityStateSource,
    controller: &dyn OutputController,
) -> DistributionReport {
    let mut evaluations = Vec::with_capacity(devices.len());
    let mut eligible = Vec::new();

    for device in devices {
        let availability = availability::evaluate(device, states, controller).await;
        if availability.is_available() {
            eligible.push(device);
        }
        evaluations.push(DeviceEvaluation {
            name: device.name.clone(),
            output_control_entity: device.output_control_entity.clone(),
            availability,
        });
    }

    let mut report = DistributionReport {
        total_consumption_w,
        evaluations,
        share_w: None,
        commands_sent: 0,
        commands_failed: 0,
    };

    let Some(share) = share_per_device(total_consumption_w, eligible.len()) else {
        info!("No available Noah devices to dispatch load to");
        return report;
    };

    if total_consumption_w < 0.0 {
        debug!(
            "Consumption is negative ({} W), commanding negative share",
            total_consumption_w
        );
    }
    debug!("Calculated output per device: {} W", share);

    for device in eligible {
        if set_device_output(controller, device, share).await {
            report.commands_sent += 1;
        } else {
            report.commands_failed += 1;
        }
    }
    report.share_w = Some(share);

    info!(
        "Distributed {} W across {} device(s): {} W each ({} failed)",
        total_consumption_w,
        report.eligible_count(),
        share,
        report.commands_failed
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryStates, RecordingController};

    fn device(id: &str, min_soc: f64) -> DeviceConfig {
        DeviceConfig::new(
            format!("Noah {id}"),
            format!("sensor.noah_{id}_soc"),
            format!("number.noah_{id}_output_power"),
            min_soc,
        )
    }

    #[test]
    fn test_share_is_not_remainder_balanced() {
        assert_eq!(share_per_device(1000.0, 3), Some(333));
        assert_eq!(share_per_device(1000.0, 1), Some(1000));
        assert_eq!(share_per_device(999.6, 2), Some(500));
    }

    #[test]
    fn test_share_rounds_half_to_even() {
        assert_eq!(share_per_device(5.0, 2), Some(2));
        assert_eq!(share_per_device(7.0, 2), Some(4));
        assert_eq!(share_per_device(-5.0, 2), Some(-2));
    }

    #[test]
    fn test_share_without_devices() {
        assert_eq!(share_per_device(1000.0, 0), None);
    }

    #[test]
    fn test_negative_total_passes_through() {
        assert_eq!(share_per_device(-300.0, 2), Some(-150));
    }

    #[tokio::test]
    async fn test_equal_split_over_three_devices() {
        let devices = vec![device("a", 10.0), device("b", 10.0), device("c", 10.0)];
        let states = InMemoryStates::new()
            .with_state("sensor.noah_a_soc", 80)
            .with_state("sensor.noah_b_soc", 50)
            .with_state("sensor.noah_c_soc", 11);
        let controller = RecordingController::new();

        let report = distribute(1000.0, &devices, &states, &controller).await;

        assert_eq!(report.share_w, Some(333));
        assert_eq!(report.commands_sent, 3);
        assert_eq!(
            controller.commands(),
            vec![
                ("number.noah_a_output_power".to_owned(), 333),
                ("number.noah_b_output_power".to_owned(), 333),
                ("number.noah_c_output_power".to_owned(), 333),
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_commands_precede_shares() {
        let devices = vec![device("a", 10.0), device("b", 15.0), device("c", 10.0)];
        let states = InMemoryStates::new()
            .with_state("sensor.noah_a_soc", 80)
            .with_state("sensor.noah_b_soc", 10)
            .with_state("sensor.noah_c_soc", 60);
        let controller = RecordingController::new();

        let report = distribute(900.0, &devices, &states, &controller).await;

        assert_eq!(report.eligible_names(), vec!["Noah a", "Noah c"]);
        assert_eq!(
            controller.commands(),
            vec![
                ("number.noah_b_output_power".to_owned(), 0),
                ("number.noah_a_output_power".to_owned(), 450),
                ("number.noah_c_output_power".to_owned(), 450),
            ]
        );
    }

    #[tokio::test]
    async fn test_nothing_eligible() {
        let devices = vec![device("a", 15.0), device("b", 15.0)];
        let states = InMemoryStates::new()
            .with_state("sensor.noah_a_soc", 10)
            .with_state("sensor.noah_b_soc", 15);
        let controller = RecordingController::new();

        let report = distribute(800.0, &devices, &states, &controller).await;

        assert_eq!(report.share_w, None);
        assert_eq!(report.eligible_count(), 0);
        assert_eq!(
            controller.commands(),
            vec![
                ("number.noah_a_output_power".to_owned(), 0),
                ("number.noah_b_output_power".to_owned(), 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_unreadable_device_left_out_of_split() {
        let devices = vec![device("a", 10.0), device("b", 10.0)];
        let states = InMemoryStates::new()
            .with_state("sensor.noah_a_soc", 70)
            .with_state("sensor.noah_b_soc", "unknown");
        let controller = RecordingController::new();

        let report = distribute(600.0, &devices, &states, &controller).await;

        assert_eq!(report.share_w, Some(600));
        assert!(controller.commands_for("number.noah_b_output_power").is_empty());
        assert_eq!(report.evaluations[1].availability, Availability::Unreadable);
    }

    #[tokio::test]
    async fn test_failed_command_does_not_stop_others() {
        let devices = vec![device("a", 10.0), device("b", 10.0), device("c", 10.0)];
        let states = InMemoryStates::new()
            .with_state("sensor.noah_a_soc", 70)
            .with_state("sensor.noah_b_soc", 70)
            .with_state("sensor.noah_c_soc", 70);
        let controller = RecordingController::new();
        controller.fail_on("number.noah_a_output_power");

        let report = distribute(300.0, &devices, &states, &controller).await;

        assert_eq!(report.commands_sent, 2);
        assert_eq!(report.commands_failed, 1);
        assert_eq!(controller.commands_for("number.noah_c_output_power"), vec![100]);
    }
}
