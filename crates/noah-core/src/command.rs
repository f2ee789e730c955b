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

use tracing::{error, info};

use crate::config::DeviceConfig;
use crate::traits::OutputController;

/// Command the output power of one device.
///
/// Failures are logged and reported through the return value only, so one
/// device can never stop the others from being commanded.
pub async fn set_device_output(
    controller: &dyn OutputController,
    device: &DeviceConfig,
    watts: i64,
) -> bool {
    info!(
        "Setting output for '{}' ({}) to {} W",
        device.name, device.output_control_entity, watts
    );

    match controller
        .set_output(&device.output_control_entity, watts)
        .await
    {
        Ok(()) => true,
        Err(e) => {
            error!(
                "Failed to set output for '{}' ({}) via {}: {:#}",
                device.name,
                device.output_control_entity,
                controller.name(),
                e
            );
            false
        }
    }
}
