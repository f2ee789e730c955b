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

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Local, NaiveTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Read access to the home automation entity store.
/// Business logic uses this trait, never knows about HA REST details
#[async_trait]
pub trait EntityStateSource: Send + Sync {
    /// Read the raw state text of an entity (e.g. "42.5", "unavailable")
    async fn get_state(&self, entity_id: &str) -> Result<String>;

    /// Check whether an entity is known to the platform (startup validation only)
    async fn entity_exists(&self, entity_id: &str) -> Result<bool>;

    /// Get data source name for logging
    fn name(&self) -> &str;
}

/// Write access to the Noah output power controls
#[async_trait]
pub trait OutputController: Send + Sync {
    /// Command the output power of a number entity, in watts
    async fn set_output(&self, entity_id: &str, watts: i64) -> Result<()>;

    /// Get controller name for logging
    fn name(&self) -> &str;
}

/// Source of the current wall-clock time of day
pub trait Clock: Send + Sync {
    fn local_time(&self) -> NaiveTime;
}

/// Wall clock, optionally pinned to the Home Assistant timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    timezone: Option<Tz>,
}

impl SystemClock {
    /// Clock in the host's local timezone
    pub fn local() -> Self {
        Self { timezone: None }
    }

    /// Clock in the given IANA timezone (e.g. "Europe/Prague").
    /// Unknown names fall back to the host's local timezone.
    pub fn with_timezone_name(name: &str) -> Self {
        match name.parse::<Tz>() {
            Ok(tz) => Self { timezone: Some(tz) },
            Err(e) => {
                warn!("Unknown timezone '{}' ({}), using host local time", name, e);
                Self::local()
            }
        }
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
    }
}

impl Clock for SystemClock {
    fn local_time(&self) -> NaiveTime {
        match self.timezone {
            Some(tz) => Utc::now().with_timezone(&tz).time(),
            None => Local::now().time(),
        }
    }
}

/// Parse an entity state as a number.
///
/// Home Assistant reports missing data as text ("unavailable", "unknown") so
/// anything that is not a finite number counts as a read failure.
pub fn parse_numeric_state(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
