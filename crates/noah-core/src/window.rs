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

//! Charging window gate
//!
//! During the charging window the optimizer leaves the Noah devices alone: no
//! sensor is read and no output is commanded.

use chrono::NaiveTime;
use serde::Serialize;
use std::fmt;

use crate::error::{ConfigError, ConfigResult};

/// Returns true when `now` lies in `[start, end)`.
///
/// The interval is interpreted within a single day. A window with
/// `start >= end` is empty, overnight windows are not wrapped.
pub fn is_excluded(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    start <= now && now < end
}

/// Parse a time of day in `HH:MM:SS` (or `HH:MM`) form.
pub fn parse_time_of_day(field: &'static str, value: &str) -> ConfigResult<NaiveTime> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| ConfigError::InvalidTime {
            field,
            value: value.to_owned(),
        })
}

/// Time-of-day interval during which no output adjustment is made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChargingWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ChargingWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Build a window from the `charging_start_time` / `charging_end_time` strings
    pub fn parse(start: &str, end: &str) -> ConfigResult<Self> {
        Ok(Self {
            start: parse_time_of_day("charging_start_time", start)?,
            end: parse_time_of_day("charging_end_time", end)?,
        })
    }

    pub fn contains(&self, now: NaiveTime) -> bool {
        is_excluded(now, self.start, self.end)
    }

    /// True when the window can never match (start at or after end)
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl Default for ChargingWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl fmt::Display for ChargingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%H:%M:%S"),
            self.end.format("%H:%M:%S")
        )
    }
}
