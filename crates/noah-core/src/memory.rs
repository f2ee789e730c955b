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

//! In-memory implementations of the capability traits for tests
//!
//! Only compiled for this crate's tests or with the `test-util` feature.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveTime;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};

use crate::traits::{Clock, EntityStateSource, OutputController};

/// Entity store backed by a map; every read is recorded
#[derive(Debug, Default)]
pub struct InMemoryStates {
    states: RwLock<HashMap<String, String>>,
    reads: Mutex<Vec<String>>,
}

impl InMemoryStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(self, entity_id: &str, state: impl ToString) -> Self {
        self.set(entity_id, state);
        self
    }

    pub fn set(&self, entity_id: &str, state: impl ToString) {
        self.states
            .write()
            .insert(entity_id.to_owned(), state.to_string());
    }

    pub fn remove(&self, entity_id: &str) {
        self.states.write().remove(entity_id);
    }

    /// Entity ids read so far, in order
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().clone()
    }

    pub fn clear_reads(&self) {
        self.reads.lock().clear();
    }
}

#[async_trait]
impl EntityStateSource for InMemoryStates {
    async fn get_state(&self, entity_id: &str) -> Result<String> {
        self.reads.lock().push(entity_id.to_owned());
        self.states
            .read()
            .get(entity_id)
            .cloned()
            .ok_or_else(|| anyhow!("Entity not found: {entity_id}"))
    }

    async fn entity_exists(&self, entity_id: &str) -> Result<bool> {
        Ok(self.states.read().contains_key(entity_id))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// Controller that records every command instead of sending it
#[derive(Debug, Default)]
pub struct RecordingController {
    commands: Mutex<Vec<(String, i64)>>,
    failing: RwLock<HashSet<String>>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every command to `entity_id` fail (after being recorded)
    pub fn fail_on(&self, entity_id: &str) {
        self.failing.write().insert(entity_id.to_owned());
    }

    /// Commands issued so far as (entity_id, watts), in order
    pub fn commands(&self) -> Vec<(String, i64)> {
        self.commands.lock().clone()
    }

    pub fn commands_for(&self, entity_id: &str) -> Vec<i64> {
        self.commands
            .lock()
            .iter()
            .filter(|(entity, _)| entity == entity_id)
            .map(|(_, watts)| *watts)
            .collect()
    }

    pub fn clear(&self) {
        self.commands.lock().clear();
    }
}

#[async_trait]
impl OutputController for RecordingController {
    async fn set_output(&self, entity_id: &str, watts: i64) -> Result<()> {
        self.commands.lock().push((entity_id.to_owned(), watts));
        if self.failing.read().contains(entity_id) {
            return Err(anyhow!("Simulated command failure for {entity_id}"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Clock frozen at a settable time of day
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveTime>,
}

impl FixedClock {
    pub fn new(now: NaiveTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock at `hour:minute:second`; out-of-range values clamp to midnight
    pub fn at(hour: u32, minute: u32, second: u32) -> Self {
        Self::new(NaiveTime::from_hms_opt(hour, minute, second).unwrap_or(NaiveTime::MIN))
    }

    pub fn set(&self, now: NaiveTime) {
        *self.now.lock() = now;
    }
}

impl Clock for FixedClock {
    fn local_time(&self) -> NaiveTime {
        *self.now.lock()
    }
}
