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

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, trace};

use crate::client::HomeAssistantClient;
use noah_core::{EntityStateSource, OutputController};

/// Service used to command Noah output power (number entities)
pub const SET_VALUE_SERVICE: &str = "number.set_value";

/// Home Assistant adapter implementing the optimizer's state and control seams
#[derive(Debug, Clone)]
pub struct HomeAssistantAdapter {
    client: Arc<HomeAssistantClient>,
    debug_mode: bool,
}

impl HomeAssistantAdapter {
    pub fn new(client: Arc<HomeAssistantClient>) -> Self {
        Self {
            client,
            debug_mode: false,
        }
    }

    /// In debug mode output commands are only logged, never sent
    #[must_use]
    pub fn with_debug_mode(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    pub fn is_debug_mode(&self) -> bool {
        self.debug_mode
    }

    /// Get reference to the underlying HA client
    pub fn client(&self) -> &Arc<HomeAssistantClient> {
        &self.client
    }
}

#[async_trait]
impl EntityStateSource for HomeAssistantAdapter {
    async fn get_state(&self, entity_id: &str) -> Result<String> {
        let state = self
            .client
            .get_state(entity_id)
            .await
            .with_context(|| format!("Failed to read entity: {entity_id}"))?;

        trace!(
            "{} = '{}' {}",
            entity_id,
            state.state,
            state.unit_of_measurement().unwrap_or_default()
        );
        Ok(state.state)
    }

    async fn entity_exists(&self, entity_id: &str) -> Result<bool> {
        self.client
            .entity_exists(entity_id)
            .await
            .with_context(|| format!("Failed to look up entity: {entity_id}"))
    }

    fn name(&self) -> &str {
        "Home Assistant"
    }
}

#[async_trait]
impl OutputController for HomeAssistantAdapter {
    async fn set_output(&self, entity_id: &str, watts: i64) -> Result<()> {
        if self.debug_mode {
            info!(
                "🔍 DEBUG MODE: would call {} on {} with value {}",
                SET_VALUE_SERVICE, entity_id, watts
            );
            return Ok(());
        }

        self.client
            .call_service(
                SET_VALUE_SERVICE,
                json!({
                    "entity_id": entity_id,
                    "value": watts
                }),
            )
            .await
            .with_context(|| format!("Failed to set {entity_id} to {watts} W"))
    }

    fn name(&self) -> &str {
        if self.debug_mode {
            "Home Assistant (debug mode)"
        } else {
            "Home Assistant"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    async fn adapter(server: &Server) -> HomeAssistantAdapter {
        let client = HomeAssistantClient::new(server.url(), "test_token").unwrap();
        HomeAssistantAdapter::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_get_state_returns_raw_text() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/states/sensor.noah_soc")
            .with_status(200)
            .with_body(
                json!({
                    "entity_id": "sensor.noah_soc",
                    "state": "unavailable",
                    "attributes": {}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let adapter = adapter(&server).await;

        assert_eq!(
            adapter.get_state("sensor.noah_soc").await.unwrap(),
            "unavailable"
        );
    }

    #[tokio::test]
    async fn test_get_state_missing_entity_is_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/states/sensor.gone")
            .with_status(404)
            .create_async()
            .await;

        let adapter = adapter(&server).await;

        assert!(adapter.get_state("sensor.gone").await.is_err());
        assert!(!adapter.entity_exists("sensor.gone").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_output_calls_number_set_value() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/services/number/set_value")
            .match_body(Matcher::Json(json!({
                "entity_id": "number.noah_output_power",
                "value": 333
            })))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let adapter = adapter(&server).await;
        adapter
            .set_output("number.noah_output_power", 333)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_debug_mode_sends_nothing() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/services/number/set_value")
            .expect(0)
            .create_async()
            .await;

        let adapter = adapter(&server).await.with_debug_mode(true);
        adapter
            .set_output("number.noah_output_power", 250)
            .await
            .unwrap();

        assert!(adapter.is_debug_mode());
        assert_eq!(OutputController::name(&adapter), "Home Assistant (debug mode)");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_command_is_sent_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/services/number/set_value")
            .with_status(502)
            .expect(1)
            .create_async()
            .await;

        let adapter = adapter(&server).await;

        assert!(
            adapter
                .set_output("number.noah_output_power", 400)
                .await
                .is_err()
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_debug_output_hides_token() {
        let server = Server::new_async().await;
        let adapter = adapter(&server).await;

        assert!(!format!("{adapter:?}").contains("test_token"));
    }
}
