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

use crate::errors::{HaError, HaResult};
use crate::types::HaEntityState;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

const SUPERVISOR_URL: &str = "http://supervisor/core";
const DEFAULT_BASE_URL: &str = "http://localhost:8123";

/// Home Assistant REST API client
///
/// Makes a single attempt per request unless retries are enabled with
/// [`HomeAssistantClient::with_retry_config`]. The control loop relies on
/// its fixed schedule instead of retrying inside a cycle.
#[derive(Clone)]
pub struct HomeAssistantClient {
    base_url: String,
    token: String,
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HomeAssistantClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> HaResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HaError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: token.into(),
            client,
            max_retries: 1,
            retry_delay: Duration::from_millis(500),
        })
    }

    /// Create HA client using the Supervisor API token.
    /// This is the standard method when running as an HA add-on
    pub fn from_supervisor() -> HaResult<Self> {
        let token = std::env::var("SUPERVISOR_TOKEN").map_err(|_| {
            HaError::ConfigError(
                "SUPERVISOR_TOKEN environment variable not set. Are you running as an HA addon?"
                    .to_owned(),
            )
        })?;

        info!("Initializing HA client using Supervisor API");
        Self::new(SUPERVISOR_URL, token)
    }

    /// Create HA client from configuration values.
    /// Falls back to HA_BASE_URL / HA_TOKEN environment variables
    pub fn from_config(ha_base_url: Option<String>, ha_token: Option<String>) -> HaResult<Self> {
        let base_url = ha_base_url
            .or_else(|| std::env::var("HA_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());

        let token = ha_token
            .or_else(|| std::env::var("HA_TOKEN").ok())
            .ok_or_else(|| {
                HaError::ConfigError(
                    "HA token not found in config or HA_TOKEN environment variable".to_owned(),
                )
            })?;

        info!("Initializing HA client from configuration: {}", base_url);
        Self::new(base_url, token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Get the state of a specific entity
    pub async fn get_state(&self, entity_id: &str) -> HaResult<HaEntityState> {
        let url = format!("{}/api/states/{}", self.base_url, entity_id);
        debug!("🔍 [HA QUERY] Getting state for entity: {}", entity_id);

        let response = self
            .retry_request(|| async { self.client.get(&url).bearer_auth(&self.token).send().await })
            .await?;

        match response.status() {
            StatusCode::OK => {
                let state = response.json::<HaEntityState>().await?;
                debug!("✅ [HA RESULT] Entity: {} = '{}'", entity_id, state.state);
                trace!("   Attributes: {:?}", state.attributes);
                Ok(state)
            }
            StatusCode::NOT_FOUND => Err(HaError::EntityNotFound(entity_id.to_owned())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("❌ [HA ERROR] Authentication failed for entity: {}", entity_id);
                Err(HaError::AuthenticationFailed)
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                error!("❌ [HA ERROR] Status {}: {}", status, message);
                Err(HaError::ApiError {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    /// Check whether Home Assistant knows the entity
    pub async fn entity_exists(&self, entity_id: &str) -> HaResult<bool> {
        match self.get_state(entity_id).await {
            Ok(_) => Ok(true),
            Err(HaError::EntityNotFound(_)) => {
                debug!("Entity {} does not exist", entity_id);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Call a Home Assistant service
    ///
    /// # Arguments
    /// * `service` - Service name in format "domain.service" (e.g., "number.set_value")
    /// * `data` - JSON data to send with the service call
    ///
    /// # Example
    /// ```no_run
    /// # use noah_ha::client::HomeAssistantClient;
    /// # use serde_json::json;
    /// # async fn example() {
    /// # let client = HomeAssistantClient::from_config(None, Some("token".to_owned())).unwrap();
    /// client.call_service(
    ///     "number.set_value",
    ///     json!({
    ///         "entity_id": "number.growatt_noah_2000_output_power",
    ///         "value": 400
    ///     })
    /// ).await.unwrap();
    /// # }
    /// ```
    pub async fn call_service(&self, service: &str, data: Value) -> HaResult<()> {
        let Some((domain, name)) = service.split_once('.') else {
            error!("❌ [HA ERROR] Invalid service format: {}", service);
            return Err(HaError::ServiceCallFailed {
                service: service.to_owned(),
                reason: "Invalid service format, expected 'domain.service'".to_owned(),
            });
        };
        if domain.is_empty() || name.is_empty() || name.contains('.') {
            return Err(HaError::ServiceCallFailed {
                service: service.to_owned(),
                reason: "Invalid service format, expected 'domain.service'".to_owned(),
            });
        }

        let url = format!("{}/api/services/{}/{}", self.base_url, domain, name);
        debug!("📞 [HA SERVICE] Calling: {} with {}", service, data);

        let response = self
            .retry_request(|| async {
                self.client
                    .post(&url)
                    .bearer_auth(&self.token)
                    .json(&data)
                    .send()
                    .await
            })
            .await?;

        match response.status() {
            StatusCode::OK => {
                debug!("✅ [HA SERVICE] Success: {}", service);
                Ok(())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("❌ [HA SERVICE] Authentication failed for: {}", service);
                Err(HaError::AuthenticationFailed)
            }
            status => {
                let reason = response.text().await.unwrap_or_default();
                error!("❌ [HA SERVICE] Failed: {} (status: {})", service, status);
                Err(HaError::ServiceCallFailed {
                    service: service.to_owned(),
                    reason,
                })
            }
        }
    }

    /// Health check - ping HA API
    pub async fn ping(&self) -> HaResult<bool> {
        let url = format!("{}/api/", self.base_url);
        debug!("Performing health check");

        match self.client.get(&url).bearer_auth(&self.token).send().await {
            Ok(response) => {
                let is_ok = response.status().is_success();
                if !is_ok {
                    warn!("Health check failed: status {}", response.status());
                }
                Ok(is_ok)
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                Ok(false)
            }
        }
    }

    /// Get Home Assistant timezone from `/api/config`
    pub async fn get_timezone(&self) -> HaResult<String> {
        let url = format!("{}/api/config", self.base_url);
        let response = self
            .retry_request(|| async { self.client.get(&url).bearer_auth(&self.token).send().await })
            .await?;

        let config = match response.status() {
            StatusCode::OK => response.json::<Value>().await?,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(HaError::AuthenticationFailed);
            }
            status => {
                return Err(HaError::ApiError {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }
        };

        config
            .get("time_zone")
            .and_then(|tz| tz.as_str())
            .map(|tz| {
                info!("🌍 Home Assistant timezone: {}", tz);
                tz.to_owned()
            })
            .ok_or_else(|| HaError::ConfigError("Timezone not found in HA config".to_owned()))
    }

    /// Send a request, retrying transport errors with exponential backoff
    /// when more than one attempt is configured
    async fn retry_request<F, Fut>(&self, mut request_fn: F) -> HaResult<reqwest::Response>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempts = 0;
        let mut delay = self.retry_delay;

        loop {
            attempts += 1;
            match request_fn().await {
                Ok(response) => return Ok(response),
                Err(e) if attempts >= self.max_retries => {
                    error!("Request failed after {} attempts: {}", attempts, e);
                    return Err(HaError::HttpError(e));
                }
                Err(e) => {
                    warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempts, self.max_retries, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    /// Allow up to `max_retries` attempts per request, doubling `retry_delay`
    /// between them
    #[must_use]
    pub fn with_retry_config(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }
}

impl fmt::Debug for HomeAssistantClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HomeAssistantClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}
