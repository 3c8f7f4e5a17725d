//! Philips Hue bridge REST client.

use reqwest::{Client, Url};
use serde_json::Value;

use smarthome_app::ports::Lighting;
use smarthome_domain::error::HomeError;

use crate::config::HueConfig;
use crate::error::ActuatorError;
use crate::http;

const SERVICE: &str = "hue";

/// Lighting backed by a Hue bridge.
pub struct HueBridge {
    client: Client,
    api: Url,
}

impl HueBridge {
    /// # Errors
    ///
    /// Returns [`ActuatorError::InvalidBaseUrl`] if the bridge address is unusable.
    pub fn new(client: Client, config: &HueConfig) -> Result<Self, ActuatorError> {
        let base = http::base_url(&config.bridge)?;
        let api = http::endpoint(&base, &["api", config.username.as_str()])?;
        Ok(Self { client, api })
    }

    fn light_url(&self, light: &str) -> Result<Url, ActuatorError> {
        http::endpoint(&self.api, &["lights", light, "state"])
    }

    fn group_url(&self, group: &str) -> Result<Url, ActuatorError> {
        http::endpoint(&self.api, &["groups", group, "action"])
    }

    async fn put(&self, url: Url, state: &Value) -> Result<(), ActuatorError> {
        let response = self
            .client
            .put(url)
            .json(state)
            .send()
            .await
            .map_err(|source| ActuatorError::Request {
                service: SERVICE,
                source,
            })?;
        http::check_status(SERVICE, &response)?;
        let body: Value = response
            .json()
            .await
            .map_err(|source| ActuatorError::Request {
                service: SERVICE,
                source,
            })?;
        match rejection(&body) {
            Some(reason) => Err(ActuatorError::Rejected {
                service: SERVICE,
                reason,
            }),
            None => Ok(()),
        }
    }
}

/// The bridge answers 200 with a list of `{"success": ..}` / `{"error": ..}`
/// entries; the first error description, if any.
fn rejection(body: &Value) -> Option<String> {
    body.as_array()?
        .iter()
        .find_map(|entry| entry.get("error"))
        .map(|error| {
            error
                .get("description")
                .and_then(Value::as_str)
                .map_or_else(|| error.to_string(), str::to_string)
        })
}

impl Lighting for HueBridge {
    async fn set_light(&self, light: &str, state: &Value) -> Result<(), HomeError> {
        let url = self.light_url(light)?;
        tracing::debug!(light, %state, "setting hue light");
        self.put(url, state).await?;
        Ok(())
    }

    async fn set_group(&self, group: &str, state: &Value) -> Result<(), HomeError> {
        let url = self.group_url(group)?;
        tracing::debug!(group, %state, "setting hue group");
        self.put(url, state).await?;
        Ok(())
    }
}
