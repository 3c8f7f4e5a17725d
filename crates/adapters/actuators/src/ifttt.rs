//! IFTTT Maker webhooks.

use reqwest::{Client, Url};
use serde_json::{Map, Value};

use smarthome_app::ports::Webhook;
use smarthome_domain::error::HomeError;

use crate::config::IftttConfig;
use crate::error::ActuatorError;
use crate::http;

const SERVICE: &str = "ifttt";

pub struct IftttWebhook {
    client: Client,
    base: Url,
    key: String,
}

impl IftttWebhook {
    /// # Errors
    ///
    /// Returns [`ActuatorError::InvalidBaseUrl`] if the base URL is unusable.
    pub fn new(client: Client, config: &IftttConfig) -> Result<Self, ActuatorError> {
        Ok(Self {
            client,
            base: http::base_url(&config.base_url)?,
            key: config.key.clone(),
        })
    }

    fn trigger_url(&self, channel: &str) -> Result<Url, ActuatorError> {
        http::endpoint(&self.base, &["trigger", channel, "with", "key", self.key.as_str()])
    }
}

/// `{"value1": .., "value2": .., "value3": ..}` for the values given.
fn body(values: &[String]) -> Map<String, Value> {
    values
        .iter()
        .take(3)
        .enumerate()
        .map(|(i, value)| (format!("value{}", i + 1), Value::String(value.clone())))
        .collect()
}

impl Webhook for IftttWebhook {
    async fn trigger(&self, channel: &str, values: &[String]) -> Result<(), HomeError> {
        let url = self.trigger_url(channel)?;
        tracing::debug!(channel, values = values.len(), "triggering webhook");
        let response = self
            .client
            .post(url)
            .json(&body(values))
            .send()
            .await
            .map_err(|source| ActuatorError::Request {
                service: SERVICE,
                source,
            })?;
        http::check_status(SERVICE, &response)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_build_trigger_url_from_default_base() {
        let webhook = IftttWebhook::new(
            Client::new(),
            &IftttConfig {
                key: "k3y".to_string(),
                base_url: "https://maker.ifttt.com".to_string(),
            },
        )
        .unwrap();

        let url = webhook.trigger_url("door_open").unwrap();

        assert_eq!(
            url.as_str(),
            "https://maker.ifttt.com/trigger/door_open/with/key/k3y"
        );
    }

    #[test]
    fn should_number_values_from_one() {
        let values = vec!["Garage".to_string(), "open".to_string()];
        assert_eq!(
            Value::Object(body(&values)),
            json!({"value1": "Garage", "value2": "open"})
        );
    }

    #[test]
    fn should_send_empty_body_without_values() {
        assert!(body(&[]).is_empty());
    }
}
