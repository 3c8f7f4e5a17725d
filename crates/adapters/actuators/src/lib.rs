//! HTTP actuator adapters.
//!
//! Implements the lighting, speech and webhook ports of `smarthome-app`
//! against a Hue bridge, the Sonos HTTP API (speech and playlists) and
//! IFTTT Maker webhooks.

pub mod config;
pub mod error;
mod http;
pub mod hue;
pub mod ifttt;
pub mod sonos;

pub use config::{ActuatorsConfig, HueConfig, IftttConfig, SonosConfig};
pub use error::ActuatorError;
pub use hue::HueBridge;
pub use ifttt::IftttWebhook;
pub use sonos::SonosSpeech;

/// The actuators enabled by configuration.
pub struct Actuators {
    pub lighting: Option<HueBridge>,
    pub speech: Option<SonosSpeech>,
    pub webhook: Option<IftttWebhook>,
}

impl Actuators {
    /// Build every configured actuator over one shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError`] if the client cannot be built or a
    /// configured address is invalid.
    pub fn from_config(config: &ActuatorsConfig) -> Result<Self, ActuatorError> {
        let client = http::client(config.timeout())?;
        let lighting = config
            .hue
            .as_ref()
            .map(|hue| HueBridge::new(client.clone(), hue))
            .transpose()?;
        let speech = config
            .sonos
            .as_ref()
            .map(|sonos| SonosSpeech::new(client.clone(), sonos))
            .transpose()?;
        let webhook = config
            .ifttt
            .as_ref()
            .map(|ifttt| IftttWebhook::new(client.clone(), ifttt))
            .transpose()?;

        tracing::info!(
            hue = lighting.is_some(),
            sonos = speech.is_some(),
            ifttt = webhook.is_some(),
            "actuators configured"
        );
        Ok(Self {
            lighting,
            speech,
            webhook,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_only_configured_actuators() {
        let config = ActuatorsConfig {
            sonos: Some(SonosConfig {
                base_url: "http://localhost:5005".to_string(),
            }),
            ..ActuatorsConfig::default()
        };

        let actuators = Actuators::from_config(&config).unwrap();

        assert!(actuators.lighting.is_none());
        assert!(actuators.speech.is_some());
        assert!(actuators.webhook.is_none());
    }

    #[test]
    fn should_fail_on_invalid_address() {
        let config = ActuatorsConfig {
            hue: Some(HueConfig {
                bridge: "http://[::1".to_string(),
                username: "u".to_string(),
            }),
            ..ActuatorsConfig::default()
        };

        assert!(matches!(
            Actuators::from_config(&config),
            Err(ActuatorError::InvalidBaseUrl(_))
        ));
    }
}
