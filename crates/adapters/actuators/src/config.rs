//! Actuator configuration. Each section is optional; an absent section
//! leaves that command kind unconfigured.

use std::time::Duration;

use serde::Deserialize;

/// `[actuators]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActuatorsConfig {
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
    pub hue: Option<HueConfig>,
    pub sonos: Option<SonosConfig>,
    pub ifttt: Option<IftttConfig>,
}

impl ActuatorsConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ActuatorsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            hue: None,
            sonos: None,
            ifttt: None,
        }
    }
}

/// Philips Hue bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct HueConfig {
    /// Bridge address, with or without scheme (`192.168.1.20`).
    pub bridge: String,
    /// Whitelisted API username issued by the bridge.
    pub username: String,
}

/// Sonos HTTP API server.
#[derive(Debug, Clone, Deserialize)]
pub struct SonosConfig {
    /// Base URL of the API (`http://localhost:5005`).
    pub base_url: String,
}

/// IFTTT Maker webhooks.
#[derive(Debug, Clone, Deserialize)]
pub struct IftttConfig {
    pub key: String,
    #[serde(default = "default_ifttt_url")]
    pub base_url: String,
}

fn default_ifttt_url() -> String {
    "https://maker.ifttt.com".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_leave_every_actuator_unconfigured_by_default() {
        let config = ActuatorsConfig::default();
        assert!(config.hue.is_none());
        assert!(config.sonos.is_none());
        assert!(config.ifttt.is_none());
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn should_deserialize_sections_from_toml() {
        let toml = r#"
            timeout_secs = 2

            [hue]
            bridge = "192.168.1.20"
            username = "abc123"

            [ifttt]
            key = "secret"
        "#;
        let config: ActuatorsConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.timeout_secs, 2);
        let hue = config.hue.unwrap();
        assert_eq!(hue.bridge, "192.168.1.20");
        assert_eq!(hue.username, "abc123");
        assert!(config.sonos.is_none());
        assert_eq!(config.ifttt.unwrap().base_url, "https://maker.ifttt.com");
    }

    #[test]
    fn should_reject_hue_section_without_username() {
        let result = toml::from_str::<ActuatorsConfig>("[hue]\nbridge = \"hue.local\"");
        assert!(result.is_err());
    }
}
