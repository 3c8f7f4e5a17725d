//! MQTT transport configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the broker connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname or IP address.
    pub broker_host: String,
    /// Broker port.
    pub broker_port: u16,
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Optional credentials.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// How long to wait for the broker's CONNACK at startup, in seconds.
    pub connect_timeout_secs: u16,
    /// Retain flag set on every outbound publish.
    pub retain: bool,
    /// Capacity of the request channel between client and event loop.
    pub channel_capacity: usize,
}

impl MqttConfig {
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(u64::from(self.keep_alive_secs))
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_secs))
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "smarthome".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 60,
            connect_timeout_secs: 10,
            retain: false,
            channel_capacity: 64,
        }
    }
}
