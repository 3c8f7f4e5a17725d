//! MQTT adapter error types.

use std::time::Duration;

use smarthome_domain::error::HomeError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The broker did not acknowledge the connection in time.
    #[error("no CONNACK from broker within {0:?}")]
    ConnectTimeout(Duration),

    /// The broker answered the connection with a non-success code.
    #[error("broker refused connection: {0:?}")]
    Refused(rumqttc::ConnectReturnCode),

    /// The event loop failed to reach or talk to the broker.
    #[error("MQTT connection error")]
    Connection(#[source] rumqttc::ConnectionError),

    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl From<MqttError> for HomeError {
    fn from(err: MqttError) -> Self {
        HomeError::Transport(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_connect_timeout() {
        let err = MqttError::ConnectTimeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "no CONNACK from broker within 5s");
    }

    #[test]
    fn should_display_refused_code() {
        let err = MqttError::Refused(rumqttc::ConnectReturnCode::NotAuthorized);
        assert_eq!(err.to_string(), "broker refused connection: NotAuthorized");
    }

    #[test]
    fn should_convert_to_transport_error() {
        let err: HomeError = MqttError::ConnectTimeout(Duration::from_secs(1)).into();
        assert!(matches!(err, HomeError::Transport(_)));
    }
}
