//! Actuator adapter error types.

use smarthome_domain::error::HomeError;

/// Errors raised while talking to an actuator over HTTP.
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    /// A configured address cannot be used as a base URL.
    #[error("invalid base URL {0:?}")]
    InvalidBaseUrl(String),

    /// The HTTP request could not be sent or its body not read.
    #[error("{service} request failed")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{service} answered with status {status}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
    },

    /// The service accepted the request but reported a failure in its body.
    #[error("{service} rejected the command: {reason}")]
    Rejected {
        service: &'static str,
        reason: String,
    },
}

impl From<ActuatorError> for HomeError {
    fn from(err: ActuatorError) -> Self {
        HomeError::Actuator(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_status_error() {
        let err = ActuatorError::Status {
            service: "sonos",
            status: reqwest::StatusCode::NOT_FOUND,
        };
        assert_eq!(err.to_string(), "sonos answered with status 404 Not Found");
    }

    #[test]
    fn should_convert_to_actuator_error() {
        let err: HomeError = ActuatorError::InvalidBaseUrl("::".to_string()).into();
        assert!(matches!(err, HomeError::Actuator(_)));
    }
}
