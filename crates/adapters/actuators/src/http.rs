//! Shared HTTP plumbing.

use std::time::Duration;

use reqwest::{Client, Response, Url};

use crate::error::ActuatorError;

pub(crate) fn client(timeout: Duration) -> Result<Client, ActuatorError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|source| ActuatorError::Request {
            service: "http",
            source,
        })
}

/// Parse a configured address, assuming `http` when no scheme is given.
pub(crate) fn base_url(address: &str) -> Result<Url, ActuatorError> {
    let address = address.trim();
    let candidate = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };
    let url =
        Url::parse(&candidate).map_err(|_| ActuatorError::InvalidBaseUrl(address.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ActuatorError::InvalidBaseUrl(address.to_string()));
    }
    Ok(url)
}

/// Append percent-encoded path segments to `base`.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ActuatorError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ActuatorError::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn check_status(service: &'static str, response: &Response) -> Result<(), ActuatorError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ActuatorError::Status { service, status })
    }
}
