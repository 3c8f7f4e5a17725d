//! Actuator ports: third-party devices commands are delivered to.
//!
//! Each trait is optional at runtime: the dispatcher skips command kinds
//! whose actuator was not configured.

use std::future::Future;

use smarthome_domain::error::HomeError;

/// A lighting bridge addressing single lights and light groups.
pub trait Lighting: Send + Sync + 'static {
    /// Apply `state` (e.g. `{"on": true, "bri": 200}`) to one light.
    fn set_light(
        &self,
        light: &str,
        state: &serde_json::Value,
    ) -> impl Future<Output = Result<(), HomeError>> + Send;

    /// Apply `state` to every light of a group.
    fn set_group(
        &self,
        group: &str,
        state: &serde_json::Value,
    ) -> impl Future<Output = Result<(), HomeError>> + Send;
}

/// A speaker system addressed by room.
pub trait Speech: Send + Sync + 'static {
    /// Say `text`, then resume whatever was playing.
    fn speak(&self, target: &str, text: &str)
    -> impl Future<Output = Result<(), HomeError>> + Send;

    /// Replace the queue with the first saved playlist whose name contains
    /// `playlist`, or any saved playlist for
    /// [`ANY_PLAYLIST`](smarthome_domain::rule::ANY_PLAYLIST).
    fn play_playlist(
        &self,
        target: &str,
        playlist: &str,
    ) -> impl Future<Output = Result<(), HomeError>> + Send;
}

/// A notification webhook taking up to three free-form values.
pub trait Webhook: Send + Sync + 'static {
    fn trigger(
        &self,
        channel: &str,
        values: &[String],
    ) -> impl Future<Output = Result<(), HomeError>> + Send;
}
