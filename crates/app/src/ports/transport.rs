//! Transport port: the publish/subscribe bus devices talk on.

use std::future::Future;

use smarthome_domain::error::HomeError;

/// Outbound side of the transport.
pub trait Publisher: Send + Sync + 'static {
    /// Publish `payload` on `topic`.
    fn publish(
        &self,
        topic: &str,
        payload: String,
    ) -> impl Future<Output = Result<(), HomeError>> + Send;
}

/// Inbound side of the transport.
///
/// The transport delivers every received message to exactly one handler.
/// Implementations must not block: anything slow is spawned.
pub trait InboundHandler: Send + Sync + 'static {
    fn handle(&self, topic: &str, payload: &[u8]);
}
