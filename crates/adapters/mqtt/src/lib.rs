//! MQTT transport adapter.
//!
//! [`MqttTransport::connect`] opens the broker session and waits for its
//! CONNACK. The returned [`Listener`] owns the rumqttc event loop: once
//! spawned it forwards every inbound publish to an
//! [`InboundHandler`](smarthome_app::ports::InboundHandler) and restores the
//! subscriptions after a reconnect.

pub mod config;
pub mod error;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, QoS, SubscribeFilter,
};
use tokio::task::JoinHandle;

use smarthome_app::ports::{InboundHandler, Publisher};
use smarthome_domain::error::HomeError;

pub use config::MqttConfig;
pub use error::MqttError;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Outbound half of the broker session.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
    retain: bool,
    filters: Arc<Mutex<Vec<String>>>,
}

/// Inbound half of the broker session, owning the event loop.
pub struct Listener {
    eventloop: EventLoop,
    client: AsyncClient,
    filters: Arc<Mutex<Vec<String>>>,
}

impl MqttTransport {
    /// Connect to the broker and wait for the session to be acknowledged.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError`] when the broker is unreachable, refuses the
    /// session, or does not answer within the configured timeout.
    pub async fn connect(config: &MqttConfig) -> Result<(Self, Listener), MqttError> {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(config.keep_alive());
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username.clone(), password.clone());
        }

        let (client, mut eventloop) = AsyncClient::new(options, config.channel_capacity.max(1));

        let timeout = config.connect_timeout();
        tokio::time::timeout(timeout, wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| MqttError::ConnectTimeout(timeout))??;

        tracing::info!(
            host = %config.broker_host,
            port = config.broker_port,
            client_id = %config.client_id,
            "connected to MQTT broker"
        );

        let filters = Arc::new(Mutex::new(Vec::new()));
        let transport = Self {
            client: client.clone(),
            retain: config.retain,
            filters: Arc::clone(&filters),
        };
        let listener = Listener {
            eventloop,
            client,
            filters,
        };
        Ok((transport, listener))
    }

    /// Subscribe to every filter at QoS 1.
    ///
    /// Filters are remembered and re-subscribed whenever the session is
    /// re-established.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Client`] if the request cannot be queued.
    pub async fn subscribe(&self, filters: &[String]) -> Result<(), MqttError> {
        if filters.is_empty() {
            return Ok(());
        }
        self.client
            .subscribe_many(subscribe_filters(filters))
            .await
            .map_err(MqttError::Client)?;
        self.filters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(filters.iter().cloned());
        tracing::info!(count = filters.len(), "subscribed to topics");
        Ok(())
    }

    /// Close the broker session. The listener stops once the disconnect is
    /// sent.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Client`] if the request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), MqttError> {
        self.client.disconnect().await.map_err(MqttError::Client)
    }
}

impl Publisher for MqttTransport {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), HomeError> {
        tracing::debug!(topic, retain = self.retain, "publishing");
        self.client
            .publish(topic, QoS::AtLeastOnce, self.retain, payload)
            .await
            .map_err(MqttError::Client)?;
        Ok(())
    }
}

impl Listener {
    /// Drive the event loop on a background task, delivering inbound
    /// publishes to `handler`.
    pub fn spawn<H>(self, handler: Arc<H>) -> JoinHandle<()>
    where
        H: InboundHandler,
    {
        tokio::spawn(self.run(handler))
    }

    async fn run<H>(mut self, handler: Arc<H>)
    where
        H: InboundHandler,
    {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    handler.handle(&publish.topic, &publish.payload);
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("MQTT session re-established");
                    self.resubscribe();
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    tracing::info!("MQTT session closed");
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "MQTT connection lost, retrying");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    fn resubscribe(&self) {
        let filters = self
            .filters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if filters.is_empty() {
            return;
        }
        if let Err(err) = self.client.try_subscribe_many(subscribe_filters(&filters)) {
            tracing::warn!(error = %err, "failed to restore subscriptions");
        }
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), MqttError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(MqttError::Refused(code)),
                };
            }
            Ok(_) => {}
            Err(ConnectionError::ConnectionRefused(code)) => return Err(MqttError::Refused(code)),
            Err(err) => return Err(MqttError::Connection(err)),
        }
    }
}

fn subscribe_filters(filters: &[String]) -> Vec<SubscribeFilter> {
    filters
        .iter()
        .map(|filter| SubscribeFilter::new(filter.clone(), QoS::AtLeastOnce))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_subscribe_every_filter_at_least_once() {
        let filters = vec![
            "home/requests".to_string(),
            "home/rooms/kitchen/things/+/interrupt".to_string(),
        ];

        let subscriptions = subscribe_filters(&filters);

        assert_eq!(subscriptions.len(), 2);
        assert_eq!(subscriptions[1].path, "home/rooms/kitchen/things/+/interrupt");
        assert!(subscriptions.iter().all(|s| s.qos == QoS::AtLeastOnce));
    }

    #[tokio::test]
    async fn should_fail_when_broker_is_unreachable() {
        let config = MqttConfig {
            broker_host: "127.0.0.1".to_string(),
            broker_port: 1,
            connect_timeout_secs: 2,
            ..MqttConfig::default()
        };

        let result = MqttTransport::connect(&config).await;

        assert!(matches!(
            result,
            Err(MqttError::Connection(_) | MqttError::ConnectTimeout(_))
        ));
    }
}
