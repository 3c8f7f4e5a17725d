//! # smarthomed: home coordinator daemon
//!
//! Composition root that wires all adapters together and runs the tree.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and install logging
//! - Open the `SQLite` store and load the topology and its rules
//! - Build the actuators and the command dispatcher
//! - Connect to the MQTT broker, subscribe every node, start listening
//! - Log an initial status sweep of the whole home
//! - On Ctrl-C, cancel pending timers and close the broker session
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use smarthome_adapter_actuators::Actuators;
use smarthome_adapter_mqtt::MqttTransport;
use smarthome_adapter_storage_sqlite_sqlx::{SqliteRuleStore, SqliteTopologyStore};
use smarthome_app::dispatcher::CommandDispatcher;
use smarthome_app::loader;
use smarthome_domain::id::NodeId;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

const LISTENER_DRAIN: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Store
    let db = smarthome_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database.url.clone(),
    }
    .build()
    .await
    .with_context(|| format!("failed to open store at {}", config.database.url))?;
    let topology = SqliteTopologyStore::new(db.pool().clone());
    let rules = SqliteRuleStore::new(db.pool().clone());

    let blueprint = loader::load(&topology, &rules, NodeId::new(config.home.root_id))
        .await
        .context("failed to load topology")?;

    // Actuators
    let actuators =
        Actuators::from_config(&config.actuators).context("failed to configure actuators")?;

    // Transport
    let (transport, listener) = MqttTransport::connect(&config.mqtt)
        .await
        .with_context(|| {
            format!(
                "failed to connect to MQTT broker {}:{}",
                config.mqtt.broker_host, config.mqtt.broker_port
            )
        })?;
    let transport = Arc::new(transport);

    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::clone(&transport),
        actuators.lighting,
        actuators.speech,
        actuators.webhook,
    ));
    let hub = Arc::new(blueprint.into_hub(&transport, &dispatcher, config.request_timeout()));

    transport
        .subscribe(&hub.subscriptions())
        .await
        .context("failed to subscribe")?;
    let listening = listener.spawn(Arc::clone(&hub));

    let readings = hub.root().status_snapshot().await;
    tracing::info!(
        home = %hub.root().name(),
        nodes = hub.nodes().len(),
        readings = readings.len(),
        "initial status sweep"
    );
    for reading in &readings {
        tracing::debug!(
            sensor = %reading.sensor_name,
            sensor_type = %reading.sensor_type,
            value = reading.value,
            "reading"
        );
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("shutting down");

    hub.shutdown();
    if let Err(err) = transport.disconnect().await {
        tracing::warn!(error = %err, "failed to disconnect cleanly");
    }
    if tokio::time::timeout(LISTENER_DRAIN, listening).await.is_err() {
        tracing::warn!("listener did not stop in time");
    }
    db.close().await;

    Ok(())
}
