//! # smarthome-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `Publisher` / `InboundHandler`: the publish/subscribe transport
//!   - `TopologyStore` / `RuleStore`: read-only rule and topology store
//!   - `Lighting`, `Speech`, `Webhook`: third-party actuators
//! - Run the live topology tree: request fan-out, response correlation,
//!   status caching ([`node`], [`correlation`], [`hub`])
//! - Evaluate rules on sensor events and debounce their delayed commands
//!   ([`rule_engine`], [`debounce`], [`dispatcher`])
//! - Load and validate everything from the store at startup ([`loader`])
//!
//! ## Dependency rule
//! Depends on `smarthome-domain` only (plus `tokio` for tasks, channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod correlation;
pub mod debounce;
pub mod dispatcher;
pub mod hub;
pub mod loader;
pub mod node;
pub mod ports;
pub mod rule_engine;

#[cfg(test)]
pub(crate) mod testing;
