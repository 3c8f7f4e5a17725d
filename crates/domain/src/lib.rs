//! # smarthome-domain
//!
//! Pure domain model for the smarthome coordinator.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define the **topology** (Home → Room → Device) and its subscriptions
//! - Define **sensor readings** reported by devices
//! - Define **rules** (sensor selector → conditions → primary / secondary command)
//! - Define the **wire messages** exchanged over the transport and the topic taxonomy
//! - Contain all invariant enforcement and condition evaluation
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod message;
pub mod rule;
pub mod sensor;
pub mod topic;
pub mod topology;
