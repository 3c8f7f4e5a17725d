//! # smarthome-adapter-storage-sqlite-sqlx
//!
//! `SQLite` store adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the store port traits defined in `smarthome-app::ports::store`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map database rows to the raw definitions the loader validates
//!
//! The adapter only reads: rules and topology are maintained out of band.
//!
//! ## Dependency rule
//! Depends on `smarthome-app` (for port traits) and `smarthome-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod pool;
pub mod rule_repo;
pub mod topology_repo;

pub use error::StorageError;
pub use pool::{Config, Database};
pub use rule_repo::SqliteRuleStore;
pub use topology_repo::SqliteTopologyStore;
