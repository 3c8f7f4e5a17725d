//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod actuator;
pub mod store;
pub mod transport;

pub use actuator::{Lighting, Speech, Webhook};
pub use store::{RuleStore, TopologyStore};
pub use transport::{InboundHandler, Publisher};
