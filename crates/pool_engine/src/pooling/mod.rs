//! Instance pooling system
//!
//! Expensive-to-create instances are created ahead of time, handed out on
//! demand and returned for reuse instead of being destroyed. Each template
//! gets its own [`Pool`]; a [`Registry`] owns all pools and dispatches by
//! template identity or name.

pub mod error;
pub mod events;
pub mod host;
pub mod pool;
pub mod registry;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use error::{PoolError, PoolResult};
pub use events::{PoolEvent, PoolEventHandler, PoolEvents, SubscriptionId};
pub use host::{PoolHost, PoolTemplate, TemplateId};
pub use pool::{Pool, PoolStats};
pub use registry::{DespawnOutcome, EnvironmentTransition, PoolKey, Registry, RegistryStats};
pub use scheduler::{PoolTask, Scheduler, TaskId};
