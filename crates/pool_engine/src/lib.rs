//! # Pool Engine
//!
//! Instance pooling for hosts that create expensive objects from templates.
//!
//! ## Features
//!
//! - **Per-template pools**: LIFO reuse, preallocation, growth and hard limits
//! - **Registry**: lookup by template id or name, unpooled fallback
//! - **Deferred work**: delayed despawns and periodic culling driven by the host loop
//! - **Environment transitions**: non-persistent pools are purged on scene changes
//! - **Data-driven setup**: pools declared in TOML or RON files
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pool_engine::prelude::*;
//!
//! fn run<H: PoolHost>(host: H, template: H::Template) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = Registry::new(host, &RegistryConfig::default());
//!     registry.create_pool(template.clone(), PoolConfig::new().with_preallocate(8))?;
//!
//!     let instance = registry.spawn(&template, &Placement::identity());
//!     if let Some(instance) = instance {
//!         registry.despawn_after(instance, std::time::Duration::from_secs(2));
//!     }
//!
//!     // once per frame
//!     registry.update();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod core;
pub mod config;
pub mod foundation;
pub mod pooling;

/// Common imports for pool users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::config::{PoolConfig, PoolDefinition, RegistryConfig},
        foundation::{
            math::{Placement, Quat, Vec3},
            time::{Clock, ManualClock, Stopwatch, SystemClock},
        },
        pooling::{
            DespawnOutcome, EnvironmentTransition, Pool, PoolError, PoolEvent, PoolHost,
            PoolResult, PoolStats, PoolTemplate, Registry, RegistryStats, TemplateId,
        },
    };
}
