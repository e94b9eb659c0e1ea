//! # Pool Configuration
//!
//! Policy knobs for individual pools and for the registry that owns them.
//! Everything here is plain data: it is read once when a pool is registered
//! and stays immutable afterwards, so it can be loaded from TOML or RON.
//!
//! ## Policy overview
//!
//! - **Preallocation**: instances created up front when the pool is registered
//! - **Growth**: instances created each time a spawn finds the pool empty
//! - **Hard limit**: ceiling on idle plus outstanding instances
//! - **Culling**: periodic destruction of idle instances above a target size
//! - **Auto-expiry**: despawn after the instance's own effect duration
//! - **Persistence**: survive environment transitions

use serde::{Serialize, Deserialize};
use std::time::Duration;

// Re-export from the config module for convenience
pub use crate::config::{Config, ConfigError};

/// # Pool Configuration
///
/// Allocation, limit and culling policy for a single template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Instances created when the pool is initialized
    pub preallocate: usize,
    /// Instances created per spawn that finds no idle instance
    pub growth: usize,
    /// Whether `limit_amount` caps the pool
    pub limit_instances: bool,
    /// Maximum idle plus outstanding instances when limited
    pub limit_amount: usize,
    /// Whether idle instances above `cull_above` get destroyed periodically
    pub cull_despawned: bool,
    /// Idle count culling shrinks towards
    pub cull_above: usize,
    /// Minimum seconds between two cull passes
    pub cull_interval_secs: f32,
    /// Maximum instances destroyed per cull pass, 0 for no cap
    pub cull_max_per_pass: usize,
    /// Despawn automatically after the instance's effect duration
    pub auto_expire: bool,
    /// Invoke the host's reset capability on every spawn
    pub reset_on_spawn: bool,
    /// Survive environment transitions
    pub persistent: bool,
}

impl PoolConfig {
    /// Create a configuration with the default policy
    pub fn new() -> Self {
        Self {
            preallocate: 1,
            growth: 1,
            limit_instances: false,
            limit_amount: 100,
            cull_despawned: false,
            cull_above: 50,
            cull_interval_secs: 60.0,
            cull_max_per_pass: 0,
            auto_expire: false,
            reset_on_spawn: false,
            persistent: false,
        }
    }

    /// Set the preallocation count
    #[must_use]
    pub fn with_preallocate(mut self, count: usize) -> Self {
        self.preallocate = count;
        self
    }

    /// Set how many instances to create when a spawn finds the pool empty
    #[must_use]
    pub fn with_growth(mut self, count: usize) -> Self {
        self.growth = count;
        self
    }

    /// Enable the hard limit
    #[must_use]
    pub fn with_hard_limit(mut self, ceiling: usize) -> Self {
        self.limit_instances = true;
        self.limit_amount = ceiling;
        self
    }

    /// Enable culling of idle instances above `target` every `interval_secs`
    #[must_use]
    pub fn with_culling(mut self, target: usize, interval_secs: f32) -> Self {
        self.cull_despawned = true;
        self.cull_above = target;
        self.cull_interval_secs = interval_secs;
        self
    }

    /// Cap the number of instances destroyed per cull pass (0 removes the cap)
    #[must_use]
    pub fn with_cull_max_per_pass(mut self, count: usize) -> Self {
        self.cull_max_per_pass = count;
        self
    }

    /// Enable or disable auto-expiry
    #[must_use]
    pub fn with_auto_expire(mut self, enabled: bool) -> Self {
        self.auto_expire = enabled;
        self
    }

    /// Enable or disable reset-on-spawn
    #[must_use]
    pub fn with_reset_on_spawn(mut self, enabled: bool) -> Self {
        self.reset_on_spawn = enabled;
        self
    }

    /// Mark the pool as surviving environment transitions
    #[must_use]
    pub fn with_persistent(mut self, enabled: bool) -> Self {
        self.persistent = enabled;
        self
    }

    /// Ceiling on idle plus outstanding instances, if limited
    pub fn hard_limit(&self) -> Option<usize> {
        self.limit_instances.then_some(self.limit_amount)
    }

    /// Minimum time between cull passes
    ///
    /// Values too large for a `Duration` saturate to `Duration::MAX`.
    pub fn cull_interval(&self) -> Duration {
        Duration::try_from_secs_f32(self.cull_interval_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.limit_instances && self.limit_amount == 0 {
            return Err("Hard limit must be at least 1 when limit_instances is set".to_string());
        }

        if self.cull_interval_secs < 0.0 || Duration::try_from_secs_f32(self.cull_interval_secs).is_err() {
            return Err(format!(
                "Cull interval must be a non-negative, representable number of seconds, got {}",
                self.cull_interval_secs
            ));
        }

        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for PoolConfig {}

/// # Pool Definition
///
/// A statically declared pool: the template to resolve through the host plus
/// its policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDefinition {
    /// Template name handed to the host for resolution
    pub template: String,
    /// Pool policy
    #[serde(default)]
    pub config: PoolConfig,
}

impl PoolDefinition {
    /// Create a definition for `template`
    pub fn new(template: impl Into<String>, config: PoolConfig) -> Self {
        Self {
            template: template.into(),
            config,
        }
    }
}

/// # Registry Configuration
///
/// Registry-wide settings plus every pool created at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Seconds between maintenance passes; zero or less disables maintenance
    pub maintenance_interval_secs: f32,
    /// Whether the registry itself survives environment transitions
    pub persistent: bool,
    /// Pools created at startup
    pub pools: Vec<PoolDefinition>,
}

impl RegistryConfig {
    /// Create a registry configuration with no static pools
    pub fn new() -> Self {
        Self {
            maintenance_interval_secs: 1.0,
            persistent: true,
            pools: Vec::new(),
        }
    }

    /// Set the maintenance interval in seconds
    #[must_use]
    pub fn with_maintenance_interval(mut self, secs: f32) -> Self {
        self.maintenance_interval_secs = secs;
        self
    }

    /// Set registry persistence
    #[must_use]
    pub fn with_persistent(mut self, enabled: bool) -> Self {
        self.persistent = enabled;
        self
    }

    /// Declare a pool to create at startup
    #[must_use]
    pub fn with_pool(mut self, template: impl Into<String>, config: PoolConfig) -> Self {
        self.pools.push(PoolDefinition::new(template, config));
        self
    }

    /// Maintenance interval, or `None` when maintenance is disabled
    pub fn maintenance_interval(&self) -> Option<Duration> {
        interval_from_secs(self.maintenance_interval_secs)
    }

    /// Validate the configuration and every pool definition
    pub fn validate(&self) -> Result<(), String> {
        let secs = self.maintenance_interval_secs;
        if secs.is_nan() {
            return Err("Maintenance interval cannot be NaN".to_string());
        }
        if secs > 0.0 && Duration::try_from_secs_f32(secs).is_err() {
            return Err(format!("Maintenance interval of {secs} seconds is too large"));
        }

        for definition in &self.pools {
            if definition.template.is_empty() {
                return Err("Pool definitions need a template name".to_string());
            }
            definition
                .config
                .validate()
                .map_err(|reason| format!("Pool '{}': {}", definition.template, reason))?;
        }

        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for RegistryConfig {}

/// Convert a seconds value into an interval
///
/// Non-positive values, and values a `Duration` cannot hold, disable it.
pub(crate) fn interval_from_secs(secs: f32) -> Option<Duration> {
    if secs > 0.0 {
        Duration::try_from_secs_f32(secs).ok()
    } else {
        None
    }
}
