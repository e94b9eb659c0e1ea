//! Single-Template Pool
//!
//! Owns every idle instance created from one template and enforces that
//! template's allocation, limit and culling policy.
//!
//! # Architecture
//!
//! ```text
//! spawn()  ──► hard limit reached? ──yes──► None
//!                     │ no
//!                     ▼
//!              idle empty? ──yes──► allocate `growth` (clamped to limit)
//!                     │                      │
//!                     ▼                      ▼
//!              pop most recent idle ◄── retry once
//! ```
//!
//! Idle instances are kept on a stack: the instance returned last is the one
//! spawned next. Checked-out instances are tracked by identity so a pool only
//! ever takes back what it handed out.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut pool = Pool::new(template, PoolConfig::new().with_preallocate(5))?;
//! pool.initialize(&mut host)?;
//!
//! let instance = pool.spawn(&mut host, &mut scheduler).expect("pool has capacity");
//! pool.despawn(&mut host, instance)?;
//! ```

use crate::core::config::PoolConfig;
use crate::pooling::error::{PoolError, PoolResult};
use crate::pooling::events::{PoolEvent, PoolEventHandler, PoolEvents, SubscriptionId};
use crate::pooling::host::{PoolHost, PoolTemplate, TemplateId};
use crate::pooling::scheduler::{PoolTask, Scheduler};
use std::fmt;
use std::time::Duration;

/// Lifetime counters for a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances ever created by this pool
    pub allocated: usize,
    /// Instances destroyed by culling or clearing
    pub destroyed: usize,
    /// Successful spawns
    pub spawns: u64,
    /// Successful despawns
    pub despawns: u64,
    /// Spawns that returned nothing
    pub failed_spawns: u64,
    /// Highest number of instances checked out at once
    pub peak_spawned: usize,
}

/// Pool of reusable instances for one template
pub struct Pool<H: PoolHost> {
    template: H::Template,
    name: String,
    id: TemplateId,
    config: PoolConfig,
    idle: Vec<H::Instance>,
    checked_out: Vec<H::Instance>,
    container: Option<H::Container>,
    last_cull: Duration,
    initialized: bool,
    events: PoolEvents<H::Instance>,
    stats: PoolStats,
}

impl<H: PoolHost> fmt::Debug for Pool<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("idle", &self.idle.len())
            .field("spawned", &self.checked_out.len())
            .field("initialized", &self.initialized)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<H: PoolHost> Pool<H> {
    /// Create an uninitialized pool
    ///
    /// Nothing is allocated until [`Pool::initialize`].
    pub fn new(template: H::Template, config: PoolConfig) -> PoolResult<Self> {
        let name = template.name().to_string();
        config.validate().map_err(|reason| PoolError::InvalidConfig {
            pool: name.clone(),
            reason,
        })?;

        Ok(Self {
            id: template.template_id(),
            template,
            name,
            config,
            idle: Vec::new(),
            checked_out: Vec::new(),
            container: None,
            last_cull: Duration::ZERO,
            initialized: false,
            events: PoolEvents::new(),
            stats: PoolStats::default(),
        })
    }

    /// Create the pool container and preallocate idle instances
    ///
    /// Must be called exactly once before the first spawn.
    pub fn initialize(&mut self, host: &mut H) -> PoolResult<()> {
        if self.initialized {
            return Err(PoolError::AlreadyInitialized { pool: self.name.clone() });
        }

        self.container = Some(host.create_container(&self.name));
        self.last_cull = host.current_time();
        self.initialized = true;

        let mut count = self.config.preallocate;
        if let Some(limit) = self.config.hard_limit() {
            if count > limit {
                log::warn!(
                    "Pool '{}': preallocation of {} exceeds hard limit {}, clamping",
                    self.name, count, limit
                );
                count = limit;
            }
        }

        self.allocate(host, count);
        log::info!("Initialized pool '{}' with {} idle instances", self.name, self.idle.len());
        Ok(())
    }

    /// Check an instance out of the pool
    ///
    /// Returns `None` when the hard limit is reached, or when the pool is
    /// empty and cannot grow. Successful spawns fire [`PoolEvent::Spawned`]
    /// and, with auto-expiry enabled, queue a deferred despawn on `scheduler`.
    pub fn spawn(
        &mut self,
        host: &mut H,
        scheduler: &mut Scheduler<PoolTask<H::Instance>>,
    ) -> Option<H::Instance> {
        if !self.initialized {
            log::error!("{}", PoolError::NotInitialized { pool: self.name.clone() });
            self.stats.failed_spawns += 1;
            return None;
        }

        if let Some(limit) = self.config.hard_limit() {
            if self.checked_out.len() >= limit {
                log::debug!("Pool '{}' reached its hard limit of {}", self.name, limit);
                self.stats.failed_spawns += 1;
                return None;
            }
        }

        if self.idle.is_empty() {
            let growth = self.growth_headroom();
            if growth > 0 {
                self.allocate(host, growth);
                log::debug!(
                    "Pool '{}' grew by {} to {} instances",
                    self.name, growth, self.total_count()
                );
            }
        }

        let Some(instance) = self.idle.pop() else {
            log::debug!("Pool '{}' is exhausted", self.name);
            self.stats.failed_spawns += 1;
            return None;
        };

        self.checked_out.push(instance.clone());
        self.stats.spawns += 1;
        self.stats.peak_spawned = self.stats.peak_spawned.max(self.checked_out.len());

        if self.config.reset_on_spawn && !host.reset_instance(&instance) {
            log::trace!("Pool '{}': instance {:?} has no reset capability", self.name, instance);
        }

        self.events.emit(&PoolEvent::Spawned { pool: &self.name, instance: &instance });

        if self.config.auto_expire {
            match host.effect_duration(&instance) {
                Some(duration) => {
                    scheduler.after(host.current_time(), duration, PoolTask::Despawn(instance.clone()));
                }
                None => log::error!(
                    "Pool '{}' auto-expires instances but {:?} reports no effect duration",
                    self.name, instance
                ),
            }
        }

        Some(instance)
    }

    /// Return a checked-out instance to the idle stack
    ///
    /// The instance is deactivated and [`PoolEvent::Despawned`] fires.
    /// Despawning an instance that is already idle, or one this pool never
    /// handed out, is rejected and leaves the pool untouched.
    pub fn despawn(&mut self, host: &mut H, instance: H::Instance) -> PoolResult<()> {
        if self.idle.contains(&instance) {
            return Err(PoolError::AlreadyIdle { pool: self.name.clone() });
        }
        let Some(slot) = self.checked_out.iter().position(|out| *out == instance) else {
            return Err(PoolError::NotCheckedOut { pool: self.name.clone() });
        };

        host.set_active(&instance, false);
        self.checked_out.swap_remove(slot);
        self.stats.despawns += 1;

        self.events.emit(&PoolEvent::Despawned { pool: &self.name, instance: &instance });
        self.idle.push(instance);
        Ok(())
    }

    /// Destroy idle instances above the cull target
    ///
    /// Runs at most once per configured cull interval, measured from the
    /// previous pass or, before the first pass, from initialization. The
    /// least recently returned instances go first. Returns how many were
    /// destroyed.
    pub fn cull_excess(&mut self, host: &mut H, now: Duration) -> usize {
        if !self.config.cull_despawned || self.idle.len() <= self.config.cull_above {
            return 0;
        }

        if now.saturating_sub(self.last_cull) < self.config.cull_interval() {
            return 0;
        }
        self.last_cull = now;

        let mut excess = self.idle.len() - self.config.cull_above;
        if self.config.cull_max_per_pass > 0 {
            excess = excess.min(self.config.cull_max_per_pass);
        }

        let culled: Vec<_> = self.idle.drain(..excess).collect();
        for instance in culled {
            host.destroy_instance(instance);
        }
        self.stats.destroyed += excess;

        log::debug!(
            "Culled {} idle instances from pool '{}' ({} idle remain)",
            excess, self.name, self.idle.len()
        );
        excess
    }

    /// Allocate extra idle instances ahead of demand
    ///
    /// The hard limit still applies. Returns how many were created.
    pub fn prewarm(&mut self, host: &mut H, count: usize) -> usize {
        if !self.initialized {
            log::warn!("Cannot prewarm: {}", PoolError::NotInitialized { pool: self.name.clone() });
            return 0;
        }

        let count = self
            .config
            .hard_limit()
            .map_or(count, |limit| count.min(limit.saturating_sub(self.total_count())));
        self.allocate(host, count);
        count
    }

    /// Drain every idle instance
    ///
    /// With `destroy_all` each idle instance is destroyed and nothing is
    /// returned. Otherwise the instances are detached from the pool container
    /// and handed back. Checked-out instances are not affected.
    pub fn clear(&mut self, host: &mut H, destroy_all: bool) -> Vec<H::Instance> {
        let drained: Vec<_> = self.idle.drain(..).collect();
        log::debug!("Clearing {} idle instances from pool '{}'", drained.len(), self.name);

        if destroy_all {
            self.stats.destroyed += drained.len();
            for instance in drained {
                host.destroy_instance(instance);
            }
            Vec::new()
        } else {
            for instance in &drained {
                host.detach_from_container(instance);
            }
            drained
        }
    }

    /// Subscribe to spawn/despawn notifications
    pub fn subscribe(&mut self, handler: impl PoolEventHandler<H::Instance> + 'static) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    /// Stop a subscription
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Template name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template reference identity
    pub fn template_id(&self) -> TemplateId {
        self.id
    }

    /// Template instances are created from
    pub fn template(&self) -> &H::Template {
        &self.template
    }

    /// Pool policy
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Instances waiting in the pool
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Instances currently checked out
    pub fn spawned_count(&self) -> usize {
        self.checked_out.len()
    }

    /// Idle plus checked-out instances
    pub fn total_count(&self) -> usize {
        self.idle.len() + self.checked_out.len()
    }

    /// Whether `instance` is sitting idle in this pool
    pub fn is_idle(&self, instance: &H::Instance) -> bool {
        self.idle.contains(instance)
    }

    /// Whether `instance` was handed out by this pool and not yet returned
    pub fn is_checked_out(&self, instance: &H::Instance) -> bool {
        self.checked_out.contains(instance)
    }

    /// Lifetime counters
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Whether [`Pool::initialize`] has run
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Container idle instances are parented under
    pub fn container(&self) -> Option<&H::Container> {
        self.container.as_ref()
    }

    /// Whether the pool survives environment transitions
    pub fn is_persistent(&self) -> bool {
        self.config.persistent
    }

    /// Give up the container so the owner can destroy it
    pub(crate) fn take_container(&mut self) -> Option<H::Container> {
        self.container.take()
    }

    /// How many instances a spawn on an empty pool may create
    fn growth_headroom(&self) -> usize {
        match self.config.hard_limit() {
            Some(limit) => self.config.growth.min(limit.saturating_sub(self.total_count())),
            None => self.config.growth,
        }
    }

    fn allocate(&mut self, host: &mut H, count: usize) {
        self.idle.reserve(count);
        for _ in 0..count {
            let instance = host.create_instance(&self.template);
            if let Some(container) = &self.container {
                host.attach_to_container(&instance, container);
            }
            host.set_active(&instance, false);
            self.idle.push(instance);
        }
        self.stats.allocated += count;
    }
}
