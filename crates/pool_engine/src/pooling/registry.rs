//! Pool Registry
//!
//! Owns every pool, routes spawn and despawn requests to the pool that owns
//! the template, and drives the deferred work (maintenance culling and
//! delayed despawns) from the host loop.
//!
//! # Architecture
//!
//! ```text
//! Host loop ──update()──► Scheduler ──► Despawn(instance) / Maintenance
//!     │
//!     ├─ spawn(template)      ─► by_id   ─┐
//!     ├─ spawn_by_name(name)  ─► by_name ─┼─► Pool ─► PoolHost (create/place/activate)
//!     └─ despawn(instance)    ─► by_name ─┘
//! ```
//!
//! Pools live in a slot map. Registration order is kept separately so
//! maintenance and environment purges walk pools deterministically. The two
//! lookup indices are only ever changed together with the slot map, inside a
//! single call.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut registry = Registry::from_config(host, RegistryConfig::load_from_file("pools.ron")?)?;
//!
//! let bullet = registry.spawn_by_name("bullet", &Placement::at(muzzle));
//! registry.despawn_after(bullet.unwrap(), Duration::from_secs(2));
//!
//! // once per frame
//! registry.update();
//! ```

use crate::core::config::{interval_from_secs, ConfigError, PoolConfig, RegistryConfig};
use crate::foundation::math::Placement;
use crate::pooling::error::{PoolError, PoolResult};
use crate::pooling::host::{PoolHost, PoolTemplate, TemplateId};
use crate::pooling::pool::{Pool, PoolStats};
use crate::pooling::scheduler::{PoolTask, Scheduler, TaskId};
use slotmap::{new_key_type, SlotMap};
use std::collections::HashMap;
use std::time::Duration;

new_key_type! {
    /// Slot of a registered pool
    pub struct PoolKey;
}

/// External lifecycle event that purges non-persistent pools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentTransition {
    /// Name of the environment being entered
    pub target: String,
}

impl EnvironmentTransition {
    /// Create a transition into `target`
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into() }
    }
}

/// What happened to an instance handed to [`Registry::despawn`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DespawnOutcome {
    /// Returned to its pool
    Pooled,
    /// No pool took it, so it was destroyed directly
    Destroyed,
    /// Its pool refused it (already idle); nothing changed
    Rejected,
}

/// Aggregate statistics across every registered pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Registered pools
    pub pools: usize,
    /// Idle instances across pools
    pub idle: usize,
    /// Checked-out instances across pools
    pub spawned: usize,
    /// Tasks waiting in the scheduler
    pub pending_tasks: usize,
    /// Sum of the pools' lifetime counters
    pub totals: PoolStats,
}

/// Registry of pools keyed by template identity
pub struct Registry<H: PoolHost> {
    host: H,
    pools: SlotMap<PoolKey, Pool<H>>,
    order: Vec<PoolKey>,
    by_id: HashMap<TemplateId, PoolKey>,
    by_name: HashMap<String, TemplateId>,
    scheduler: Scheduler<PoolTask<H::Instance>>,
    maintenance_interval: Option<Duration>,
    maintenance_scheduled: bool,
    persistent: bool,
}

impl<H: PoolHost> Registry<H> {
    /// Create an empty registry
    ///
    /// The maintenance loop starts immediately when the configured interval
    /// is positive. Pools declared in `config.pools` are ignored here; use
    /// [`Registry::from_config`] to create them.
    pub fn new(host: H, config: &RegistryConfig) -> Self {
        let mut registry = Self {
            host,
            pools: SlotMap::with_key(),
            order: Vec::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            scheduler: Scheduler::new(),
            maintenance_interval: None,
            maintenance_scheduled: false,
            persistent: config.persistent,
        };
        registry.run_maintenance_loop(config.maintenance_interval_secs);
        registry
    }

    /// Create a registry and every statically declared pool
    ///
    /// Templates are resolved through [`PoolHost::resolve_template`]. A
    /// definition whose template cannot be resolved, or whose pool cannot be
    /// registered, is reported and skipped.
    pub fn from_config(host: H, config: RegistryConfig) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError::Invalid)?;

        let mut registry = Self::new(host, &config);
        for definition in config.pools {
            let Some(template) = registry.host.resolve_template(&definition.template) else {
                log::error!("Cannot create pool: template '{}' was not found", definition.template);
                continue;
            };
            if let Err(err) = registry.create_pool(template, definition.config) {
                log::error!("Cannot create pool '{}': {}", definition.template, err);
            }
        }

        log::info!("Registry started with {} pools", registry.pool_count());
        Ok(registry)
    }

    /// Build and register a pool for `template`
    pub fn create_pool(&mut self, template: H::Template, config: PoolConfig) -> PoolResult<TemplateId> {
        let pool = Pool::new(template, config)?;
        self.manage_pool(pool)
    }

    /// Register a pool and initialize it
    ///
    /// Fails when a pool with the same template name or id is already
    /// registered; the existing pool is left untouched.
    pub fn manage_pool(&mut self, mut pool: Pool<H>) -> PoolResult<TemplateId> {
        let id = pool.template_id();
        if self.by_name.contains_key(pool.name()) || self.by_id.contains_key(&id) {
            let err = PoolError::DuplicateTemplate {
                name: pool.name().to_string(),
                id,
            };
            log::error!("{err}");
            return Err(err);
        }

        if !pool.is_initialized() {
            pool.initialize(&mut self.host)?;
        }

        let name = pool.name().to_string();
        let key = self.pools.insert(pool);
        self.order.push(key);
        self.by_id.insert(id, key);
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Unregister a pool and clear it
    ///
    /// Returns `None` when no pool is registered for `id`. Idle instances are
    /// destroyed with `destroy_all`, otherwise they are detached and left
    /// alive in the host. The pool container is destroyed either way.
    /// Instances still checked out are not touched.
    pub fn remove_pool(&mut self, id: TemplateId, destroy_all: bool) -> Option<Pool<H>> {
        let key = self.by_id.remove(&id)?;
        self.order.retain(|registered| *registered != key);
        let mut pool = self.pools.remove(key)?;
        self.by_name.remove(pool.name());

        let released = pool.clear(&mut self.host, destroy_all);
        if let Some(container) = pool.take_container() {
            self.host.destroy_container(container);
        }

        log::info!(
            "Removed pool '{}' ({} idle released, {} still checked out)",
            pool.name(),
            released.len(),
            pool.spawned_count()
        );
        Some(pool)
    }

    /// Unregister a pool by template name
    pub fn remove_pool_by_name(&mut self, name: &str, destroy_all: bool) -> Option<Pool<H>> {
        let id = *self.by_name.get(name)?;
        self.remove_pool(id, destroy_all)
    }

    /// Spawn from the pool that owns `template`
    ///
    /// When no pool is registered for the template the instance is created
    /// directly, unpooled, and a warning is reported.
    pub fn spawn(&mut self, template: &H::Template, placement: &Placement) -> Option<H::Instance> {
        if let Some(&key) = self.by_id.get(&template.template_id()) {
            return self.spawn_from(key, placement);
        }

        log::warn!(
            "No pool for template '{}' ({}); creating an unpooled instance",
            template.name(),
            template.template_id()
        );
        let instance = self.host.create_instance(template);
        self.host.set_world_placement(&instance, placement);
        self.host.set_active(&instance, true);
        Some(instance)
    }

    /// Spawn from the pool registered under `name`
    ///
    /// Unknown names are reported and yield `None`.
    pub fn spawn_by_name(&mut self, name: &str, placement: &Placement) -> Option<H::Instance> {
        let Some(key) = self.key_by_name(name) else {
            log::error!("{}", PoolError::UnknownTemplate { name: name.to_string() });
            return None;
        };
        self.spawn_from(key, placement)
    }

    /// Return an instance to the pool named after it
    ///
    /// Instances without a pool (never pooled, created by the unpooled
    /// fallback, or orphaned by a removed pool) are destroyed directly.
    pub fn despawn(&mut self, instance: H::Instance) -> DespawnOutcome {
        let key = self
            .host
            .instance_name(&instance)
            .and_then(|name| self.key_by_name(&name));

        let Some(key) = key else {
            log::warn!("Instance {instance:?} has no pool; destroying it");
            self.host.destroy_instance(instance);
            return DespawnOutcome::Destroyed;
        };
        let Some(pool) = self.pools.get_mut(key) else {
            return DespawnOutcome::Rejected;
        };

        match pool.despawn(&mut self.host, instance.clone()) {
            Ok(()) => {
                if let Some(container) = pool.container() {
                    self.host.attach_to_container(&instance, container);
                }
                DespawnOutcome::Pooled
            }
            Err(PoolError::NotCheckedOut { pool: pool_name }) => {
                log::warn!("Pool '{pool_name}' did not hand out {instance:?}; destroying it");
                self.host.destroy_instance(instance);
                DespawnOutcome::Destroyed
            }
            Err(err) => {
                log::warn!("Ignoring despawn of {instance:?}: {err}");
                DespawnOutcome::Rejected
            }
        }
    }

    /// Despawn `instance` once `delay` has passed
    ///
    /// Every call schedules its own despawn; there is no de-duplication and
    /// no cancellation.
    pub fn despawn_after(&mut self, instance: H::Instance, delay: Duration) -> TaskId {
        let now = self.host.current_time();
        self.scheduler.after(now, delay, PoolTask::Despawn(instance))
    }

    /// Purge pools that do not survive an environment transition
    ///
    /// Non-persistent pools are removed newest first and their idle instances
    /// destroyed. A non-persistent registry removes every pool. Returns how
    /// many pools were removed.
    pub fn on_environment_transition(&mut self, event: &EnvironmentTransition) -> usize {
        log::info!("Environment transition to '{}'", event.target);

        if !self.persistent {
            let removed = self.pool_count();
            self.shutdown();
            return removed;
        }

        let mut removed = 0;
        for index in (0..self.order.len()).rev() {
            let key = self.order[index];
            let Some(pool) = self.pools.get(key) else {
                continue;
            };
            if pool.is_persistent() {
                continue;
            }
            let id = pool.template_id();
            if self.remove_pool(id, true).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Start, retune or stop the periodic cull pass
    ///
    /// A non-positive interval disables maintenance. At most one maintenance
    /// task is ever pending.
    pub fn run_maintenance_loop(&mut self, interval_secs: f32) {
        self.maintenance_interval = interval_from_secs(interval_secs);
        match self.maintenance_interval {
            Some(interval) if !self.maintenance_scheduled => {
                let now = self.host.current_time();
                self.scheduler.after(now, interval, PoolTask::Maintenance);
                self.maintenance_scheduled = true;
                log::debug!("Maintenance loop running every {interval:?}");
            }
            Some(_) => {}
            None => log::debug!("Maintenance loop disabled"),
        }
    }

    /// Run one cull pass over every pool, in registration order
    ///
    /// Returns the number of instances destroyed.
    pub fn cull_all(&mut self) -> usize {
        let now = self.host.current_time();
        let mut culled = 0;
        for key in &self.order {
            if let Some(pool) = self.pools.get_mut(*key) {
                culled += pool.cull_excess(&mut self.host, now);
            }
        }
        culled
    }

    /// Run every scheduled task that has come due
    ///
    /// Call once per host frame. Returns how many tasks ran.
    pub fn update(&mut self) -> usize {
        let now = self.host.current_time();
        let due = self.scheduler.take_due(now);
        let ran = due.len();

        for task in due {
            match task {
                PoolTask::Despawn(instance) => {
                    self.despawn(instance);
                }
                PoolTask::Maintenance => {
                    self.maintenance_scheduled = false;
                    if let Some(interval) = self.maintenance_interval {
                        self.cull_all();
                        self.scheduler.after(now, interval, PoolTask::Maintenance);
                        self.maintenance_scheduled = true;
                    }
                }
            }
        }
        ran
    }

    /// Remove every pool, destroying idle instances, and drop pending tasks
    pub fn shutdown(&mut self) {
        let ids: Vec<_> = self
            .order
            .iter()
            .rev()
            .filter_map(|key| self.pools.get(*key).map(Pool::template_id))
            .collect();
        for id in ids {
            self.remove_pool(id, true);
        }
        self.scheduler.clear();
        self.maintenance_scheduled = false;
        log::info!("Registry shut down");
    }

    /// Pool registered for a template id
    pub fn pool(&self, id: TemplateId) -> Option<&Pool<H>> {
        self.by_id.get(&id).and_then(|key| self.pools.get(*key))
    }

    /// Mutable pool registered for a template id
    pub fn pool_mut(&mut self, id: TemplateId) -> Option<&mut Pool<H>> {
        let key = *self.by_id.get(&id)?;
        self.pools.get_mut(key)
    }

    /// Pool registered under a template name
    pub fn pool_by_name(&self, name: &str) -> Option<&Pool<H>> {
        self.key_by_name(name).and_then(|key| self.pools.get(key))
    }

    /// Mutable pool registered under a template name
    pub fn pool_by_name_mut(&mut self, name: &str) -> Option<&mut Pool<H>> {
        let key = self.key_by_name(name)?;
        self.pools.get_mut(key)
    }

    /// Pool that owns a live template handle
    pub fn pool_for_template(&self, template: &H::Template) -> Option<&Pool<H>> {
        self.pool(template.template_id())
    }

    /// Whether a pool is registered for `id`
    pub fn contains(&self, id: TemplateId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Whether a pool is registered under `name`
    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of registered pools
    pub fn pool_count(&self) -> usize {
        self.order.len()
    }

    /// Registered pools in registration order
    pub fn pools(&self) -> impl Iterator<Item = &Pool<H>> + '_ {
        self.order.iter().filter_map(|key| self.pools.get(*key))
    }

    /// Template names in registration order
    pub fn pool_names(&self) -> Vec<&str> {
        self.pools().map(Pool::name).collect()
    }

    /// Tasks waiting in the scheduler
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    /// Whether the registry survives environment transitions
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Aggregate statistics
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            pools: self.pool_count(),
            pending_tasks: self.pending_tasks(),
            ..RegistryStats::default()
        };
        for pool in self.pools() {
            let pool_stats = pool.stats();
            stats.idle += pool.idle_count();
            stats.spawned += pool.spawned_count();
            stats.totals.allocated += pool_stats.allocated;
            stats.totals.destroyed += pool_stats.destroyed;
            stats.totals.spawns += pool_stats.spawns;
            stats.totals.despawns += pool_stats.despawns;
            stats.totals.failed_spawns += pool_stats.failed_spawns;
            stats.totals.peak_spawned += pool_stats.peak_spawned;
        }
        stats
    }

    /// The host collaborator
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host collaborator
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn key_by_name(&self, name: &str) -> Option<PoolKey> {
        let id = self.by_name.get(name)?;
        self.by_id.get(id).copied()
    }

    fn spawn_from(&mut self, key: PoolKey, placement: &Placement) -> Option<H::Instance> {
        let pool = self.pools.get_mut(key)?;
        let instance = pool.spawn(&mut self.host, &mut self.scheduler)?;

        self.host.detach_from_container(&instance);
        self.host.set_world_placement(&instance, placement);
        self.host.set_active(&instance, true);
        Some(instance)
    }

    #[cfg(test)]
    pub(crate) fn indices_consistent(&self) -> bool {
        self.order.len() == self.pools.len()
            && self.by_id.len() == self.pools.len()
            && self.by_name.len() == self.pools.len()
            && self.pools.iter().all(|(key, pool)| {
                self.by_id.get(&pool.template_id()) == Some(&key)
                    && self.by_name.get(pool.name()) == Some(&pool.template_id())
                    && self.order.contains(&key)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pooling::events::PoolEvent;
    use crate::pooling::tests::mock_host::{MockHost, MockInstance, MockTemplate};

    fn registry_without_maintenance() -> Registry<MockHost> {
        Registry::new(MockHost::new(), &RegistryConfig::new().with_maintenance_interval(0.0))
    }

    #[test]
    fn test_manage_pool_initializes_and_indexes() {
        let mut registry = registry_without_maintenance();
        let id = registry
            .create_pool(MockTemplate::new(7, "rocket"), PoolConfig::new().with_preallocate(3))
            .unwrap();

        assert_eq!(id, TemplateId(7));
        assert!(registry.contains(id));
        assert!(registry.contains_name("rocket"));
        assert_eq!(registry.pool_by_name("rocket").unwrap().idle_count(), 3);
        assert_eq!(registry.host().container_names(), vec!["rocket pool".to_string()]);
        assert!(registry.indices_consistent());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = registry_without_maintenance();
        registry
            .create_pool(MockTemplate::new(1, "rocket"), PoolConfig::new().with_preallocate(2))
            .unwrap();

        let err = registry
            .create_pool(MockTemplate::new(2, "rocket"), PoolConfig::new().with_preallocate(9))
            .unwrap_err();

        assert!(matches!(err, PoolError::DuplicateTemplate { .. }));
        assert_eq!(registry.pool_count(), 1);
        assert_eq!(registry.pool_by_name("rocket").unwrap().idle_count(), 2);
        assert_eq!(registry.pool_by_name("rocket").unwrap().template_id(), TemplateId(1));
        assert_eq!(registry.host().created_count(), 2);
        assert!(registry.indices_consistent());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = registry_without_maintenance();
        registry.create_pool(MockTemplate::new(1, "rocket"), PoolConfig::new()).unwrap();
        assert!(registry.create_pool(MockTemplate::new(1, "missile"), PoolConfig::new()).is_err());
        assert_eq!(registry.pool_names(), vec!["rocket"]);
    }

    #[test]
    fn test_remove_pool_updates_indices() {
        let mut registry = registry_without_maintenance();
        let rocket = registry.create_pool(MockTemplate::new(1, "rocket"), PoolConfig::new().with_preallocate(2)).unwrap();
        registry.create_pool(MockTemplate::new(2, "spark"), PoolConfig::new()).unwrap();

        let removed = registry.remove_pool(rocket, true).unwrap();
        assert_eq!(removed.idle_count(), 0);
        assert!(!registry.contains(rocket));
        assert!(!registry.contains_name("rocket"));
        assert_eq!(registry.pool_names(), vec!["spark"]);
        assert_eq!(registry.host().container_names(), vec!["spark pool".to_string()]);
        assert!(registry.indices_consistent());

        assert!(registry.remove_pool(rocket, true).is_none());
        assert!(registry.remove_pool_by_name("rocket", true).is_none());
    }

    #[test]
    fn test_spawn_places_and_activates() {
        let mut registry = registry_without_maintenance();
        let template = MockTemplate::new(1, "rocket");
        registry.create_pool(template.clone(), PoolConfig::new().with_preallocate(1)).unwrap();

        let placement = Placement::at(crate::foundation::math::Vec3::new(1.0, 2.0, 3.0));
        let instance = registry.spawn(&template, &placement).unwrap();

        let object = registry.host().object(instance).unwrap();
        assert!(object.active);
        assert_eq!(object.parent, None);
        assert_eq!(object.placement, Some(placement));
        assert_eq!(registry.pool_for_template(&template).unwrap().spawned_count(), 1);
    }

    #[test]
    fn test_despawn_reparents_to_container() {
        let mut registry = registry_without_maintenance();
        registry.create_pool(MockTemplate::new(1, "rocket"), PoolConfig::new()).unwrap();

        let instance = registry.spawn_by_name("rocket", &Placement::identity()).unwrap();
        assert_eq!(registry.despawn(instance), DespawnOutcome::Pooled);

        let container = *registry.pool_by_name("rocket").unwrap().container().unwrap();
        let object = registry.host().object(instance).unwrap();
        assert!(!object.active);
        assert_eq!(object.parent, Some(container));
    }

    #[test]
    fn test_unknown_name_returns_none() {
        let mut registry = registry_without_maintenance();
        assert!(registry.spawn_by_name("ghost", &Placement::identity()).is_none());
        assert_eq!(registry.host().created_count(), 0);
    }

    #[test]
    fn test_unknown_template_falls_back_to_unpooled() {
        let mut registry = registry_without_maintenance();
        let template = MockTemplate::new(3, "debris");

        let instance = registry.spawn(&template, &Placement::identity()).unwrap();
        assert!(registry.host().object(instance).unwrap().active);
        assert_eq!(registry.pool_count(), 0);

        assert_eq!(registry.despawn(instance), DespawnOutcome::Destroyed);
        assert!(registry.host().object(instance).is_none());
    }

    #[test]
    fn test_pool_mut_allows_subscribing() {
        let mut registry = registry_without_maintenance();
        let id = registry.create_pool(MockTemplate::new(1, "rocket"), PoolConfig::new()).unwrap();
        let pool = registry.pool_mut(id).unwrap();
        pool.subscribe(|_: &PoolEvent<'_, MockInstance>| {});
        assert!(registry.pool_by_name_mut("rocket").is_some());
    }
}
