//! Integration tests for registry workflows
//!
//! Drives complete spawn/despawn/maintenance cycles through the registry the
//! way a host frame loop would: mutate, advance the clock, call `update`.

use crate::core::config::{PoolConfig, RegistryConfig};
use crate::foundation::math::{Placement, Vec3};
use crate::pooling::error::PoolError;
use crate::pooling::registry::{DespawnOutcome, EnvironmentTransition, Registry};
use crate::pooling::tests::mock_host::{MockHost, MockTemplate};
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> RegistryConfig {
        RegistryConfig::new().with_maintenance_interval(0.0)
    }

    fn registry_with(pools: &[(u64, &str, PoolConfig)]) -> Registry<MockHost> {
        let mut registry = Registry::new(MockHost::new(), &quiet_config());
        for (id, name, config) in pools {
            registry.create_pool(MockTemplate::new(*id, name), config.clone()).unwrap();
        }
        registry
    }

    #[test]
    fn test_hard_limit_through_registry() {
        let mut registry = registry_with(&[(
            1,
            "drone",
            PoolConfig::new().with_preallocate(5).with_growth(1).with_hard_limit(6),
        )]);

        for _ in 0..6 {
            assert!(registry.spawn_by_name("drone", &Placement::identity()).is_some());
        }
        let pool = registry.pool_by_name("drone").unwrap();
        assert_eq!(pool.spawned_count(), 6);
        assert_eq!(pool.idle_count(), 0);

        assert!(registry.spawn_by_name("drone", &Placement::identity()).is_none());
        assert_eq!(registry.host().created_count(), 6);
    }

    #[test]
    fn test_growth_on_empty_through_registry() {
        let mut registry = registry_with(&[(1, "shell", PoolConfig::new().with_preallocate(2))]);

        let spawned: Vec<_> = (0..5)
            .map(|_| registry.spawn_by_name("shell", &Placement::identity()))
            .collect();

        assert!(spawned.iter().all(Option::is_some));
        let pool = registry.pool_by_name("shell").unwrap();
        assert_eq!(pool.spawned_count(), 5);
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.stats().allocated, 5);
    }

    #[test]
    fn test_lifo_reuse_through_registry() {
        let mut registry = registry_with(&[(1, "shell", PoolConfig::new().with_preallocate(2))]);

        let a = registry.spawn_by_name("shell", &Placement::identity()).unwrap();
        let b = registry.spawn_by_name("shell", &Placement::identity()).unwrap();
        registry.despawn(a);
        registry.despawn(b);

        let placement = Placement::at(Vec3::new(0.0, 4.0, 0.0));
        assert_eq!(registry.spawn_by_name("shell", &placement), Some(b));
        assert_eq!(registry.host().object(b).unwrap().placement, Some(placement));
        assert_eq!(registry.host().created_count(), 2);
    }

    #[test]
    fn test_environment_transition_purges_non_persistent_pools() {
        let mut registry = registry_with(&[
            (1, "hud_marker", PoolConfig::new().with_preallocate(2).with_persistent(true)),
            (2, "bullet", PoolConfig::new().with_preallocate(3)),
        ]);

        let returned = registry.spawn_by_name("bullet", &Placement::identity()).unwrap();
        let outstanding = registry.spawn_by_name("bullet", &Placement::identity()).unwrap();
        assert_eq!(registry.despawn(returned), DespawnOutcome::Pooled);

        let removed = registry.on_environment_transition(&EnvironmentTransition::new("level_2"));

        assert_eq!(removed, 1);
        assert_eq!(registry.pool_names(), vec!["hud_marker"]);
        assert!(registry.indices_consistent());
        // Idle bullets were destroyed, the checked-out one survives
        assert!(registry.host().object(returned).is_none());
        assert!(registry.host().object(outstanding).is_some());

        // Its eventual despawn finds no pool and destroys it directly
        assert_eq!(registry.despawn(outstanding), DespawnOutcome::Destroyed);
        assert!(registry.host().object(outstanding).is_none());
        assert_eq!(registry.host().missing_destroys, 0);
        assert_eq!(registry.host().live_count(), 2);
    }

    #[test]
    fn test_environment_transition_removes_every_non_persistent_pool() {
        let mut registry = registry_with(&[
            (1, "a", PoolConfig::new()),
            (2, "b", PoolConfig::new().with_persistent(true)),
            (3, "c", PoolConfig::new()),
            (4, "d", PoolConfig::new()),
        ]);

        assert_eq!(registry.on_environment_transition(&EnvironmentTransition::new("menu")), 3);
        assert_eq!(registry.pool_names(), vec!["b"]);
        assert!(registry.indices_consistent());

        // Nothing left to purge
        assert_eq!(registry.on_environment_transition(&EnvironmentTransition::new("level_1")), 0);
    }

    #[test]
    fn test_non_persistent_registry_drops_all_pools_on_transition() {
        let config = quiet_config().with_persistent(false);
        let mut registry = Registry::new(MockHost::new(), &config);
        registry
            .create_pool(MockTemplate::new(1, "hud_marker"), PoolConfig::new().with_persistent(true))
            .unwrap();
        registry.create_pool(MockTemplate::new(2, "bullet"), PoolConfig::new()).unwrap();

        assert_eq!(registry.on_environment_transition(&EnvironmentTransition::new("credits")), 2);
        assert_eq!(registry.pool_count(), 0);
        assert_eq!(registry.host().live_count(), 0);
        assert!(registry.host().container_names().is_empty());
    }

    #[test]
    fn test_maintenance_loop_culls_once_per_pool_interval() {
        let config = RegistryConfig::new().with_maintenance_interval(1.0);
        let mut registry = Registry::new(MockHost::new(), &config);
        registry
            .create_pool(
                MockTemplate::new(1, "spark"),
                PoolConfig::new().with_preallocate(10).with_culling(2, 3.0).with_cull_max_per_pass(0),
            )
            .unwrap();
        assert_eq!(registry.pending_tasks(), 1);

        for _ in 0..2 {
            registry.host().advance_secs(1.0);
            registry.update();
            assert_eq!(registry.pool_by_name("spark").unwrap().idle_count(), 10);
        }

        registry.host().advance_secs(1.0);
        assert_eq!(registry.update(), 1);
        assert_eq!(registry.pool_by_name("spark").unwrap().idle_count(), 2);

        // Refill and confirm the next pass waits a full cull interval
        let burst: Vec<_> = (0..7)
            .filter_map(|_| registry.spawn_by_name("spark", &Placement::identity()))
            .collect();
        for instance in burst {
            registry.despawn(instance);
        }
        assert_eq!(registry.pool_by_name("spark").unwrap().idle_count(), 7);

        for _ in 0..2 {
            registry.host().advance_secs(1.0);
            registry.update();
            assert_eq!(registry.pool_by_name("spark").unwrap().idle_count(), 7);
        }
        registry.host().advance_secs(1.0);
        registry.update();
        assert_eq!(registry.pool_by_name("spark").unwrap().idle_count(), 2);
        assert_eq!(registry.pending_tasks(), 1);
    }

    #[test]
    fn test_maintenance_disabled_with_zero_interval() {
        let mut registry = registry_with(&[(
            1,
            "spark",
            PoolConfig::new().with_preallocate(10).with_culling(2, 0.0),
        )]);
        assert_eq!(registry.pending_tasks(), 0);

        registry.host().advance_secs(30.0);
        assert_eq!(registry.update(), 0);
        assert_eq!(registry.pool_by_name("spark").unwrap().idle_count(), 10);

        // Manual passes still work
        assert_eq!(registry.cull_all(), 8);
    }

    #[test]
    fn test_oversized_intervals_never_panic() {
        let config = RegistryConfig::new().with_maintenance_interval(1e20);
        let mut registry = Registry::new(MockHost::new(), &config);
        assert_eq!(registry.pending_tasks(), 0);

        let result = registry.create_pool(
            MockTemplate::new(1, "spark"),
            PoolConfig::new().with_preallocate(4).with_culling(1, 1e20),
        );
        assert!(matches!(result, Err(PoolError::InvalidConfig { .. })));
        assert_eq!(registry.pool_count(), 0);

        registry.host().advance_secs(10.0);
        assert_eq!(registry.update(), 0);
        assert_eq!(registry.cull_all(), 0);
        assert!(Registry::from_config(MockHost::new(), config).is_err());
    }

    #[test]
    fn test_maintenance_can_be_stopped() {
        let config = RegistryConfig::new().with_maintenance_interval(1.0);
        let mut registry = Registry::new(MockHost::new(), &config);
        registry.run_maintenance_loop(-1.0);

        registry.host().advance_secs(1.0);
        assert_eq!(registry.update(), 1);
        assert_eq!(registry.pending_tasks(), 0);

        registry.run_maintenance_loop(0.5);
        assert_eq!(registry.pending_tasks(), 1);
        registry.run_maintenance_loop(0.5);
        assert_eq!(registry.pending_tasks(), 1);
    }

    #[test]
    fn test_despawn_after_delay() {
        let mut registry = registry_with(&[(1, "flare", PoolConfig::new().with_preallocate(1))]);
        let instance = registry.spawn_by_name("flare", &Placement::identity()).unwrap();

        registry.despawn_after(instance, Duration::from_millis(1500));
        registry.host().advance_secs(1.0);
        assert_eq!(registry.update(), 0);
        assert!(registry.host().object(instance).unwrap().active);

        registry.host().advance_secs(0.5);
        assert_eq!(registry.update(), 1);
        let pool = registry.pool_by_name("flare").unwrap();
        assert_eq!(pool.spawned_count(), 0);
        assert!(pool.is_idle(&instance));
    }

    #[test]
    fn test_repeated_delayed_despawns_are_independent_and_safe() {
        let mut registry = registry_with(&[(1, "flare", PoolConfig::new().with_preallocate(2))]);
        let first = registry.spawn_by_name("flare", &Placement::identity()).unwrap();
        let _second = registry.spawn_by_name("flare", &Placement::identity()).unwrap();

        registry.despawn_after(first, Duration::from_secs(1));
        registry.despawn_after(first, Duration::from_secs(2));
        assert_eq!(registry.pending_tasks(), 2);

        registry.host().advance_secs(2.0);
        assert_eq!(registry.update(), 2);

        // The second despawn is rejected, so counts stay consistent
        let pool = registry.pool_by_name("flare").unwrap();
        assert_eq!(pool.spawned_count(), 1);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_delayed_despawn_of_destroyed_instance_is_harmless() {
        let mut registry = registry_with(&[]);
        let debris = MockTemplate::new(9, "debris");
        let instance = registry.spawn(&debris, &Placement::identity()).unwrap();

        registry.despawn_after(instance, Duration::from_secs(1));
        assert_eq!(registry.despawn(instance), DespawnOutcome::Destroyed);

        registry.host().advance_secs(1.0);
        assert_eq!(registry.update(), 1);
        assert_eq!(registry.host().missing_destroys, 1);
    }

    #[test]
    fn test_auto_expire_returns_instances_after_effect_duration() {
        let mut registry = Registry::new(MockHost::new(), &quiet_config());
        let template = MockTemplate::new(4, "explosion").with_effect(Duration::from_secs(2));
        registry
            .create_pool(template.clone(), PoolConfig::new().with_preallocate(1).with_auto_expire(true))
            .unwrap();

        let instance = registry.spawn(&template, &Placement::identity()).unwrap();
        assert_eq!(registry.pending_tasks(), 1);

        registry.host().advance_secs(2.0);
        registry.update();
        assert!(registry.pool_for_template(&template).unwrap().is_idle(&instance));
    }

    #[test]
    fn test_pool_created_later_does_not_adopt_unpooled_instance() {
        let mut registry = registry_with(&[]);
        let debris = MockTemplate::new(9, "debris");
        let stray = registry.spawn(&debris, &Placement::identity()).unwrap();

        registry.create_pool(debris.clone(), PoolConfig::new().with_preallocate(1)).unwrap();

        // The new pool never handed `stray` out, so it is destroyed instead
        assert_eq!(registry.despawn(stray), DespawnOutcome::Destroyed);
        assert_eq!(registry.pool_for_template(&debris).unwrap().idle_count(), 1);
    }

    #[test]
    fn test_unpooled_instance_rejected_while_pool_has_instances_out() {
        let mut registry = registry_with(&[]);
        let debris = MockTemplate::new(9, "debris");
        let stray = registry.spawn(&debris, &Placement::identity()).unwrap();

        registry.create_pool(debris.clone(), PoolConfig::new().with_preallocate(1)).unwrap();
        let legit = registry.spawn(&debris, &Placement::identity()).unwrap();

        assert_eq!(registry.despawn(stray), DespawnOutcome::Destroyed);
        assert!(registry.host().object(stray).is_none());

        assert_eq!(registry.despawn(legit), DespawnOutcome::Pooled);
        assert!(registry.host().object(legit).is_some());
        let pool = registry.pool_for_template(&debris).unwrap();
        assert!(pool.is_idle(&legit));
        assert_eq!(pool.spawned_count(), 0);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_counts_conserved_across_mixed_despawns() {
        let mut registry = registry_with(&[
            (1, "bullet", PoolConfig::new().with_preallocate(2).with_growth(2).with_culling(1, 0.0)),
            (2, "spark", PoolConfig::new().with_preallocate(1)),
        ]);
        let debris = MockTemplate::new(9, "debris");
        let stray = registry.spawn(&debris, &Placement::identity()).unwrap();

        let bullets: Vec<_> = (0..5)
            .filter_map(|_| registry.spawn_by_name("bullet", &Placement::identity()))
            .collect();
        let spark = registry.spawn_by_name("spark", &Placement::identity()).unwrap();

        registry.despawn(bullets[0]);
        registry.despawn(bullets[1]);
        registry.despawn(bullets[1]);
        registry.despawn(stray);
        registry.despawn(spark);
        registry.despawn(spark);
        registry.cull_all();

        let stats = registry.stats();
        assert_eq!(stats.totals.allocated - stats.totals.destroyed, stats.idle + stats.spawned);
        assert_eq!(stats.spawned, 3);
        assert_eq!(registry.host().live_count(), stats.idle + stats.spawned);
        for pool in registry.pools() {
            let pool_stats = pool.stats();
            assert_eq!(pool.total_count(), pool_stats.allocated - pool_stats.destroyed);
        }
    }

    #[test]
    fn test_from_config_creates_static_pools() {
        let host = MockHost::new()
            .with_template(MockTemplate::new(1, "bullet"))
            .with_template(MockTemplate::new(2, "spark"));
        let config = quiet_config()
            .with_pool("bullet", PoolConfig::new().with_preallocate(4))
            .with_pool("missing", PoolConfig::new())
            .with_pool("spark", PoolConfig::new().with_preallocate(2));

        let registry = Registry::from_config(host, config).unwrap();

        assert_eq!(registry.pool_names(), vec!["bullet", "spark"]);
        assert_eq!(registry.host().created_count(), 6);
        assert!(registry.indices_consistent());
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let config = quiet_config().with_pool("bullet", PoolConfig::new().with_hard_limit(0));
        assert!(Registry::from_config(MockHost::new(), config).is_err());
    }

    #[test]
    fn test_shutdown_clears_everything() {
        let mut registry = Registry::new(MockHost::new(), &RegistryConfig::new());
        registry.create_pool(MockTemplate::new(1, "a"), PoolConfig::new().with_preallocate(3)).unwrap();
        registry.create_pool(MockTemplate::new(2, "b"), PoolConfig::new().with_preallocate(2)).unwrap();
        let outstanding = registry.spawn_by_name("a", &Placement::identity()).unwrap();
        registry.despawn_after(outstanding, Duration::from_secs(5));

        registry.shutdown();

        assert_eq!(registry.pool_count(), 0);
        assert_eq!(registry.pending_tasks(), 0);
        assert_eq!(registry.host().live_count(), 1);
        assert!(registry.indices_consistent());
    }

    #[test]
    fn test_stats_aggregate_across_pools() {
        let mut registry = registry_with(&[
            (1, "a", PoolConfig::new().with_preallocate(3)),
            (2, "b", PoolConfig::new().with_preallocate(1).with_hard_limit(1)),
        ]);
        let a = registry.spawn_by_name("a", &Placement::identity()).unwrap();
        registry.spawn_by_name("b", &Placement::identity()).unwrap();
        assert!(registry.spawn_by_name("b", &Placement::identity()).is_none());
        registry.despawn(a);

        let stats = registry.stats();
        assert_eq!(stats.pools, 2);
        assert_eq!(stats.idle, 3);
        assert_eq!(stats.spawned, 1);
        assert_eq!(stats.totals.allocated, 4);
        assert_eq!(stats.totals.spawns, 2);
        assert_eq!(stats.totals.despawns, 1);
        assert_eq!(stats.totals.failed_spawns, 1);
    }
}
