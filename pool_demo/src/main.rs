//! Pooling demo
//!
//! Simulates a few seconds of a shooter at 60 frames per second: bullets that
//! despawn after a random flight time, spark bursts returned right away,
//! self-expiring explosions and a level change halfway through. Pool
//! statistics are logged as the simulation runs.
//!
//! Usage: `pool_demo [pools.ron|pools.toml]`

mod scene;

use pool_engine::config::{Config, ConfigError};
use pool_engine::core::config::{PoolConfig, RegistryConfig};
use pool_engine::foundation::logging;
use pool_engine::foundation::math::{Placement, Vec3};
use pool_engine::foundation::time::Stopwatch;
use pool_engine::pooling::{EnvironmentTransition, Registry};
use rand::prelude::*;
use scene::{Prefab, Scene};
use std::time::Duration;

// Simulation constants
const FRAME_SECS: f32 = 1.0 / 60.0;
const FRAMES: u32 = 600;
const LEVEL_CHANGE_FRAME: u32 = 300;
const REPORT_EVERY: u32 = 120;
const SPARK_BURST: usize = 6;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("Failed to load pool configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Prefab '{0}' is not registered in the scene")]
    MissingPrefab(String),
}

fn default_config() -> RegistryConfig {
    RegistryConfig::new()
        .with_maintenance_interval(1.0)
        .with_pool(
            "bullet",
            PoolConfig::new()
                .with_preallocate(32)
                .with_growth(8)
                .with_hard_limit(128)
                .with_culling(48, 5.0)
                .with_cull_max_per_pass(16),
        )
        .with_pool(
            "spark",
            PoolConfig::new()
                .with_preallocate(16)
                .with_growth(4)
                .with_culling(16, 2.0)
                .with_reset_on_spawn(true),
        )
        .with_pool("explosion", PoolConfig::new().with_preallocate(4).with_auto_expire(true))
        .with_pool("hud_marker", PoolConfig::new().with_preallocate(2).with_persistent(true))
}

fn build_scene() -> Scene {
    let mut scene = Scene::new();
    scene.register_prefab(Prefab::new(1, "bullet"));
    scene.register_prefab(Prefab::new(2, "spark"));
    scene.register_prefab(Prefab::new(3, "explosion").with_lifetime(1.5));
    scene.register_prefab(Prefab::new(4, "hud_marker"));
    // Never pooled; exercises the unpooled fallback
    scene.register_prefab(Prefab::new(5, "debris"));
    scene
}

fn random_placement(rng: &mut StdRng) -> Placement {
    let position = Vec3::new(
        rng.gen_range(-50.0..50.0),
        rng.gen_range(-50.0..50.0),
        rng.gen_range(-10.0..10.0),
    );
    Placement::from_euler(position, 0.0, 0.0, rng.gen_range(0.0..std::f32::consts::TAU))
}

fn report(registry: &Registry<Scene>, frame: u32) {
    let stats = registry.stats();
    let scene = registry.host();
    log::info!(
        "[frame {frame:3}] t={:.2}s pools={} idle={} spawned={} pending={} | scene objects={} active={} parked={} extent={:.1}",
        scene.now_secs(),
        stats.pools,
        stats.idle,
        stats.spawned,
        stats.pending_tasks,
        scene.object_count(),
        scene.active_count(),
        scene.parked_count(),
        scene.active_extent(),
    );
    for pool in registry.pools() {
        let pool_stats = pool.stats();
        log::debug!(
            "    {:<10} idle={:3} spawned={:3} allocated={} destroyed={} failed={} peak={}",
            pool.name(),
            pool.idle_count(),
            pool.spawned_count(),
            pool_stats.allocated,
            pool_stats.destroyed,
            pool_stats.failed_spawns,
            pool_stats.peak_spawned,
        );
    }
}

fn run(config: RegistryConfig) -> Result<(), DemoError> {
    let scene = build_scene();
    let debris = scene
        .prefab("debris")
        .cloned()
        .ok_or_else(|| DemoError::MissingPrefab("debris".to_string()))?;

    let mut registry = Registry::from_config(scene, config)?;
    let mut rng = StdRng::seed_from_u64(7);
    let mut sparks = Vec::with_capacity(SPARK_BURST);

    if let Some(marker) = registry.spawn_by_name("hud_marker", &Placement::identity()) {
        log::info!("HUD marker {marker:?} placed; it survives level changes");
    }

    for frame in 1..=FRAMES {
        registry.host().tick(FRAME_SECS);

        // Bullets fly for a random time before returning to their pool
        for _ in 0..rng.gen_range(0..4) {
            if let Some(bullet) = registry.spawn_by_name("bullet", &random_placement(&mut rng)) {
                let flight = Duration::from_secs_f32(rng.gen_range(0.3..2.5));
                registry.despawn_after(bullet, flight);
            }
        }

        // Spark bursts live for a single frame
        for spark in sparks.drain(..) {
            registry.despawn(spark);
        }
        if rng.gen_bool(0.2) {
            let origin = random_placement(&mut rng);
            sparks.extend((0..SPARK_BURST).filter_map(|_| registry.spawn_by_name("spark", &origin)));
        }

        // Explosions return on their own once their effect ends
        if rng.gen_bool(0.05) {
            registry.spawn_by_name("explosion", &random_placement(&mut rng));
        }

        if rng.gen_bool(0.01) {
            if let Some(chunk) = registry.spawn(&debris, &random_placement(&mut rng)) {
                registry.despawn_after(chunk, Duration::from_secs(1));
            }
        }

        registry.update();

        if frame == LEVEL_CHANGE_FRAME {
            for spark in sparks.drain(..) {
                registry.despawn(spark);
            }
            let removed = registry.on_environment_transition(&EnvironmentTransition::new("level_2"));
            log::info!("Level change removed {removed} pools; remaining: {:?}", registry.pool_names());
        }

        if frame % REPORT_EVERY == 0 {
            report(&registry, frame);
        }
    }

    let scene = registry.host();
    log::info!(
        "Simulation finished: {} objects created, {} resets, {} scene groups",
        scene.created_count(),
        scene.reset_count(),
        scene.group_count()
    );

    registry.shutdown();
    log::info!("After shutdown: {} scene objects remain", registry.host().object_count());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_level("info");
    log::info!("Starting pool demo");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading pool configuration from {path}");
            RegistryConfig::load_from_file(&path).map_err(DemoError::from)?
        }
        None => default_config(),
    };

    let stopwatch = Stopwatch::start_new();
    let result = run(config);

    match result {
        Ok(()) => {
            log::info!("Pool demo completed in {:.2} ms", stopwatch.elapsed_millis());
            Ok(())
        }
        Err(e) => {
            log::error!("Pool demo failed: {e}");
            Err(e.into())
        }
    }
}
