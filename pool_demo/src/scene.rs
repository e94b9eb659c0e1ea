//! Minimal scene graph that hosts pooled objects for the demo
//!
//! Objects and pool groups live in slot maps. Nothing is rendered; the scene
//! only tracks the state a real engine would (activation, parenting,
//! placement) so the pools have something to drive.

use pool_engine::foundation::math::Placement;
use pool_engine::foundation::time::{Clock, ManualClock};
use pool_engine::pooling::{PoolHost, PoolTemplate, TemplateId};
use slotmap::{new_key_type, SlotMap};
use std::collections::HashMap;
use std::time::Duration;

new_key_type! {
    /// Handle to a scene object
    pub struct ObjectKey;
    /// Handle to a pool group node
    pub struct GroupKey;
}

/// Prototype for scene objects
#[derive(Debug, Clone)]
pub struct Prefab {
    id: TemplateId,
    name: String,
    lifetime: Option<Duration>,
}

impl Prefab {
    pub fn new(id: u64, name: &str) -> Self {
        Self {
            id: TemplateId(id),
            name: name.to_string(),
            lifetime: None,
        }
    }

    /// Give the prefab a finite effect, like a particle burst
    pub fn with_lifetime(mut self, secs: f32) -> Self {
        self.lifetime = Some(Duration::from_secs_f32(secs));
        self
    }
}

impl PoolTemplate for Prefab {
    fn template_id(&self) -> TemplateId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
struct SceneObject {
    prefab: String,
    active: bool,
    group: Option<GroupKey>,
    placement: Placement,
    lifetime: Option<Duration>,
    resets: u32,
}

/// Scene state plus the frame clock
#[derive(Default)]
pub struct Scene {
    clock: ManualClock,
    objects: SlotMap<ObjectKey, SceneObject>,
    groups: SlotMap<GroupKey, String>,
    prefabs: HashMap<String, Prefab>,
    created: usize,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prefab so pools declared in config files can find it
    pub fn register_prefab(&mut self, prefab: Prefab) {
        self.prefabs.insert(prefab.name.clone(), prefab);
    }

    pub fn prefab(&self, name: &str) -> Option<&Prefab> {
        self.prefabs.get(name)
    }

    /// Advance the frame clock
    pub fn tick(&self, dt: f32) {
        self.clock.advance_secs(dt);
    }

    pub fn now_secs(&self) -> f32 {
        self.clock.now().as_secs_f32()
    }

    /// Objects currently alive, active or not
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Objects visible in the world
    pub fn active_count(&self) -> usize {
        self.objects.values().filter(|object| object.active).count()
    }

    /// Objects ever created
    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Objects parked under a pool group
    pub fn parked_count(&self) -> usize {
        self.objects.values().filter(|object| object.group.is_some()).count()
    }

    /// Distance of the active object farthest from the origin
    pub fn active_extent(&self) -> f32 {
        self.objects
            .values()
            .filter(|object| object.active)
            .map(|object| object.placement.position.norm())
            .fold(0.0, f32::max)
    }

    /// Times any object was reset on reuse
    pub fn reset_count(&self) -> u32 {
        self.objects.values().map(|object| object.resets).sum()
    }
}

impl PoolHost for Scene {
    type Template = Prefab;
    type Instance = ObjectKey;
    type Container = GroupKey;

    fn create_instance(&mut self, template: &Prefab) -> ObjectKey {
        self.created += 1;
        self.objects.insert(SceneObject {
            prefab: template.name.clone(),
            active: true,
            group: None,
            placement: Placement::identity(),
            lifetime: template.lifetime,
            resets: 0,
        })
    }

    fn destroy_instance(&mut self, instance: ObjectKey) {
        if self.objects.remove(instance).is_none() {
            log::warn!("Scene object {instance:?} was already destroyed");
        }
    }

    fn set_active(&mut self, instance: &ObjectKey, active: bool) {
        if let Some(object) = self.objects.get_mut(*instance) {
            object.active = active;
        }
    }

    fn create_container(&mut self, pool_name: &str) -> GroupKey {
        self.groups.insert(format!("{pool_name} pool"))
    }

    fn destroy_container(&mut self, container: GroupKey) {
        if let Some(name) = self.groups.remove(container) {
            log::debug!("Removed scene group '{name}'");
        }
    }

    fn attach_to_container(&mut self, instance: &ObjectKey, container: &GroupKey) {
        if let Some(object) = self.objects.get_mut(*instance) {
            object.group = Some(*container);
        }
    }

    fn detach_from_container(&mut self, instance: &ObjectKey) {
        if let Some(object) = self.objects.get_mut(*instance) {
            object.group = None;
        }
    }

    fn set_world_placement(&mut self, instance: &ObjectKey, placement: &Placement) {
        if let Some(object) = self.objects.get_mut(*instance) {
            object.placement = *placement;
        }
    }

    fn instance_name(&self, instance: &ObjectKey) -> Option<String> {
        self.objects.get(*instance).map(|object| object.prefab.clone())
    }

    fn current_time(&self) -> Duration {
        self.clock.now()
    }

    fn reset_instance(&mut self, instance: &ObjectKey) -> bool {
        match self.objects.get_mut(*instance) {
            Some(object) => {
                object.resets += 1;
                true
            }
            None => false,
        }
    }

    fn effect_duration(&self, instance: &ObjectKey) -> Option<Duration> {
        self.objects.get(*instance).and_then(|object| object.lifetime)
    }

    fn resolve_template(&mut self, name: &str) -> Option<Prefab> {
        self.prefabs.get(name).cloned()
    }
}
