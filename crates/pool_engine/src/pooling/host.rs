//! Host abstraction traits for the pooling system
//!
//! The pooling layer never creates, destroys or places anything itself. It
//! asks its host through [`PoolHost`], which keeps the core free of any scene
//! graph, renderer or timer dependency.

use crate::foundation::math::Placement;
use std::fmt;
use std::time::Duration;

/// Stable reference identity of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub u64);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A prototype that pooled instances are created from
pub trait PoolTemplate {
    /// Reference identity used for handle-based lookups
    fn template_id(&self) -> TemplateId;

    /// Display name used for name-based lookups
    ///
    /// Instances created from this template must report the same name through
    /// [`PoolHost::instance_name`] so despawns can find their pool.
    fn name(&self) -> &str;
}

/// Collaborator interface the pooling layer drives
///
/// Required methods cover instance lifetime, activation, parenting and time.
/// The provided methods are optional capabilities: a host that cannot reset
/// instances or report effect durations simply keeps the defaults and the
/// pools degrade gracefully.
pub trait PoolHost {
    /// Prototype type instances are created from
    type Template: PoolTemplate;

    /// Handle to a live instance
    type Instance: Clone + PartialEq + fmt::Debug;

    /// Handle to the object idle instances are parented under
    type Container;

    /// Physically create a new instance from `template`
    fn create_instance(&mut self, template: &Self::Template) -> Self::Instance;

    /// Physically destroy an instance
    fn destroy_instance(&mut self, instance: Self::Instance);

    /// Activate or deactivate an instance
    fn set_active(&mut self, instance: &Self::Instance, active: bool);

    /// Create the container a pool parents its idle instances under
    fn create_container(&mut self, pool_name: &str) -> Self::Container;

    /// Destroy a container once its pool is gone
    fn destroy_container(&mut self, container: Self::Container);

    /// Parent an instance under a pool container
    fn attach_to_container(&mut self, instance: &Self::Instance, container: &Self::Container);

    /// Detach an instance so it lives freely in the world
    fn detach_from_container(&mut self, instance: &Self::Instance);

    /// Move an instance to a world position and orientation
    fn set_world_placement(&mut self, instance: &Self::Instance, placement: &Placement);

    /// Name of the template an instance was created from
    ///
    /// `None` when the instance no longer exists.
    fn instance_name(&self, instance: &Self::Instance) -> Option<String>;

    /// Current host time
    fn current_time(&self) -> Duration;

    /// Reset an instance to its freshly spawned state
    ///
    /// Returns `false` when the instance has no reset capability.
    fn reset_instance(&mut self, _instance: &Self::Instance) -> bool {
        false
    }

    /// How long an instance's effect lasts, if it has one
    fn effect_duration(&self, _instance: &Self::Instance) -> Option<Duration> {
        None
    }

    /// Look up a template by name for statically configured pools
    fn resolve_template(&mut self, _name: &str) -> Option<Self::Template> {
        None
    }
}
