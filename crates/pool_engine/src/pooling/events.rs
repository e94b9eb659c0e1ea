//! Pool lifecycle notifications
//!
//! Pools emit exactly two notifications: an instance was spawned, or an
//! instance was despawned. Subscribers are purely observational and cannot
//! influence the operation that fired them.

use std::fmt;

/// Lifecycle notification emitted by a pool
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoolEvent<'a, I> {
    /// An instance left the pool for active use
    Spawned {
        /// Template name of the pool
        pool: &'a str,
        /// The spawned instance
        instance: &'a I,
    },
    /// An instance came back to the pool
    Despawned {
        /// Template name of the pool
        pool: &'a str,
        /// The returned instance
        instance: &'a I,
    },
}

impl<'a, I> PoolEvent<'a, I> {
    /// Template name of the pool that fired the event
    pub fn pool(&self) -> &'a str {
        match self {
            Self::Spawned { pool, .. } | Self::Despawned { pool, .. } => pool,
        }
    }

    /// Instance the event is about
    pub fn instance(&self) -> &'a I {
        match self {
            Self::Spawned { instance, .. } | Self::Despawned { instance, .. } => instance,
        }
    }
}

/// Subscriber to pool notifications
pub trait PoolEventHandler<I> {
    /// Observe an event
    fn on_event(&mut self, event: &PoolEvent<'_, I>);
}

impl<I, F> PoolEventHandler<I> for F
where
    F: FnMut(&PoolEvent<'_, I>),
{
    fn on_event(&mut self, event: &PoolEvent<'_, I>) {
        self(event);
    }
}

/// Token returned by [`PoolEvents::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Subscriber list owned by a pool
pub struct PoolEvents<I> {
    handlers: Vec<(SubscriptionId, Box<dyn PoolEventHandler<I>>)>,
    next_id: u64,
}

impl<I> Default for PoolEvents<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> fmt::Debug for PoolEvents<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolEvents")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

impl<I> PoolEvents<I> {
    /// Create an empty subscriber list
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a subscriber
    pub fn subscribe(&mut self, handler: impl PoolEventHandler<I> + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a subscriber; returns whether it was registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Deliver an event to every subscriber in subscription order
    pub fn emit(&mut self, event: &PoolEvent<'_, I>) {
        for (_, handler) in &mut self.handlers {
            handler.on_event(event);
        }
    }

    /// Number of subscribers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether nobody is listening
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
