//! Handler registries keyed by event type.
//!
//! Each event type gets one [`HandlerRegistry`], created lazily the first
//! time it is looked up so firing an event nobody listens to is never an
//! error. The dispatcher takes a snapshot of a registry before invoking
//! anything, so handlers may register or unregister while being called
//! without deadlocking or corrupting the iteration in progress.

use crate::event::{AnyEvent, Event, EventKey};
use crate::handler::{HandlerBinding, HandlerId, ListenerKey};

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Ordered handler bindings for one event type.
#[derive(Debug)]
pub struct HandlerRegistry {
    event: EventKey,
    bindings: RwLock<Vec<HandlerBinding>>,
}

impl HandlerRegistry {
    /// Creates an empty registry for `event`.
    pub fn new(event: EventKey) -> Self {
        Self {
            event,
            bindings: RwLock::new(Vec::new()),
        }
    }

    /// The event type this registry serves.
    pub fn event(&self) -> EventKey {
        self.event
    }

    /// Appends one binding.
    pub fn register(&self, binding: HandlerBinding) {
        self.register_all(std::iter::once(binding));
    }

    /// Appends bindings in order. Bindings whose listener has been dropped
    /// are pruned at the same time.
    pub fn register_all<I>(&self, bindings: I)
    where
        I: IntoIterator<Item = HandlerBinding>,
    {
        let mut current = self.bindings.write();
        current.retain(HandlerBinding::is_live);
        current.extend(bindings);
    }

    /// Removes every binding. Returns how many were removed.
    pub fn unregister_all(&self) -> usize {
        let mut current = self.bindings.write();
        let removed = current.len();
        current.clear();
        removed
    }

    /// Removes every binding owned by `listener`. Returns how many were removed.
    ///
    /// Bindings of dropped listeners are pruned too but are not counted.
    pub fn unregister(&self, listener: ListenerKey) -> usize {
        let mut current = self.bindings.write();
        let mut removed = 0;
        current.retain(|binding| {
            if binding.belongs_to(listener) {
                removed += 1;
                false
            } else {
                binding.is_live()
            }
        });
        removed
    }

    /// Removes the binding with `id`.
    pub fn unregister_handler(&self, id: HandlerId) -> bool {
        let mut current = self.bindings.write();
        let before = current.len();
        current.retain(|binding| binding.id() != id);
        current.len() != before
    }

    /// Returns `true` if any binding belongs to `listener`.
    pub fn contains_listener(&self, listener: ListenerKey) -> bool {
        self.bindings
            .read()
            .iter()
            .any(|binding| binding.belongs_to(listener))
    }

    /// Point-in-time copy of the bindings in registration order.
    pub fn bindings(&self) -> Vec<HandlerBinding> {
        self.bindings.read().clone()
    }

    /// Number of bindings, live or not yet pruned.
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    /// Returns `true` if there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}

/// Projects an event onto one of its declared supertypes.
pub type Projection = for<'a> fn(&'a dyn AnyEvent) -> Option<&'a dyn AnyEvent>;

/// A declared "is-a" link from one event type to another.
#[derive(Clone, Copy)]
pub struct Supertype {
    key: EventKey,
    project: Projection,
}

impl Supertype {
    /// Declares that `S` is also dispatched as `P`.
    pub fn of<S, P>() -> Self
    where
        S: Event + AsRef<P>,
        P: Event,
    {
        Self {
            key: EventKey::of::<P>(),
            project: project_as::<S, P>,
        }
    }

    /// The supertype's key.
    pub fn key(&self) -> EventKey {
        self.key
    }

    /// Views `event` as the supertype, or `None` if it is not the subtype.
    pub fn project<'a>(&self, event: &'a dyn AnyEvent) -> Option<&'a dyn AnyEvent> {
        (self.project)(event)
    }
}

impl fmt::Debug for Supertype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Supertype").field(&self.key).finish()
    }
}

fn project_as<S, P>(event: &dyn AnyEvent) -> Option<&dyn AnyEvent>
where
    S: Event + AsRef<P>,
    P: Event,
{
    event
        .downcast_ref::<S>()
        .map(|sub| sub.as_ref() as &dyn AnyEvent)
}

/// All registries of one bus, plus the supertype links between event types.
#[derive(Debug, Default)]
pub struct HandlerMap {
    registries: RwLock<HashMap<EventKey, Arc<HandlerRegistry>>>,
    supertypes: RwLock<HashMap<EventKey, Vec<Supertype>>>,
}

impl HandlerMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the registry for `event`, creating it if absent.
    pub fn get_or_create(&self, event: EventKey) -> Arc<HandlerRegistry> {
        if let Some(registry) = self.registries.read().get(&event) {
            return Arc::clone(registry);
        }

        let mut registries = self.registries.write();
        Arc::clone(
            registries
                .entry(event)
                .or_insert_with(|| Arc::new(HandlerRegistry::new(event))),
        )
    }

    /// Returns the registry for `event` if one exists.
    pub fn get(&self, event: EventKey) -> Option<Arc<HandlerRegistry>> {
        self.registries.read().get(&event).cloned()
    }

    fn all(&self) -> Vec<Arc<HandlerRegistry>> {
        self.registries.read().values().cloned().collect()
    }

    /// Removes `listener` from every registry. Returns how many bindings went.
    pub fn unregister_listener(&self, listener: ListenerKey) -> usize {
        self.all()
            .iter()
            .map(|registry| registry.unregister(listener))
            .sum()
    }

    /// Removes the binding with `id` from whichever registry holds it.
    pub fn unregister_handler(&self, id: HandlerId) -> bool {
        self.all()
            .iter()
            .any(|registry| registry.unregister_handler(id))
    }

    /// Returns `true` if `listener` has any binding.
    pub fn contains_listener(&self, listener: ListenerKey) -> bool {
        self.all()
            .iter()
            .any(|registry| registry.contains_listener(listener))
    }

    /// Number of bindings for `event`.
    pub fn handler_count(&self, event: EventKey) -> usize {
        self.get(event).map_or(0, |registry| registry.len())
    }

    /// Number of bindings across all event types.
    pub fn total_handler_count(&self) -> usize {
        self.all().iter().map(|registry| registry.len()).sum()
    }

    /// Records that events of type `S` are also dispatched as `P`.
    ///
    /// Returns `false` if the link already existed.
    pub fn map_supertype<S, P>(&self) -> bool
    where
        S: Event + AsRef<P>,
        P: Event,
    {
        let link = Supertype::of::<S, P>();
        let mut supertypes = self.supertypes.write();
        let links = supertypes.entry(EventKey::of::<S>()).or_default();
        if links.iter().any(|existing| existing.key == link.key) {
            return false;
        }
        links.push(link);
        true
    }

    /// The direct supertypes declared for `event`, in declaration order.
    pub fn supertypes_of(&self, event: EventKey) -> Vec<Supertype> {
        self.supertypes
            .read()
            .get(&event)
            .cloned()
            .unwrap_or_default()
    }

    /// Empties every registry and forgets all registries and supertype links.
    pub fn clear(&self) {
        let registries = std::mem::take(&mut *self.registries.write());
        for registry in registries.values() {
            registry.unregister_all();
        }
        self.supertypes.write().clear();
    }
}
