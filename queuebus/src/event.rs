//! Core event trait and type-erased event handles.
//!
//! Every payload that travels through the bus implements [`Event`]. Events
//! are immutable once fired: the bus wraps them in an `Arc` and hands shared
//! references to each handler, so no `Clone` bound is required.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Core trait that all events must implement.
///
/// Most events should use `#[derive(Event)]`:
///
/// ```rust
/// use queuebus::Event;
///
/// #[derive(Event, Debug)]
/// struct ConsoleMessage {
///     text: String,
/// }
///
/// assert_eq!(ConsoleMessage::event_type_name(), "ConsoleMessage");
/// ```
///
/// # Manual Implementation
///
/// ```rust
/// use queuebus::Event;
///
/// struct PackageLoaded {
///     name: String,
/// }
///
/// impl Event for PackageLoaded {
///     fn event_type_name() -> &'static str {
///         "PackageLoaded"
///     }
///
///     fn log_description(&self) -> String {
///         format!("PackageLoaded({})", self.name)
///     }
/// }
/// ```
pub trait Event: Send + Sync + 'static {
    /// Returns the name of the event type.
    ///
    /// The default implementation uses the full type name including module path.
    fn event_type_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// Returns the routing key for this event type.
    fn event_key() -> EventKey
    where
        Self: Sized,
    {
        EventKey::of::<Self>()
    }

    /// Returns a short description of this event for logging.
    ///
    /// Override this method to provide meaningful log messages
    /// without exposing sensitive data.
    fn log_description(&self) -> String
    where
        Self: Sized,
    {
        Self::event_type_name().to_string()
    }
}

/// Identifies one concrete event type for routing.
///
/// Equality and hashing use the `TypeId` only; the name is carried for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct EventKey {
    id: TypeId,
    name: &'static str,
}

impl EventKey {
    /// Returns the key of the event type `E`.
    pub fn of<E: Event>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: E::event_type_name(),
        }
    }

    /// Returns the underlying `TypeId`.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Returns the event type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventKey {}

impl Hash for EventKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventKey({})", self.name)
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Object-safe view of an [`Event`].
///
/// Implemented for every `Event`; the queue stores [`QueuedEvent`] handles
/// and the dispatcher downcasts them back to the concrete type.
pub trait AnyEvent: Send + Sync + 'static {
    /// Returns the event as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns the routing key of the concrete event type.
    fn key(&self) -> EventKey;

    /// Returns the log description of the event.
    fn describe(&self) -> String;
}

impl<E: Event> AnyEvent for E {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn key(&self) -> EventKey {
        E::event_key()
    }

    fn describe(&self) -> String {
        self.log_description()
    }
}

impl dyn AnyEvent {
    /// Returns `true` if the concrete event type is `E`.
    pub fn is<E: Event>(&self) -> bool {
        self.as_any().is::<E>()
    }

    /// Downcasts to the concrete event type.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }
}

impl fmt::Debug for dyn AnyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyEvent({})", self.describe())
    }
}

/// Shared handle to a fired event as it sits in the queue.
pub type QueuedEvent = Arc<dyn AnyEvent>;
