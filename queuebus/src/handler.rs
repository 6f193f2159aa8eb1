//! Handler bindings for queuebus.
//!
//! A [`HandlerBinding`] is what a [`crate::registry::HandlerRegistry`] stores:
//! an invoker closure that performs the type-checked call, plus the identity
//! of the listener it belongs to so it can be unregistered later. Listeners
//! are held weakly; the bus never keeps a listener alive.

use crate::error::{HandlerError, HandlerResult};
use crate::event::{AnyEvent, Event, EventKey};

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Unique identifier for a handler binding.
///
/// Returned by [`crate::EventBus::subscribe`] and usable with
/// [`crate::EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Creates a new unique handler ID.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the numeric value of this handler ID.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandlerId({})", self.0)
    }
}

/// Identity of a registered listener instance.
///
/// Derived from the address of the listener's `Arc` allocation, so two
/// clones of the same `Arc` share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(usize);

impl ListenerKey {
    /// Returns the key for a listener instance.
    pub fn of<L: ?Sized>(listener: &Arc<L>) -> Self {
        Self(Arc::as_ptr(listener) as *const () as usize)
    }
}

/// Values a handler may return.
///
/// Implemented for `()` and for `Result<(), E>` so both infallible and
/// fallible functions can be bound.
pub trait HandlerOutput {
    /// Converts the handler's return value into a handler result.
    fn into_handler_result(self) -> HandlerResult<()>;
}

impl HandlerOutput for () {
    fn into_handler_result(self) -> HandlerResult<()> {
        Ok(())
    }
}

impl<E> HandlerOutput for Result<(), E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_handler_result(self) -> HandlerResult<()> {
        self.map_err(HandlerError::failed)
    }
}

/// Trait for standalone event handlers.
///
/// Implemented for closures and function pointers taking `&E` and returning
/// `()` or `Result<(), impl Error>`.
///
/// # Examples
///
/// ```rust
/// use queuebus::{Event, Handler};
///
/// #[derive(Event)]
/// struct Tick { n: u32 }
///
/// let handler = |event: &Tick| println!("tick {}", event.n);
/// assert!(handler.handle(&Tick { n: 1 }).is_ok());
/// ```
pub trait Handler<E: Event>: Send + Sync + 'static {
    /// Handles the given event.
    fn handle(&self, event: &E) -> HandlerResult<()>;

    /// Returns the name of this handler for debugging and logging.
    ///
    /// The default implementation uses the type name.
    fn handler_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<F, E, R> Handler<E> for F
where
    F: Fn(&E) -> R + Send + Sync + 'static,
    E: Event,
    R: HandlerOutput,
{
    fn handle(&self, event: &E) -> HandlerResult<()> {
        self(event).into_handler_result()
    }
}

type Invoker = Arc<dyn Fn(&dyn AnyEvent) -> HandlerResult<()> + Send + Sync>;

/// Type-erased call performed on a listener: given the listener and an
/// event, invoke the bound method if the event has the expected type.
pub type ListenerInvoker<L> = Arc<dyn Fn(&L, &dyn AnyEvent) -> HandlerResult<()> + Send + Sync>;

/// One handler bound to one event type.
#[derive(Clone)]
pub struct HandlerBinding {
    id: HandlerId,
    event: EventKey,
    name: Cow<'static, str>,
    owner: Option<(ListenerKey, Weak<dyn Any + Send + Sync>)>,
    invoker: Invoker,
}

impl HandlerBinding {
    /// Binds a standalone handler for events of type `E`.
    pub fn from_handler<E, H>(handler: H) -> Self
    where
        E: Event,
        H: Handler<E>,
    {
        let name = handler.handler_name();
        let invoker: Invoker = Arc::new(move |event: &dyn AnyEvent| {
            match event.downcast_ref::<E>() {
                Some(event) => handler.handle(event),
                None => Ok(()),
            }
        });

        Self {
            id: HandlerId::new(),
            event: EventKey::of::<E>(),
            name: Cow::Borrowed(name),
            owner: None,
            invoker,
        }
    }

    /// Binds a listener method to `event`.
    ///
    /// The listener is captured weakly; once it is dropped the binding
    /// reports [`HandlerError::ListenerDropped`] and is pruned by the
    /// registry on its next mutation.
    pub fn for_listener<L>(
        listener: &Arc<L>,
        event: EventKey,
        name: Cow<'static, str>,
        invoker: ListenerInvoker<L>,
    ) -> Self
    where
        L: Send + Sync + 'static,
    {
        let weak = Arc::downgrade(listener);
        let erased: Weak<dyn Any + Send + Sync> = weak.clone();

        let invoker: Invoker = Arc::new(move |event: &dyn AnyEvent| match weak.upgrade() {
            Some(listener) => invoker(&listener, event),
            None => Err(HandlerError::ListenerDropped),
        });

        Self {
            id: HandlerId::new(),
            event,
            name,
            owner: Some((ListenerKey::of(listener), erased)),
            invoker,
        }
    }

    /// Returns this binding's ID.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Returns the event type this binding was declared for.
    pub fn event(&self) -> EventKey {
        self.event
    }

    /// Returns the handler name used in reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning listener, if this binding came from one.
    pub fn listener(&self) -> Option<ListenerKey> {
        self.owner.as_ref().map(|(key, _)| *key)
    }

    /// Returns `true` if the binding belongs to `listener`.
    pub fn belongs_to(&self, listener: ListenerKey) -> bool {
        self.listener() == Some(listener)
    }

    /// Returns `false` once the owning listener has been dropped.
    pub fn is_live(&self) -> bool {
        match &self.owner {
            Some((_, weak)) => weak.strong_count() > 0,
            None => true,
        }
    }

    /// Invokes the handler with `event`.
    pub fn invoke(&self, event: &dyn AnyEvent) -> HandlerResult<()> {
        (self.invoker)(event)
    }
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("name", &self.name)
            .field("listener", &self.listener())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct TestEvent {
        value: i32,
    }

    impl Event for TestEvent {
        fn event_type_name() -> &'static str {
            "TestEvent"
        }
    }

    struct OtherEvent;

    impl Event for OtherEvent {}

    #[derive(Debug)]
    struct TestError(&'static str);

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for TestError {}

    struct Counter {
        total: Mutex<i32>,
    }

    #[test]
    fn test_handler_id_generation() {
        let id1 = HandlerId::new();
        let id2 = HandlerId::new();

        assert_ne!(id1, id2);
        assert!(id2.value() > id1.value());
        assert!(id1.to_string().starts_with("HandlerId("));
    }

    #[test]
    fn test_closure_handlers() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let handler = move |event: &TestEvent| {
            *seen_clone.lock() = Some(event.value);
        };

        assert!(handler.handle(&TestEvent { value: 42 }).is_ok());
        assert_eq!(*seen.lock(), Some(42));

        let fallible = |event: &TestEvent| -> Result<(), TestError> {
            if event.value > 0 {
                Ok(())
            } else {
                Err(TestError("negative value"))
            }
        };
        assert!(fallible.handle(&TestEvent { value: 1 }).is_ok());
        assert!(matches!(
            fallible.handle(&TestEvent { value: -1 }),
            Err(HandlerError::Failed(_))
        ));
    }

    #[test]
    fn test_binding_ignores_other_event_types() {
        let hits = Arc::new(Mutex::new(0));
        let hits_clone = Arc::clone(&hits);
        let binding = HandlerBinding::from_handler(move |_: &TestEvent| {
            *hits_clone.lock() += 1;
        });

        assert_eq!(binding.event(), EventKey::of::<TestEvent>());
        assert!(binding.listener().is_none());
        assert!(binding.is_live());

        binding.invoke(&TestEvent { value: 1 }).unwrap();
        binding.invoke(&OtherEvent).unwrap();
        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn test_listener_binding_holds_listener_weakly() {
        let listener = Arc::new(Counter {
            total: Mutex::new(0),
        });
        let invoker: ListenerInvoker<Counter> = Arc::new(|counter: &Counter, event: &dyn AnyEvent| {
            if let Some(event) = event.downcast_ref::<TestEvent>() {
                *counter.total.lock() += event.value;
            }
            Ok(())
        });
        let binding = HandlerBinding::for_listener(
            &listener,
            EventKey::of::<TestEvent>(),
            Cow::Borrowed("Counter::add"),
            invoker,
        );

        assert!(binding.belongs_to(ListenerKey::of(&listener)));
        assert_eq!(binding.name(), "Counter::add");

        binding.invoke(&TestEvent { value: 5 }).unwrap();
        assert_eq!(*listener.total.lock(), 5);
        assert_eq!(Arc::strong_count(&listener), 1);

        drop(listener);
        assert!(!binding.is_live());
        assert!(matches!(
            binding.invoke(&TestEvent { value: 5 }),
            Err(HandlerError::ListenerDropped)
        ));
    }

    #[test]
    fn test_listener_key_identity() {
        let a = Arc::new(1u8);
        let a_clone = Arc::clone(&a);
        let b = Arc::new(1u8);

        assert_eq!(ListenerKey::of(&a), ListenerKey::of(&a_clone));
        assert_ne!(ListenerKey::of(&a), ListenerKey::of(&b));
    }
}
