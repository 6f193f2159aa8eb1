//! Listener declarations.
//!
//! A listener is any shared object with handler methods. Instead of being
//! discovered at runtime, a listener lists its handlers in
//! [`Listener::declare_handlers`]; the bus turns each declaration into a
//! [`HandlerBinding`] tied weakly to the listener instance.
//!
//! ```rust
//! use queuebus::{Event, EventBus, HandlerDeclarations, Listener};
//! use std::sync::Arc;
//!
//! #[derive(Event)]
//! struct ConsoleMessage { text: String }
//!
//! struct Console;
//!
//! impl Console {
//!     fn on_message(&self, event: &ConsoleMessage) {
//!         println!("> {}", event.text);
//!     }
//! }
//!
//! impl Listener for Console {
//!     fn declare_handlers(handlers: &mut HandlerDeclarations<Self>) {
//!         handlers.on(Console::on_message);
//!     }
//! }
//!
//! let bus = EventBus::new();
//! bus.enable()?;
//! let summary = bus.register_listener(&Arc::new(Console))?;
//! assert_eq!(summary.handlers.len(), 1);
//! # Ok::<(), queuebus::EventBusError>(())
//! ```

use crate::error::HandlerResult;
use crate::event::{AnyEvent, Event, EventKey};
use crate::handler::{HandlerBinding, HandlerId, HandlerOutput, ListenerInvoker};

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// An object whose methods handle events.
pub trait Listener: Send + Sync + 'static {
    /// Declares this listener's handlers.
    fn declare_handlers(handlers: &mut HandlerDeclarations<Self>)
    where
        Self: Sized;
}

/// Kind of one parameter in a [`DynamicHandler`] signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// An event type.
    Event(EventKey),
    /// Anything else, named for diagnostics.
    Value(&'static str),
}

impl ParamKind {
    /// Parameter of event type `E`.
    pub fn event<E: Event>() -> Self {
        Self::Event(EventKey::of::<E>())
    }

    /// Parameter of non-event type `T`.
    pub fn value<T: ?Sized>() -> Self {
        Self::Value(std::any::type_name::<T>())
    }
}

/// A handler declared by signature rather than by Rust type.
///
/// Only signatures with exactly one parameter, and that parameter an event
/// type, are bound. Anything else is skipped at registration time and
/// reported, without failing the rest of the listener.
pub struct DynamicHandler<L> {
    name: Cow<'static, str>,
    params: Vec<ParamKind>,
    invoker: ListenerInvoker<L>,
}

impl<L> DynamicHandler<L> {
    /// Creates a declaration with the given signature and invoker.
    pub fn new<N, F>(name: N, params: Vec<ParamKind>, invoker: F) -> Self
    where
        N: Into<Cow<'static, str>>,
        F: Fn(&L, &dyn AnyEvent) -> HandlerResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params,
            invoker: Arc::new(invoker),
        }
    }

    /// The declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared parameters.
    pub fn params(&self) -> &[ParamKind] {
        &self.params
    }

    fn event(&self) -> Result<EventKey, String> {
        match self.params.as_slice() {
            [ParamKind::Event(key)] => Ok(*key),
            [ParamKind::Value(name)] => Err(format!("parameter `{name}` is not an event type")),
            params => Err(format!(
                "expected exactly one parameter, found {}",
                params.len()
            )),
        }
    }
}

impl<L> fmt::Debug for DynamicHandler<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicHandler")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

enum Declaration<L> {
    Typed {
        event: EventKey,
        name: Cow<'static, str>,
        invoker: ListenerInvoker<L>,
    },
    Dynamic(DynamicHandler<L>),
}

/// The handlers a listener declares, in declaration order.
pub struct HandlerDeclarations<L> {
    declarations: Vec<Declaration<L>>,
}

impl<L: Listener> HandlerDeclarations<L> {
    pub(crate) fn new() -> Self {
        Self {
            declarations: Vec::new(),
        }
    }

    pub(crate) fn collect() -> Self {
        let mut declarations = Self::new();
        L::declare_handlers(&mut declarations);
        declarations
    }

    /// Declares a handler for events of type `E`, named after the function.
    pub fn on<E, F, R>(&mut self, handler: F) -> &mut Self
    where
        E: Event,
        F: Fn(&L, &E) -> R + Send + Sync + 'static,
        R: HandlerOutput,
    {
        self.on_named(std::any::type_name::<F>(), handler)
    }

    /// Declares a handler for events of type `E` with an explicit name.
    pub fn on_named<E, F, R, N>(&mut self, name: N, handler: F) -> &mut Self
    where
        E: Event,
        F: Fn(&L, &E) -> R + Send + Sync + 'static,
        R: HandlerOutput,
        N: Into<Cow<'static, str>>,
    {
        let invoker: ListenerInvoker<L> = Arc::new(move |listener: &L, event: &dyn AnyEvent| {
            match event.downcast_ref::<E>() {
                Some(event) => handler(listener, event).into_handler_result(),
                None => Ok(()),
            }
        });

        self.declarations.push(Declaration::Typed {
            event: EventKey::of::<E>(),
            name: name.into(),
            invoker,
        });
        self
    }

    /// Declares a handler by signature.
    pub fn on_dynamic(&mut self, handler: DynamicHandler<L>) -> &mut Self {
        self.declarations.push(Declaration::Dynamic(handler));
        self
    }

    /// Number of declarations, including ones that will be skipped.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Returns `true` if nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Binds every well-formed declaration to `listener`.
    pub(crate) fn bind(self, listener: &Arc<L>) -> BoundHandlers {
        let mut bound = BoundHandlers::default();

        for declaration in self.declarations {
            let (event, name, invoker) = match declaration {
                Declaration::Typed {
                    event,
                    name,
                    invoker,
                } => (event, name, invoker),
                Declaration::Dynamic(handler) => match handler.event() {
                    Ok(event) => (event, handler.name, handler.invoker),
                    Err(reason) => {
                        bound.skipped.push(SkippedDeclaration {
                            name: handler.name.into_owned(),
                            reason,
                        });
                        continue;
                    }
                },
            };
            bound
                .bindings
                .push(HandlerBinding::for_listener(listener, event, name, invoker));
        }

        bound
    }
}

/// Bindings produced from one listener's declarations.
#[derive(Debug, Default)]
pub(crate) struct BoundHandlers {
    pub(crate) bindings: Vec<HandlerBinding>,
    pub(crate) skipped: Vec<SkippedDeclaration>,
}

impl BoundHandlers {
    /// Bindings grouped by event type, keeping declaration order within and
    /// across groups.
    pub(crate) fn by_event(bindings: Vec<HandlerBinding>) -> Vec<(EventKey, Vec<HandlerBinding>)> {
        let mut groups: Vec<(EventKey, Vec<HandlerBinding>)> = Vec::new();
        for binding in bindings {
            match groups.iter_mut().find(|(event, _)| *event == binding.event()) {
                Some((_, group)) => group.push(binding),
                None => groups.push((binding.event(), vec![binding])),
            }
        }
        groups
    }
}

/// A declaration that was not bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDeclaration {
    /// The declared handler name.
    pub name: String,
    /// Why it was skipped.
    pub reason: String,
}

impl fmt::Display for SkippedDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.reason)
    }
}

/// Outcome of registering one listener.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationSummary {
    /// IDs of the bindings created, in declaration order.
    pub handlers: Vec<HandlerId>,
    /// Declarations that were skipped.
    pub skipped: Vec<SkippedDeclaration>,
}
