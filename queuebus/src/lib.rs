//! # queuebus - Queued Event Bus for Rust
//!
//! queuebus decouples the code that announces something happened from the
//! code that reacts to it. Producers fire events from any thread; a single
//! background dispatcher delivers them, in the order they were fired, to
//! every handler registered for the event's type.
//!
//! ## Features
//!
//! - **Non-blocking firing**: `fire_event` queues and returns immediately
//! - **Bounded queue**: a growable ring buffer with a hard ceiling and in-place compaction
//! - **FIFO delivery**: one dispatcher thread, one event at a time
//! - **Failure isolation**: a failing or panicking handler never stops the others
//! - **Lifecycle**: enable, disable (draining what is queued) and reload
//! - **Explicit listeners**: handlers are declared in code, bound weakly to their owner
//!
//! ## Quick Start
//!
//! ```rust
//! use queuebus::{Event, EventBus, HandlerDeclarations, Listener};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[derive(Event, Debug)]
//! struct ConsoleMessage {
//!     text: String,
//! }
//!
//! struct Console;
//!
//! impl Console {
//!     fn on_message(&self, event: &ConsoleMessage) {
//!         println!("{}", event.text);
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
//!
//! let console = Arc::new(Console);
//! bus.register_listener(&console)?;
//!
//! bus.fire_event(ConsoleMessage { text: "hello".to_string() })?;
//! bus.wait_idle(Some(Duration::from_secs(1)));
//!
//! bus.disable()?;
//! # Ok::<(), queuebus::EventBusError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export derive macros
pub use queuebus_derive::Event;

// Core modules
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod event_bus;
pub mod handler;
pub mod listener;
pub mod queue;
pub mod registry;
pub mod report;
pub mod testing;

// Feature-gated modules
#[cfg(feature = "metrics")]
pub mod metrics;

// Re-exports for convenience
pub use event::{AnyEvent, Event, EventKey, QueuedEvent};
pub use handler::{Handler, HandlerBinding, HandlerId, HandlerOutput, ListenerKey};

pub use dispatcher::{CancellationToken, Dispatcher};
pub use error::*;
pub use event_bus::{EventBus, EventBusBuilder, EventBusConfig, Lifecycle};
pub use listener::{
    DynamicHandler, HandlerDeclarations, Listener, ParamKind, RegistrationSummary,
    SkippedDeclaration,
};
pub use queue::{EventQueue, RingBuffer};
pub use registry::{HandlerMap, HandlerRegistry};
pub use report::{ErrorKind, ErrorReport, ErrorSink, Severity, SharedErrorSink, TracingSink};

#[cfg(feature = "metrics")]
pub use metrics::BusMetrics;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{EventBusError, HandlerError, QueueError};
    pub use crate::{
        Event, EventBus, EventBusBuilder, EventBusConfig, Handler, HandlerDeclarations, HandlerId,
        Lifecycle, Listener,
    };
    pub use crate::{ErrorKind, ErrorReport, ErrorSink, Severity};
}

/// Version information for the queuebus library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod test_lifecycle;

#[cfg(test)]
mod test_concurrency;
