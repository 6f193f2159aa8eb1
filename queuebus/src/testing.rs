//! Testing utilities for queuebus applications.
//!
//! Delivery happens on the dispatcher thread, so assertions in tests need
//! something to wait on. [`EventSpy`] is a listener that records what it
//! receives and can block until enough has arrived, [`MockHandler`] counts
//! calls and fails on demand, and [`RecordingSink`] keeps every error report
//! in memory.
//!
//! # Examples
//!
//! ```rust
//! use queuebus::testing::EventSpy;
//! use queuebus::{Event, EventBus};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[derive(Event, Clone, Debug, PartialEq)]
//! struct UserLoggedIn { user_id: u64 }
//!
//! let bus = EventBus::new();
//! bus.enable()?;
//!
//! let spy = Arc::new(EventSpy::<UserLoggedIn>::new());
//! bus.register_listener(&spy)?;
//! bus.fire_event(UserLoggedIn { user_id: 123 })?;
//!
//! assert!(spy.wait_for(1, Duration::from_secs(1)));
//! assert_eq!(spy.events()[0].user_id, 123);
//! # Ok::<(), queuebus::EventBusError>(())
//! ```

use crate::event::Event;
use crate::listener::{HandlerDeclarations, Listener};
use crate::report::{ErrorKind, ErrorReport, ErrorSink};

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// A listener that records every event of type `E` it receives.
#[derive(Debug)]
pub struct EventSpy<E> {
    events: Mutex<Vec<E>>,
    arrived: Condvar,
}

impl<E: Event + Clone> EventSpy<E> {
    /// Creates an empty spy.
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            arrived: Condvar::new(),
        }
    }

    fn record(&self, event: &E) {
        self.events.lock().push(event.clone());
        self.arrived.notify_all();
    }

    /// Events received so far, in delivery order.
    pub fn events(&self) -> Vec<E> {
        self.events.lock().clone()
    }

    /// Number of events received.
    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    /// The most recent event, if any.
    pub fn last(&self) -> Option<E> {
        self.events.lock().last().cloned()
    }

    /// Forgets everything received.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Blocks until at least `count` events have arrived.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock();
        while events.len() < count {
            if self.arrived.wait_until(&mut events, deadline).timed_out() {
                return events.len() >= count;
            }
        }
        true
    }
}

impl<E: Event + Clone> Default for EventSpy<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event + Clone> Listener for EventSpy<E> {
    fn declare_handlers(handlers: &mut HandlerDeclarations<Self>) {
        handlers.on_named("EventSpy::record", Self::record);
    }
}

/// Error returned by a [`MockHandler`] told to fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mock handler failure")]
pub struct MockFailure;

/// A handler double that counts calls and fails on demand.
///
/// Clones share their counters.
#[derive(Debug, Clone, Default)]
pub struct MockHandler {
    calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl MockHandler {
    /// Creates a mock that succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent calls fail or succeed.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of calls made to any handler produced by this mock.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns a handler for events of type `E` backed by this mock.
    pub fn handler<E: Event>(&self) -> impl Fn(&E) -> Result<(), MockFailure> + Send + Sync + 'static {
        let mock = self.clone();
        move |_: &E| {
            mock.calls.fetch_add(1, Ordering::SeqCst);
            if mock.fail.load(Ordering::SeqCst) {
                Err(MockFailure)
            } else {
                Ok(())
            }
        }
    }
}

/// An error sink that keeps every report in memory.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    reports: Arc<Mutex<Vec<ErrorReport>>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports received so far.
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports.lock().clone()
    }

    /// Number of reports of `kind`.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.reports
            .lock()
            .iter()
            .filter(|report| report.kind == kind)
            .count()
    }

    /// Returns `true` if nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }

    /// Forgets every report.
    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, report: ErrorReport) {
        self.reports.lock().push(report);
    }
}
