//! The background worker that delivers queued events.
//!
//! One [`Dispatcher`] owns one named OS thread. The thread blocks on the
//! queue, and for every event it takes a snapshot of the matching registry
//! and invokes each binding in registration order. A handler that fails or
//! panics is reported to the error sink and the remaining handlers still
//! run. When stopped, the thread drains whatever is left in the queue before
//! it exits.

use crate::error::HandlerError;
use crate::event::{AnyEvent, EventKey, QueuedEvent};
use crate::handler::HandlerBinding;
#[cfg(feature = "metrics")]
use crate::metrics::BusMetrics;
use crate::queue::EventQueue;
use crate::registry::HandlerMap;
use crate::report::{ErrorKind, ErrorReport, Severity, SharedErrorSink};

use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

/// Cooperative stop signal shared between the bus and its dispatcher.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`CancellationToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Everything the worker thread needs to deliver events.
pub(crate) struct DispatchContext {
    pub(crate) queue: Arc<EventQueue<QueuedEvent>>,
    pub(crate) handlers: Arc<HandlerMap>,
    pub(crate) sink: SharedErrorSink,
    pub(crate) catch_panics: bool,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: Option<BusMetrics>,
}

impl DispatchContext {
    /// Delivers one event to its own handlers, then to the handlers of each
    /// declared supertype. Every type is visited at most once.
    pub(crate) fn dispatch(&self, event: &dyn AnyEvent) {
        tracing::trace!(event = %event.key(), "dispatching event");
        let mut visited = Vec::new();
        self.dispatch_as(event, &mut visited);

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.events_dispatched.inc();
        }
    }

    fn dispatch_as(&self, event: &dyn AnyEvent, visited: &mut Vec<EventKey>) {
        let key = event.key();
        if visited.contains(&key) {
            return;
        }
        visited.push(key);

        let registry = self.handlers.get_or_create(key);
        for binding in registry.bindings() {
            self.invoke(&binding, event);
        }

        for supertype in self.handlers.supertypes_of(key) {
            if let Some(parent) = supertype.project(event) {
                self.dispatch_as(parent, visited);
            }
        }
    }

    fn invoke(&self, binding: &HandlerBinding, event: &dyn AnyEvent) {
        let result = if self.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(|| binding.invoke(event)))
                .unwrap_or_else(|payload| Err(HandlerError::from_panic_payload(payload)))
        } else {
            binding.invoke(event)
        };

        match result {
            Ok(()) => {}
            Err(HandlerError::ListenerDropped) => {
                tracing::trace!(handler = binding.name(), "listener dropped; skipping handler");
            }
            Err(error) => {
                self.sink.report(
                    ErrorReport::new(
                        ErrorKind::DispatchFailure,
                        Severity::Warning,
                        "Dispatcher::dispatch",
                    )
                    .with_detail(format!(
                        "handler {} failed on {}: {}",
                        binding.name(),
                        event.describe(),
                        error
                    )),
                );

                #[cfg(feature = "metrics")]
                if let Some(metrics) = &self.metrics {
                    metrics.handler_failures.inc();
                }
            }
        }
    }

    fn run(&self, stop: &CancellationToken) {
        tracing::debug!("dispatcher started");
        while let Some(event) = self.queue.next_for_dispatch(stop) {
            let _in_flight = InFlight(&self.queue);
            self.dispatch(&*event);

            #[cfg(feature = "metrics")]
            if let Some(metrics) = &self.metrics {
                metrics.queue_depth.set(self.queue.len() as i64);
            }
        }
        tracing::debug!("dispatcher drained queue and stopped");
    }
}

/// Marks the current event finished even if dispatch unwinds.
struct InFlight<'a>(&'a EventQueue<QueuedEvent>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.finish_dispatch();
    }
}

/// Shuts the queue when the worker thread unwinds out of `run`.
///
/// Without it a dead worker would leave producers filling a queue nobody
/// drains and `wait_idle` callers blocked forever.
struct WorkerExit {
    queue: Arc<EventQueue<QueuedEvent>>,
    sink: SharedErrorSink,
}

impl Drop for WorkerExit {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        self.queue.close();
        let discarded = self.queue.len();
        self.queue.clear();
        self.sink.report(
            ErrorReport::new(
                ErrorKind::ShutdownInterrupted,
                Severity::Severe,
                "Dispatcher::run",
            )
            .with_detail(format!(
                "dispatcher thread panicked; {} queued events discarded",
                discarded
            )),
        );
    }
}

/// Why a dispatcher did not stop cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ShutdownError {
    /// The thread was still running when the timeout elapsed.
    TimedOut(Duration),
    /// Stop was requested from the dispatcher thread itself.
    FromDispatcherThread,
    /// The thread panicked.
    Panicked(String),
}

impl fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut(timeout) => {
                write!(f, "dispatcher still running after {:?}; detached", timeout)
            }
            Self::FromDispatcherThread => {
                f.write_str("stop requested from the dispatcher thread; join skipped")
            }
            Self::Panicked(message) => write!(f, "dispatcher thread panicked: {}", message),
        }
    }
}

/// Handle to a running dispatcher thread.
pub struct Dispatcher {
    stop: CancellationToken,
    queue: Arc<EventQueue<QueuedEvent>>,
    handle: Option<JoinHandle<()>>,
    exited: mpsc::Receiver<()>,
    thread_id: ThreadId,
}

impl Dispatcher {
    /// Spawns the worker thread.
    pub(crate) fn start(context: DispatchContext, thread_name: &str) -> io::Result<Self> {
        let stop = CancellationToken::new();
        let queue = Arc::clone(&context.queue);
        let (exited_tx, exited) = mpsc::channel();

        let worker_stop = stop.clone();
        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                // Dropped on return or unwind; either way the joiner wakes up.
                let _exited = exited_tx;
                let _exit = WorkerExit {
                    queue: Arc::clone(&context.queue),
                    sink: Arc::clone(&context.sink),
                };
                context.run(&worker_stop);
            })?;
        let thread_id = handle.thread().id();

        Ok(Self {
            stop,
            queue,
            handle: Some(handle),
            exited,
            thread_id,
        })
    }

    /// Returns `true` while the worker thread has not exited.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Returns `true` if called from the worker thread.
    pub fn is_current_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Signals the worker to drain and stop, then waits for it.
    ///
    /// With `timeout` set, gives up after that long and leaves the thread
    /// detached. Called from the worker thread itself, only signals.
    pub(crate) fn shutdown(mut self, timeout: Option<Duration>) -> Result<(), ShutdownError> {
        self.signal_stop();

        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        if self.is_current_thread() {
            return Err(ShutdownError::FromDispatcherThread);
        }

        if let Some(timeout) = timeout {
            if let Err(RecvTimeoutError::Timeout) = self.exited.recv_timeout(timeout) {
                return Err(ShutdownError::TimedOut(timeout));
            }
        }

        handle
            .join()
            .map_err(|payload| match HandlerError::from_panic_payload(payload) {
                HandlerError::Panic { message } => ShutdownError::Panicked(message),
                other => ShutdownError::Panicked(other.to_string()),
            })
    }

    fn signal_stop(&self) {
        self.stop.cancel();
        self.queue.wake_consumers();
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.signal_stop();
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("thread_id", &self.thread_id)
            .field("running", &self.is_running())
            .field("stopping", &self.stop.is_cancelled())
            .finish()
    }
}
