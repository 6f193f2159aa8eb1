//! The event bus facade.
//!
//! [`EventBus`] ties an [`EventQueue`], a [`HandlerMap`] and a [`Dispatcher`]
//! together behind a small lifecycle: producers fire events from any thread,
//! the dispatcher delivers them one at a time on its own thread, and
//! `enable`/`disable` build and tear down the whole runtime.

use crate::dispatcher::{DispatchContext, Dispatcher, ShutdownError};
use crate::error::{EventBusError, EventBusResult, QueueError};
use crate::event::{Event, QueuedEvent};
use crate::handler::{Handler, HandlerBinding, HandlerId, ListenerKey};
use crate::listener::{BoundHandlers, HandlerDeclarations, Listener, RegistrationSummary};
#[cfg(feature = "metrics")]
use crate::metrics::BusMetrics;
use crate::queue::{EventQueue, RingBuffer, DEFAULT_COMPACTION_THRESHOLD_PERCENT, DEFAULT_MAX_CAPACITY};
use crate::registry::HandlerMap;
use crate::report::{ErrorKind, ErrorReport, ErrorSink, Severity, SharedErrorSink, TracingSink};

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default name of the dispatcher thread.
pub const DEFAULT_DISPATCHER_THREAD_NAME: &str = "queuebus-dispatcher";

/// Configuration options for the EventBus.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EventBusConfig {
    /// Hard ceiling on queued events.
    pub max_capacity: usize,

    /// Percentage of the buffer that must be dead space at the front before
    /// the queue compacts instead of growing.
    pub compaction_threshold_percent: u8,

    /// Slots allocated up front.
    pub initial_capacity: usize,

    /// Name given to the dispatcher thread.
    pub dispatcher_thread_name: String,

    /// How long `disable` waits for the dispatcher. `None` waits forever.
    pub shutdown_timeout: Option<Duration>,

    /// Whether a panicking handler is caught and reported instead of
    /// killing the dispatcher thread.
    ///
    /// When `false`, a handler panic ends the dispatcher. The queue is then
    /// closed and emptied and `ShutdownInterrupted` is reported; the bus
    /// stays `Enabled` but drops every further event until it is disabled
    /// or reloaded.
    pub catch_handler_panics: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
            compaction_threshold_percent: DEFAULT_COMPACTION_THRESHOLD_PERCENT,
            initial_capacity: 0,
            dispatcher_thread_name: DEFAULT_DISPATCHER_THREAD_NAME.to_string(),
            shutdown_timeout: None,
            catch_handler_panics: true,
        }
    }
}

impl EventBusConfig {
    /// Checks that the configuration describes a bus that can be enabled.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidArgument`] for a zero capacity, a
    /// threshold above 100, or a thread name the OS cannot accept.
    pub fn validate(&self) -> Result<(), QueueError> {
        RingBuffer::<()>::with_policy(0, self.max_capacity, self.compaction_threshold_percent)?;

        if self.dispatcher_thread_name.contains('\0') {
            return Err(QueueError::invalid_argument(
                "dispatcher_thread_name must not contain NUL bytes",
            ));
        }
        Ok(())
    }
}

/// Where a bus is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Lifecycle {
    /// No dispatcher, no handlers; fired events are dropped.
    Disabled,
    /// `enable` is building the runtime.
    Enabling,
    /// Accepting events and registrations.
    Enabled,
    /// `disable` is draining and tearing down.
    Disabling,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Disabled => "disabled",
            Lifecycle::Enabling => "enabling",
            Lifecycle::Enabled => "enabled",
            Lifecycle::Disabling => "disabling",
        };
        f.write_str(name)
    }
}

/// Everything that exists only while the bus is enabled.
struct Runtime {
    queue: Arc<EventQueue<QueuedEvent>>,
    handlers: Arc<HandlerMap>,
    dispatcher: Mutex<Option<Dispatcher>>,
}

struct BusState {
    lifecycle: Lifecycle,
    runtime: Option<Arc<Runtime>>,
}

/// Asynchronous event bus with a single background dispatcher.
///
/// Events fired from any thread are queued and delivered in FIFO order on
/// the dispatcher thread. Firing never waits for handlers to run.
///
/// # Examples
///
/// ```rust
/// use queuebus::{Event, EventBus};
/// use std::time::Duration;
///
/// #[derive(Event)]
/// struct ConsoleMessage {
///     text: String,
/// }
///
/// let bus = EventBus::new();
/// bus.enable()?;
///
/// bus.subscribe(|event: &ConsoleMessage| println!("{}", event.text))?;
/// bus.fire_event(ConsoleMessage { text: "hello".into() })?;
///
/// assert!(bus.wait_idle(Some(Duration::from_secs(1))));
/// bus.disable()?;
/// # Ok::<(), queuebus::EventBusError>(())
/// ```
pub struct EventBus {
    config: EventBusConfig,
    sink: SharedErrorSink,
    state: RwLock<BusState>,
    #[cfg(feature = "metrics")]
    metrics: Option<BusMetrics>,
}

impl EventBus {
    /// Creates a disabled bus with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Creates a disabled bus with `config`, reporting to `tracing`.
    pub fn with_config(config: EventBusConfig) -> Self {
        EventBusBuilder::new().with_config(config).build()
    }

    /// Creates a builder for configuring a bus.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use queuebus::EventBus;
    /// use std::time::Duration;
    ///
    /// let bus = EventBus::builder()
    ///     .with_max_capacity(1024)
    ///     .with_shutdown_timeout(Duration::from_secs(2))
    ///     .build();
    /// assert_eq!(bus.config().max_capacity, 1024);
    /// ```
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Returns the current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.read().lifecycle
    }

    /// Returns `true` if the bus accepts events.
    pub fn is_enabled(&self) -> bool {
        self.lifecycle() == Lifecycle::Enabled
    }

    fn runtime(&self) -> Option<Arc<Runtime>> {
        self.state.read().runtime.clone()
    }

    /// Builds the queue and registries and starts the dispatcher.
    ///
    /// # Errors
    ///
    /// - [`EventBusError::AlreadyEnabled`] if the bus is enabled.
    /// - [`EventBusError::Transitioning`] if another thread is enabling or
    ///   disabling it.
    /// - [`EventBusError::Queue`] with `InvalidArgument` for a bad config.
    /// - [`EventBusError::Spawn`] if the thread could not be started.
    ///
    /// On error the bus stays disabled. An invalid configuration is also
    /// reported to the error sink as `InvalidArgument`.
    pub fn enable(&self) -> EventBusResult<()> {
        {
            let mut state = self.state.write();
            match state.lifecycle {
                Lifecycle::Disabled => state.lifecycle = Lifecycle::Enabling,
                Lifecycle::Enabled => return Err(EventBusError::AlreadyEnabled),
                other => return Err(EventBusError::Transitioning { state: other }),
            }
        }

        match self.start_runtime() {
            Ok(runtime) => {
                let mut state = self.state.write();
                state.runtime = Some(Arc::new(runtime));
                state.lifecycle = Lifecycle::Enabled;
                drop(state);

                tracing::info!(
                    max_capacity = self.config.max_capacity,
                    thread = %self.config.dispatcher_thread_name,
                    "event bus enabled"
                );
                Ok(())
            }
            Err(error) => {
                self.state.write().lifecycle = Lifecycle::Disabled;
                if let EventBusError::Queue(QueueError::InvalidArgument { reason }) = &error {
                    self.sink.report(
                        ErrorReport::new(
                            ErrorKind::InvalidArgument,
                            Severity::Severe,
                            "EventBus::enable",
                        )
                        .with_detail(reason.clone()),
                    );
                } else {
                    tracing::error!(%error, "event bus failed to enable");
                }
                Err(error)
            }
        }
    }

    fn start_runtime(&self) -> EventBusResult<Runtime> {
        self.config.validate()?;

        let queue = Arc::new(EventQueue::with_policy(
            self.config.initial_capacity,
            self.config.max_capacity,
            self.config.compaction_threshold_percent,
        )?);
        let handlers = Arc::new(HandlerMap::new());

        let context = DispatchContext {
            queue: Arc::clone(&queue),
            handlers: Arc::clone(&handlers),
            sink: Arc::clone(&self.sink),
            catch_panics: self.config.catch_handler_panics,
            #[cfg(feature = "metrics")]
            metrics: self.metrics.clone(),
        };
        let dispatcher = Dispatcher::start(context, &self.config.dispatcher_thread_name)
            .map_err(EventBusError::Spawn)?;

        Ok(Runtime {
            queue,
            handlers,
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }

    /// Stops the dispatcher after it drains the queue, then drops every
    /// registration and the queue itself.
    ///
    /// Called from a handler, the dispatcher cannot be joined; it is told to
    /// stop, the remaining events are discarded, and the report goes to the
    /// error sink. The same happens when `shutdown_timeout` elapses.
    ///
    /// # Errors
    ///
    /// - [`EventBusError::AlreadyDisabled`] if the bus is disabled.
    /// - [`EventBusError::Transitioning`] if another thread is enabling or
    ///   disabling it.
    pub fn disable(&self) -> EventBusResult<()> {
        let runtime = {
            let mut state = self.state.write();
            match state.lifecycle {
                Lifecycle::Enabled => {}
                Lifecycle::Disabled => return Err(EventBusError::AlreadyDisabled),
                other => return Err(EventBusError::Transitioning { state: other }),
            }
            state.lifecycle = Lifecycle::Disabling;
            state.runtime.take()
        };

        if let Some(runtime) = runtime {
            self.teardown(&runtime);
        }

        self.state.write().lifecycle = Lifecycle::Disabled;
        tracing::info!("event bus disabled");
        Ok(())
    }

    fn teardown(&self, runtime: &Runtime) {
        let dispatcher = runtime.dispatcher.lock().take();
        if let Some(dispatcher) = dispatcher {
            if let Err(error) = dispatcher.shutdown(self.config.shutdown_timeout) {
                let severity = match error {
                    ShutdownError::FromDispatcherThread => Severity::Info,
                    ShutdownError::TimedOut(_) => Severity::Warning,
                    ShutdownError::Panicked(_) => Severity::Severe,
                };
                self.sink.report(
                    ErrorReport::new(ErrorKind::ShutdownInterrupted, severity, "EventBus::disable")
                        .with_detail(error.to_string()),
                );
            }
        }

        runtime.queue.close();
        runtime.handlers.clear();

        let discarded = runtime.queue.len();
        runtime.queue.clear();
        if discarded > 0 {
            tracing::debug!(discarded, "discarded undelivered events");
        }

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.queue_depth.set(0);
        }
    }

    /// Disables the bus if it is enabled, then enables it.
    ///
    /// # Errors
    ///
    /// Any error from [`EventBus::disable`] other than `AlreadyDisabled`,
    /// or any error from [`EventBus::enable`].
    pub fn reload(&self) -> EventBusResult<()> {
        match self.disable() {
            Ok(()) | Err(EventBusError::AlreadyDisabled) => {}
            Err(error) => return Err(error),
        }
        self.enable()
    }

    /// Queues `event` for delivery and returns without waiting for handlers.
    ///
    /// If the bus is not enabled the event is dropped and `Ok(())` is
    /// returned. This includes an event that races a concurrent `disable`
    /// and arrives after the dispatcher has finished draining: the queue is
    /// closed at that point and the event is dropped rather than accepted.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::Queue`] with `CapacityExceeded` when the
    /// queue is full. Nothing is queued in that case.
    pub fn fire_event<E: Event>(&self, event: E) -> EventBusResult<()> {
        self.fire_shared(Arc::new(event))
    }

    /// Queues an already shared event.
    ///
    /// # Errors
    ///
    /// Same as [`EventBus::fire_event`].
    pub fn fire_shared(&self, event: QueuedEvent) -> EventBusResult<()> {
        let Some(runtime) = self.runtime() else {
            tracing::trace!(event = %event.key(), "bus not enabled; event dropped");
            return Ok(());
        };
        match self.enqueue(&runtime, event) {
            Err(QueueError::Closed) => Ok(()),
            result => result.map_err(EventBusError::from),
        }
    }

    fn enqueue(&self, runtime: &Runtime, event: QueuedEvent) -> Result<(), QueueError> {
        let key = event.key();
        let result = runtime.queue.enqueue(event);

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(()) => metrics.record_enqueued(runtime.queue.len()),
                Err(QueueError::Closed) => {}
                Err(_) => metrics.record_rejected(),
            }
        }
        if let Err(QueueError::Closed) = result {
            tracing::trace!(event = %key, "bus shutting down; event dropped");
        }
        result
    }

    /// Queues a batch of events. Either all are queued, in order and
    /// contiguously, or none are.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::Queue`] with `CapacityExceeded` if the
    /// batch does not fit.
    pub fn fire_events<E, I>(&self, events: I) -> EventBusResult<()>
    where
        E: Event,
        I: IntoIterator<Item = E>,
    {
        let Some(runtime) = self.runtime() else {
            return Ok(());
        };

        let batch: Vec<QueuedEvent> = events
            .into_iter()
            .map(|event| Arc::new(event) as QueuedEvent)
            .collect();
        #[cfg(feature = "metrics")]
        let count = batch.len();

        match runtime.queue.enqueue_all(batch) {
            Err(QueueError::Closed) => Ok(()),
            Ok(()) => {
                #[cfg(feature = "metrics")]
                if let Some(metrics) = &self.metrics {
                    metrics.events_enqueued.inc_by(count as u64);
                    metrics.queue_depth.set(runtime.queue.len() as i64);
                }
                Ok(())
            }
            Err(error) => {
                #[cfg(feature = "metrics")]
                if let Some(metrics) = &self.metrics {
                    metrics.events_rejected.inc_by(count as u64);
                }
                Err(error.into())
            }
        }
    }

    /// Queues `event`, returning `false` if it was not queued because the
    /// queue is full or the bus is not enabled.
    ///
    /// A full queue is reported to the error sink.
    pub fn try_fire_event<E: Event>(&self, event: E) -> bool {
        let Some(runtime) = self.runtime() else {
            return false;
        };

        let event: QueuedEvent = Arc::new(event);
        match self.enqueue(&runtime, Arc::clone(&event)) {
            Ok(()) => true,
            Err(QueueError::Closed) => false,
            Err(error) => {
                self.sink.report(
                    ErrorReport::new(
                        ErrorKind::CapacityExceeded,
                        Severity::Warning,
                        "EventBus::try_fire_event",
                    )
                    .with_detail(format!("{} rejected: {}", event.describe(), error)),
                );
                false
            }
        }
    }

    /// Registers every handler `listener` declares.
    ///
    /// Declarations with the wrong shape are skipped and reported; the rest
    /// are registered. Registering the same listener twice makes each of its
    /// handlers run twice per event.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::Disabled`] if the bus is not enabled.
    pub fn register_listener<L: Listener>(
        &self,
        listener: &Arc<L>,
    ) -> EventBusResult<RegistrationSummary> {
        let runtime = self.runtime().ok_or(EventBusError::Disabled)?;

        if runtime.handlers.contains_listener(ListenerKey::of(listener)) {
            tracing::warn!(
                listener = std::any::type_name::<L>(),
                "listener registered twice; its handlers will run once per registration"
            );
        }

        let bound = HandlerDeclarations::<L>::collect().bind(listener);
        for skipped in &bound.skipped {
            self.sink.report(
                ErrorReport::new(
                    ErrorKind::RegistrationSkipped,
                    Severity::Fine,
                    "EventBus::register_listener",
                )
                .with_detail(skipped.to_string()),
            );
        }

        let handlers: Vec<HandlerId> = bound.bindings.iter().map(HandlerBinding::id).collect();
        for (event, bindings) in BoundHandlers::by_event(bound.bindings) {
            runtime.handlers.get_or_create(event).register_all(bindings);
        }

        tracing::debug!(
            listener = std::any::type_name::<L>(),
            handlers = handlers.len(),
            skipped = bound.skipped.len(),
            "listener registered"
        );

        Ok(RegistrationSummary {
            handlers,
            skipped: bound.skipped,
        })
    }

    /// Removes every handler belonging to `listener`.
    ///
    /// Returns the number of handlers removed; zero if the listener was
    /// never registered or the bus is not enabled.
    pub fn unregister_listener<L: ?Sized>(&self, listener: &Arc<L>) -> usize {
        match self.runtime() {
            Some(runtime) => runtime.handlers.unregister_listener(ListenerKey::of(listener)),
            None => 0,
        }
    }

    /// Registers a standalone handler for events of type `E`.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::Disabled`] if the bus is not enabled.
    pub fn subscribe<E, H>(&self, handler: H) -> EventBusResult<HandlerId>
    where
        E: Event,
        H: Handler<E>,
    {
        let runtime = self.runtime().ok_or(EventBusError::Disabled)?;
        let binding = HandlerBinding::from_handler(handler);
        let id = binding.id();
        runtime.handlers.get_or_create(binding.event()).register(binding);
        Ok(id)
    }

    /// Removes the handler with `id`. Returns `false` if it was not found.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        self.runtime()
            .is_some_and(|runtime| runtime.handlers.unregister_handler(id))
    }

    /// Declares that events of type `S` are also delivered to handlers of
    /// `P`, viewed through `S: AsRef<P>`.
    ///
    /// Links are followed transitively. Returns `false` if the link already
    /// existed. Links are cleared by `disable`.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::Disabled`] if the bus is not enabled.
    pub fn map_supertype<S, P>(&self) -> EventBusResult<bool>
    where
        S: Event + AsRef<P>,
        P: Event,
    {
        let runtime = self.runtime().ok_or(EventBusError::Disabled)?;
        Ok(runtime.handlers.map_supertype::<S, P>())
    }

    /// Number of handlers registered for `E`.
    pub fn handler_count<E: Event>(&self) -> usize {
        self.runtime()
            .map_or(0, |runtime| runtime.handlers.handler_count(E::event_key()))
    }

    /// Number of handlers registered across all event types.
    pub fn total_handler_count(&self) -> usize {
        self.runtime()
            .map_or(0, |runtime| runtime.handlers.total_handler_count())
    }

    /// Number of events waiting for the dispatcher.
    pub fn queued_events(&self) -> usize {
        self.runtime().map_or(0, |runtime| runtime.queue.len())
    }

    /// Blocks until every queued event has been dispatched.
    ///
    /// Returns `false` if `timeout` elapsed first. A bus that is not
    /// enabled is always idle.
    pub fn wait_idle(&self, timeout: Option<Duration>) -> bool {
        match self.runtime() {
            Some(runtime) => runtime.queue.wait_idle(timeout),
            None => true,
        }
    }

    /// Async counterpart of [`EventBus::wait_idle`] without a timeout.
    ///
    /// Wrap it in `tokio::time::timeout` to bound the wait.
    #[cfg(feature = "async")]
    pub async fn wait_idle_async(&self) {
        if let Some(runtime) = self.runtime() {
            runtime.queue.wait_idle_async().await;
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if self.is_enabled() {
            if let Err(error) = self.disable() {
                tracing::warn!(%error, "event bus failed to disable on drop");
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("lifecycle", &self.lifecycle())
            .field("queued_events", &self.queued_events())
            .field("handlers", &self.total_handler_count())
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for configuring EventBus instances.
///
/// # Examples
///
/// ```rust
/// use queuebus::{EventBusBuilder, ErrorReport};
///
/// let bus = EventBusBuilder::new()
///     .with_max_capacity(256)
///     .with_compaction_threshold(75)
///     .with_thread_name("ui-events")
///     .with_error_sink(|report: ErrorReport| eprintln!("{}", report))
///     .build();
///
/// assert_eq!(bus.config().dispatcher_thread_name, "ui-events");
/// ```
pub struct EventBusBuilder {
    config: EventBusConfig,
    sink: Option<SharedErrorSink>,
    #[cfg(feature = "metrics")]
    metrics: Option<BusMetrics>,
}

impl EventBusBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: EventBusConfig::default(),
            sink: None,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: EventBusConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the hard ceiling on queued events.
    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.config.max_capacity = max_capacity;
        self
    }

    /// Sets the compaction threshold, in percent of the buffer.
    pub fn with_compaction_threshold(mut self, percent: u8) -> Self {
        self.config.compaction_threshold_percent = percent;
        self
    }

    /// Sets how many slots are allocated when the bus is enabled.
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.config.initial_capacity = initial_capacity;
        self
    }

    /// Sets the dispatcher thread name.
    pub fn with_thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.dispatcher_thread_name = name.into();
        self
    }

    /// Bounds how long `disable` waits for the dispatcher.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = Some(timeout);
        self
    }

    /// Sets whether handler panics are caught and reported.
    pub fn with_catch_panics(mut self, catch: bool) -> Self {
        self.config.catch_handler_panics = catch;
        self
    }

    /// Sends failure reports to `sink` instead of `tracing`.
    pub fn with_error_sink<S: ErrorSink>(mut self, sink: S) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Sends failure reports to an already shared sink.
    pub fn with_shared_error_sink(mut self, sink: SharedErrorSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Records bus activity in `metrics`.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: BusMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds a disabled bus.
    pub fn build(self) -> EventBus {
        EventBus {
            config: self.config,
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
            state: RwLock::new(BusState {
                lifecycle: Lifecycle::Disabled,
                runtime: None,
            }),
            #[cfg(feature = "metrics")]
            metrics: self.metrics,
        }
    }

    /// Builds the bus and enables it.
    ///
    /// # Errors
    ///
    /// Any error from [`EventBus::enable`].
    pub fn build_enabled(self) -> EventBusResult<EventBus> {
        let bus = self.build();
        bus.enable()?;
        Ok(bus)
    }
}

impl Default for EventBusBuilder {
    fn default() -> Self {
        Self::new()
    }
}
