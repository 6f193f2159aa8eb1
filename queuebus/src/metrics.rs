//! Prometheus metrics for an event bus.
//!
//! Enabled with the `metrics` feature. A [`BusMetrics`] is a bundle of
//! counters that the bus and its dispatcher update as events flow through;
//! register it into any `prometheus::Registry` to export them.
//!
//! ```rust
//! use queuebus::{EventBusBuilder, metrics::BusMetrics};
//! use prometheus::Registry;
//!
//! let registry = Registry::new();
//! let metrics = BusMetrics::new()?;
//! metrics.register(&registry)?;
//!
//! let bus = EventBusBuilder::new().with_metrics(metrics).build();
//! # drop(bus);
//! # Ok::<(), prometheus::Error>(())
//! ```

use prometheus::{IntCounter, IntGauge, Opts, Registry};

const NAMESPACE: &str = "queuebus";

/// Counters and gauges describing one bus.
#[derive(Debug, Clone)]
pub struct BusMetrics {
    /// Events accepted by the queue.
    pub events_enqueued: IntCounter,
    /// Events rejected because the queue was full.
    pub events_rejected: IntCounter,
    /// Events fully dispatched to their handlers.
    pub events_dispatched: IntCounter,
    /// Handler invocations that returned an error or panicked.
    pub handler_failures: IntCounter,
    /// Events waiting in the queue.
    pub queue_depth: IntGauge,
}

impl BusMetrics {
    /// Creates metrics under the `queuebus` namespace.
    pub fn new() -> prometheus::Result<Self> {
        Self::with_subsystem("")
    }

    /// Creates metrics under `queuebus_<subsystem>`, for processes running
    /// more than one bus.
    pub fn with_subsystem(subsystem: &str) -> prometheus::Result<Self> {
        let opts = |name: &str, help: &str| {
            let opts = Opts::new(name, help).namespace(NAMESPACE);
            if subsystem.is_empty() {
                opts
            } else {
                opts.subsystem(subsystem)
            }
        };

        Ok(Self {
            events_enqueued: IntCounter::with_opts(opts(
                "events_enqueued_total",
                "Events accepted by the queue",
            ))?,
            events_rejected: IntCounter::with_opts(opts(
                "events_rejected_total",
                "Events rejected because the queue was full",
            ))?,
            events_dispatched: IntCounter::with_opts(opts(
                "events_dispatched_total",
                "Events delivered to all of their handlers",
            ))?,
            handler_failures: IntCounter::with_opts(opts(
                "handler_failures_total",
                "Handler invocations that failed or panicked",
            ))?,
            queue_depth: IntGauge::with_opts(opts("queue_depth", "Events waiting in the queue"))?,
        })
    }

    /// Registers every metric with `registry`.
    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.events_enqueued.clone()))?;
        registry.register(Box::new(self.events_rejected.clone()))?;
        registry.register(Box::new(self.events_dispatched.clone()))?;
        registry.register(Box::new(self.handler_failures.clone()))?;
        registry.register(Box::new(self.queue_depth.clone()))?;
        Ok(())
    }

    pub(crate) fn record_enqueued(&self, depth: usize) {
        self.events_enqueued.inc();
        self.queue_depth.set(depth as i64);
    }

    pub(crate) fn record_rejected(&self) {
        self.events_rejected.inc();
    }
}
