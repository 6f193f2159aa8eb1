//! Error types for queuebus.
//!
//! This module defines the errors that surface synchronously to callers:
//! queue rejections, bus lifecycle misuse, and handler failures. Failures
//! that never reach a caller (a handler failing on the dispatcher thread, a
//! skipped registration) are reported through [`crate::report::ErrorSink`]
//! instead.

use crate::event_bus::Lifecycle;

use std::io;
use thiserror::Error;

/// Errors raised by [`crate::queue::EventQueue`] and [`crate::queue::RingBuffer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue holds `max_capacity` elements and cannot accept more.
    #[error("Queue capacity exceeded (max: {max_capacity})")]
    CapacityExceeded {
        /// The hard ceiling that was hit.
        max_capacity: usize,
    },

    /// The queue has no element to return.
    #[error("Queue is empty")]
    Empty,

    /// The queue was closed by its consumer and accepts nothing more.
    #[error("Queue is closed")]
    Closed,

    /// An argument or policy value was rejected.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },
}

/// Errors produced while invoking a single handler.
///
/// These never propagate to the producer that fired the event; the
/// dispatcher hands them to the error sink and moves on.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("Handler failed: {0}")]
    Failed(Box<dyn std::error::Error + Send + Sync>),

    /// The handler panicked.
    #[error("Handler panicked: {message}")]
    Panic {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// The listener owning the handler has been dropped.
    #[error("Listener dropped before dispatch")]
    ListenerDropped,
}

/// Errors that can occur during event bus operations.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// The queue rejected the event.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// `enable` was called on a bus that is not disabled.
    #[error("Bus is already enabled")]
    AlreadyEnabled,

    /// `disable` was called on a bus that is not enabled.
    #[error("Bus is already disabled")]
    AlreadyDisabled,

    /// The operation needs an enabled bus.
    #[error("Bus is disabled")]
    Disabled,

    /// The dispatcher thread could not be started.
    #[error("Failed to spawn dispatcher thread: {0}")]
    Spawn(#[source] io::Error),

    /// Another thread is enabling or disabling the bus.
    #[error("Bus is {state}; lifecycle change already in progress")]
    Transitioning {
        /// The transitional state observed.
        state: Lifecycle,
    },
}

/// Convenience type alias for queue operation results.
pub type QueueResult<T> = Result<T, QueueError>;

/// Convenience type alias for handler results.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Convenience type alias for EventBus operation results.
pub type EventBusResult<T> = Result<T, EventBusError>;

impl QueueError {
    /// Creates a new capacity exceeded error.
    pub fn capacity_exceeded(max_capacity: usize) -> Self {
        Self::CapacityExceeded { max_capacity }
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(reason: S) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl HandlerError {
    /// Creates a new failure from any error type.
    pub fn failed<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Self::Failed(Box::new(error))
    }

    /// Creates a new panic error.
    pub fn panic<S: Into<String>>(message: S) -> Self {
        Self::Panic {
            message: message.into(),
        }
    }

    /// Builds a panic error from a `catch_unwind` payload.
    pub(crate) fn from_panic_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panic { message }
    }
}

impl EventBusError {
    /// Returns `true` when the queue rejected the event for lack of room.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::Queue(QueueError::CapacityExceeded { .. }))
    }
}
