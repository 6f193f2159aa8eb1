//! Thread-safe bounded event queue.
//!
//! [`EventQueue`] guards a [`RingBuffer`] with a single queue-wide lock, so
//! concurrent producers never interleave partial writes and FIFO order is the
//! order in which `enqueue` calls acquired the lock. Two condition variables
//! hang off the same lock: one wakes the dispatcher when an element arrives,
//! the other wakes callers of [`EventQueue::wait_idle`] once the queue has
//! drained and nothing is being dispatched.

mod ring;

pub use ring::{RingBuffer, DEFAULT_COMPACTION_THRESHOLD_PERCENT, DEFAULT_MAX_CAPACITY};

use crate::dispatcher::CancellationToken;
use crate::error::{QueueError, QueueResult};

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct QueueState<T> {
    ring: RingBuffer<T>,
    /// Elements handed to the dispatcher and not yet finished.
    in_flight: usize,
    /// Set once the consumer has stopped; no further elements are accepted.
    closed: bool,
}

impl<T> QueueState<T> {
    fn is_idle(&self) -> bool {
        self.ring.is_empty() && self.in_flight == 0
    }
}

/// Bounded FIFO queue shared between producers and the dispatcher.
///
/// # Examples
///
/// ```rust
/// use queuebus::queue::EventQueue;
/// use queuebus::QueueError;
///
/// let queue = EventQueue::new();
/// queue.enqueue("A")?;
/// queue.enqueue("B")?;
/// queue.enqueue("C")?;
///
/// assert_eq!(queue.dequeue()?, "A");
/// assert_eq!(queue.dequeue()?, "B");
/// assert_eq!(queue.dequeue()?, "C");
/// assert_eq!(queue.dequeue(), Err(QueueError::Empty));
/// # Ok::<(), QueueError>(())
/// ```
#[derive(Debug)]
pub struct EventQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
    idle: Condvar,
    #[cfg(feature = "async")]
    idle_notify: tokio::sync::Notify,
}

impl<T> EventQueue<T> {
    /// Creates an empty queue with the default policy (8192 slots, 50% compaction).
    pub fn new() -> Self {
        Self::from_ring(RingBuffer::new())
    }

    /// Creates an empty queue with an explicit growth policy.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidArgument`] for a zero `max_capacity` or a
    /// threshold above 100.
    pub fn with_policy(
        initial_capacity: usize,
        max_capacity: usize,
        compaction_threshold_percent: u8,
    ) -> QueueResult<Self> {
        RingBuffer::with_policy(initial_capacity, max_capacity, compaction_threshold_percent)
            .map(Self::from_ring)
    }

    fn from_ring(ring: RingBuffer<T>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                ring,
                in_flight: 0,
                closed: false,
            }),
            available: Condvar::new(),
            idle: Condvar::new(),
            #[cfg(feature = "async")]
            idle_notify: tokio::sync::Notify::new(),
        }
    }

    /// Appends an event.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::CapacityExceeded`] when the queue is at its hard
    /// ceiling, or [`QueueError::Closed`] once the queue has been closed.
    pub fn enqueue(&self, event: T) -> QueueResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(QueueError::Closed);
        }
        state.ring.push(event)?;
        drop(state);

        self.available.notify_one();
        Ok(())
    }

    /// Appends an event, returning `false` instead of an error when full.
    pub fn try_enqueue(&self, event: T) -> bool {
        self.enqueue(event).is_ok()
    }

    /// Appends a batch in order. Either the whole batch is queued or none of it.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::CapacityExceeded`] if the batch does not fit,
    /// or [`QueueError::Closed`] once the queue has been closed.
    pub fn enqueue_all<I>(&self, events: I) -> QueueResult<()>
    where
        I: IntoIterator<Item = T>,
    {
        let mut state = self.state.lock();
        if state.closed {
            return Err(QueueError::Closed);
        }
        state.ring.push_all(events)?;
        let queued = !state.ring.is_empty();
        drop(state);

        if queued {
            self.available.notify_all();
        }
        Ok(())
    }

    /// Removes and returns the oldest event.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Empty`] if there is nothing queued.
    pub fn dequeue(&self) -> QueueResult<T> {
        self.try_dequeue().ok_or(QueueError::Empty)
    }

    /// Removes and returns the oldest event, or `None` if the queue is empty.
    pub fn try_dequeue(&self) -> Option<T> {
        let mut state = self.state.lock();
        let event = state.ring.pop();
        if event.is_some() && state.is_idle() {
            self.notify_idle();
        }
        event
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.state.lock().ring.len()
    }

    /// Returns `true` if no events are queued.
    pub fn is_empty(&self) -> bool {
        self.state.lock().ring.is_empty()
    }

    /// Returns `true` if nothing is queued and nothing is being dispatched.
    pub fn is_idle(&self) -> bool {
        self.state.lock().is_idle()
    }

    /// Number of allocated slots.
    pub fn capacity(&self) -> usize {
        self.state.lock().ring.capacity()
    }

    /// The hard ceiling on queued events.
    pub fn max_capacity(&self) -> usize {
        self.state.lock().ring.max_capacity()
    }

    /// Drops every queued event.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.ring.clear();
        if state.is_idle() {
            self.notify_idle();
        }
    }

    /// Keeps only the events for which `keep` returns `true`.
    ///
    /// Returns the number of events removed.
    pub fn retain<F>(&self, keep: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut state = self.state.lock();
        let removed = state.ring.retain(keep);
        if removed > 0 && state.is_idle() {
            self.notify_idle();
        }
        removed
    }

    /// Blocks until an event is available or `stop` is cancelled.
    ///
    /// Queued events are always returned before the cancellation is
    /// observed, so a cancelled consumer drains the queue before it gets
    /// `None`. Returning `None` closes the queue under the same lock, so no
    /// producer can slip an event in after the final drain. Every `Some`
    /// must be matched by a call to [`EventQueue::finish_dispatch`].
    pub(crate) fn next_for_dispatch(&self, stop: &CancellationToken) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(event) = state.ring.pop() {
                state.in_flight += 1;
                return Some(event);
            }
            if stop.is_cancelled() {
                state.closed = true;
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Stops accepting new events. Events already queued stay queued.
    pub(crate) fn close(&self) {
        self.state.lock().closed = true;
    }

    /// Returns `true` once the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Marks one event returned by `next_for_dispatch` as fully handled.
    pub(crate) fn finish_dispatch(&self) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.is_idle() {
            self.notify_idle();
        }
    }

    /// Wakes every thread blocked in `next_for_dispatch`.
    ///
    /// Taking the lock first means a waiter that has just checked its token
    /// cannot miss the wake-up.
    pub(crate) fn wake_consumers(&self) {
        let _state = self.state.lock();
        self.available.notify_all();
    }

    /// Blocks until the queue is empty and nothing is being dispatched.
    ///
    /// Returns `false` if `timeout` elapsed first. With no running consumer a
    /// non-empty queue never becomes idle, so pass a timeout in that case.
    pub fn wait_idle(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();

        while !state.is_idle() {
            match deadline {
                Some(deadline) => {
                    if self.idle.wait_until(&mut state, deadline).timed_out() {
                        return state.is_idle();
                    }
                }
                None => self.idle.wait(&mut state),
            }
        }
        true
    }

    /// Async counterpart of [`EventQueue::wait_idle`] without a timeout.
    #[cfg(feature = "async")]
    pub async fn wait_idle_async(&self) {
        loop {
            let mut notified = std::pin::pin!(self.idle_notify.notified());
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    fn notify_idle(&self) {
        self.idle.notify_all();
        #[cfg(feature = "async")]
        self.idle_notify.notify_waiters();
    }
}

impl<T: Clone> EventQueue<T> {
    /// Returns the oldest event without removing it.
    pub fn peek(&self) -> Option<T> {
        self.state.lock().ring.peek().cloned()
    }

    /// Returns the oldest event without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Empty`] if there is nothing queued.
    pub fn element(&self) -> QueueResult<T> {
        self.peek().ok_or(QueueError::Empty)
    }

    /// Copies the queued events out in FIFO order.
    ///
    /// This is a point-in-time copy, not a live view.
    pub fn snapshot(&self) -> Vec<T> {
        self.state.lock().ring.snapshot()
    }
}

impl<T: PartialEq> EventQueue<T> {
    /// Returns `true` if an equal event is queued.
    pub fn contains(&self, event: &T) -> bool {
        self.state.lock().ring.contains(event)
    }

    /// Removes the first queued event equal to `event`.
    pub fn remove(&self, event: &T) -> bool {
        let mut state = self.state.lock();
        let removed = state.ring.remove(event);
        if removed && state.is_idle() {
            self.notify_idle();
        }
        removed
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
