// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The handle that producer threads push items through. See [`Producer`].

use super::{AbortReason, BufferState, BufferTransition, HandoffBuffer, NotifyHandle,
            Push, PushOutcome, TryPush, TryPushOutcome};
use std::sync::Arc;

/// State shared by every clone of a [`Producer`]. When the last clone goes away, the
/// producer side is closed exactly once.
#[derive(Debug)]
struct ProducerShared<T> {
    buffer: Arc<HandoffBuffer<T>>,
    notify: NotifyHandle,
}

impl<T> ProducerShared<T> {
    fn wake_if_first(&self, transition: BufferTransition) {
        if transition == BufferTransition::BecameNonEmpty {
            self.notify.notify_event();
        }
    }

    fn close(&self) -> bool {
        self.buffer.close_producer_side();
        self.notify.close()
    }
}

impl<T> Drop for ProducerShared<T> {
    /// Closes the pipeline gracefully if nobody called [`Producer::close()`] or
    /// [`Producer::abort()`]. Items already in the buffer are still delivered.
    fn drop(&mut self) {
        if self.close() {
            tracing::debug!("last producer dropped, pipeline closed");
        }
    }
}

/// The object producer threads call into.
///
/// Cheap to [`Clone`], and every clone is [`Send`] + [`Sync`] (for `T: Send`), so any
/// number of threads can push concurrently. Items from all clones land in one FIFO, in
/// arrival order.
///
/// # Two Ways To Push
///
/// | Method         | Full buffer               | Callable from the worker thread? |
/// | :------------- | :------------------------ | :------------------------------- |
/// | [`try_push()`] | returns [`TryPush::Full`] | Yes                              |
/// | [`push()`]     | blocks until a slot frees | **No** (deadlocks the pipeline)  |
///
/// A full buffer is never an error. Items that can't be accepted are always handed back
/// to the caller.
///
/// # Ending The Stream
///
/// - [`close()`]: graceful. Everything already pushed is delivered, then the subscriber
///   sees the end of the stream.
/// - [`abort()`]: immediate. Anything not yet delivered is discarded, and the subscriber
///   sees the [`AbortReason`].
/// - Dropping the last clone behaves like [`close()`].
///
/// Whichever happens first wins; later calls return `false`.
///
/// # Example
///
/// ```no_run
/// use r3bl_handoff::{Push, create_pipeline};
///
/// # fn main() -> miette::Result<()> {
/// let (producer, publisher) = create_pipeline::<String>(16)?;
/// let handle = std::thread::spawn(move || {
///     for line in ["alpha", "beta", "gamma"] {
///         if let Push::Closed(_) = producer.push(line.to_string()) {
///             break;
///         }
///     }
///     // `producer` is dropped here, which closes the pipeline.
/// });
/// # drop((publisher, handle));
/// # Ok(())
/// # }
/// ```
///
/// [`abort()`]: Self::abort
/// [`close()`]: Self::close
/// [`push()`]: Self::push
/// [`try_push()`]: Self::try_push
#[derive(Debug)]
pub struct Producer<T> {
    shared: Arc<ProducerShared<T>>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Producer<T> {
    pub(crate) fn new(buffer: Arc<HandoffBuffer<T>>, notify: NotifyHandle) -> Self {
        Self {
            shared: Arc::new(ProducerShared { buffer, notify }),
        }
    }

    /// Pushes `value` if there is room. Never blocks, and is safe to call from any
    /// thread, including the worker's own thread (e.g. from inside a subscriber).
    pub fn try_push(&self, value: T) -> TryPush<T> {
        match self.shared.buffer.try_push(value) {
            TryPushOutcome::Accepted(transition) => {
                self.shared.wake_if_first(transition);
                TryPush::Accepted
            }
            TryPushOutcome::Full(it) => TryPush::Full(it),
            TryPushOutcome::Closed(it) => TryPush::Closed(it),
        }
    }

    /// Pushes `value`, blocking the calling thread while the buffer is full.
    ///
    /// Returns [`Push::Closed`] with the value if the pipeline stopped accepting items
    /// before a slot became available: the producer side was closed or aborted, or the
    /// consumer side terminated (completed, aborted, subscriber dropped, worker exited).
    ///
    /// Must only be called from threads that are allowed to block, **never** from the
    /// worker thread, since only the worker can free a slot.
    pub fn push(&self, value: T) -> Push<T> {
        match self.shared.buffer.push(value) {
            PushOutcome::Accepted(transition) => {
                self.shared.wake_if_first(transition);
                Push::Accepted
            }
            PushOutcome::Closed(it) => Push::Closed(it),
        }
    }

    /// Stops accepting items and lets the worker drain what is already buffered before
    /// completing the stream. Returns `false` if the pipeline was already closed or
    /// aborted.
    pub fn close(&self) -> bool { self.shared.close() }

    /// Stops accepting items and fails the stream with `reason`. Items not yet
    /// delivered are discarded. Returns `false` if the pipeline was already closed or
    /// aborted.
    pub fn abort(&self, reason: AbortReason) -> bool {
        self.shared.buffer.close_producer_side();
        self.shared.notify.abort(reason)
    }

    /// Items currently waiting in the buffer.
    #[must_use]
    pub fn len(&self) -> usize { self.shared.buffer.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.shared.buffer.is_empty() }

    #[must_use]
    pub fn capacity(&self) -> usize { self.shared.buffer.capacity() }

    /// Whether pushes can no longer succeed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.notify.is_finished() || self.shared.buffer.state() != BufferState::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BridgeSignal, NotifyListener, NotifyReceiver, notify_bridge};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct CountingListener {
        events: usize,
    }

    impl NotifyListener for CountingListener {
        fn on_event(&mut self) { self.events += 1; }

        fn on_close(&mut self) {}

        fn on_abort(&mut self, _reason: AbortReason) {}
    }

    fn setup(capacity: usize) -> (Producer<u32>, NotifyReceiver) {
        let buffer = Arc::new(HandoffBuffer::new(capacity).unwrap());
        let (notify, receiver) = notify_bridge();
        (Producer::new(buffer, notify), receiver)
    }

    fn drain_signals(receiver: &mut NotifyReceiver) -> Vec<BridgeSignal> {
        std::iter::from_fn(|| receiver.try_recv()).collect()
    }

    #[test]
    fn test_one_wakeup_per_empty_to_non_empty_transition() {
        let (producer, mut receiver) = setup(4);
        let mut listener = CountingListener::default();

        // First item wakes, later ones don't.
        assert!(producer.try_push(1).is_accepted());
        assert!(producer.push(2).is_accepted());
        assert!(producer.try_push(3).is_accepted());
        let signals = drain_signals(&mut receiver);
        assert_eq!(signals, vec![BridgeSignal::Event]);
        for signal in signals {
            receiver.dispatch(&mut listener, signal);
        }

        // Worker drains everything, so the next push starts from empty again.
        assert_eq!(producer.shared.buffer.drain_up_to(10), vec![1, 2, 3]);
        assert!(producer.push(4).is_accepted());
        assert_eq!(drain_signals(&mut receiver), vec![BridgeSignal::Event]);

        // Still non-empty: no new wakeup.
        assert!(producer.try_push(5).is_accepted());
        assert!(drain_signals(&mut receiver).is_empty());
        assert_eq!(listener.events, 1);
    }

    #[test]
    fn test_full_buffer_hands_item_back() {
        let (producer, _receiver) = setup(1);
        assert!(producer.try_push(1).is_accepted());
        assert_eq!(producer.try_push(2), TryPush::Full(2));
        assert_eq!(producer.try_push(3).into_rejected(), Some(3));
        assert_eq!(producer.len(), 1);
        assert_eq!(producer.capacity(), 1);
    }

    #[test]
    fn test_close_is_sent_once_and_rejects_further_pushes() {
        let (producer, mut receiver) = setup(2);
        let clone = producer.clone();
        assert!(producer.try_push(7).is_accepted());

        assert!(clone.close());
        assert!(!producer.close());
        assert!(!producer.abort(AbortReason::new("too late")));
        assert!(producer.is_closed());

        assert_eq!(producer.try_push(8), TryPush::Closed(8));
        assert_eq!(producer.push(9), Push::Closed(9));
        // Already buffered items stay drainable.
        assert_eq!(producer.len(), 1);

        assert_eq!(
            drain_signals(&mut receiver),
            vec![BridgeSignal::Event, BridgeSignal::Close]
        );
    }

    #[test]
    fn test_abort_sends_reason() {
        let (producer, mut receiver) = setup(2);
        assert!(producer.abort(AbortReason::new("upstream failed")));
        assert!(producer.is_closed());
        assert_eq!(
            drain_signals(&mut receiver),
            vec![BridgeSignal::Abort(AbortReason::new("upstream failed"))]
        );
    }

    #[test]
    fn test_dropping_last_clone_closes() {
        let (producer, mut receiver) = setup(2);
        let clone = producer.clone();

        drop(producer);
        assert!(drain_signals(&mut receiver).is_empty());

        drop(clone);
        assert_eq!(drain_signals(&mut receiver), vec![BridgeSignal::Close]);
    }

    #[test]
    fn test_dropping_after_abort_sends_nothing_more() {
        let (producer, mut receiver) = setup(2);
        assert!(producer.abort(AbortReason::new("x")));
        drop(producer);
        assert_eq!(
            drain_signals(&mut receiver),
            vec![BridgeSignal::Abort(AbortReason::new("x"))]
        );
    }
}
