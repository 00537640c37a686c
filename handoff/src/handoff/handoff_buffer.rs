// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The capacity-bounded, thread-safe FIFO shared between producers and the worker. See
//! [`HandoffBuffer`].

use super::{BufferState, BufferTransition, HandoffError, PushOutcome, TryPushOutcome};
use std::{collections::VecDeque,
          num::NonZeroUsize,
          sync::{Condvar, Mutex, MutexGuard, PoisonError}};

/// A capacity-bounded, ordered sequence of items guarded by a [`Mutex`] and a
/// [`Condvar`].
///
/// One instance is shared (via [`Arc`]) between every [`Producer`] clone and the single
/// [`HandoffBackend`] running on the worker thread. Neither side owns it exclusively; it
/// is freed once both have released their reference.
///
/// ```text
///  producer threads                               worker thread
/// ┌────────────────┐   try_push()/push()   ┌──────────────────────┐
/// │ Producer (N×)  │ ───────────────────►  │    HandoffBuffer     │
/// └────────────────┘                       │  [0 ..= capacity]    │
///         ▲                                └──────────┬───────────┘
///         │   notify_all() when drain removed ≥ 1     │ drain_up_to(n)
///         └───────────────────────────────────────────┤
///                                                     ▼
///                                          ┌──────────────────────┐
///                                          │    HandoffBackend    │
///                                          └──────────────────────┘
/// ```
///
/// # Locking
///
/// Every read and write of the item sequence happens while holding the lock, and the lock
/// is only ever held for the duration of a single operation. Nothing is called back while
/// it is held, so the worker thread can never be blocked by a producer for longer than a
/// [`VecDeque`] mutation.
///
/// A poisoned lock is recovered via [`PoisonError::into_inner()`]. The guarded data is a
/// [`VecDeque`] plus a [`BufferState`], and no operation leaves either half-updated.
///
/// [`Arc`]: std::sync::Arc
/// [`HandoffBackend`]: super::HandoffBackend
/// [`Producer`]: super::Producer
#[derive(Debug)]
pub struct HandoffBuffer<T> {
    capacity: NonZeroUsize,
    inner: Mutex<BufferInner<T>>,
    /// Signalled whenever a drain frees at least one slot, or the buffer is closed.
    slot_freed: Condvar,
}

#[derive(Debug)]
struct BufferInner<T> {
    items: VecDeque<T>,
    state: BufferState,
}

impl<T> BufferInner<T> {
    /// Returns the transition this push would cause, or [`None`] if there's no room.
    fn room_for_one(&self, capacity: NonZeroUsize) -> Option<BufferTransition> {
        if self.items.is_empty() {
            Some(BufferTransition::BecameNonEmpty)
        } else if self.items.len() < capacity.get() {
            Some(BufferTransition::AlreadyNonEmpty)
        } else {
            None
        }
    }
}

impl<T> HandoffBuffer<T> {
    /// Creates an empty buffer in the [`BufferState::Open`] state.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::ZeroCapacity`] if `capacity` is `0`.
    pub fn new(capacity: usize) -> Result<Self, HandoffError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(HandoffError::ZeroCapacity)?;
        Ok(Self {
            capacity,
            inner: Mutex::new(BufferInner {
                items: VecDeque::new(),
                state: BufferState::Open,
            }),
            slot_freed: Condvar::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BufferInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn capacity(&self) -> usize { self.capacity.get() }

    #[must_use]
    pub fn len(&self) -> usize { self.lock().items.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.lock().items.is_empty() }

    #[must_use]
    pub fn state(&self) -> BufferState { self.lock().state }

    /// Appends `value` if there is room, without ever blocking.
    ///
    /// The [`BufferTransition`] in the accepted case tells the caller whether it must wake
    /// the consumer. A full or closed buffer hands `value` back.
    pub fn try_push(&self, value: T) -> TryPushOutcome<T> {
        let mut inner = self.lock();
        if inner.state != BufferState::Open {
            return TryPushOutcome::Closed(value);
        }
        match inner.room_for_one(self.capacity) {
            Some(transition) => {
                inner.items.push_back(value);
                TryPushOutcome::Accepted(transition)
            }
            None => TryPushOutcome::Full(value),
        }
    }

    /// Appends `value`, blocking the calling thread while the buffer is at capacity.
    ///
    /// Only returns early (with [`PushOutcome::Closed`]) if the buffer is closed before
    /// or while waiting. Must never be called from the worker thread, since the worker is
    /// the only thing that can free a slot.
    pub fn push(&self, value: T) -> PushOutcome<T> {
        let mut inner = self.lock();
        loop {
            if inner.state != BufferState::Open {
                return PushOutcome::Closed(value);
            }
            // Loop: several waiters may race for one freed slot, and wakeups can be
            // spurious.
            if let Some(transition) = inner.room_for_one(self.capacity) {
                inner.items.push_back(value);
                return PushOutcome::Accepted(transition);
            }
            inner = self
                .slot_freed
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Removes the first `min(n, len)` items in FIFO order and appends them to `out`.
    /// Wakes every blocked producer if at least one item was removed. Never blocks.
    ///
    /// Returns the number of items moved.
    pub fn drain_up_to_into(&self, n: usize, out: &mut impl Extend<T>) -> usize {
        let mut inner = self.lock();
        let count = n.min(inner.items.len());
        if count > 0 {
            out.extend(inner.items.drain(..count));
            self.slot_freed.notify_all();
        }
        count
    }

    /// Removes and returns the first `min(n, len)` items in FIFO order. See
    /// [`drain_up_to_into()`].
    ///
    /// [`drain_up_to_into()`]: Self::drain_up_to_into
    #[must_use]
    pub fn drain_up_to(&self, n: usize) -> Vec<T> {
        let mut acc = Vec::new();
        self.drain_up_to_into(n, &mut acc);
        acc
    }

    /// Stops accepting new items. Items already buffered stay drainable. Producers
    /// blocked in [`push()`] are released with [`PushOutcome::Closed`].
    ///
    /// Returns `true` if this call performed the transition.
    ///
    /// [`push()`]: Self::push
    pub fn close_producer_side(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != BufferState::Open {
            return false;
        }
        inner.state = BufferState::ProducerClosed;
        self.slot_freed.notify_all();
        true
    }

    /// Marks the consumer side as gone: discards every buffered item and releases every
    /// producer blocked in [`push()`]. Idempotent.
    ///
    /// Returns the number of discarded items. They are dropped after the lock is
    /// released.
    ///
    /// [`push()`]: Self::push
    pub fn close_consumer_side(&self) -> usize {
        let discarded = {
            let mut inner = self.lock();
            inner.state = BufferState::ConsumerClosed;
            self.slot_freed.notify_all();
            std::mem::take(&mut inner.items)
        };
        discarded.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::{Arc, mpsc}, thread, time::Duration};
    use test_case::test_case;

    const TIMEOUT: Duration = Duration::from_secs(5);
    const STILL_BLOCKED: Duration = Duration::from_millis(100);

    fn accepted(outcome: TryPushOutcome<char>) -> BufferTransition {
        match outcome {
            TryPushOutcome::Accepted(transition) => transition,
            other => panic!("Expected Accepted, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(matches!(
            HandoffBuffer::<u8>::new(0),
            Err(HandoffError::ZeroCapacity)
        ));
    }

    #[test]
    fn test_try_push_reports_first_item() {
        let buffer = HandoffBuffer::new(3).unwrap();
        assert_eq!(accepted(buffer.try_push('a')), BufferTransition::BecameNonEmpty);
        assert_eq!(accepted(buffer.try_push('b')), BufferTransition::AlreadyNonEmpty);
        assert_eq!(accepted(buffer.try_push('c')), BufferTransition::AlreadyNonEmpty);
        assert_eq!(buffer.try_push('d'), TryPushOutcome::Full('d'));

        assert_eq!(buffer.drain_up_to(3), vec!['a', 'b', 'c']);
        assert_eq!(accepted(buffer.try_push('e')), BufferTransition::BecameNonEmpty);
    }

    #[test]
    fn test_capacity_two_scenario() {
        let buffer = HandoffBuffer::new(2).unwrap();
        assert!(matches!(buffer.try_push('A'), TryPushOutcome::Accepted(_)));
        assert!(matches!(buffer.try_push('B'), TryPushOutcome::Accepted(_)));
        assert_eq!(buffer.try_push('C'), TryPushOutcome::Full('C'));

        assert_eq!(buffer.drain_up_to(1), vec!['A']);
        assert_eq!(buffer.len(), 1);

        assert_eq!(accepted(buffer.try_push('C')), BufferTransition::AlreadyNonEmpty);
        assert_eq!(buffer.drain_up_to(5), vec!['B', 'C']);
        assert!(buffer.is_empty());
    }

    #[test_case(0, 4 => 0 ; "zero requested")]
    #[test_case(2, 4 => 2 ; "fewer than present")]
    #[test_case(4, 4 => 4 ; "exactly present")]
    #[test_case(9, 4 => 4 ; "more than present")]
    #[test_case(3, 0 => 0 ; "empty buffer")]
    fn test_drain_never_exceeds_request_or_contents(n: usize, present: usize) -> usize {
        let buffer = HandoffBuffer::new(8).unwrap();
        for it in 0..present {
            assert!(matches!(buffer.try_push(it), TryPushOutcome::Accepted(_)));
        }
        let drained = buffer.drain_up_to(n);
        assert_eq!(drained, (0..drained.len()).collect::<Vec<_>>());
        assert_eq!(buffer.len(), present - drained.len());
        drained.len()
    }

    #[test]
    fn test_push_blocks_until_drain_frees_slot() {
        let buffer = Arc::new(HandoffBuffer::new(1).unwrap());
        let (pushed_tx, pushed_rx) = mpsc::channel();

        let producer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for it in [1, 2] {
                    let outcome = buffer.push(it);
                    pushed_tx.send((it, outcome)).unwrap();
                }
            })
        };

        assert_eq!(
            pushed_rx.recv_timeout(TIMEOUT).unwrap(),
            (1, PushOutcome::Accepted(BufferTransition::BecameNonEmpty))
        );
        // Buffer is full, so the second push must still be parked.
        assert!(pushed_rx.recv_timeout(STILL_BLOCKED).is_err());
        assert_eq!(buffer.len(), 1);

        assert_eq!(buffer.drain_up_to(1), vec![1]);
        assert_eq!(
            pushed_rx.recv_timeout(TIMEOUT).unwrap(),
            (2, PushOutcome::Accepted(BufferTransition::BecameNonEmpty))
        );
        producer.join().unwrap();
        assert_eq!(buffer.drain_up_to(1), vec![2]);
    }

    #[test]
    fn test_empty_drain_does_not_release_blocked_push() {
        let buffer = Arc::new(HandoffBuffer::new(1).unwrap());
        assert!(matches!(buffer.try_push(0), TryPushOutcome::Accepted(_)));
        let (pushed_tx, pushed_rx) = mpsc::channel();

        let producer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || pushed_tx.send(buffer.push(1)).unwrap())
        };

        // Nothing removed, nothing released.
        assert!(buffer.drain_up_to(0).is_empty());
        assert!(pushed_rx.recv_timeout(STILL_BLOCKED).is_err());

        assert_eq!(buffer.drain_up_to(1), vec![0]);
        assert!(pushed_rx.recv_timeout(TIMEOUT).unwrap().is_accepted());
        producer.join().unwrap();
    }

    #[test]
    fn test_close_consumer_side_releases_blocked_producers() {
        let buffer = Arc::new(HandoffBuffer::new(1).unwrap());
        assert!(matches!(buffer.try_push(0), TryPushOutcome::Accepted(_)));
        let (pushed_tx, pushed_rx) = mpsc::channel();

        let producers: Vec<_> = (1..=3)
            .map(|it| {
                let buffer = Arc::clone(&buffer);
                let pushed_tx = pushed_tx.clone();
                thread::spawn(move || pushed_tx.send(buffer.push(it)).unwrap())
            })
            .collect();
        assert!(pushed_rx.recv_timeout(STILL_BLOCKED).is_err());

        assert_eq!(buffer.close_consumer_side(), 1);

        let mut rejected: Vec<_> = (0..3)
            .map(|_| match pushed_rx.recv_timeout(TIMEOUT).unwrap() {
                PushOutcome::Closed(it) => it,
                other => panic!("Expected Closed, got {other:?}"),
            })
            .collect();
        rejected.sort_unstable();
        assert_eq!(rejected, vec![1, 2, 3]);
        for producer in producers {
            producer.join().unwrap();
        }

        assert!(buffer.is_empty());
        assert_eq!(buffer.state(), BufferState::ConsumerClosed);
        assert_eq!(buffer.try_push(4), TryPushOutcome::Closed(4));
    }

    #[test]
    fn test_close_producer_side_keeps_items_drainable() {
        let buffer = HandoffBuffer::new(4).unwrap();
        assert!(matches!(buffer.try_push('x'), TryPushOutcome::Accepted(_)));
        assert!(buffer.close_producer_side());
        assert!(!buffer.close_producer_side());

        assert_eq!(buffer.try_push('y'), TryPushOutcome::Closed('y'));
        assert_eq!(buffer.push('z'), PushOutcome::Closed('z'));
        assert_eq!(buffer.drain_up_to(4), vec!['x']);
        assert_eq!(buffer.state(), BufferState::ProducerClosed);
    }

    #[test]
    fn test_concurrent_producers_lose_and_duplicate_nothing() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 250;
        const CAPACITY: usize = 8;

        let buffer = Arc::new(HandoffBuffer::new(CAPACITY).unwrap());
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|producer_id| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    let mut accepted = vec![];
                    for seq in 0..PER_PRODUCER {
                        let item = producer_id * PER_PRODUCER + seq;
                        // Alternate entry points so both are exercised under contention.
                        if seq % 2 == 0 {
                            assert!(buffer.push(item).is_accepted());
                            accepted.push(item);
                        } else if let TryPushOutcome::Accepted(_) = buffer.try_push(item) {
                            accepted.push(item);
                        }
                    }
                    accepted
                })
            })
            .collect();

        let mut delivered = vec![];
        while producers.iter().any(|it| !it.is_finished()) || !buffer.is_empty() {
            assert!(buffer.len() <= CAPACITY);
            delivered.extend(buffer.drain_up_to(3));
            thread::yield_now();
        }

        let mut accepted: Vec<usize> = producers
            .into_iter()
            .flat_map(|it| it.join().unwrap())
            .collect();
        delivered.extend(buffer.drain_up_to(CAPACITY));

        accepted.sort_unstable();
        delivered.sort_unstable();
        assert_eq!(delivered, accepted);
    }
}
