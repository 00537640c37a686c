// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The consumer-side adapter that lives on the worker thread. See [`HandoffBackend`].

use super::{AbortReason, HandoffBuffer, NotifyListener};
use crate::{BufferedObservable, FlowState, PullSource, Sink};
use std::{collections::VecDeque, num::NonZeroUsize, sync::Arc};

/// [`PullSource`] view of the shared [`HandoffBuffer`].
#[derive(Debug)]
pub struct HandoffSource<T> {
    buffer: Arc<HandoffBuffer<T>>,
}

impl<T> PullSource for HandoffSource<T> {
    type Item = T;

    /// Drains up to `n` items into `staging`. The buffer itself wakes blocked producers
    /// when anything was removed.
    fn pull(&mut self, n: usize, staging: &mut VecDeque<T>) {
        debug_assert!(n > 0, "pull() requires outstanding demand");
        if n == 0 {
            return;
        }
        let pulled = self.buffer.drain_up_to_into(n, staging);
        tracing::trace!(requested = n, pulled, "pulled from handoff buffer");
    }

    /// Never finished while unread items remain, whatever the base thinks.
    fn done(&self, base_done: bool) -> bool { base_done && self.buffer.is_empty() }

    fn on_terminated(&mut self) {
        let discarded = self.buffer.close_consumer_side();
        if discarded > 0 {
            tracing::debug!(discarded, "discarded undelivered items");
        }
    }
}

/// Runs on the worker thread: supplies items to the downstream [`Sink`] on demand, and
/// reacts to producer activity delivered through the [notification bridge].
///
/// ```text
///             NotifyListener hooks                  downstream control
///   on_event ─┐                                   ┌─ on_subscribe(sink)
///   on_close ─┼──► BufferedObservable<HandoffSource> ◄──┼─ on_request(n)
///   on_abort ─┘            │                        └─ on_cancel()
///                          ▼ pull(n), n = min(demand, batch)
///                    HandoffBuffer::drain_up_to_into()
/// ```
///
/// # States
///
/// | State          | Entered by                          | Pulls? |
/// | :------------- | :---------------------------------- | :----- |
/// | `Running`      | construction                        | on demand |
/// | `ShuttingDown` | [`on_close()`]                      | on demand, until [`done()`] |
/// | `Completed`    | drained after close                 | never again |
/// | `Aborted`      | [`on_abort()`]                      | never again |
/// | `Cancelled`    | [`on_cancel()`] (subscriber gone)   | never again |
///
/// Entering any terminal state closes the consumer side of the buffer, which discards
/// leftovers and releases every producer blocked in [`Producer::push()`].
///
/// [`Producer::push()`]: super::Producer::push
/// [`done()`]: Self::done
/// [`on_abort()`]: NotifyListener::on_abort
/// [`on_cancel()`]: Self::on_cancel
/// [`on_close()`]: NotifyListener::on_close
/// [notification bridge]: mod@super::notify_bridge
#[allow(missing_debug_implementations)]
pub struct HandoffBackend<T, K>
where
    K: Sink<T>,
{
    flow: BufferedObservable<HandoffSource<T>, K>,
}

impl<T, K> HandoffBackend<T, K>
where
    K: Sink<T>,
{
    #[must_use]
    pub fn new(buffer: Arc<HandoffBuffer<T>>, batch_size: NonZeroUsize) -> Self {
        Self {
            flow: BufferedObservable::new(HandoffSource { buffer }, batch_size),
        }
    }

    #[must_use]
    pub fn buffer(&self) -> &Arc<HandoffBuffer<T>> { &self.flow.source().buffer }

    #[must_use]
    pub fn state(&self) -> FlowState { self.flow.state() }

    #[must_use]
    pub fn is_terminal(&self) -> bool { self.flow.is_terminal() }

    #[must_use]
    pub fn is_finished(&self) -> bool { self.flow.is_finished() }

    /// Binds the downstream sink. See [`BufferedObservable::on_subscribe()`].
    pub fn on_subscribe(&mut self, sink: K) -> bool { self.flow.on_subscribe(sink) }

    /// Downstream asks for `n` more items. May pull synchronously.
    pub fn on_request(&mut self, n: usize) { self.flow.on_request(n); }

    /// Downstream went away.
    pub fn on_cancel(&mut self) { self.flow.cancel(); }

    /// Drain-completion condition: upstream closed, nothing staged, **and** the shared
    /// buffer is empty.
    #[must_use]
    pub fn done(&self) -> bool { self.flow.done() }
}

impl<T, K> NotifyListener for HandoffBackend<T, K>
where
    K: Sink<T>,
{
    fn on_event(&mut self) { self.flow.try_emit(); }

    fn on_close(&mut self) {
        self.flow.try_emit();
        self.flow.shutdown();
    }

    fn on_abort(&mut self, reason: AbortReason) {
        tracing::warn!(%reason, "handoff pipeline aborted by producer");
        self.flow.abort(reason);
    }
}
