// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The cooperative worker that hosts a [`HandoffBackend`]. See [`run_worker_loop()`].

use super::{DownstreamControl, HandoffBackend, HandoffBuffer, NotifyListener,
            NotifyReceiver, WorkerLiveness};
use crate::{Continuation, Sink};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// [RAII] guard that runs the worker's exit protocol when [`run_worker_loop()`] returns
/// or unwinds:
///
/// 1. Closes the consumer side of the buffer. Leftover items are discarded and every
///    producer blocked in [`Producer::push()`] returns [`Push::Closed`].
/// 2. Marks the [`WorkerLiveness`] terminated, so [`Publisher::subscribe()`] reports
///    [`HandoffError::WorkerGone`].
///
/// [RAII]: https://en.wikipedia.org/wiki/Resource_acquisition_is_initialization
/// [`HandoffError::WorkerGone`]: super::HandoffError::WorkerGone
/// [`Producer::push()`]: super::Producer::push
/// [`Publisher::subscribe()`]: super::Publisher::subscribe
/// [`Push::Closed`]: super::Push::Closed
#[allow(missing_debug_implementations)]
pub struct TerminationGuard<T> {
    liveness: Arc<WorkerLiveness>,
    buffer: Arc<HandoffBuffer<T>>,
}

impl<T> Drop for TerminationGuard<T> {
    fn drop(&mut self) {
        let discarded = self.buffer.close_consumer_side();
        self.liveness.mark_terminated();
        tracing::debug!(
            generation = self.liveness.generation(),
            discarded,
            panicking = std::thread::panicking(),
            "handoff worker exited"
        );
    }
}

/// Processes bridge signals and downstream control messages, one at a time and each to
/// completion, until the backend reaches a terminal state that nobody needs to hear
/// about anymore.
///
/// ```text
///  NotifyReceiver ──BridgeSignal──┐
///                                 ├─► select! ─► HandoffBackend hooks
///  control_rx ──DownstreamControl─┘
/// ```
///
/// # Exit Conditions
///
/// | Condition                                            | Typical cause                      |
/// | :--------------------------------------------------- | :--------------------------------- |
/// | Terminal event delivered to the subscriber           | close + drained, or abort          |
/// | [`DownstreamControl::Cancel`]                        | [`Subscription`] dropped           |
/// | Control channel closed and backend terminal          | all publishers dropped unsubscribed |
/// | Both channels closed                                 | everything dropped                 |
///
/// A closed signal channel (every producer gone without a close) is treated as a close.
/// A closed control channel is treated as a cancel.
///
/// [`Subscription`]: super::Subscription
pub async fn run_worker_loop<T, K>(
    mut backend: HandoffBackend<T, K>,
    mut signals: NotifyReceiver,
    mut control_rx: UnboundedReceiver<DownstreamControl<K>>,
    liveness: Arc<WorkerLiveness>,
) where
    K: Sink<T>,
{
    let _guard = TerminationGuard {
        buffer: Arc::clone(backend.buffer()),
        liveness: Arc::clone(&liveness),
    };
    tracing::debug!(generation = liveness.generation(), "handoff worker started");

    let mut signals_open = true;
    let mut control_open = true;

    loop {
        let continuation = tokio::select! {
            signal = signals.recv(), if signals_open => {
                match signal {
                    Some(signal) => signals.dispatch(&mut backend, signal),
                    None => {
                        signals_open = false;
                        backend.on_close();
                    }
                }
                Continuation::Continue
            }
            control = control_rx.recv(), if control_open => {
                match control {
                    Some(control) => handle_control(&mut backend, control),
                    None => {
                        control_open = false;
                        backend.on_cancel();
                        Continuation::Continue
                    }
                }
            }
            else => Continuation::Stop,
        };

        if continuation == Continuation::Stop
            || backend.is_finished()
            || (!control_open && backend.is_terminal())
        {
            tracing::debug!(state = ?backend.state(), "handoff worker loop done");
            break;
        }
    }
    // _guard dropped here (or during unwinding), closing the buffer's consumer side.
}

fn handle_control<T, K>(
    backend: &mut HandoffBackend<T, K>,
    control: DownstreamControl<K>,
) -> Continuation
where
    K: Sink<T>,
{
    match control {
        DownstreamControl::Subscribe(sink) => {
            if !backend.on_subscribe(sink) {
                tracing::warn!(
                    state = ?backend.state(),
                    "handoff backend refused subscriber: already subscribed or cancelled"
                );
            }
            Continuation::Continue
        }
        DownstreamControl::Request(n) => {
            backend.on_request(n);
            Continuation::Continue
        }
        DownstreamControl::Cancel => {
            backend.on_cancel();
            Continuation::Stop
        }
    }
}
