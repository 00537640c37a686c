// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Pull-based reactive base that tracks downstream demand and stages outgoing batches.
//! See [`BufferedObservable`] and [`PullSource`].

use super::{FlowState, Sink};
use crate::AbortReason;
use std::{collections::VecDeque, num::NonZeroUsize};

/// A source of items that is only ever asked for as many items as downstream has
/// requested.
///
/// This is the override contract between [`BufferedObservable`] (which owns the demand
/// bookkeeping) and a concrete source (which knows where items come from).
pub trait PullSource {
    type Item;

    /// Moves up to `n` items into `staging`, in order. Never called with `n == 0`.
    fn pull(&mut self, n: usize, staging: &mut VecDeque<Self::Item>);

    /// Whether the source is finished, given whether the base considers itself finished
    /// (upstream closed and nothing left staged). Override to add conditions of your own.
    fn done(&self, base_done: bool) -> bool { base_done }

    /// Called once when the observable enters a terminal state.
    fn on_terminated(&mut self) {}
}

/// Demand-driven emitter: accumulates items pulled from a [`PullSource`] and forwards
/// them to a single [`Sink`] no faster than the sink has requested.
///
/// # Demand Invariant
///
/// Staged items are always handed to the sink before the source is asked for more, so
/// whenever [`PullSource::pull()`] runs the staging buffer is empty and `n` is
/// `min(outstanding demand, batch size)`. The source can therefore never be asked for
/// more than downstream is willing to take.
///
/// # Terminal Delivery
///
/// Completion or failure may happen before a sink is attached (e.g. producers closed an
/// empty pipeline). The terminal event is then held and delivered as soon as
/// [`on_subscribe()`] is called. [`is_finished()`] only becomes `true` once there is
/// nobody left to tell.
///
/// [`is_finished()`]: Self::is_finished
/// [`on_subscribe()`]: Self::on_subscribe
#[allow(missing_debug_implementations)]
pub struct BufferedObservable<S, K>
where
    S: PullSource,
    K: Sink<S::Item>,
{
    source: S,
    sink: Option<K>,
    staging: VecDeque<S::Item>,
    demand: usize,
    batch_size: NonZeroUsize,
    state: FlowState,
    abort_reason: Option<AbortReason>,
    terminal_delivered: bool,
}

impl<S, K> BufferedObservable<S, K>
where
    S: PullSource,
    K: Sink<S::Item>,
{
    #[must_use]
    pub fn new(source: S, batch_size: NonZeroUsize) -> Self {
        Self {
            source,
            sink: None,
            staging: VecDeque::new(),
            demand: 0,
            batch_size,
            state: FlowState::Running,
            abort_reason: None,
            terminal_delivered: false,
        }
    }

    #[must_use]
    pub fn source(&self) -> &S { &self.source }

    pub fn source_mut(&mut self) -> &mut S { &mut self.source }

    #[must_use]
    pub fn state(&self) -> FlowState { self.state }

    /// Items requested by the sink but not yet delivered.
    #[must_use]
    pub fn demand(&self) -> usize { self.demand }

    #[must_use]
    pub fn is_terminal(&self) -> bool { self.state.is_terminal() }

    /// Terminal, and the terminal event has reached the sink (or there is no sink to
    /// reach anymore).
    #[must_use]
    pub fn is_finished(&self) -> bool { self.is_terminal() && self.terminal_delivered }

    /// Attaches the one and only sink. Returns `false` (dropping `sink`) if a sink is
    /// already attached or the observable was cancelled.
    pub fn on_subscribe(&mut self, sink: K) -> bool {
        if self.sink.is_some() || self.state == FlowState::Cancelled {
            return false;
        }
        self.sink = Some(sink);
        if self.is_terminal() {
            self.deliver_terminal();
        }
        true
    }

    /// Adds `n` to the outstanding demand and emits as much as possible right away.
    pub fn on_request(&mut self, n: usize) {
        if n == 0 || self.sink.is_none() || self.is_terminal() {
            return;
        }
        self.demand = self.demand.saturating_add(n);
        self.try_emit();
    }

    /// Delivers staged items, pulling more from the source while demand remains and the
    /// source keeps producing. Completes if shutting down and [`done()`] holds afterwards.
    ///
    /// [`done()`]: Self::done
    pub fn try_emit(&mut self) {
        if self.is_terminal() {
            return;
        }

        if let Some(sink) = self.sink.as_mut() {
            loop {
                while self.demand > 0 {
                    let Some(item) = self.staging.pop_front() else { break };
                    self.demand -= 1;
                    sink.on_next(item);
                }
                if self.demand == 0 {
                    break;
                }

                let n = self.demand.min(self.batch_size.get());
                let staged_before = self.staging.len();
                self.source.pull(n, &mut self.staging);
                if self.staging.len() == staged_before {
                    break;
                }
            }
        }

        if self.state == FlowState::ShuttingDown && self.done() {
            self.complete();
        }
    }

    /// Upstream will produce no more. Completion is deferred until [`done()`] holds.
    ///
    /// [`done()`]: Self::done
    pub fn shutdown(&mut self) {
        if self.state != FlowState::Running {
            return;
        }
        tracing::debug!(staged = self.staging.len(), "observable shutting down");
        self.state = FlowState::ShuttingDown;
        if self.done() {
            self.complete();
        }
    }

    /// Terminates immediately with `reason`. Staged items are dropped.
    pub fn abort(&mut self, reason: AbortReason) {
        if self.is_terminal() {
            return;
        }
        self.state = FlowState::Aborted;
        self.abort_reason = Some(reason);
        // Report first: dropping discarded items runs user code that may panic.
        self.deliver_terminal();
        self.staging.clear();
        self.source.on_terminated();
    }

    /// The sink went away. Terminates without notifying anyone.
    pub fn cancel(&mut self) {
        if self.is_terminal() {
            return;
        }
        tracing::debug!(demand = self.demand, "observable cancelled by downstream");
        self.state = FlowState::Cancelled;
        self.sink = None;
        self.staging.clear();
        self.terminal_delivered = true;
        self.source.on_terminated();
    }

    /// Whether the observable has nothing left to emit: upstream has closed, nothing is
    /// staged, and the [`PullSource`] agrees.
    #[must_use]
    pub fn done(&self) -> bool {
        let base_done = match self.state {
            FlowState::Running => false,
            FlowState::ShuttingDown => self.staging.is_empty(),
            FlowState::Completed | FlowState::Aborted | FlowState::Cancelled => true,
        };
        self.source.done(base_done)
    }

    fn complete(&mut self) {
        tracing::debug!("observable completed");
        self.state = FlowState::Completed;
        self.source.on_terminated();
        self.deliver_terminal();
    }

    fn deliver_terminal(&mut self) {
        if self.terminal_delivered {
            return;
        }
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        match self.state {
            FlowState::Completed => sink.on_complete(),
            FlowState::Aborted => {
                if let Some(reason) = self.abort_reason.take() {
                    sink.on_error(reason);
                }
            }
            FlowState::Cancelled => {}
            FlowState::Running | FlowState::ShuttingDown => return,
        }
        self.terminal_delivered = true;
    }
}
