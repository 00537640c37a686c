// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::AbortReason;

/// What a downstream subscriber receives: any number of items followed by at most one
/// terminal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent<T> {
    Next(T),
    Complete,
    Error(AbortReason),
}

/// The observer side of a [`BufferedObservable`]. Called on the worker thread only.
///
/// [`BufferedObservable`]: super::BufferedObservable
pub trait Sink<T> {
    fn on_next(&mut self, item: T);
    fn on_complete(&mut self);
    fn on_error(&mut self, reason: AbortReason);
}

/// Lifecycle of a [`BufferedObservable`].
///
/// ```text
/// Running ──shutdown()──► ShuttingDown ──drained──► Completed
///    │                          │
///    ├──────abort()─────────────┴──────────────────► Aborted
///    └──────cancel()────────────┴──────────────────► Cancelled
/// ```
///
/// The last three are terminal and absorbing.
///
/// [`BufferedObservable`]: super::BufferedObservable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Running,
    ShuttingDown,
    Completed,
    Aborted,
    Cancelled,
}

impl FlowState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Cancelled)
    }
}
