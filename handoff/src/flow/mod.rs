// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The minimal pull-based reactive base that the handoff backend plugs into.
//!
//! - [`BufferedObservable`] owns the downstream demand bookkeeping (outstanding request
//!   count, staging buffer, batch size, terminal state) and decides **when** to pull.
//! - [`PullSource`] is the override contract for **what** gets pulled.
//! - [`Sink`] is the observer that items and the terminal [`FlowEvent`] are pushed to.
//!
//! This is deliberately not an operator algebra: there is no `map`, `filter`, or
//! `merge` here.

// Attach sources.
pub mod buffered_observable;
pub mod flow_types;

// Re-export.
pub use buffered_observable::*;
pub use flow_types::*;
