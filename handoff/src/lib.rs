// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words backpressure condvar

//! # r3bl_handoff
//!
//! Feed items from ordinary, possibly blocking threads into an async, pull-based,
//! backpressure-driven pipeline that runs on its own single-threaded [`tokio`] worker.
//!
//! ```text
//!  std::thread ──push()──► [ bounded buffer ] ──pull(demand)──► Subscription (Stream)
//!  std::thread ──try_push()─┘      ▲                                   │
//!                                  └──── request(n) / drop = cancel ───┘
//! ```
//!
//! - **Producers** get a cheap, cloneable [`Producer`] with a blocking [`push()`] and a
//!   non-blocking [`try_push()`]. A full buffer is a normal return value, never an error.
//! - **The consumer** gets a [`Subscription`] that only receives what it asked for,
//!   either with explicit [`request()`] calls or by using it as a [`Stream`].
//! - **Termination** is explicit: [`close()`] drains and completes, [`abort()`]
//!   discards and fails, dropping the [`Subscription`] cancels. Producers blocked in
//!   [`push()`] are always released.
//!
//! See the [`handoff`] module for the full design, and [`create_pipeline()`] to get
//! started.
//!
//! # Modules
//!
//! | Module              | Contents                                                       |
//! | :------------------ | :------------------------------------------------------------- |
//! | [`handoff`]         | The buffer, bridge, backend, worker, and the public handles    |
//! | [`flow`]            | Minimal demand-driven reactive base ([`BufferedObservable`])   |
//! | [`common`]          | Small shared enums ([`Continuation`], [`LivenessState`])       |
//! | [`tracing_logging`] | Optional [`tracing`] subscriber setup ([`init()`])             |
//!
//! [`Stream`]: futures_core::Stream
//! [`abort()`]: Producer::abort
//! [`close()`]: Producer::close
//! [`push()`]: Producer::push
//! [`request()`]: Subscription::request
//! [`try_push()`]: Producer::try_push

// https://github.com/rust-lang/rust-clippy
// https://rust-lang.github.io/rust-clippy/master/index.html
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach sources.
pub mod common;
pub mod flow;
pub mod handoff;
pub mod tracing_logging;

// Re-export.
#[allow(ambiguous_glob_reexports)]
pub use common::*;
#[allow(ambiguous_glob_reexports)]
pub use flow::*;
#[allow(ambiguous_glob_reexports)]
pub use handoff::*;
#[allow(ambiguous_glob_reexports)]
pub use tracing_logging::*;
