// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words condvar backpressure coalesced

//! A bounded handoff from blocking producer threads into a pull-based async pipeline.
//!
//! # What Problem Does This Solve?
//!
//! Some code can only produce items by blocking: a thread reading from a device, a
//! callback from a C library, a synchronous parser walking a file. Some code can only
//! consume items cooperatively: an [async task] on a single-threaded [`tokio`] runtime
//! that must never block, and that wants items **only when it is ready for them**.
//!
//! Connecting the two naively goes wrong in one of four ways:
//!
//! | Failure            | How it happens                                                     |
//! | :----------------- | :----------------------------------------------------------------- |
//! | Unbounded memory   | producers outrun the consumer and an unbounded queue grows         |
//! | Lost wakeup        | the consumer goes idle just as an item arrives, and never wakes    |
//! | Busy-waiting       | the consumer polls the queue in a loop to avoid lost wakeups       |
//! | Demand violation   | the consumer is handed more items than it asked for                |
//!
//! This module gives all four guarantees at once.
//!
//! # Architecture
//!
//! ```text
//!   producer threads (may block)              dedicated worker thread (never blocks)
//!  ┌─────────────────────────┐              ┌──────────────────────────────────────┐
//!  │ Producer::push()        │  Arc<...>    │ run_worker_loop()  (tokio, 1 thread) │
//!  │ Producer::try_push()    │─────────────►│   HandoffBackend                     │
//!  │ Producer::close/abort() │ HandoffBuffer│     └─ BufferedObservable<Source>    │
//!  └───────────┬─────────────┘ (Mutex +     │            │ pull(min(demand,batch)) │
//!              │               Condvar)     │            ▼                         │
//!              │                            │     ChannelSink ──► Subscription     │
//!              │ empty → non-empty          └──────────────▲────────────┬──────────┘
//!              ▼                                           │            │
//!        NotifyHandle ──── BridgeSignal ──► NotifyReceiver ┘   request(n) / Cancel
//!                     (Event coalesced,                       from the subscriber
//!                      Close / Abort once)
//! ```
//!
//! The [`HandoffBuffer`] is the only state shared between the two sides. Everything
//! else crosses the boundary as a message.
//!
//! # How Each Guarantee Is Met
//!
//! - **Bounded memory**: the buffer holds at most `capacity` items. A full buffer makes
//!   [`Producer::try_push()`] return [`TryPush::Full`] and makes [`Producer::push()`]
//!   wait on a [`Condvar`] until the worker frees a slot.
//! - **No lost wakeups**: a producer wakes the worker exactly when its push moves the
//!   buffer from empty to non-empty ([`BufferTransition::BecameNonEmpty`]). If the
//!   buffer was already non-empty, a wakeup is already pending or the worker is still
//!   pulling.
//! - **No busy-waiting**: the worker sleeps in [`tokio::select!`] until a
//!   [`BridgeSignal`] or a subscriber message arrives. Producers sleep on the
//!   [`Condvar`].
//! - **Demand respected**: the worker pulls `min(outstanding demand, batch size)` items
//!   and never more. With no demand, items stay in the buffer and producers feel
//!   backpressure.
//!
//! # Lifecycle
//!
//! | Trigger                                | Items in buffer     | Subscriber sees     | Blocked producers get |
//! | :------------------------------------- | :------------------ | :------------------ | :-------------------- |
//! | [`Producer::close()`] / last drop      | delivered first     | end of stream       | [`Push::Closed`]      |
//! | [`Producer::abort()`]                  | discarded           | `Err(AbortReason)`  | [`Push::Closed`]      |
//! | [`Subscription`] dropped               | discarded           | -                   | [`Push::Closed`]      |
//! | every [`Publisher`] dropped unsubscribed | discarded         | -                   | [`Push::Closed`]      |
//! | worker thread panics                   | discarded           | `Err(AbortReason)`  | [`Push::Closed`]      |
//!
//! In every case the consumer side of the buffer is closed when the worker's backend
//! terminates, so no producer stays blocked on a pipeline nobody reads.
//!
//! # Example
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use r3bl_handoff::{Push, create_pipeline};
//!
//! # async fn example() -> miette::Result<()> {
//! let (producer, publisher) = create_pipeline::<u64>(64)?;
//! let mut subscription = publisher.subscribe()?;
//!
//! let join_handle = std::thread::spawn(move || {
//!     for it in 0..1_000 {
//!         if let Push::Closed(_) = producer.push(it) {
//!             break;
//!         }
//!     }
//! });
//!
//! let mut sum = 0;
//! while let Some(item) = subscription.next().await {
//!     sum += item?;
//! }
//! assert_eq!(sum, (0..1_000).sum());
//! # drop(join_handle);
//! # Ok(())
//! # }
//! ```
//!
//! [`Condvar`]: std::sync::Condvar
//! [async task]: tokio::task

// Attach sources.
pub mod handoff_backend;
pub mod handoff_buffer;
pub mod handoff_config;
pub mod handoff_types;
pub mod notify_bridge;
pub mod pipeline;
pub mod producer;
pub mod publisher;
pub mod worker;
pub mod worker_liveness;

// Re-export.
pub use handoff_backend::*;
pub use handoff_buffer::*;
pub use handoff_config::*;
pub use handoff_types::*;
pub use notify_bridge::*;
pub use pipeline::*;
pub use producer::*;
pub use publisher::*;
pub use worker::*;
pub use worker_liveness::*;
