// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Cross-thread wakeup from producer threads into the worker. See [`notify_bridge()`].
//!
//! The bridge decouples "a producer made the buffer non-empty" from "the worker processes
//! that fact", without busy polling. It has two sides:
//!
//! | Side        | Type               | Runs on                 | API                                        |
//! | :---------- | :----------------- | :---------------------- | :----------------------------------------- |
//! | Caller side | [`NotifyHandle`]   | any producer thread     | [`notify_event()`], [`close()`], [`abort()`] |
//! | Worker side | [`NotifyReceiver`] | the worker thread       | [`recv()`] + [`dispatch()`] to a [`NotifyListener`] |
//!
//! Signals are a closed set ([`BridgeSignal`]) carried over an unbounded [`tokio`]
//! channel into the worker's task loop. The channel never grows without bound:
//!
//! - [`BridgeSignal::Event`] is **coalesced** through a single-slot pending flag, so at
//!   most one is in flight at any time.
//! - [`BridgeSignal::Close`] / [`BridgeSignal::Abort`] are sent at most once per bridge.
//!
//! [`abort()`]: NotifyHandle::abort
//! [`close()`]: NotifyHandle::close
//! [`dispatch()`]: NotifyReceiver::dispatch
//! [`notify_event()`]: NotifyHandle::notify_event
//! [`recv()`]: NotifyReceiver::recv

use super::AbortReason;
use std::sync::{Arc,
                atomic::{AtomicBool, Ordering}};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// A signal from the producer side to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeSignal {
    /// New items are available in the buffer.
    Event,
    /// Producers will push no more. Drain what is left, then complete.
    Close,
    /// Producers hit an unrecoverable failure. Discard what is left and fail.
    Abort(AbortReason),
}

/// The worker-side hooks that a [`BridgeSignal`] is routed to by
/// [`NotifyReceiver::dispatch()`]. Each hook runs on the worker thread, exactly once per
/// delivered signal, and must not block.
pub trait NotifyListener {
    /// Producer activity: pull whatever current downstream demand allows.
    fn on_event(&mut self);

    /// Producers are done: flush, then shut down once fully drained.
    fn on_close(&mut self);

    /// Producers failed: terminate immediately with `reason`.
    fn on_abort(&mut self, reason: AbortReason);
}

#[derive(Debug, Default)]
struct BridgeFlags {
    /// Single-slot coalescing flag: `true` while an [`BridgeSignal::Event`] is queued but
    /// not yet dispatched.
    event_pending: AtomicBool,
    /// `true` once [`BridgeSignal::Close`] or [`BridgeSignal::Abort`] has been sent.
    finished: AtomicBool,
}

/// Creates a connected caller-side [`NotifyHandle`] and worker-side [`NotifyReceiver`].
#[must_use]
pub fn notify_bridge() -> (NotifyHandle, NotifyReceiver) {
    let (tx, rx) = unbounded_channel();
    let flags = Arc::new(BridgeFlags::default());
    (
        NotifyHandle {
            tx,
            flags: Arc::clone(&flags),
        },
        NotifyReceiver { rx, flags },
    )
}

/// Caller side of the bridge. Thread-safe and cheap to clone; none of its methods block.
#[derive(Debug, Clone)]
pub struct NotifyHandle {
    tx: UnboundedSender<BridgeSignal>,
    flags: Arc<BridgeFlags>,
}

impl NotifyHandle {
    /// Schedules one [`NotifyListener::on_event()`] on the worker. Calls made before the
    /// worker gets to it collapse into a single invocation.
    pub fn notify_event(&self) {
        if !self.flags.event_pending.swap(true, Ordering::SeqCst) {
            // A closed channel means the worker has exited; there's nothing to wake.
            drop(self.tx.send(BridgeSignal::Event));
        }
    }

    /// Sends [`BridgeSignal::Close`]. Returns `false` if the bridge was already closed or
    /// aborted, in which case nothing is sent.
    pub fn close(&self) -> bool { self.finish(BridgeSignal::Close) }

    /// Sends [`BridgeSignal::Abort`]. Returns `false` if the bridge was already closed or
    /// aborted, in which case nothing is sent.
    pub fn abort(&self, reason: AbortReason) -> bool {
        self.finish(BridgeSignal::Abort(reason))
    }

    #[must_use]
    pub fn is_finished(&self) -> bool { self.flags.finished.load(Ordering::SeqCst) }

    fn finish(&self, signal: BridgeSignal) -> bool {
        if self.flags.finished.swap(true, Ordering::SeqCst) {
            return false;
        }
        drop(self.tx.send(signal));
        true
    }
}

/// Worker side of the bridge. Owned by the worker loop.
#[derive(Debug)]
pub struct NotifyReceiver {
    rx: UnboundedReceiver<BridgeSignal>,
    flags: Arc<BridgeFlags>,
}

impl NotifyReceiver {
    /// Waits for the next signal. Returns [`None`] once every [`NotifyHandle`] is gone.
    pub async fn recv(&mut self) -> Option<BridgeSignal> { self.rx.recv().await }

    /// Returns the next signal if one is already queued.
    pub fn try_recv(&mut self) -> Option<BridgeSignal> { self.rx.try_recv().ok() }

    /// Routes `signal` to the matching hook on `listener`.
    ///
    /// The pending flag is cleared **before** [`NotifyListener::on_event()`] runs. A push
    /// that lands after the clear sends a fresh event; a push that landed before it is
    /// already visible to the pull that `on_event()` performs. Either way no wakeup is
    /// lost.
    pub fn dispatch(&self, listener: &mut impl NotifyListener, signal: BridgeSignal) {
        match signal {
            BridgeSignal::Event => {
                self.flags.event_pending.store(false, Ordering::SeqCst);
                listener.on_event();
            }
            BridgeSignal::Close => listener.on_close(),
            BridgeSignal::Abort(reason) => listener.on_abort(reason),
        }
    }
}
