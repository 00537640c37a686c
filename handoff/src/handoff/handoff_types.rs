// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Public API types for the handoff pipeline. See [`HandoffError`], [`AbortReason`],
//! [`TryPush`], and [`Push`] for details.

/// Errors from [`create_pipeline()`] and [`Publisher::subscribe()`].
///
/// Buffer-full and pipeline-closed conditions are **not** errors. They are encoded in the
/// return values of [`Producer::try_push()`] and [`Producer::push()`], which hand the
/// rejected item back to the caller.
///
/// | Variant               | Cause                                                     | Recoverable? |
/// | :-------------------- | :-------------------------------------------------------- | :----------- |
/// | [`ZeroCapacity`]      | Buffer capacity of `0` was requested                      | No (misuse)  |
/// | [`ZeroBatchSize`]     | Batch size of `0` was requested                           | No (misuse)  |
/// | [`ThreadSpawn`]       | [`std::thread::Builder::spawn()`] failed (thread limits)  | Maybe        |
/// | [`RuntimeCreation`]   | The worker's [`tokio`] runtime could not be built         | Maybe        |
/// | [`AlreadySubscribed`] | [`Publisher::subscribe()`] called a second time           | No (misuse)  |
/// | [`WorkerGone`]        | The worker thread exited before the subscription arrived  | No           |
///
/// [`AlreadySubscribed`]: Self::AlreadySubscribed
/// [`Producer::push()`]: super::Producer::push
/// [`Producer::try_push()`]: super::Producer::try_push
/// [`Publisher::subscribe()`]: super::Publisher::subscribe
/// [`RuntimeCreation`]: Self::RuntimeCreation
/// [`ThreadSpawn`]: Self::ThreadSpawn
/// [`WorkerGone`]: Self::WorkerGone
/// [`ZeroBatchSize`]: Self::ZeroBatchSize
/// [`ZeroCapacity`]: Self::ZeroCapacity
/// [`create_pipeline()`]: super::create_pipeline
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum HandoffError {
    /// The handoff buffer must be able to hold at least one item.
    #[error("Handoff buffer capacity must be at least 1")]
    #[diagnostic(
        code(r3bl_handoff::zero_capacity),
        help("Pass a capacity >= 1 to `create_pipeline()`")
    )]
    ZeroCapacity,

    /// The worker must be allowed to pull at least one item per batch.
    #[error("Pull batch size must be at least 1")]
    #[diagnostic(
        code(r3bl_handoff::zero_batch_size),
        help("Use `HandoffConfig::with_batch_size()` with a value >= 1")
    )]
    ZeroBatchSize,

    /// [`std::thread::Builder::spawn()`] failed.
    #[error("Failed to spawn handoff worker thread")]
    #[diagnostic(code(r3bl_handoff::thread_spawn))]
    #[cfg_attr(
        target_os = "linux",
        diagnostic(help(
            "The system may have reached its thread limit - \
             check `ulimit -u` for per-user limit, \
             `cat /proc/sys/kernel/threads-max` for system-wide limit"
        ))
    )]
    #[cfg_attr(
        target_os = "macos",
        diagnostic(help(
            "The system may have reached its thread limit - \
             check `ulimit -u` for per-user limit, \
             `sysctl kern.num_taskthreads` for per-process limit"
        ))
    )]
    ThreadSpawn(#[source] std::io::Error),

    /// The single-threaded [`tokio`] runtime that hosts the worker could not be built.
    #[error("Failed to build the handoff worker runtime")]
    #[diagnostic(code(r3bl_handoff::runtime_creation))]
    RuntimeCreation(#[source] std::io::Error),

    /// Each pipeline has exactly one downstream subscriber.
    #[error("This pipeline already has a subscriber")]
    #[diagnostic(
        code(r3bl_handoff::already_subscribed),
        help("Fan out from the single `Subscription` if several consumers need the items")
    )]
    AlreadySubscribed,

    /// The worker thread has already exited, so there is nothing to subscribe to.
    #[error("The handoff worker has already terminated")]
    #[diagnostic(code(r3bl_handoff::worker_gone))]
    WorkerGone,
}

/// The reason a producer gave when it aborted the pipeline via [`Producer::abort()`].
///
/// This is delivered to the downstream subscriber as the failure termination of the
/// stream. Cheap to clone, so that it can be carried through the [notification bridge]
/// and handed to late subscribers.
///
/// [`Producer::abort()`]: super::Producer::abort
/// [notification bridge]: mod@super::notify_bridge
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
#[error("Producer aborted the pipeline: {message}")]
#[diagnostic(code(r3bl_handoff::aborted))]
pub struct AbortReason {
    message: String,
}

impl AbortReason {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Reported to the subscriber when the worker went away without delivering a
    /// terminal event, e.g. because dropping a discarded item panicked.
    #[must_use]
    pub fn worker_exited() -> Self { Self::new("handoff worker exited unexpectedly") }

    #[must_use]
    pub fn message(&self) -> &str { &self.message }
}

/// Whether a successful push moved the buffer from empty to non-empty.
///
/// This is the exact condition under which the consumer side has to be woken up. If the
/// buffer was already non-empty, the worker has either been notified already or is still
/// pulling, so a second wakeup would be redundant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTransition {
    /// The buffer was empty before this push.
    BecameNonEmpty,
    /// The buffer already held at least one item.
    AlreadyNonEmpty,
}

/// Lifecycle of the [`HandoffBuffer`]. Only ever moves forward.
///
/// [`HandoffBuffer`]: super::HandoffBuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Producers may push and the consumer may drain.
    Open,
    /// Producers are done. Remaining items can still be drained.
    ProducerClosed,
    /// The consumer side is gone (completed, aborted, cancelled, or its worker exited).
    /// Items were discarded and every blocked producer has been released.
    ConsumerClosed,
}

/// Outcome of [`HandoffBuffer::try_push()`].
///
/// [`HandoffBuffer::try_push()`]: super::HandoffBuffer::try_push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryPushOutcome<T> {
    Accepted(BufferTransition),
    Full(T),
    Closed(T),
}

/// Outcome of [`HandoffBuffer::push()`]. Never `Full`, since the call blocks instead.
///
/// [`HandoffBuffer::push()`]: super::HandoffBuffer::push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome<T> {
    Accepted(BufferTransition),
    Closed(T),
}

impl<T> PushOutcome<T> {
    #[must_use]
    pub fn is_accepted(&self) -> bool { matches!(self, Self::Accepted(_)) }
}

/// Result of [`Producer::try_push()`].
///
/// Capacity exhaustion is a normal outcome, not an error. The caller decides whether to
/// retry, drop the item, or switch to the blocking [`Producer::push()`].
///
/// [`Producer::push()`]: super::Producer::push
/// [`Producer::try_push()`]: super::Producer::try_push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum TryPush<T> {
    /// The item is in the buffer.
    Accepted,
    /// The buffer is at capacity. The item is handed back.
    Full(T),
    /// The pipeline no longer accepts items. The item is handed back.
    Closed(T),
}

impl<T> TryPush<T> {
    #[must_use]
    pub fn is_accepted(&self) -> bool { matches!(self, Self::Accepted) }

    /// Returns the rejected item, if any.
    #[must_use]
    pub fn into_rejected(self) -> Option<T> {
        match self {
            Self::Accepted => None,
            Self::Full(it) | Self::Closed(it) => Some(it),
        }
    }
}

/// Result of the blocking [`Producer::push()`].
///
/// [`Producer::push()`]: super::Producer::push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Push<T> {
    /// The item is in the buffer.
    Accepted,
    /// The pipeline was closed before a slot became available. The item is handed back.
    Closed(T),
}

impl<T> Push<T> {
    #[must_use]
    pub fn is_accepted(&self) -> bool { matches!(self, Self::Accepted) }
}
