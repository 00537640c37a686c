// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Control flow signal for loops and threads.
///
/// Used by the [worker loop] to decide, after handling one bridge signal or one
/// downstream control message, whether it should keep going.
///
/// [worker loop]: crate::run_worker_loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    /// Continue to the next iteration.
    #[default]
    Continue,

    /// Stop processing and exit the loop/thread.
    Stop,
}

/// An indication of whether the dedicated worker thread is running or terminated.
///
/// # Why Not Just `bool`?
///
/// `bool` requires remembering what `true` means. With this enum:
/// - [`LivenessState::Running`] is unambiguous
/// - Pattern matching catches all cases
/// - Code reads like documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    /// The worker thread is running and processing signals.
    Running,
    /// The worker thread has exited.
    Terminated,
}
