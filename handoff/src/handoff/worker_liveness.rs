// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Worker thread liveness tracking. See [`WorkerLiveness`].

use crate::LivenessState;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

static NEXT_GENERATION: AtomicU8 = AtomicU8::new(1);

/// Hands out the tag of the next worker. Wraps from `255` to `0`.
fn next_generation() -> u8 { NEXT_GENERATION.fetch_add(1, Ordering::Relaxed) }

/// One-way "has this pipeline's worker exited" flag, plus the worker's generation tag.
///
/// Every pipeline owns exactly one worker, and a worker is never restarted. So once the
/// flag flips, the pipeline is over for good: [`Publisher::subscribe()`] turns it into
/// [`HandoffError::WorkerGone`] instead of handing out a subscription nobody will feed.
///
/// The generation tells concurrent pipelines apart. It is part of the worker thread's
/// name (`{prefix}-gen-{generation}`) and of the worker's start and exit log events, so a
/// panic message or a log line can be traced back to the pipeline that produced it.
///
/// | Written by                               | Read by                    |
/// | :--------------------------------------- | :------------------------- |
/// | [`TerminationGuard`] (worker exit)       | [`Publisher::liveness()`]  |
/// | worker thread that never got its runtime | [`Publisher::subscribe()`] |
///
/// [`HandoffError::WorkerGone`]: super::HandoffError::WorkerGone
/// [`Publisher::liveness()`]: super::Publisher::liveness
/// [`Publisher::subscribe()`]: super::Publisher::subscribe
/// [`TerminationGuard`]: super::TerminationGuard
#[derive(Debug)]
pub struct WorkerLiveness {
    terminated: AtomicBool,
    generation: u8,
}

impl WorkerLiveness {
    #[must_use]
    pub fn new() -> Self {
        Self {
            terminated: AtomicBool::new(false),
            generation: next_generation(),
        }
    }

    #[must_use]
    pub fn generation(&self) -> u8 { self.generation }

    /// Returns `true` only for the call that actually flipped the flag.
    pub fn mark_terminated(&self) -> bool { !self.terminated.swap(true, Ordering::AcqRel) }

    #[must_use]
    pub fn state(&self) -> LivenessState {
        if self.terminated.load(Ordering::Acquire) {
            LivenessState::Terminated
        } else {
            LivenessState::Running
        }
    }
}

impl Default for WorkerLiveness {
    fn default() -> Self { Self::new() }
}
