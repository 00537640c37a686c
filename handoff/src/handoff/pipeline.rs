// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Wiring of one buffer, one worker, one bridge, and the two handles. See
//! [`create_pipeline()`].

use super::{HandoffBackend, HandoffBuffer, HandoffConfig, HandoffError, Producer,
            Publisher, WorkerLiveness, notify_bridge, run_worker_loop};
use std::{num::NonZeroUsize,
          sync::{Arc,
                 mpsc::{SendError, sync_channel}}};
use tokio::{runtime::Runtime, sync::mpsc::unbounded_channel};

/// Creates a pipeline with a buffer of `capacity` items and otherwise
/// [default](HandoffConfig::default) settings.
///
/// # Errors
///
/// See [`create_pipeline_with_config()`].
pub fn create_pipeline<T>(
    capacity: usize,
) -> Result<(Producer<T>, Publisher<T>), HandoffError>
where
    T: Send + 'static,
{
    create_pipeline_with_config(HandoffConfig::default().with_capacity(capacity))
}

/// Creates a pipeline and starts its worker thread.
///
/// ```text
/// 1. validate config          ─► ZeroCapacity / ZeroBatchSize
/// 2. allocate HandoffBuffer   (Arc, shared by producer side and backend)
/// 3. bind the notify bridge   (NotifyHandle → Producer, NotifyReceiver → worker)
/// 4. build the worker runtime ─► RuntimeCreation
/// 5. spawn "{prefix}-gen-{n}" ─► ThreadSpawn
/// 6. hand the runtime to the worker thread
/// 7. return (Producer, Publisher)
/// ```
///
/// The runtime is built on the calling thread, so that failure to build it is reported
/// here rather than lost on the worker thread. It only moves to the worker thread once
/// the spawn has succeeded. If the spawn fails, the runtime is shut down in the
/// background, which is safe even when the caller is itself running inside a [`tokio`]
/// runtime. The worker thread is detached; it exits on its own once the pipeline
/// terminates (see [`run_worker_loop()`]).
///
/// # Errors
///
/// - [`HandoffError::ZeroCapacity`] if `config.capacity` is `0`.
/// - [`HandoffError::ZeroBatchSize`] if `config.batch_size` is `0`.
/// - [`HandoffError::RuntimeCreation`] if the worker's [`tokio`] runtime can't be built.
/// - [`HandoffError::ThreadSpawn`] if the OS refuses to spawn the worker thread.
pub fn create_pipeline_with_config<T>(
    config: HandoffConfig,
) -> Result<(Producer<T>, Publisher<T>), HandoffError>
where
    T: Send + 'static,
{
    let batch_size =
        NonZeroUsize::new(config.batch_size).ok_or(HandoffError::ZeroBatchSize)?;
    let buffer = Arc::new(HandoffBuffer::new(config.capacity)?);

    let (notify, signals) = notify_bridge();
    let (control_tx, control_rx) = unbounded_channel();
    let liveness = Arc::new(WorkerLiveness::new());
    let backend = HandoffBackend::new(Arc::clone(&buffer), batch_size);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(HandoffError::RuntimeCreation)?;

    let thread_name = format!(
        "{}-gen-{}",
        config.thread_name_prefix,
        liveness.generation()
    );
    tracing::debug!(
        %thread_name,
        capacity = config.capacity,
        batch_size = config.batch_size,
        "spawning handoff worker"
    );

    let mut builder = std::thread::Builder::new().name(thread_name);
    if let Some(bytes) = config.stack_size {
        builder = builder.stack_size(bytes);
    }

    let (runtime_tx, runtime_rx) = sync_channel::<Runtime>(1);
    let worker_liveness = Arc::clone(&liveness);
    let spawn_result = builder.spawn(move || {
        // Sender dropped: the spawning side bailed out.
        let Ok(runtime) = runtime_rx.recv() else {
            worker_liveness.mark_terminated();
            return;
        };
        runtime.block_on(run_worker_loop(
            backend,
            signals,
            control_rx,
            worker_liveness,
        ));
    });

    if let Err(err) = spawn_result {
        tracing::warn!(error = %err, "failed to spawn handoff worker");
        runtime.shutdown_background();
        return Err(HandoffError::ThreadSpawn(err));
    }
    if let Err(SendError(runtime)) = runtime_tx.send(runtime) {
        runtime.shutdown_background();
        return Err(HandoffError::WorkerGone);
    }

    Ok((
        Producer::new(buffer, notify),
        Publisher::new(control_tx, liveness, batch_size),
    ))
}
