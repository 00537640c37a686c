// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Pipeline construction parameters: [`HandoffConfig`].

/// Parameters for [`create_pipeline_with_config()`].
///
/// Validated when the pipeline is created, not here, so that a config can be built up
/// freely with the `with_*` methods.
///
/// | Field                  | Meaning                                             | Must be |
/// | :--------------------- | :-------------------------------------------------- | :------ |
/// | [`capacity`]           | Max items held between producers and the worker     | `>= 1`  |
/// | [`batch_size`]         | Max items moved out of the buffer per pull          | `>= 1`  |
/// | [`thread_name_prefix`] | Worker thread is named `{prefix}-gen-{generation}`  | any     |
/// | [`stack_size`]         | Worker thread stack size in bytes, `None` = OS default | any  |
///
/// [`batch_size`]: Self::batch_size
/// [`capacity`]: Self::capacity
/// [`create_pipeline_with_config()`]: super::create_pipeline_with_config
/// [`stack_size`]: Self::stack_size
/// [`thread_name_prefix`]: Self::thread_name_prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffConfig {
    pub capacity: usize,
    /// Also the demand a [`Subscription`] used as a [`Stream`] requests at a time.
    ///
    /// [`Stream`]: futures_core::Stream
    /// [`Subscription`]: super::Subscription
    pub batch_size: usize,
    pub thread_name_prefix: &'static str,
    pub stack_size: Option<usize>,
}

/// ```text
/// capacity:           128
/// batch_size:         32   (a full buffer drains in 4 pulls)
/// thread_name_prefix: "handoff-worker"
/// stack_size:         None (std default, see std::thread::Builder::stack_size)
/// ```
impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            capacity: 128,
            batch_size: 32,
            thread_name_prefix: "handoff-worker",
            stack_size: None,
        }
    }
}

impl HandoffConfig {
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: &'static str) -> Self {
        self.thread_name_prefix = prefix;
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}
