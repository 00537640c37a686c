// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Tracing setup for programs that use handoff pipelines.
//!
//! The library itself only emits [`tracing`] events: worker lifecycle at `DEBUG`,
//! per-pull detail at `TRACE`, producer aborts at `WARN`. Nothing is printed unless a
//! subscriber is installed, e.g. with [`init()`]:
//!
//! ```no_run
//! use r3bl_handoff::{DisplayPreference, TracingConfig, init};
//!
//! # fn main() -> miette::Result<()> {
//! init(TracingConfig::new_file_and_display(None, DisplayPreference::Stderr))?;
//! # Ok(())
//! # }
//! ```

// Attach sources.
pub mod rolling_file_appender_impl;
pub mod tracing_config;
pub mod tracing_setup;
pub mod writer_config;

// Re-export.
pub use tracing_config::*;
pub use tracing_setup::*;
