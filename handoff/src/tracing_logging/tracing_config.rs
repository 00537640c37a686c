// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use tracing_core::LevelFilter;

/// Default file used by the `new_file*` constructors when no path is given.
pub const DEFAULT_LOG_FILE: &str = "handoff_log_file_debug.log";

/// Configure tracing output for a program that uses handoff pipelines. Logs can go to:
/// 1. a file,
/// 2. stdout or stderr,
/// 3. both.
///
/// Pass it to [`init()`] to install a global subscriber, or to [`try_create_layers()`]
/// to compose the layers with your own.
///
/// Fields:
/// - `writer_config`: [`WriterConfig`] to choose where to write the logs.
/// - `level`: [`tracing::Level`] to filter at.
///
/// [`init()`]: super::init
/// [`try_create_layers()`]: super::try_create_layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub writer_config: WriterConfig,
    pub level: tracing::Level,
}

/// Where log lines go. A file path is used as-is; it is never rotated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterConfig {
    None,
    Display(DisplayPreference),
    File(String /* log file path */),
    DisplayAndFile(DisplayPreference, String /* log file path */),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPreference {
    Stdout,
    Stderr,
}

impl TracingConfig {
    /// Log to both `preferred_display` and a file, at `DEBUG`.
    #[must_use]
    pub fn new_file_and_display(
        filename: Option<String>,
        preferred_display: DisplayPreference,
    ) -> Self {
        Self {
            writer_config: WriterConfig::DisplayAndFile(
                preferred_display,
                filename.unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
            ),
            level: tracing::Level::DEBUG,
        }
    }

    #[must_use]
    pub fn new_display(preferred_display: DisplayPreference) -> Self {
        Self {
            writer_config: WriterConfig::Display(preferred_display),
            level: tracing::Level::DEBUG,
        }
    }

    #[must_use]
    pub fn new_file(filename: Option<String>) -> Self {
        Self {
            writer_config: WriterConfig::File(
                filename.unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
            ),
            level: tracing::Level::DEBUG,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn get_level_filter(&self) -> LevelFilter { LevelFilter::from_level(self.level) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_file_constructor_falls_back_to_default_path() {
        let config = TracingConfig::new_file(None);
        assert_eq!(
            config.writer_config,
            WriterConfig::File(DEFAULT_LOG_FILE.to_string())
        );
        assert_eq!(config.get_level_filter(), LevelFilter::DEBUG);
    }

    #[test]
    fn test_with_level_overrides_filter() {
        let config = TracingConfig::new_display(DisplayPreference::Stderr)
            .with_level(tracing::Level::WARN);
        assert_eq!(config.get_level_filter(), LevelFilter::WARN);
    }
}
