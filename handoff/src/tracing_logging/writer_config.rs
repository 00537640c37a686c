// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{DisplayPreference, DynLayer, WriterConfig, rolling_file_appender_impl};
use tracing_core::LevelFilter;
use tracing_subscriber::{Layer, registry::LookupSpan};

/// Avoid gnarly type annotations by using a macro to create the `fmt` layer.
///
/// Thread names are on, since every pipeline's worker is named
/// `{prefix}-gen-{generation}`.
#[macro_export]
macro_rules! create_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_thread_ids(false)
            .with_thread_names(true)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true)
    };
}

impl WriterConfig {
    #[must_use]
    pub fn display_preference(&self) -> Option<DisplayPreference> {
        match self {
            WriterConfig::Display(it) | WriterConfig::DisplayAndFile(it, _) => Some(*it),
            WriterConfig::None | WriterConfig::File(_) => None,
        }
    }

    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        match self {
            WriterConfig::File(it) | WriterConfig::DisplayAndFile(_, it) => Some(it.as_str()),
            WriterConfig::None | WriterConfig::Display(_) => None,
        }
    }

    /// This erases the concrete type of the writer, and returns a boxed layer. This
    /// is useful for composition of layers. There's more info in the docs
    /// [here](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/index.html#runtime-configuration-with-layers).
    ///
    /// # Errors
    ///
    /// Never fails today. The [`miette::Result`] matches
    /// [`try_create_file_layer()`](Self::try_create_file_layer).
    pub fn try_create_display_layer<S>(
        &self,
        level_filter: LevelFilter,
    ) -> miette::Result<Option<Box<DynLayer<S>>>>
    where
        S: tracing_core::Subscriber,
        for<'a> S: LookupSpan<'a>,
    {
        let fmt_layer = create_fmt!();

        Ok(match self.display_preference() {
            Some(DisplayPreference::Stdout) => Some(Box::new(
                fmt_layer
                    .with_writer(std::io::stdout)
                    .with_filter(level_filter),
            )),
            Some(DisplayPreference::Stderr) => Some(Box::new(
                fmt_layer
                    .with_writer(std::io::stderr)
                    .with_filter(level_filter),
            )),
            None => None,
        })
    }

    /// Same as [`try_create_display_layer()`](Self::try_create_display_layer), but
    /// writes to the configured file without ANSI escapes.
    ///
    /// # Errors
    ///
    /// If the file path has no parent folder or no file name.
    pub fn try_create_file_layer<S>(
        &self,
        level_filter: LevelFilter,
    ) -> miette::Result<Option<Box<DynLayer<S>>>>
    where
        S: tracing_core::Subscriber,
        for<'a> S: LookupSpan<'a>,
    {
        let fmt_layer = create_fmt!().with_ansi(false);

        Ok(match self.file_path() {
            Some(path) => {
                let file = rolling_file_appender_impl::try_create(path)?;
                Some(Box::new(
                    fmt_layer.with_writer(file).with_filter(level_filter),
                ))
            }
            None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(WriterConfig::None, None, None)]
    #[test_case(
        WriterConfig::Display(DisplayPreference::Stdout),
        Some(DisplayPreference::Stdout),
        None
    )]
    #[test_case(WriterConfig::File("a.log".into()), None, Some("a.log"))]
    #[test_case(
        WriterConfig::DisplayAndFile(DisplayPreference::Stderr, "b.log".into()),
        Some(DisplayPreference::Stderr),
        Some("b.log")
    )]
    fn test_writer_config_targets(
        config: WriterConfig,
        display: Option<DisplayPreference>,
        file: Option<&str>,
    ) {
        assert_eq!(config.display_preference(), display);
        assert_eq!(config.file_path(), file);
    }

    #[test]
    fn test_display_layer_only_when_display_is_configured() {
        let display = WriterConfig::Display(DisplayPreference::Stderr)
            .try_create_display_layer::<tracing_subscriber::Registry>(LevelFilter::INFO)
            .unwrap();
        assert!(display.is_some());

        let none = WriterConfig::None
            .try_create_display_layer::<tracing_subscriber::Registry>(LevelFilter::INFO)
            .unwrap();
        assert!(none.is_none());
    }
}
