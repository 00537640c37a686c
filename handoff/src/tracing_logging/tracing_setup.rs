// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::TracingConfig;
use miette::IntoDiagnostic;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

pub type DynLayer<S> = dyn Layer<S> + Send + Sync + 'static;

/// Initialize the global tracing subscriber with the provided [`TracingConfig`]. Does
/// nothing for [`WriterConfig::None`].
///
/// # Errors
///
/// If the log file can't be opened, or a global subscriber is already installed.
///
/// [`WriterConfig::None`]: super::WriterConfig::None
pub fn init(tracing_config: TracingConfig) -> miette::Result<()> {
    match try_create_layers(tracing_config)? {
        Some(layers) => tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .into_diagnostic(),
        None => Ok(()),
    }
}

/// Returns the layers. This does not initialize the tracing system. Don't forget to do
/// this manually, by calling `init` on the returned layers.
///
/// For example, once you have the layers, you can run the following:
/// `try_create_layers(..).map(|layers| tracing_subscriber::registry().with(layers).init());`
///
/// Returns [`None`] for [`WriterConfig::None`].
///
/// # Errors
///
/// If the log file can't be opened.
///
/// [`WriterConfig::None`]: super::WriterConfig::None
pub fn try_create_layers(
    tracing_config: TracingConfig,
) -> miette::Result<Option<Vec<Box<DynLayer<tracing_subscriber::Registry>>>>> {
    let writer_config = &tracing_config.writer_config;
    if writer_config.display_preference().is_none() && writer_config.file_path().is_none()
    {
        return Ok(None);
    }

    let level_filter = tracing_config.get_level_filter();

    let layers = {
        let mut return_it: Vec<Box<DynLayer<tracing_subscriber::Registry>>> = vec![];

        // Set the level filter from the tracing configuration. This is needed if you add
        // more layers, like OpenTelemetry, which don't have a level filter.
        return_it.push(Box::new(level_filter));

        if let Some(layer) = writer_config.try_create_display_layer(level_filter)? {
            return_it.push(layer);
        }

        if let Some(layer) = writer_config.try_create_file_layer(level_filter)? {
            return_it.push(layer);
        }

        return_it
    };

    Ok(Some(layers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DisplayPreference, WriterConfig, create_pipeline};
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::path::PathBuf;

    fn temp_log_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "r3bl_handoff_tracing_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_no_layers_for_writer_config_none() {
        let config = TracingConfig {
            writer_config: WriterConfig::None,
            level: tracing::Level::INFO,
        };
        assert!(try_create_layers(config).unwrap().is_none());
    }

    #[test]
    fn test_layer_count_matches_writer_config() {
        let path = temp_log_file("layer_count.log");
        let path = path.to_str().unwrap().to_string();

        let display = TracingConfig::new_display(DisplayPreference::Stdout);
        assert_eq!(try_create_layers(display).unwrap().unwrap().len(), 2);

        let file = TracingConfig::new_file(Some(path.clone()));
        assert_eq!(try_create_layers(file).unwrap().unwrap().len(), 2);

        let both = TracingConfig::new_file_and_display(Some(path), DisplayPreference::Stderr);
        assert_eq!(try_create_layers(both).unwrap().unwrap().len(), 3);
    }

    #[test]
    fn test_bad_file_path_is_an_error() {
        let config = TracingConfig::new_file(Some(String::new()));
        assert!(try_create_layers(config).is_err());
    }

    /// Installs the global subscriber, so it must not overlap with anything else that
    /// does.
    #[test]
    #[serial]
    fn test_init_writes_worker_lifecycle_to_file() {
        let path = temp_log_file("init.log");
        let config = TracingConfig::new_file(Some(path.to_str().unwrap().to_string()));
        init(config.clone()).unwrap();

        // A second global subscriber is refused.
        assert!(init(config).is_err());

        let (producer, publisher) = create_pipeline::<u8>(1).unwrap();
        let generation = publisher.generation();
        tracing::info!(generation, "pipeline created in test");
        drop(publisher);
        drop(producer);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("pipeline created in test"));
        assert!(contents.contains("spawning handoff worker"));
    }
}
