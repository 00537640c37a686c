// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use miette::miette;
use std::path::PathBuf;

/// Opens `path_str` for appending, creating it if needed. The file is never rotated.
///
/// Note that if you wrap this up in a non blocking writer, the worker guard has to be
/// kept alive for as long as logging should happen, which [`init()`] can't do for you.
///
/// [`init()`]: super::init
pub fn try_create(
    path_str: &str,
) -> miette::Result<tracing_appender::rolling::RollingFileAppender> {
    let path = PathBuf::from(path_str);

    let parent = path.parent().ok_or_else(|| {
        miette!(
            "Can't access the folder of {}. It might not exist, or you may not have the \
             required permissions.",
            path.display()
        )
    })?;

    let file_name = path.file_name().ok_or_else(|| {
        miette!(
            "Can't access file name {}. It might not exist, or you may not have the \
             required permissions.",
            path.display()
        )
    })?;

    Ok(tracing_appender::rolling::never(parent, file_name))
}
