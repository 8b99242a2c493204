// Copyright 2024 placer developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Structured logging setup, built on `slog`.
//!
//! Both solver engines take a `&slog::Logger` rather than reaching for a thread-local or global
//! logger, so a caller embedding this crate controls where its messages go.

use std::str::FromStr;

use slog::{o, Level};

use crate::core::Error;
use crate::place_error;

/// Parses a `--log-level` value (`critical`, `error`, `warning`, `info`, `debug`, `trace`) into a
/// [`Level`].
pub fn parse_level(name: &str) -> Result<Level, Error> {
    Level::from_str(name).map_err(|_| place_error!(ConfigError, format!("unknown log level {name:?}")))
}

/// Logs to the terminal, blocking on a full async-drain buffer.
#[cfg(feature = "slog-logger")]
pub fn term(level: Level) -> slog::Logger {
    term_internal(level, slog_async::OverflowStrategy::Block)
}

/// Logs to the terminal without blocking; messages are dropped if the buffer overflows.
#[cfg(feature = "slog-logger")]
pub fn term_noblock(level: Level) -> slog::Logger {
    term_internal(level, slog_async::OverflowStrategy::Drop)
}

#[cfg(feature = "slog-logger")]
fn term_internal(level: Level, overflow_strategy: slog_async::OverflowStrategy) -> slog::Logger {
    use slog::Drain as _;

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator)
        .use_original_order()
        .build()
        .filter_level(level)
        .fuse();
    let drain = slog_async::Async::new(drain)
        .overflow_strategy(overflow_strategy)
        .build()
        .fuse();
    slog::Logger::root(drain, o!())
}

/// Logs JSON to a file, blocking on a full async-drain buffer.
#[cfg(feature = "slog-logger")]
pub fn file(path: &str, level: Level) -> Result<slog::Logger, Error> {
    file_internal(path, level, slog_async::OverflowStrategy::Block)
}

/// Logs JSON to a file without blocking; messages are dropped if the buffer overflows.
#[cfg(feature = "slog-logger")]
pub fn file_noblock(path: &str, level: Level) -> Result<slog::Logger, Error> {
    file_internal(path, level, slog_async::OverflowStrategy::Drop)
}

#[cfg(feature = "slog-logger")]
fn file_internal(
    path: &str,
    level: Level,
    overflow_strategy: slog_async::OverflowStrategy,
) -> Result<slog::Logger, Error> {
    use slog::Drain as _;
    use std::fs::OpenOptions;
    use std::sync::Mutex;

    let handle = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| place_error!(ConfigError, format!("cannot open log file {path:?}: {e}")))?;
    let drain = Mutex::new(slog_json::Json::new(handle).build()).map(slog::Fuse);
    let drain = drain.filter_level(level).fuse();
    let drain = slog_async::Async::new(drain)
        .overflow_strategy(overflow_strategy)
        .build()
        .fuse();
    Ok(slog::Logger::root(drain, o!()))
}

/// A logger that discards everything. Used by library callers and tests that don't care about
/// diagnostics.
pub fn discard() -> slog::Logger {
    slog::Logger::root(slog::Discard, o!())
}
