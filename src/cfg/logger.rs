// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Logger initialization. A non-blocking stdout writer plus an `EnvFilter`
//! seeded from `Options::log_level`, with the event format (JSON vs. compact
//! text) picked by `Options::log_format`.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

use crate::cfg::options::{LogFormat, Options};

/// Installs the global subscriber. The returned [`WorkerGuard`] must be kept
/// alive for the process lifetime — dropping it stops the background
/// writer thread and silently truncates buffered log lines.
pub fn init_logger(options: &Options) -> Result<WorkerGuard> {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let env_filter = EnvFilter::try_new(options.log_level.to_string())
        .context("log level string from Options must always parse")?;

    let registry = Registry::default().with(env_filter);

    match options.log_format {
        LogFormat::Json => {
            let subscriber = registry.with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            );
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to install global json subscriber")?;
        },
        LogFormat::Text => {
            let subscriber = registry.with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .compact(),
            );
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to install global text subscriber")?;
        },
    }

    Ok(guard)
}
