// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use geoblock::{app, cfg::options::Options};
use tracing::{error, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let (options, env_warnings) = Options::from_env();
    let _logger_guard = geoblock::cfg::logger::init_logger(&options)?;

    for message in env_warnings {
        warn!("{message}");
    }

    if let Err(e) = app::run(options).await {
        error!(error = %e, "fatal error, exiting");
        return Err(e);
    }

    Ok(())
}
