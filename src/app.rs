// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Lifecycle orchestration (C7): the startup sequence of spec.md §4.7 and
//! the signal-driven graceful shutdown.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    cfg::{cli::resolve_config_path, options::Options, policy::PolicyFile},
    engine::Engine,
    error::Error,
    http::{build_router, AppState},
    ipinfo::{cache::CachedFetcher, fetch::ReqwestFetcher, resolver::Resolver},
    metrics::Collector,
    scheduler::{self, DEFAULT_AUTO_RELOAD_INTERVAL, DEFAULT_AUTO_UPDATE_INTERVAL},
};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the service to completion: builds every component, serves HTTP
/// until cancelled, and drains in-flight requests before returning.
pub async fn run(options: Options) -> Result<()> {
    let token = CancellationToken::new();
    spawn_signal_watcher(token.clone());

    let metrics = Arc::new(Collector::new());

    let config_path = resolve_config_path(&options.config_file.to_string_lossy())
        .with_context(|| format!("failed to resolve policy file path {}", options.config_file.display()))?;

    let initial_policy = PolicyFile::load_from_file(&config_path).map_err(|e| {
        Error::ConfigMissing(format!("{}: {e}", config_path.display()))
    })?;
    let rules_count = initial_policy.rules.len();
    metrics.record_config_reload(true);
    info!(rules_count, path = %config_path.display(), "loaded initial policy");

    let fetcher = CachedFetcher::new(
        ReqwestFetcher::new().context("failed to build http fetcher")?,
        options.cache_dir.clone(),
        crate::ipinfo::cache::DEFAULT_MAX_CACHE_AGE,
    );
    let resolver = Arc::new(Resolver::with_default_sources(fetcher, Arc::clone(&metrics)));

    resolver
        .update(&token)
        .await
        .context("initial ip-range database update failed")?;

    let engine = Arc::new(Engine::new(initial_policy));

    let state = Arc::new(AppState {
        resolver: Arc::clone(&resolver),
        engine: Arc::clone(&engine),
        metrics: Arc::clone(&metrics),
    });
    let router = build_router(state);

    let update_task = tokio::spawn(scheduler::auto_update(
        token.clone(),
        Arc::clone(&resolver),
        DEFAULT_AUTO_UPDATE_INTERVAL,
    ));
    let reload_task = tokio::spawn(scheduler::auto_reload(
        token.clone(),
        Arc::clone(&engine),
        config_path,
        Arc::clone(&metrics),
        DEFAULT_AUTO_RELOAD_INTERVAL,
    ));

    let addr = format!("0.0.0.0:{}", options.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    let serve_token = token.clone();
    let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
        serve_token.cancelled().await;
    });

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, serve).await {
        Ok(Ok(())) => {},
        Ok(Err(e)) => return Err(e).context("http server error"),
        Err(_) => {
            return Err(Error::ShutdownError(format!(
                "in-flight requests did not drain within {SHUTDOWN_TIMEOUT:?}"
            ))
            .into());
        },
    }

    let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        let _ = update_task.await;
        let _ = reload_task.await;
    })
    .await;

    Ok(())
}

fn spawn_signal_watcher(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                },
                Err(e) => error!(error = %e, "failed to install SIGTERM handler"),
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("received SIGINT, shutting down"),
            _ = terminate => info!("received SIGTERM, shutting down"),
        }

        token.cancel();
    });
}
