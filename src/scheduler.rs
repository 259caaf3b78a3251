// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Periodic background tasks (C6): `run_every` is the abstract primitive;
//! `auto_update` and `auto_reload` are its two concrete callers.

use std::{path::PathBuf, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    engine::Engine,
    ipinfo::{fetch::Fetcher, resolver::Resolver},
    metrics::Collector,
    reload::{fs_load, fs_stat, ConfigReloader, ReloadOutcome},
};

pub const DEFAULT_AUTO_UPDATE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_AUTO_RELOAD_INTERVAL: Duration = Duration::from_secs(5);

/// Invokes `f` at fixed-period ticks until `token` is cancelled. Invocations
/// never overlap, and the loop stops before the next tick once cancellation
/// is observed — `f` is never called after `run_every` returns.
pub async fn run_every<F, Fut>(token: CancellationToken, interval: Duration, mut f: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so the first real invocation
    // happens after one full interval, matching a plain periodic timer.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {
                if token.is_cancelled() {
                    return;
                }
                f().await;
            }
        }
    }
}

/// Every `interval`, calls `resolver.update`. Errors are logged and do not
/// stop the loop; only cancellation ends it.
pub async fn auto_update<F: Fetcher>(
    token: CancellationToken,
    resolver: Arc<Resolver<F>>,
    interval: Duration,
) {
    run_every(token.clone(), interval, move || {
        let resolver = Arc::clone(&resolver);
        let token = token.clone();
        async move {
            match resolver.update(&token).await {
                Ok(()) => info!("auto_update: ip-range database refreshed"),
                Err(e) => error!(error = %e, "auto_update: refresh failed, keeping previous database"),
            }
        }
    })
    .await;
}

/// Every `interval`, calls `reload_if_changed` against the policy file at
/// `path`. Reports success/failure to the config-reload metric.
pub async fn auto_reload(
    token: CancellationToken,
    engine: Arc<Engine>,
    path: PathBuf,
    metrics: Arc<Collector>,
    interval: Duration,
) {
    let reloader = match ConfigReloader::new(path.clone(), fs_stat, fs_load) {
        Ok(r) => r,
        Err(e) => {
            error!(path = %path.display(), error = %e, "auto_reload: failed to construct reloader, will not watch policy file");
            return;
        },
    };
    let reloader = tokio::sync::Mutex::new(reloader);

    run_every(token, interval, move || {
        let engine = Arc::clone(&engine);
        let metrics = Arc::clone(&metrics);
        async {
            let mut guard = reloader.lock().await;
            match guard.reload_if_changed(&engine) {
                Ok(ReloadOutcome::Unchanged) => {},
                Ok(ReloadOutcome::Reloaded { rules_count }) => {
                    metrics.record_config_reload(true);
                    info!(rules_count, "auto_reload: policy file reloaded");
                },
                Err(e) => {
                    metrics.record_config_reload(false);
                    error!(error = %e, "auto_reload: reload failed, keeping previous policy");
                },
            }
        }
    })
    .await;
}
