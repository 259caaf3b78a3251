// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The HTTP adapter (thin, per spec.md §6.1): wires the resolver, engine and
//! metrics collector into three routes behind a tracing middleware.

pub mod forward_auth;
pub mod health;
pub mod metrics;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    engine::Engine,
    ipinfo::{fetch::Fetcher, resolver::Resolver},
    metrics::Collector,
};

/// Shared state reachable from every handler.
pub struct AppState<F> {
    pub resolver: Arc<Resolver<F>>,
    pub engine: Arc<Engine>,
    pub metrics: Arc<Collector>,
}

pub fn build_router<F: Fetcher + 'static>(state: Arc<AppState<F>>) -> Router {
    Router::new()
        .route("/v1/forward-auth", get(forward_auth::handler::<F>))
        .route("/v1/health", get(health::handler))
        .route("/v1/metrics", get(metrics::handler::<F>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
