// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `GET /v1/metrics` (§6.1): renders the Prometheus registry as text
//! exposition format.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use crate::{http::AppState, ipinfo::fetch::Fetcher};

pub async fn handler<F: Fetcher + 'static>(
    State(state): State<Arc<AppState<F>>>,
) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}
