// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `GET /v1/health` (§6.1): a liveness probe with no dependencies.

use axum::http::StatusCode;

pub async fn handler() -> StatusCode {
    StatusCode::NO_CONTENT
}
