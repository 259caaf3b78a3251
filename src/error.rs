// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The error taxonomy shared across the crate.
//!
//! Most fallible functions return `anyhow::Result<T>` and attach context with
//! `.context(...)` at each call site, the same way the teacher crate does for
//! protocol-level failures. The variants below exist for the handful of
//! places where a caller needs to distinguish *kind* of failure rather than
//! just log a message: the HTTP boundary (to pick a status code), the
//! reloader (to decide whether to advance its remembered stat), and the
//! fetch/parse pipeline (to decide whether a record is skippable).

use thiserror::Error;

/// Error kinds from the error handling design (policy-reload, CSV ingest,
/// and request-boundary failures).
#[derive(Debug, Error)]
pub enum Error {
    /// Policy file present but not parseable as valid configuration.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Initial policy file missing or unreadable at startup.
    #[error("config missing: {0}")]
    ConfigMissing(String),

    /// A CSV source could not be fetched (network or non-200 status).
    #[error("csv fetch error for {url}: {reason}")]
    CsvFetch { url: String, reason: String },

    /// A CSV record failed to parse.
    #[error("csv parse error: {0}")]
    CsvParse(#[from] ParseError),

    /// The reloader could not `stat` the policy file.
    #[error("stat error: {0}")]
    StatError(String),

    /// The HTTP server failed to shut down cleanly.
    #[error("shutdown error: {0}")]
    ShutdownError(String),

    /// A forward-auth request was missing or carried an invalid header.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Per-record CSV parsing failures (spec ip-range source parser contract).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("record_length: expected {expected} fields, got {got}")]
    RecordLength { expected: usize, got: usize },

    #[error("ip_parse: {0:?} is not a valid IP address")]
    IpParse(String),

    #[error("invalid_asn: {0:?} is not a base-10 u32")]
    InvalidAsn(String),
}
