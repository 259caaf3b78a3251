// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `Query` and `AuthorizationResult`, built by the HTTP adapter and consumed
//! by the rule engine.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// `allow` or `deny`, shared by rule outcomes, a rule's own `policy` field,
/// and `AccessControl::default_policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    Allow,
    Deny,
}

impl Policy {
    pub fn is_allow(self) -> bool {
        matches!(self, Policy::Allow)
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Policy::Allow => "allow",
            Policy::Deny => "deny",
        })
    }
}

/// Request metadata the HTTP adapter builds before evaluation.
#[derive(Debug, Clone)]
pub struct Query {
    pub requested_domain: String,
    pub requested_method: String,
    pub source_ip: IpAddr,
    pub source_country: String,
    pub source_asn: u32,
}

/// The outcome of evaluating a [`Query`] against an `AccessControl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationResult {
    pub allowed: bool,
    /// Index of the matching rule, or `-1` if none matched.
    pub rule_index: i64,
    pub action: Policy,
    pub is_default_policy: bool,
}
