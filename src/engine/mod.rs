// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The rule engine (C4): holds the current `AccessControl` behind an atomic
//! pointer and evaluates queries against it.

pub mod glob;
pub mod query;
pub mod rule;

use std::sync::Arc;

use arc_swap::ArcSwap;

pub use query::{AuthorizationResult, Policy, Query};
pub use rule::{AccessControl, Rule};

pub struct Engine {
    config: ArcSwap<AccessControl>,
}

impl Engine {
    pub fn new(initial: AccessControl) -> Self {
        Self {
            config: ArcSwap::from_pointee(initial),
        }
    }

    /// Atomically replaces the current policy.
    pub fn update_config(&self, ac: AccessControl) {
        self.config.store(Arc::new(ac));
    }

    /// Evaluates `q` against the current policy snapshot. Safe to call
    /// concurrently with `update_config`.
    pub fn authorize(&self, q: &Query) -> AuthorizationResult {
        self.config.load().authorize(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(domain: &str) -> Query {
        Query {
            requested_domain: domain.to_string(),
            requested_method: "GET".to_string(),
            source_ip: "1.2.3.4".parse().expect("valid ip"),
            source_country: "US".to_string(),
            source_asn: 0,
        }
    }

    #[test]
    fn update_config_is_observed_by_subsequent_authorize() {
        let engine = Engine::new(AccessControl {
            default_policy: Policy::Allow,
            rules: vec![],
        });
        assert!(engine.authorize(&query("x.com")).allowed);

        engine.update_config(AccessControl {
            default_policy: Policy::Deny,
            rules: vec![],
        });
        assert!(!engine.authorize(&query("x.com")).allowed);
    }
}
