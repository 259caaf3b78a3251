// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `Rule` and `AccessControl`: the declarative predicates evaluated by the
//! engine, plus the field-matching semantics of spec.md §4.4.

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::engine::{glob::glob_match, query::Policy, query::Query};

/// One access-control rule. Every field except `policy` is optional;
/// missing/empty means "match all" for that field. A rule applies iff every
/// non-empty field matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub policy: Policy,
    #[serde(default)]
    pub networks: Vec<IpNetwork>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default, rename = "autonomous_systems")]
    pub asns: Vec<u32>,
}

impl Rule {
    pub fn matches(&self, q: &Query) -> bool {
        Self::domains_match(&self.domains, &q.requested_domain)
            && Self::methods_match(&self.methods, &q.requested_method)
            && Self::networks_match(&self.networks, q.source_ip)
            && Self::countries_match(&self.countries, &q.source_country)
            && Self::asns_match(&self.asns, q.source_asn)
    }

    fn domains_match(domains: &[String], requested: &str) -> bool {
        domains.is_empty() || domains.iter().any(|p| glob_match(p, requested))
    }

    fn methods_match(methods: &[String], requested: &str) -> bool {
        methods.is_empty() || methods.iter().any(|m| m.eq_ignore_ascii_case(requested))
    }

    fn networks_match(networks: &[IpNetwork], ip: std::net::IpAddr) -> bool {
        networks.is_empty() || networks.iter().any(|net| net.contains(ip))
    }

    fn countries_match(countries: &[String], requested: &str) -> bool {
        countries.is_empty() || countries.iter().any(|c| c.eq_ignore_ascii_case(requested))
    }

    fn asns_match(asns: &[u32], requested: u32) -> bool {
        asns.is_empty() || asns.iter().any(|a| *a == requested)
    }
}

/// An ordered list of rules plus the policy applied when none match.
/// Ordering is significant: the first matching rule wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessControl {
    pub default_policy: Policy,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl AccessControl {
    pub fn authorize(&self, q: &Query) -> super::query::AuthorizationResult {
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.matches(q) {
                return super::query::AuthorizationResult {
                    allowed: rule.policy.is_allow(),
                    rule_index: i as i64,
                    action: rule.policy,
                    is_default_policy: false,
                };
            }
        }
        super::query::AuthorizationResult {
            allowed: self.default_policy.is_allow(),
            rule_index: -1,
            action: self.default_policy,
            is_default_policy: true,
        }
    }
}
