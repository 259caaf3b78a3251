// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The policy file (§6.2): an ordered list of access-control rules plus a
//! default policy, loaded from YAML and validated before it reaches the
//! engine.

use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::engine::{AccessControl, Policy, Rule};

const ALLOWED_METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "DELETE", "PATCH"];

/// The on-disk shape of the policy file, deserialized as-is and then
/// validated/converted into an [`AccessControl`].
#[derive(Debug, Deserialize)]
pub struct PolicyFile {
    pub default_policy: Policy,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl PolicyFile {
    /// Loads and validates the policy file at `path`, returning the engine's
    /// ready-to-use [`AccessControl`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<AccessControl> {
        let raw = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("failed to read policy file {}", path.as_ref().display())
        })?;
        parse_access_control(&raw)
    }
}

/// Parses and validates a policy document already read into memory. Split
/// out from [`PolicyFile::load_from_file`] so the reloader's injected `load`
/// closure and tests can exercise it without touching the filesystem.
pub fn parse_access_control(raw: &str) -> Result<AccessControl> {
    let file: PolicyFile =
        serde_yaml::from_str(raw).context("failed to parse policy YAML")?;

    for (i, rule) in file.rules.iter().enumerate() {
        validate_rule(i, rule)?;
    }

    Ok(AccessControl {
        default_policy: file.default_policy,
        rules: file.rules,
    })
}

fn validate_rule(index: usize, rule: &Rule) -> Result<()> {
    for method in &rule.methods {
        ensure!(
            ALLOWED_METHODS
                .iter()
                .any(|m| m.eq_ignore_ascii_case(method)),
            "rule {index}: method {method:?} is not one of {ALLOWED_METHODS:?}"
        );
    }

    for country in &rule.countries {
        ensure!(
            is_alpha2(country),
            "rule {index}: country {country:?} is not a 2-letter ISO-3166-1 alpha-2 code"
        );
    }

    for domain in &rule.domains {
        ensure!(
            is_valid_domain_pattern(domain),
            "rule {index}: domain pattern {domain:?} is not RFC-1035-like"
        );
    }

    // `networks` is already `Vec<ipnetwork::IpNetwork>`; serde rejects an
    // unparseable CIDR prefix before validation ever runs.

    Ok(())
}

fn is_alpha2(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Accepts dot-separated labels of letters, digits and hyphens, where a
/// whole label may instead be the `*` wildcard. No leading/trailing hyphen
/// within a label.
fn is_valid_domain_pattern(pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    pattern.split('.').all(|label| {
        label == "*"
            || (!label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-'))
    })
}
