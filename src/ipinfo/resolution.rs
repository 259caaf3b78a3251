// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The `Resolution` record and its merge semantics.

use serde::{Deserialize, Serialize};

/// Country/ASN/organization facts resolved for an IP address. Every field is
/// optional in the sense that an empty string / zero ASN means "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub asn: u32,
    #[serde(default)]
    pub organization: String,
}

impl Resolution {
    pub fn country(country_code: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            ..Default::default()
        }
    }

    pub fn asn_info(asn: u32, organization: impl Into<String>) -> Self {
        Self {
            asn,
            organization: organization.into(),
            ..Default::default()
        }
    }

    /// Merges `other` into `self`: last-non-empty wins per field. An empty
    /// string or zero ASN in `other` never overwrites a value already set in
    /// `self`.
    pub fn merge(mut self, other: &Resolution) -> Self {
        if !other.country_code.is_empty() {
            self.country_code = other.country_code.clone();
        }
        if other.asn != 0 {
            self.asn = other.asn;
        }
        if !other.organization.is_empty() {
            self.organization = other.organization.clone();
        }
        self
    }

    /// Merges a sequence of resolutions in order, last-non-empty wins.
    pub fn merge_all<I: IntoIterator<Item = Resolution>>(resolutions: I) -> Resolution {
        resolutions
            .into_iter()
            .fold(Resolution::default(), |acc, r| acc.merge(&r))
    }
}
