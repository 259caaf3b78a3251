// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The four logical CSV sources (country v4/v6, ASN v4/v6) and their
//! per-record parsers.

use crate::{
    error::ParseError,
    ipinfo::{ip::IpKey, resolution::Resolution},
    tree::Interval,
};

/// Which parser a [`Source`] feeds its raw records through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Country,
    Asn,
}

/// One logical CSV source: a URL plus the parser it should be read with.
#[derive(Debug, Clone)]
pub struct Source {
    pub name: &'static str,
    pub url: String,
    pub kind: Kind,
}

/// The default four upstream mirrors. Tests construct their own `Source`
/// list pointed at a fake fetcher instead of relying on these.
pub fn default_sources() -> Vec<Source> {
    vec![
        Source {
            name: "country_ipv4",
            url: "https://raw.githubusercontent.com/geoblock/ip-db/main/country_ipv4.csv".to_string(),
            kind: Kind::Country,
        },
        Source {
            name: "country_ipv6",
            url: "https://raw.githubusercontent.com/geoblock/ip-db/main/country_ipv6.csv".to_string(),
            kind: Kind::Country,
        },
        Source {
            name: "asn_ipv4",
            url: "https://raw.githubusercontent.com/geoblock/ip-db/main/asn_ipv4.csv".to_string(),
            kind: Kind::Asn,
        },
        Source {
            name: "asn_ipv6",
            url: "https://raw.githubusercontent.com/geoblock/ip-db/main/asn_ipv6.csv".to_string(),
            kind: Kind::Asn,
        },
    ]
}

fn parse_ip(field: &str) -> Result<IpKey, ParseError> {
    field
        .trim()
        .parse::<std::net::IpAddr>()
        .map(IpKey::from_addr)
        .map_err(|_| ParseError::IpParse(field.to_string()))
}

fn parse_asn(field: &str) -> Result<u32, ParseError> {
    field
        .trim()
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidAsn(field.to_string()))
}

/// Parses one `start_ip, end_ip, country_code` record.
pub fn parse_country_record(
    record: &csv::StringRecord,
) -> Result<(Interval<IpKey>, Resolution), ParseError> {
    if record.len() != 3 {
        return Err(ParseError::RecordLength {
            expected: 3,
            got: record.len(),
        });
    }
    let low = parse_ip(&record[0])?;
    let high = parse_ip(&record[1])?;
    let country_code = record[2].trim().to_string();

    Ok((
        Interval::new(low.min(high), low.max(high)),
        Resolution::country(country_code),
    ))
}

/// Parses one `start_ip, end_ip, asn, organization` record.
pub fn parse_asn_record(
    record: &csv::StringRecord,
) -> Result<(Interval<IpKey>, Resolution), ParseError> {
    if record.len() != 4 {
        return Err(ParseError::RecordLength {
            expected: 4,
            got: record.len(),
        });
    }
    let low = parse_ip(&record[0])?;
    let high = parse_ip(&record[1])?;
    let asn = parse_asn(&record[2])?;
    let organization = record[3].trim().to_string();

    Ok((
        Interval::new(low.min(high), low.max(high)),
        Resolution::asn_info(asn, organization),
    ))
}

/// Parses every record in `body` with the parser selected by `kind`,
/// skipping and accumulating per-record failures rather than aborting.
///
/// Returns the number of records successfully inserted plus a joined error
/// describing every record that failed (`None` if every record parsed).
pub fn parse_records(
    body: &[u8],
    kind: Kind,
) -> (Vec<(Interval<IpKey>, Resolution)>, Option<anyhow::Error>) {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body);

    let parser: fn(&csv::StringRecord) -> Result<(Interval<IpKey>, Resolution), ParseError> =
        match kind {
            Kind::Country => parse_country_record,
            Kind::Asn => parse_asn_record,
        };

    let mut parsed = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for (line_no, result) in reader.records().enumerate() {
        match result {
            Ok(record) => match parser(&record) {
                Ok(entry) => parsed.push(entry),
                Err(e) => errors.push(format!("line {}: {e}", line_no + 1)),
            },
            Err(e) => errors.push(format!("line {}: csv error: {e}", line_no + 1)),
        }
    }

    let joined = if errors.is_empty() {
        None
    } else {
        Some(anyhow::anyhow!(errors.join("; ")))
    };

    (parsed, joined)
}
