// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The resolver (C3): owns the published IP-range tree and exposes the
//! atomic `update` / `resolve` pair described in spec.md §4.3.

use std::{sync::Arc, time::Instant};

use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    ipinfo::{
        fetch::Fetcher,
        ip::IpKey,
        resolution::Resolution,
        source::{self, Source},
    },
    metrics::Collector,
    tree::IntervalTree,
};

pub struct Resolver<F> {
    fetcher: F,
    sources: Vec<Source>,
    tree: ArcSwap<IntervalTree<IpKey, Resolution>>,
    metrics: Arc<Collector>,
}

impl<F: Fetcher> Resolver<F> {
    pub fn new(fetcher: F, sources: Vec<Source>, metrics: Arc<Collector>) -> Self {
        Self {
            fetcher,
            sources,
            tree: ArcSwap::from_pointee(IntervalTree::new()),
            metrics,
        }
    }

    pub fn with_default_sources(fetcher: F, metrics: Arc<Collector>) -> Self {
        Self::new(fetcher, source::default_sources(), metrics)
    }

    /// Builds a fresh tree from all four sources and publishes it atomically
    /// on full success. Returns the joined per-source error without
    /// publishing anything if any source failed.
    pub async fn update(&self, token: &CancellationToken) -> anyhow::Result<()> {
        let start = Instant::now();
        let mut fresh = IntervalTree::new();
        let mut per_source_counts = Vec::with_capacity(self.sources.len());
        let mut errors: Vec<String> = Vec::new();

        for source in &self.sources {
            if token.is_cancelled() {
                anyhow::bail!("resolver update cancelled");
            }

            match self.load_source(source, &mut fresh, token).await {
                Ok(count) => per_source_counts.push((source.name, count)),
                Err(e) => errors.push(format!("{}: {e}", source.name)),
            }
        }

        let duration = start.elapsed();

        if !errors.is_empty() {
            self.metrics
                .record_resolver_update(&[], duration, false);
            warn!(errors = %errors.join("; "), "resolver update failed, keeping previous tree");
            anyhow::bail!("resolver update failed: {}", errors.join("; "));
        }

        let compacted = fresh.compacted(Resolution::merge_all);
        self.tree.store(Arc::new(compacted));

        self.metrics
            .record_resolver_update(&per_source_counts, duration, true);
        info!(
            duration_ms = duration.as_millis() as u64,
            sources = per_source_counts.len(),
            "resolver update published a new ip-range tree"
        );

        Ok(())
    }

    async fn load_source(
        &self,
        source: &Source,
        tree: &mut IntervalTree<IpKey, Resolution>,
        token: &CancellationToken,
    ) -> anyhow::Result<u64> {
        let body = tokio::select! {
            _ = token.cancelled() => anyhow::bail!("resolver update cancelled"),
            r = self.fetcher.fetch(&source.url) => r?,
        };
        let (entries, parse_errors) = source::parse_records(&body, source.kind);

        if let Some(e) = parse_errors {
            warn!(source = source.name, error = %e, "some records failed to parse");
        }

        let count = entries.len() as u64;
        for (interval, value) in entries {
            tree.insert(interval, value);
        }
        Ok(count)
    }

    /// Queries the published tree and merges all hits, last-non-empty wins.
    /// Safe to call concurrently with `update`.
    pub fn resolve(&self, ip: std::net::IpAddr) -> Resolution {
        let tree = self.tree.load();
        let hits = tree.query(IpKey::from_addr(ip));
        let resolution = Resolution::merge_all(hits);

        debug!(%ip, organization = %resolution.organization, "resolved ip");

        resolution
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;

    struct MapFetcher {
        bodies: std::collections::HashMap<String, Bytes>,
    }

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> anyhow::Result<Bytes> {
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no fixture for {url}"))
        }
    }

    fn source(name: &'static str, url: &str, kind: source::Kind) -> Source {
        Source {
            name,
            url: url.to_string(),
            kind,
        }
    }

    #[tokio::test]
    async fn update_then_resolve_merges_country_and_asn() {
        let mut bodies = std::collections::HashMap::new();
        bodies.insert(
            "country_v4".to_string(),
            Bytes::from_static(b"1.0.0.0,1.0.0.255,US\n"),
        );
        bodies.insert("country_v6".to_string(), Bytes::from_static(b""));
        bodies.insert(
            "asn_v4".to_string(),
            Bytes::from_static(b"1.0.0.0,1.0.0.255,15169,Google LLC\n"),
        );
        bodies.insert("asn_v6".to_string(), Bytes::from_static(b""));

        let sources = vec![
            source("country_ipv4", "country_v4", source::Kind::Country),
            source("country_ipv6", "country_v6", source::Kind::Country),
            source("asn_ipv4", "asn_v4", source::Kind::Asn),
            source("asn_ipv6", "asn_v6", source::Kind::Asn),
        ];

        let resolver = Resolver::new(
            MapFetcher { bodies },
            sources,
            Arc::new(Collector::new()),
        );

        resolver
            .update(&CancellationToken::new())
            .await
            .expect("update should succeed");

        let res = resolver.resolve("1.0.0.10".parse().expect("valid ip"));
        assert_eq!(res.country_code, "US");
        assert_eq!(res.asn, 15169);
        assert_eq!(res.organization, "Google LLC");

        let miss = resolver.resolve("8.8.8.8".parse().expect("valid ip"));
        assert_eq!(miss, Resolution::default());
    }

    #[tokio::test]
    async fn partial_failure_does_not_publish() {
        let mut bodies = std::collections::HashMap::new();
        bodies.insert(
            "country_v4".to_string(),
            Bytes::from_static(b"1.0.0.0,1.0.0.255,US\n"),
        );
        // country_v6 deliberately missing -> fetch fails for that source.
        bodies.insert(
            "asn_v4".to_string(),
            Bytes::from_static(b"1.0.0.0,1.0.0.255,15169,Google LLC\n"),
        );
        bodies.insert("asn_v6".to_string(), Bytes::from_static(b""));

        let sources = vec![
            source("country_ipv4", "country_v4", source::Kind::Country),
            source("country_ipv6", "country_v6", source::Kind::Country),
            source("asn_ipv4", "asn_v4", source::Kind::Asn),
            source("asn_ipv6", "asn_v6", source::Kind::Asn),
        ];

        let resolver = Resolver::new(
            MapFetcher { bodies },
            sources,
            Arc::new(Collector::new()),
        );

        let before = resolver.resolve("1.0.0.10".parse().expect("valid ip"));
        assert_eq!(before, Resolution::default());

        let result = resolver.update(&CancellationToken::new()).await;
        assert!(result.is_err());

        let after = resolver.resolve("1.0.0.10".parse().expect("valid ip"));
        assert_eq!(after, Resolution::default(), "old (empty) tree must still answer");
    }
}
