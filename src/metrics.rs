// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The metrics collector. Out of scope per the purpose statement beyond its
//! contract: record request outcomes, config-reload results, and resolver
//! update counts/durations, then render them as Prometheus text exposition
//! format for `GET /v1/metrics`.

use std::time::Duration;

use prometheus::{Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Collector {
    registry: Registry,
    request_total: IntCounterVec,
    config_reload_total: IntCounterVec,
    resolver_update_total: IntCounterVec,
    resolver_update_records_total: IntCounterVec,
    resolver_update_duration_seconds: HistogramVec,
}

impl Collector {
    pub fn new() -> Self {
        let registry = Registry::new();

        let request_total = IntCounterVec::new(
            Opts::new(
                "geoblock_requests_total",
                "Forward-auth decisions, labeled by outcome",
            ),
            &["outcome", "country", "method", "rule"],
        )
        .expect("static metric descriptor is valid");

        let config_reload_total = IntCounterVec::new(
            Opts::new(
                "geoblock_config_reload_total",
                "Policy file reload attempts, labeled by result",
            ),
            &["result"],
        )
        .expect("static metric descriptor is valid");

        let resolver_update_total = IntCounterVec::new(
            Opts::new(
                "geoblock_resolver_update_total",
                "IP database update attempts, labeled by result",
            ),
            &["result"],
        )
        .expect("static metric descriptor is valid");

        let resolver_update_records_total = IntCounterVec::new(
            Opts::new(
                "geoblock_resolver_update_records_total",
                "Records inserted per ip-range source on the last successful update",
            ),
            &["source"],
        )
        .expect("static metric descriptor is valid");

        let resolver_update_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "geoblock_resolver_update_duration_seconds",
                "Duration of a full resolver update, across all four sources",
            ),
            &["result"],
        )
        .expect("static metric descriptor is valid");

        registry
            .register(Box::new(request_total.clone()))
            .expect("metric registration cannot fail for a fresh registry");
        registry
            .register(Box::new(config_reload_total.clone()))
            .expect("metric registration cannot fail for a fresh registry");
        registry
            .register(Box::new(resolver_update_total.clone()))
            .expect("metric registration cannot fail for a fresh registry");
        registry
            .register(Box::new(resolver_update_records_total.clone()))
            .expect("metric registration cannot fail for a fresh registry");
        registry
            .register(Box::new(resolver_update_duration_seconds.clone()))
            .expect("metric registration cannot fail for a fresh registry");

        Self {
            registry,
            request_total,
            config_reload_total,
            resolver_update_total,
            resolver_update_records_total,
            resolver_update_duration_seconds,
        }
    }

    pub fn record_request(&self, outcome: &str, country: &str, method: &str, rule: &str) {
        self.request_total
            .with_label_values(&[outcome, country, method, rule])
            .inc();
    }

    pub fn record_config_reload(&self, success: bool) {
        let result = if success { "success" } else { "failure" };
        self.config_reload_total.with_label_values(&[result]).inc();
    }

    /// Records a resolver `Update` attempt: `per_source` is `(source name,
    /// records inserted)`, `duration` the whole-update wall time.
    pub fn record_resolver_update(
        &self,
        per_source: &[(&str, u64)],
        duration: Duration,
        success: bool,
    ) {
        let result = if success { "success" } else { "failure" };
        self.resolver_update_total.with_label_values(&[result]).inc();
        self.resolver_update_duration_seconds
            .with_label_values(&[result])
            .observe(duration.as_secs_f64());

        if success {
            for (source, count) in per_source {
                self.resolver_update_records_total
                    .with_label_values(&[source])
                    .inc_by(*count);
            }
        }
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}
