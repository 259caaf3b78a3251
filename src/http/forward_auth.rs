// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `GET /v1/forward-auth` (§6.1): the only handler that consults the
//! resolver and the engine.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::warn;

use crate::{
    engine::{Engine, Query},
    error::Error,
    http::AppState,
    ipinfo::fetch::Fetcher,
};

const HEADER_FORWARDED_FOR: &str = "X-Forwarded-For";
const HEADER_FORWARDED_HOST: &str = "X-Forwarded-Host";
const HEADER_FORWARDED_METHOD: &str = "X-Forwarded-Method";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn handler<F: Fetcher + 'static>(
    State(state): State<Arc<AppState<F>>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(source_ip) = header_str(&headers, HEADER_FORWARDED_FOR).filter(|s| !s.is_empty())
    else {
        return invalid_request(&state, "missing or empty X-Forwarded-For");
    };
    let Some(host) = header_str(&headers, HEADER_FORWARDED_HOST).filter(|s| !s.is_empty()) else {
        return invalid_request(&state, "missing or empty X-Forwarded-Host");
    };
    let Some(method) = header_str(&headers, HEADER_FORWARDED_METHOD).filter(|s| !s.is_empty())
    else {
        return invalid_request(&state, "missing or empty X-Forwarded-Method");
    };

    let Ok(ip) = source_ip.parse::<std::net::IpAddr>() else {
        return invalid_request(&state, "X-Forwarded-For is not a valid IP address");
    };

    let resolution = state.resolver.resolve(ip);
    let query = Query {
        requested_domain: host.to_string(),
        requested_method: method.to_string(),
        source_ip: ip,
        source_country: resolution.country_code.clone(),
        source_asn: resolution.asn,
    };

    let result = state.engine.authorize(&query);
    let rule_label = if result.is_default_policy {
        "default".to_string()
    } else {
        result.rule_index.to_string()
    };

    let outcome = if result.allowed { "allow" } else { "deny" };
    state
        .metrics
        .record_request(outcome, &resolution.country_code, method, &rule_label);

    if result.allowed {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::FORBIDDEN
    }
}

fn invalid_request<F: Fetcher>(state: &AppState<F>, reason: &str) -> StatusCode {
    let err = Error::InvalidRequest(reason.to_string());
    warn!(error = %err, "rejecting forward-auth request");
    state.metrics.record_request("invalid", "", "", "");
    StatusCode::BAD_REQUEST
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{body::Body, http::Request};
    use bytes::Bytes;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        engine::{AccessControl, Policy, Rule},
        http::build_router,
        metrics::Collector,
        reload::{ConfigReloader, Stat},
    };

    struct EmptyFetcher;

    #[async_trait]
    impl Fetcher for EmptyFetcher {
        async fn fetch(&self, _url: &str) -> anyhow::Result<Bytes> {
            Ok(Bytes::from_static(b""))
        }
    }

    fn state_with(ac: AccessControl) -> Arc<AppState<EmptyFetcher>> {
        let metrics = Arc::new(Collector::new());
        Arc::new(AppState {
            resolver: Arc::new(crate::ipinfo::resolver::Resolver::new(
                EmptyFetcher,
                vec![],
                Arc::clone(&metrics),
            )),
            engine: Arc::new(Engine::new(ac)),
            metrics,
        })
    }

    fn request(ip: &str, host: &str, method: &str) -> Request<Body> {
        let mut builder = Request::builder().uri("/v1/forward-auth");
        if !ip.is_empty() {
            builder = builder.header(HEADER_FORWARDED_FOR, ip);
        }
        if !host.is_empty() {
            builder = builder.header(HEADER_FORWARDED_HOST, host);
        }
        if !method.is_empty() {
            builder = builder.header(HEADER_FORWARDED_METHOD, method);
        }
        builder.body(Body::empty()).expect("valid request")
    }

    #[tokio::test]
    async fn default_deny_returns_forbidden() {
        let state = state_with(AccessControl {
            default_policy: Policy::Deny,
            rules: vec![],
        });
        let router = build_router(state);

        let resp = router
            .oneshot(request("1.2.3.4", "x.example.com", "GET"))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn matching_allow_rule_returns_no_content() {
        let state = state_with(AccessControl {
            default_policy: Policy::Deny,
            rules: vec![Rule {
                policy: Policy::Allow,
                networks: vec![],
                domains: vec!["*.example.com".to_string()],
                methods: vec![],
                countries: vec![],
                asns: vec![],
            }],
        });
        let router = build_router(state);

        let resp = router
            .oneshot(request("1.2.3.4", "sub.example.com", "GET"))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn missing_header_is_bad_request() {
        let state = state_with(AccessControl {
            default_policy: Policy::Allow,
            rules: vec![],
        });
        let router = build_router(state);

        let resp = router
            .oneshot(request("", "x.example.com", "GET"))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_ip_is_bad_request() {
        let state = state_with(AccessControl {
            default_policy: Policy::Allow,
            rules: vec![],
        });
        let router = build_router(state);

        let resp = router
            .oneshot(request("not-an-ip", "x.example.com", "GET"))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    // Exercises ConfigReloader and scheduler wiring alongside the live
    // router, matching the hot-swap scenario from the top-level spec.
    #[tokio::test]
    async fn config_hot_swap_is_observed_by_next_request() {
        let state = state_with(AccessControl {
            default_policy: Policy::Deny,
            rules: vec![],
        });
        let router = build_router(Arc::clone(&state));

        let before = router
            .clone()
            .oneshot(request("1.2.3.4", "x.example.com", "GET"))
            .await
            .expect("response");
        assert_eq!(before.status(), StatusCode::FORBIDDEN);

        let tick = std::cell::RefCell::new(1u64);
        let mut reloader = ConfigReloader::new(
            "fake.yaml",
            |_p| {
                Ok(Stat {
                    len: 1,
                    modified: std::time::SystemTime::UNIX_EPOCH
                        + std::time::Duration::from_secs(*tick.borrow()),
                })
            },
            |_p| {
                Ok(AccessControl {
                    default_policy: Policy::Allow,
                    rules: vec![],
                })
            },
        )
        .expect("initial stat");
        *tick.borrow_mut() = 2;
        let outcome = reloader
            .reload_if_changed(&state.engine)
            .expect("reload ok");
        assert_eq!(
            outcome,
            crate::reload::ReloadOutcome::Reloaded { rules_count: 0 }
        );

        let after = router
            .oneshot(request("1.2.3.4", "x.example.com", "GET"))
            .await
            .expect("response");
        assert_eq!(after.status(), StatusCode::NO_CONTENT);
    }
}
