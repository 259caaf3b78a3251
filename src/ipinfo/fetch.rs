// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The network fetcher capability. `Fetcher` is a narrow trait so tests can
//! substitute a fake source without reaching for a mock framework, the same
//! approach the teacher crate takes with injectable `stat`/`load` closures.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Error;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<Bytes>;
}

/// Fetches a URL over HTTPS with a fixed client timeout, requiring `200 OK`.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client })
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new().expect("default reqwest client configuration is always valid")
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<Bytes> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = resp.status();
        if status.as_u16() != 200 {
            return Err(Error::CsvFetch {
                url: url.to_string(),
                reason: format!("unexpected_status: {status}"),
            }
            .into());
        }

        resp.bytes()
            .await
            .with_context(|| format!("failed to read response body from {url}"))
    }
}
