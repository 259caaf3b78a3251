// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Disk cache in front of a [`Fetcher`].
//!
//! Cache key is the basename of the URL. An empty cache directory disables
//! caching entirely (the wrapper becomes a passthrough). Writes go to a
//! sibling temp file and are renamed into place, so a crash mid-write never
//! leaves a half-written cache entry visible to a reader.

use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use crate::ipinfo::fetch::Fetcher;

/// Default freshness window for cached CSV sources (spec.md §6.4).
pub const DEFAULT_MAX_CACHE_AGE: Duration = Duration::from_secs(12 * 60 * 60);

pub struct CachedFetcher<F> {
    inner: F,
    cache_dir: Option<PathBuf>,
    max_cache_age: Duration,
}

impl<F: Fetcher> CachedFetcher<F> {
    pub fn new(inner: F, cache_dir: Option<PathBuf>, max_cache_age: Duration) -> Self {
        Self {
            inner,
            cache_dir,
            max_cache_age,
        }
    }

    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let basename = url.rsplit('/').next().filter(|s| !s.is_empty())?;
        Some(dir.join(basename))
    }

    fn read_if_fresh(&self, path: &Path) -> Option<Bytes> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to stat ip-range cache file, falling back to network");
                return None;
            },
        };

        let modified = match metadata.modified() {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read ip-range cache file mtime, falling back to network");
                return None;
            },
        };

        let age = match SystemTime::now().duration_since(modified) {
            Ok(a) => a,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ip-range cache file mtime is in the future, falling back to network");
                return None;
            },
        };

        if age >= self.max_cache_age {
            return None;
        }

        match std::fs::read(path) {
            Ok(bytes) => Some(Bytes::from(bytes)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read ip-range cache file, falling back to network");
                None
            },
        }
    }

    fn write_through(&self, path: &Path, body: &Bytes) {
        if let Err(e) = write_atomic(path, body) {
            warn!(path = %path.display(), error = %e, "failed to write ip-range cache file");
        }
    }
}

fn write_atomic(path: &Path, body: &Bytes) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let tmp_path = dir.join(format!(
        ".{}.tmp",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("cache")
    ));
    std::fs::write(&tmp_path, body)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[async_trait]
impl<F: Fetcher> Fetcher for CachedFetcher<F> {
    async fn fetch(&self, url: &str) -> anyhow::Result<Bytes> {
        let Some(path) = self.cache_path(url) else {
            return self.inner.fetch(url).await;
        };

        if let Some(cached) = self.read_if_fresh(&path) {
            return Ok(cached);
        }

        let body = self.inner.fetch(url).await?;
        self.write_through(&path, &body);
        Ok(body)
    }
}
