// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Environment-driven startup options (§6.3). Each field has a documented
//! default; invalid values fall back to that default and log a warning
//! rather than failing startup.

use std::{env, fmt, path::PathBuf};

const DEFAULT_CONFIG_FILE: &str = "/etc/geoblock/config.yaml";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CACHE_DIR: &str = "/var/cache/geoblock";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            // `fatal`/`panic` are accepted spellings per §6.3 but have no
            // distinct tracing level; they map to `error`.
            "error" | "fatal" | "panic" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Startup options, loaded once from the process environment.
#[derive(Debug, Clone)]
pub struct Options {
    pub config_file: PathBuf,
    pub port: u16,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    /// `None` means caching is disabled (explicit empty `GEOBLOCK_CACHE_DIR`).
    pub cache_dir: Option<PathBuf>,
}

impl Options {
    /// Reads every `GEOBLOCK_*` variable, applying the documented default on
    /// an invalid or absent value. Never fails.
    ///
    /// Parsing runs before the logger is installed (the log level/format it
    /// reports are themselves parsed here), so any fallback warning can't be
    /// emitted through `tracing` yet — it is returned alongside `Options`
    /// instead, for the caller to log once the real subscriber exists.
    pub fn from_env() -> (Self, Vec<String>) {
        let mut warnings = Vec::new();

        let options = Self {
            config_file: env::var("GEOBLOCK_CONFIG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE)),
            port: env::var("GEOBLOCK_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
            log_level: env::var("GEOBLOCK_LOG_LEVEL")
                .ok()
                .and_then(|v| {
                    LogLevel::parse(&v).or_else(|| {
                        warnings.push(format!(
                            "invalid GEOBLOCK_LOG_LEVEL={v:?}, falling back to info"
                        ));
                        None
                    })
                })
                .unwrap_or(LogLevel::Info),
            log_format: env::var("GEOBLOCK_LOG_FORMAT")
                .ok()
                .and_then(|v| {
                    LogFormat::parse(&v).or_else(|| {
                        warnings.push(format!(
                            "invalid GEOBLOCK_LOG_FORMAT={v:?}, falling back to text"
                        ));
                        None
                    })
                })
                .unwrap_or(LogFormat::Text),
            cache_dir: match env::var("GEOBLOCK_CACHE_DIR") {
                Ok(v) if v.is_empty() => None,
                Ok(v) => Some(PathBuf::from(v)),
                Err(_) => Some(PathBuf::from(DEFAULT_CACHE_DIR)),
            },
        };

        (options, warnings)
    }
}
