// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The config reloader (C5): detects a policy-file change by `stat` and
//! atomically re-installs rules into the engine on change.
//!
//! `Stat`/`Load` are injected closures, the same pattern the teacher crate
//! uses for `cfg::cli::resolve_config_path` + `Config::load_from_file` being
//! kept as separate, independently testable steps — here it lets tests drive
//! the reloader without touching a real filesystem.

use std::path::{Path, PathBuf};

use crate::{engine::AccessControl, error::Error};

/// The `(size, mtime)` pair used to detect a changed file without reading
/// its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub len: u64,
    pub modified: std::time::SystemTime,
}

/// Outcome of a single [`ConfigReloader::reload_if_changed`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    Unchanged,
    Reloaded { rules_count: usize },
}

pub struct ConfigReloader<S, L> {
    path: PathBuf,
    stat_fn: S,
    load_fn: L,
    last: Option<Stat>,
}

impl<S, L> ConfigReloader<S, L>
where
    S: Fn(&Path) -> std::io::Result<Stat>,
    L: Fn(&Path) -> anyhow::Result<AccessControl>,
{
    /// Takes an initial stat; fails if the file does not exist (or is
    /// otherwise unreadable).
    pub fn new(path: impl Into<PathBuf>, stat_fn: S, load_fn: L) -> Result<Self, Error> {
        let path = path.into();
        let last = stat_fn(&path).map_err(|e| Error::StatError(e.to_string()))?;
        Ok(Self {
            path,
            stat_fn,
            load_fn,
            last: Some(last),
        })
    }

    /// Stats the file; if unchanged, returns `Unchanged`. If changed, parses
    /// it and installs it into `engine` via `update_config`.
    ///
    /// A stat failure or a parse failure leaves the remembered stat
    /// untouched so the next call retries against the same file state.
    pub fn reload_if_changed(
        &mut self,
        engine: &crate::engine::Engine,
    ) -> Result<ReloadOutcome, Error> {
        let current = (self.stat_fn)(&self.path).map_err(|e| Error::StatError(e.to_string()))?;

        if Some(current) == self.last {
            return Ok(ReloadOutcome::Unchanged);
        }

        let parsed = (self.load_fn)(&self.path).map_err(|e| Error::ConfigParse(e.to_string()))?;
        let rules_count = parsed.rules.len();
        engine.update_config(parsed);
        self.last = Some(current);

        Ok(ReloadOutcome::Reloaded { rules_count })
    }
}

/// Production `stat` closure: reads real filesystem metadata.
pub fn fs_stat(path: &Path) -> std::io::Result<Stat> {
    let metadata = std::fs::metadata(path)?;
    Ok(Stat {
        len: metadata.len(),
        modified: metadata.modified()?,
    })
}

/// Production `load` closure: reads and parses the YAML policy file.
pub fn fs_load(path: &Path) -> anyhow::Result<AccessControl> {
    let content = std::fs::read_to_string(path)?;
    crate::cfg::policy::parse_access_control(&content)
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        time::{Duration, SystemTime},
    };

    use super::*;
    use crate::engine::{Engine, Policy};

    fn stat_at(secs: u64) -> Stat {
        Stat {
            len: 10,
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        }
    }

    fn access_control(n_rules: usize) -> AccessControl {
        AccessControl {
            default_policy: Policy::Deny,
            rules: (0..n_rules)
                .map(|_| crate::engine::Rule {
                    policy: Policy::Allow,
                    networks: vec![],
                    domains: vec![],
                    methods: vec![],
                    countries: vec![],
                    asns: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn unchanged_file_does_not_reload() {
        let calls = RefCell::new(0);
        let reloader = ConfigReloader::new(
            "fake.yaml",
            |_p| Ok(stat_at(1)),
            |_p| {
                *calls.borrow_mut() += 1;
                Ok(access_control(1))
            },
        );
        let mut reloader = reloader.expect("initial stat succeeds");
        let engine = Engine::new(access_control(0));

        let first = reloader.reload_if_changed(&engine).expect("ok");
        assert_eq!(first, ReloadOutcome::Unchanged);
        assert_eq!(*calls.borrow(), 0, "load must not run when stat is unchanged");
    }

    #[test]
    fn changed_file_reloads_exactly_once() {
        let tick = RefCell::new(1u64);
        let reloader = ConfigReloader::new(
            "fake.yaml",
            |_p| Ok(stat_at(*tick.borrow())),
            |_p| Ok(access_control(3)),
        )
        .expect("initial stat succeeds");
        let mut reloader = reloader;
        let engine = Engine::new(access_control(0));

        *tick.borrow_mut() = 2;
        let outcome = reloader.reload_if_changed(&engine).expect("ok");
        assert_eq!(outcome, ReloadOutcome::Reloaded { rules_count: 3 });

        let outcome2 = reloader.reload_if_changed(&engine).expect("ok");
        assert_eq!(outcome2, ReloadOutcome::Unchanged, "must not reload twice for one change");
    }

    #[test]
    fn parse_failure_retains_old_stat_and_retries_next_tick() {
        let tick = RefCell::new(1u64);
        let should_fail = RefCell::new(true);
        let mut reloader = ConfigReloader::new(
            "fake.yaml",
            |_p| Ok(stat_at(*tick.borrow())),
            |_p| {
                if *should_fail.borrow() {
                    anyhow::bail!("bad yaml")
                } else {
                    Ok(access_control(5))
                }
            },
        )
        .expect("initial stat succeeds");
        let engine = Engine::new(access_control(0));

        *tick.borrow_mut() = 2;
        let err = reloader.reload_if_changed(&engine);
        assert!(matches!(err, Err(Error::ConfigParse(_))));

        // File state is still "changed" relative to remembered stat, so a
        // second attempt must try to parse again rather than skip it.
        *should_fail.borrow_mut() = false;
        let outcome = reloader.reload_if_changed(&engine).expect("retry succeeds");
        assert_eq!(outcome, ReloadOutcome::Reloaded { rules_count: 5 });
    }

    #[test]
    fn construction_fails_when_initial_stat_errors() {
        let reloader = ConfigReloader::new(
            "fake.yaml",
            |_p| Err(std::io::Error::other("permission denied")),
            |_p| Ok(access_control(1)),
        );
        assert!(matches!(reloader, Err(Error::StatError(_))));
    }

    #[test]
    fn stat_error_on_a_later_tick_is_reported_as_stat_error() {
        let fail = RefCell::new(false);
        let mut reloader = ConfigReloader::new(
            "fake.yaml",
            |_p| {
                if *fail.borrow() {
                    Err(std::io::Error::other("disk unavailable"))
                } else {
                    Ok(stat_at(1))
                }
            },
            |_p| Ok(access_control(1)),
        )
        .expect("initial stat succeeds");
        let engine = Engine::new(access_control(0));

        *fail.borrow_mut() = true;
        let err = reloader.reload_if_changed(&engine);
        assert!(matches!(err, Err(Error::StatError(_))));
    }
}
