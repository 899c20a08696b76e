//! Configuration file watcher for hot reload of rewrite rules.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::Dispatch;

use crate::config::loader::{build_rule_set, load_config, ConfigError};
use crate::http::RuleHandle;

/// Reloads the rule set whenever the configuration file changes.
///
/// Only the pre-routing rules are swapped; listener and route settings need a
/// restart.
pub struct ConfigWatcher {
    path: PathBuf,
    rules: RuleHandle,
    logger: Option<Dispatch>,
}

impl ConfigWatcher {
    pub fn new(path: &Path, rules: RuleHandle, logger: Option<Dispatch>) -> Self {
        Self {
            path: path.to_path_buf(),
            rules,
            logger,
        }
    }

    /// Load, validate, compile, and swap in the rules from disk.
    ///
    /// On error the current rules stay active.
    pub fn reload(&self) -> Result<usize, ConfigError> {
        let config = load_config(&self.path)?;
        let rules = build_rule_set(&config, self.logger.as_ref())?;
        let count = rules.len();
        self.rules.replace(rules);
        Ok(count)
    }

    /// Start watching. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    match self.reload() {
                        Ok(count) => tracing::info!(path = ?self.path, rules = count, "Rewrite rules reloaded"),
                        Err(e) => tracing::error!(
                            path = ?self.path,
                            error = %e,
                            "Failed to reload rewrite rules, keeping current set"
                        ),
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::rewrite::RuleSet;

    #[test]
    fn test_reload_swaps_rules_and_keeps_them_on_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[rules]]\nfrom = \"/a\"\nto = \"/b\"").unwrap();

        let handle = RuleHandle::new(RuleSet::default());
        let watcher = ConfigWatcher::new(file.path(), handle.clone(), None);
        assert_eq!(watcher.reload().unwrap(), 1);
        assert_eq!(handle.load().len(), 1);

        std::fs::write(file.path(), "[[rules]]\nfrom = \"/a/:x([)\"\nto = \"/b\"\n").unwrap();
        assert!(matches!(watcher.reload(), Err(ConfigError::Rule { .. })));
        assert_eq!(handle.load().len(), 1);
    }
}
