//! Hot reload of the configuration file.
//!
//! The parent directory is watched rather than the file itself: editors and
//! config management tools usually replace the file through a rename, which
//! a watch on the old inode would miss.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::HsbConfig;

/// Sends every validated, changed configuration on a channel.
pub struct ConfigWatcher {
    path: PathBuf,
    initial: Option<HsbConfig>,
    updates: mpsc::UnboundedSender<HsbConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<HsbConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            initial: None,
            updates,
        };
        (watcher, rx)
    }

    /// Suppress reloads that would yield `config` again.
    pub fn starting_from(mut self, config: HsbConfig) -> Self {
        self.initial = Some(config);
        self
    }

    /// Start watching. Updates stop when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            initial,
            updates,
        } = self;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let target = path.clone();
        let mut last = initial;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_relevant(&event, &target) => {
                    match load_config(&target) {
                        Ok(next) if last.as_ref() == Some(&next) => {
                            tracing::debug!(path = %target.display(), "Config file touched, no changes");
                        }
                        Ok(next) => {
                            tracing::info!(path = %target.display(), "Config file changed, reloading");
                            last = Some(next.clone());
                            let _ = updates.send(next);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Rejected config change, keeping current configuration");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %path.display(), "Watching config file");
        Ok(watcher)
    }
}

/// A write, create or rename that touches `target`.
fn is_relevant(event: &Event, target: &Path) -> bool {
    let kind_matches = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_));
    let name = target.file_name();
    kind_matches && event.paths.iter().any(|p| p.file_name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_relevant_events() {
        let target = Path::new("/etc/hsb/hsb.toml");

        assert!(is_relevant(&event(EventKind::Modify(ModifyKind::Any), "/etc/hsb/hsb.toml"), target));
        assert!(is_relevant(&event(EventKind::Create(CreateKind::File), "/etc/hsb/hsb.toml"), target));
        assert!(!is_relevant(&event(EventKind::Modify(ModifyKind::Any), "/etc/hsb/other.toml"), target));
        assert!(!is_relevant(&event(EventKind::Access(AccessKind::Any), "/etc/hsb/hsb.toml"), target));
    }

    #[tokio::test]
    async fn test_watch_starts_on_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hsb.toml");
        std::fs::write(&path, "").unwrap();

        let (watcher, _rx) = ConfigWatcher::new(&path);
        assert!(watcher.run().is_ok());
    }
}
