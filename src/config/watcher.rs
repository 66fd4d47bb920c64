//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;

/// Watch `path` and emit each successfully loaded-and-validated config.
///
/// A config that fails to load keeps the current one in place; the failure
/// is logged and nothing is emitted. The returned watcher must be kept
/// alive for events to flow.
pub fn watch(
    path: &Path,
) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<ProxyConfig>), notify::Error> {
    let (tx, rx) = mpsc::unbounded_channel();
    let watched: PathBuf = path.to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                tracing::info!(path = ?watched, "Config file change detected, reloading");
                match load_config(&watched) {
                    Ok(config) => {
                        let _ = tx.send(config);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Reload failed, keeping current configuration");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Config watch error"),
        },
        Config::default().with_poll_interval(Duration::from_secs(2)),
    )?;

    watcher.watch(path, RecursiveMode::NonRecursive)?;
    tracing::info!(path = ?path, "Config watcher started");

    Ok((watcher, rx))
}
