use crate::config::AppConfig;
use crate::config_loader::ConfigLoader;
use anyhow::Result;
use notify::{Event, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;
use tokio::sync::watch;

/// How often the watcher thread checks whether anyone is still listening.
const LISTENER_POLL: Duration = Duration::from_millis(500);

/// Reloads the configuration file on modification and broadcasts the result.
///
/// Order parameters edited in the file reach the cost aggregator through
/// this channel without restarting the feed.
pub struct ConfigWatcher {
    tx: watch::Sender<AppConfig>,
}

impl ConfigWatcher {
    /// Creates a new configuration watcher with an initial configuration.
    ///
    /// Returns a tuple of the watcher and a receiver for configuration updates.
    #[must_use]
    pub fn new(initial_config: AppConfig) -> (Self, watch::Receiver<AppConfig>) {
        let (tx, rx) = watch::channel(initial_config);
        (Self { tx }, rx)
    }

    /// Applies a reload result, keeping the previous configuration on failure.
    ///
    /// Returns true if subscribers were notified.
    pub fn apply(&self, reloaded: Result<AppConfig>) -> bool {
        match reloaded {
            Ok(new_config) => {
                let changed = self.tx.send_if_modified(|current| {
                    if *current == new_config {
                        false
                    } else {
                        *current = new_config;
                        true
                    }
                });
                if changed {
                    tracing::info!("Config reloaded successfully");
                } else {
                    tracing::debug!("Config file touched but contents unchanged");
                }
                changed
            }
            Err(e) => {
                tracing::error!("Failed to reload config, keeping previous: {}", e);
                false
            }
        }
    }

    /// Watches the configuration file for changes and broadcasts updates.
    ///
    /// Runs until every receiver has been dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if file watching cannot be initiated or if the watcher task fails.
    pub async fn watch(self, config_path: impl Into<PathBuf>) -> Result<()> {
        let config_path = config_path.into();

        tokio::task::spawn_blocking(move || {
            let (notify_tx, notify_rx) = std::sync::mpsc::channel();

            let mut watcher = notify::recommended_watcher(move |res: Result<Event, _>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            })?;

            watcher.watch(Path::new(&config_path), RecursiveMode::NonRecursive)?;
            tracing::info!(path = %config_path.display(), "Watching config file");

            loop {
                match notify_rx.recv_timeout(LISTENER_POLL) {
                    Ok(event) if event.kind.is_modify() => {
                        tracing::info!("Config file changed, reloading...");
                        self.apply(ConfigLoader::load_from(&config_path));
                    }
                    Ok(_) => {}
                    Err(RecvTimeoutError::Timeout) if self.tx.is_closed() => break,
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::debug!(path = %config_path.display(), "Stopped watching config file");

            Ok::<_, anyhow::Error>(())
        })
        .await??;

        Ok(())
    }
}
