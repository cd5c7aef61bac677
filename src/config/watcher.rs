//! Configuration file watcher for hot-reload support

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use super::AppConfig;

/// Quiet period after the last file event before the config is reloaded
pub const RELOAD_DEBOUNCE: Duration = Duration::from_millis(250);

/// Config watcher that monitors file changes and sends reload notifications
///
/// A burst of file events (editors write, truncate and rename on one save)
/// produces a single reload once the file has been quiet for
/// [`RELOAD_DEBOUNCE`]. Only valid configs are delivered; a file that fails
/// to parse or validate is reported and the previous config stays in force.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<AppConfig>,
}

impl ConfigWatcher {
    /// Create a new config watcher for the specified file
    pub async fn new(config_path: String) -> Result<(Self, Arc<AppConfig>)> {
        let (tx, rx) = mpsc::channel(10);

        let initial_config = AppConfig::load(&config_path)
            .await
            .context("Failed to load initial config")?;

        // notify callbacks run on their own OS thread, not in Tokio context
        let runtime = Handle::current();
        let generation = Arc::new(AtomicU64::new(0));
        let path = config_path.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) => {
                let this_generation = generation.fetch_add(1, Ordering::SeqCst) + 1;
                trace!("Config file event #{}: {:?}", this_generation, event.paths);
                runtime.spawn(reload_when_quiet(
                    path.clone(),
                    generation.clone(),
                    this_generation,
                    tx.clone(),
                ));
            }
            Ok(_) => {}
            Err(e) => error!("Watch error: {}", e),
        })?;

        watcher
            .watch(Path::new(&config_path), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config file: {}", config_path))?;

        info!("Config file watcher started for: {}", config_path);

        Ok((Self { _watcher: watcher, rx }, Arc::new(initial_config)))
    }

    /// Wait for the next config update
    /// Returns None if the watcher has been closed
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        self.rx.recv().await
    }
}

/// Reload after the debounce period unless a later event superseded this one
async fn reload_when_quiet(
    path: String,
    generation: Arc<AtomicU64>,
    this_generation: u64,
    tx: mpsc::Sender<AppConfig>,
) {
    tokio::time::sleep(RELOAD_DEBOUNCE).await;
    if generation.load(Ordering::SeqCst) != this_generation {
        return;
    }

    debug!("Config file settled, reloading {}", path);
    match AppConfig::load(&path).await {
        Ok(config) => {
            info!("Configuration reloaded successfully");
            if let Err(e) = tx.send(config).await {
                error!("Failed to send config update: {}", e);
            }
        }
        Err(e) => warn!("Failed to reload config (keeping old config): {:#}", e),
    }
}
