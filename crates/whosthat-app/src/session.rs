// Session wiring: config -> database -> score store -> catalog client ->
// round controller -> event loop task.
//
// `spawn` is the boundary presentation code talks to. It returns a handle
// holding the command sender and the snapshot receiver; everything else
// lives inside the spawned loop.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use whosthat_catalog::{CatalogClient, PokeApiClient};
use whosthat_core::config::{self, Config};
use whosthat_core::db::Database;
use whosthat_core::protocol::{UiUpdate, UserCommand};
use whosthat_core::score::ScoreStore;
use whosthat_core::store::KeyValueStore;

use crate::app;
use crate::round::{RoundController, RoundSettings, ROUND_EVENT_CAPACITY};

const COMMAND_CAPACITY: usize = 64;
const UI_CAPACITY: usize = 256;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a running game session.
pub struct Session {
    /// Send commands to the round controller.
    pub commands: mpsc::Sender<UserCommand>,
    /// Snapshots and guess outcomes pushed by the event loop.
    pub updates: mpsc::Receiver<UiUpdate>,
    handle: JoinHandle<()>,
}

impl Session {
    /// Ask the loop to quit and wait for it, up to a short timeout.
    pub async fn shutdown(self) {
        let _ = self.commands.send(UserCommand::Quit).await;
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, self.handle)
            .await
            .is_err()
        {
            warn!("Round event loop did not exit within {:?}", SHUTDOWN_TIMEOUT);
        }
    }
}

/// Everything `spawn_with` needs besides the config file.
pub struct SessionParts {
    pub catalog: Arc<dyn CatalogClient>,
    pub store: Arc<dyn KeyValueStore>,
    pub settings: RoundSettings,
    pub rng: Box<dyn RngCore + Send + Sync>,
}

/// Load config from `base_dir` (copying defaults when missing) and spawn a
/// session against it.
pub fn launch(base_dir: &Path) -> anyhow::Result<Session> {
    let config = config::load_config(base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: catalog={}, max_id={}, advance_delay={}ms",
        config.catalog.base_url, config.catalog.max_id, config.round.advance_delay_ms
    );
    spawn(&config)
}

/// Open the database, build the HTTP catalog client, and spawn a session.
/// The first round starts immediately.
///
/// Must be called from within a tokio runtime.
pub fn spawn(config: &Config) -> anyhow::Result<Session> {
    let db = open_database(&config.db_path)?;
    let catalog =
        PokeApiClient::from_config(&config.catalog).context("failed to build catalog client")?;

    Ok(spawn_with(SessionParts {
        catalog: Arc::new(catalog),
        store: Arc::new(db),
        settings: RoundSettings::from_config(config),
        rng: Box::new(StdRng::from_os_rng()),
    }))
}

/// Spawn a session from pre-built parts. The first round starts immediately.
pub fn spawn_with(parts: SessionParts) -> Session {
    let (event_tx, event_rx) = mpsc::channel(ROUND_EVENT_CAPACITY);
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (ui_tx, ui_rx) = mpsc::channel(UI_CAPACITY);

    let scores = Arc::new(ScoreStore::new(parts.store));
    let mut controller =
        RoundController::new(parts.catalog, scores, parts.settings, parts.rng, event_tx);
    controller.start();

    let handle = tokio::spawn(async move {
        if let Err(e) = app::run(event_rx, cmd_rx, ui_tx, controller).await {
            error!("Round event loop error: {}", e);
        }
    });

    Session {
        commands: cmd_tx,
        updates: ui_rx,
        handle,
    }
}

/// Open (or create) the SQLite database at `path`, creating parent
/// directories as needed.
pub fn open_database(path: &Path) -> anyhow::Result<Database> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let path_str = path
        .to_str()
        .with_context(|| format!("database path is not valid UTF-8: {}", path.display()))?;
    let db = Database::open(path_str).context("failed to open database")?;
    info!("Database opened at {}", path.display());
    Ok(db)
}
