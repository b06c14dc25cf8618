// Round state machine.
//
// The controller owns the current entity, the session score, and the two
// kinds of background work a round can have outstanding: the catalog fetch
// and the auto-advance timer. Both run as spawned tasks that post a
// `RoundEvent` back through an mpsc channel; every event is tagged with the
// round it was issued for, and events for superseded rounds are dropped.

use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, RngCore};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use whosthat_catalog::{CatalogClient, NetworkError};
use whosthat_core::config::{CatalogConfig, Config, RoundConfig};
use whosthat_core::entity::GuessableEntity;
use whosthat_core::protocol::{EntityView, GuessOutcome, RoundId, RoundSnapshot, RoundState};
use whosthat_core::score::ScoreStore;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const PROMPT_MESSAGE: &str = "Who's that Pokémon?";
pub const LOADING_MESSAGE: &str = "Loading...";
pub const RETRY_MESSAGE: &str = "Try again...";
pub const ERROR_MESSAGE: &str = "Connection error. Press start to try again.";

/// Buffer size for the round event channel. At most one fetch and one timer
/// are outstanding, so this only has to absorb a few stale completions.
pub const ROUND_EVENT_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Completion of background work, delivered to `RoundController::handle_event`.
#[derive(Debug)]
pub enum RoundEvent {
    /// The catalog fetch issued for `round` finished.
    Fetched {
        round: RoundId,
        result: Result<GuessableEntity, NetworkError>,
    },
    /// The auto-advance delay armed in `round` elapsed.
    AdvanceDue { round: RoundId },
}

impl RoundEvent {
    pub fn round(&self) -> RoundId {
        match self {
            RoundEvent::Fetched { round, .. } => *round,
            RoundEvent::AdvanceDue { round } => *round,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSettings {
    /// Ids are drawn uniformly from `1..=max_id`.
    pub max_id: u32,
    pub advance_delay: Duration,
}

impl RoundSettings {
    pub fn from_config(config: &Config) -> Self {
        Self::from_sections(&config.catalog, &config.round)
    }

    fn from_sections(catalog: &CatalogConfig, round: &RoundConfig) -> Self {
        Self {
            max_id: catalog.max_id,
            advance_delay: round.advance_delay(),
        }
    }
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self::from_sections(&CatalogConfig::default(), &RoundConfig::default())
    }
}

// ---------------------------------------------------------------------------
// RoundController
// ---------------------------------------------------------------------------

pub struct RoundController {
    catalog: Arc<dyn CatalogClient>,
    scores: Arc<ScoreStore>,
    rng: Box<dyn RngCore + Send + Sync>,
    settings: RoundSettings,
    event_tx: mpsc::Sender<RoundEvent>,

    /// Id of the current round. Incremented by every `start()`; events whose
    /// tag differs are stale and get discarded in `handle_event`.
    round: RoundId,
    state: RoundState,
    entity: Option<GuessableEntity>,
    guess_input: String,
    message: String,
    session_score: u32,
    /// Last best score read back from the store, for display.
    best_score: u32,

    fetch_task: Option<JoinHandle<()>>,
    advance_timer: Option<JoinHandle<()>>,
}

impl RoundController {
    /// Create an idle controller. Background work posts its completions to
    /// `event_tx`; the owner must feed them back through `handle_event`.
    ///
    /// `rng` picks catalog ids; pass a seeded `StdRng` for reproducible
    /// rounds.
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        scores: Arc<ScoreStore>,
        settings: RoundSettings,
        rng: Box<dyn RngCore + Send + Sync>,
        event_tx: mpsc::Sender<RoundEvent>,
    ) -> Self {
        let best_score = match scores.get_best() {
            Ok(best) => best,
            Err(e) => {
                warn!("Failed to read best score, showing 0: {:#}", e);
                0
            }
        };
        let settings = RoundSettings {
            max_id: settings.max_id.max(1),
            ..settings
        };

        RoundController {
            catalog,
            scores,
            rng,
            settings,
            event_tx,
            round: RoundId::default(),
            state: RoundState::Idle,
            entity: None,
            guess_input: String::new(),
            message: PROMPT_MESSAGE.to_string(),
            session_score: 0,
            best_score,
            fetch_task: None,
            advance_timer: None,
        }
    }

    // -- accessors --

    pub fn round(&self) -> RoundId {
        self.round
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn entity(&self) -> Option<&GuessableEntity> {
        self.entity.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn guess_input(&self) -> &str {
        &self.guess_input
    }

    pub fn session_score(&self) -> u32 {
        self.session_score
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn has_pending_fetch(&self) -> bool {
        self.fetch_task.is_some()
    }

    pub fn has_pending_advance(&self) -> bool {
        self.advance_timer.is_some()
    }

    /// Owned view for presentation code.
    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            round: self.round,
            state: self.state,
            message: self.message.clone(),
            guess_input: self.guess_input.clone(),
            session_score: self.session_score,
            best_score: self.best_score,
            entity: self.entity.as_ref().map(EntityView::from),
        }
    }

    // -- transitions --

    /// Start a new round from any state.
    ///
    /// Supersedes the current round: the in-flight fetch and the pending
    /// auto-advance timer are cancelled, the held entity is dropped, and a
    /// fetch for a randomly chosen id is spawned. Returns the new round id.
    pub fn start(&mut self) -> RoundId {
        self.cancel_pending();

        self.round = self.round.next();
        let round = self.round;
        let id = self.rng.random_range(1..=self.settings.max_id);

        self.state = RoundState::Loading;
        self.entity = None;
        self.message = LOADING_MESSAGE.to_string();

        let catalog = Arc::clone(&self.catalog);
        let tx = self.event_tx.clone();
        let handle = tokio::spawn(async move {
            let result = catalog.fetch_by_id(id).await;
            if tx.send(RoundEvent::Fetched { round, result }).await.is_err() {
                debug!(%round, "round event receiver dropped before fetch completed");
            }
        });
        self.fetch_task = Some(handle);

        info!(%round, entity_id = id, "Round started");
        round
    }

    /// Apply a background completion. Returns `true` if it changed anything.
    ///
    /// Events tagged with a round other than the current one are stale (the
    /// round was restarted while they were in flight) and are ignored.
    pub fn handle_event(&mut self, event: RoundEvent) -> bool {
        let event_round = event.round();
        if event_round != self.round {
            debug!(
                "Discarding stale round event (event round: {}, current round: {})",
                event_round, self.round
            );
            return false;
        }

        match (self.state, event) {
            (RoundState::Loading, RoundEvent::Fetched { result: Ok(entity), .. }) => {
                self.fetch_task = None;
                info!(round = %self.round, entity_id = entity.id(), "Entity loaded");
                self.entity = Some(entity);
                self.guess_input.clear();
                self.message = PROMPT_MESSAGE.to_string();
                self.state = RoundState::AwaitingGuess;
                true
            }
            (RoundState::Loading, RoundEvent::Fetched { result: Err(e), .. }) => {
                self.fetch_task = None;
                warn!(round = %self.round, "Catalog fetch failed: {}", e);
                self.entity = None;
                self.message = ERROR_MESSAGE.to_string();
                self.state = RoundState::Failed;
                true
            }
            (RoundState::Resolved, RoundEvent::AdvanceDue { .. }) => {
                self.advance_timer = None;
                debug!(round = %self.round, "Auto-advancing to next round");
                self.start();
                true
            }
            (state, event) => {
                debug!(?state, ?event, "Ignoring round event that does not apply");
                false
            }
        }
    }

    /// Replace the text in the guess input.
    pub fn update_guess_input(&mut self, text: impl Into<String>) {
        self.guess_input = text.into();
    }

    /// Submit whatever is currently in the guess input.
    pub fn submit_current_guess(&mut self) -> GuessOutcome {
        let guess = self.guess_input.clone();
        self.submit_guess(&guess)
    }

    /// Evaluate `guess` against the current entity.
    ///
    /// Only meaningful in `AwaitingGuess`; anywhere else it is ignored. A
    /// wrong guess only changes the message, and attempts are unlimited. A
    /// right one reveals the entity, bumps the session score, ratchets the
    /// stored best, and arms the auto-advance timer.
    pub fn submit_guess(&mut self, guess: &str) -> GuessOutcome {
        if self.state != RoundState::AwaitingGuess {
            debug!(state = ?self.state, "Ignoring guess outside AwaitingGuess");
            return GuessOutcome::Ignored;
        }
        let Some(entity) = self.entity.as_mut() else {
            return GuessOutcome::Ignored;
        };

        if !entity.matches_guess(guess) {
            debug!(round = %self.round, "Incorrect guess");
            self.message = RETRY_MESSAGE.to_string();
            return GuessOutcome::Incorrect;
        }

        entity.reveal();
        let display_name = entity.canonical_name().trim().to_uppercase();

        self.session_score += 1;
        self.record_session_score();

        self.message = format!("Correct! It's {display_name}");
        self.state = RoundState::Resolved;
        self.arm_advance_timer();

        info!(
            round = %self.round,
            session_score = self.session_score,
            best_score = self.best_score,
            "Correct guess"
        );
        GuessOutcome::Correct
    }

    /// Abort the in-flight fetch and the pending auto-advance timer, if any.
    pub fn cancel_pending(&mut self) {
        if let Some(handle) = self.fetch_task.take() {
            handle.abort();
            debug!(round = %self.round, "Cancelled in-flight fetch");
        }
        if let Some(handle) = self.advance_timer.take() {
            handle.abort();
            debug!(round = %self.round, "Cancelled pending auto-advance");
        }
    }

    // -- helpers --

    fn record_session_score(&mut self) {
        let candidate = self.session_score;
        let stored = self
            .scores
            .record_score(candidate)
            .and_then(|_| self.scores.get_best());

        match stored {
            Ok(best) => self.best_score = best,
            Err(e) => {
                warn!("Failed to persist session score {}: {:#}", candidate, e);
                self.best_score = self.best_score.max(candidate);
            }
        }
    }

    fn arm_advance_timer(&mut self) {
        if let Some(handle) = self.advance_timer.take() {
            handle.abort();
        }

        let round = self.round;
        // The delay runs from the correct guess, not from when the task is
        // first polled.
        let deadline = tokio::time::Instant::now() + self.settings.advance_delay;
        let tx = self.event_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(RoundEvent::AdvanceDue { round }).await;
        });
        self.advance_timer = Some(handle);
    }
}

impl Drop for RoundController {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
