// Types exchanged between the round controller and presentation code.

use std::fmt;

use serde::Serialize;

use crate::entity::{GuessableEntity, Obfuscation};

// ---------------------------------------------------------------------------
// Round identity and state
// ---------------------------------------------------------------------------

/// Generation counter for rounds. Bumped every time a round starts; async
/// completions carry the id they were issued for so stale ones can be
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct RoundId(pub u64);

impl RoundId {
    pub fn next(self) -> Self {
        RoundId(self.0 + 1)
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// Constructed, no round started yet.
    Idle,
    /// A fetch is in flight.
    Loading,
    /// An entity is shown and guesses are accepted.
    AwaitingGuess,
    /// Guessed correctly; waiting for the auto-advance timer.
    Resolved,
    /// The fetch failed. Stays here until the user starts a new round.
    Failed,
}

/// Result of a `submit_guess` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuessOutcome {
    Correct,
    Incorrect,
    /// No entity was awaiting a guess; nothing changed.
    Ignored,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// What presentation code may show about the current entity. The name is
/// withheld until the entity is revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityView {
    pub id: u32,
    pub image_ref: String,
    pub obfuscation: Obfuscation,
    pub category_tags: Vec<String>,
    pub trait_tags: Vec<String>,
    pub first_letter_hint: String,
    pub last_letter_hint: String,
    pub revealed_name: Option<String>,
}

impl From<&GuessableEntity> for EntityView {
    fn from(entity: &GuessableEntity) -> Self {
        EntityView {
            id: entity.id(),
            image_ref: entity.image_ref().to_string(),
            obfuscation: entity.visual_obfuscation(),
            category_tags: entity.category_tags().to_vec(),
            trait_tags: entity.trait_tags().to_vec(),
            first_letter_hint: entity.first_letter_hint(),
            last_letter_hint: entity.last_letter_hint(),
            revealed_name: (!entity.is_hidden()).then(|| entity.canonical_name().to_string()),
        }
    }
}

/// Owned view of the whole controller, pushed to presentation after every
/// change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundSnapshot {
    pub round: RoundId,
    pub state: RoundState,
    pub message: String,
    pub guess_input: String,
    pub session_score: u32,
    pub best_score: u32,
    pub entity: Option<EntityView>,
}

// ---------------------------------------------------------------------------
// Presentation channel messages
// ---------------------------------------------------------------------------

/// Commands presentation code sends to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Start a new round, superseding whatever is in progress.
    Start,
    /// Replace the text in the guess input.
    UpdateGuess(String),
    /// Submit a guess. `None` submits the current guess input.
    SubmitGuess(Option<String>),
    Quit,
}

/// Updates the event loop pushes to presentation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiUpdate {
    Snapshot(Box<RoundSnapshot>),
    GuessEvaluated(GuessOutcome),
}
