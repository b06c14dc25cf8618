// Integration tests for the guessing game.
//
// These drive a full session through its public boundary: commands go in
// through `Session::commands`, snapshots come out of `Session::updates`. The
// catalog is a wiremock server and scores land in a SQLite file in a temp
// directory, so every layer (HTTP mapping, round state machine, event loop,
// persistence, config loading) runs for real.

use std::path::Path;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use whosthat_app::round::ERROR_MESSAGE;
use whosthat_app::session::{self, Session};
use whosthat_core::config::{self, CatalogConfig, Config, RoundConfig, CONFIG_FILE_NAME};
use whosthat_core::db::Database;
use whosthat_core::protocol::{GuessOutcome, RoundSnapshot, RoundState, UiUpdate, UserCommand};
use whosthat_core::score::ScoreStore;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ===========================================================================
// Test helpers
// ===========================================================================

const CATALOG_PATH: &str = "/api/v2/pokemon";
const WAIT: Duration = Duration::from_secs(10);

fn mew_body() -> serde_json::Value {
    json!({
        "id": 151,
        "name": "mew",
        "sprites": {
            "other": {
                "official-artwork": { "front_default": "https://img.example/151.png" }
            }
        },
        "types": [{ "slot": 1, "type": { "name": "psychic" } }],
        "abilities": [{ "ability": { "name": "synchronize" }, "slot": 1 }]
    })
}

fn entity_path() -> wiremock::matchers::PathRegexMatcher {
    path_regex(format!(r"^{CATALOG_PATH}/\d+$"))
}

/// Catalog that answers every id with mew.
async fn mew_catalog() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(entity_path())
        .respond_with(ResponseTemplate::new(200).set_body_json(mew_body()))
        .mount(&server)
        .await;
    server
}

fn test_config(server: &MockServer, dir: &Path, advance_delay_ms: u64) -> Config {
    Config {
        catalog: CatalogConfig {
            base_url: format!("{}{CATALOG_PATH}", server.uri()),
            max_id: 151,
            timeout_secs: 5,
        },
        round: RoundConfig { advance_delay_ms },
        db_path: dir.join("scores.db"),
    }
}

/// Wait for the next snapshot in `state`, skipping everything else.
async fn wait_for_state(session: &mut Session, state: RoundState) -> RoundSnapshot {
    tokio::time::timeout(WAIT, async {
        loop {
            match session.updates.recv().await {
                Some(UiUpdate::Snapshot(s)) if s.state == state => return *s,
                Some(_) => continue,
                None => panic!("update channel closed while waiting for {state:?}"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {state:?}"))
}

/// Wait for the next guess outcome.
async fn wait_for_outcome(session: &mut Session) -> GuessOutcome {
    tokio::time::timeout(WAIT, async {
        loop {
            match session.updates.recv().await {
                Some(UiUpdate::GuessEvaluated(outcome)) => return outcome,
                Some(_) => continue,
                None => panic!("update channel closed while waiting for outcome"),
            }
        }
    })
    .await
    .expect("timed out waiting for guess outcome")
}

async fn guess(session: &mut Session, text: &str) -> GuessOutcome {
    session
        .commands
        .send(UserCommand::SubmitGuess(Some(text.to_string())))
        .await
        .unwrap();
    wait_for_outcome(session).await
}

fn stored_best(db_path: &Path) -> u32 {
    let db = Database::open(db_path.to_str().unwrap()).unwrap();
    ScoreStore::new(std::sync::Arc::new(db)).get_best().unwrap()
}

// ===========================================================================
// Full round
// ===========================================================================

#[tokio::test]
async fn full_round_against_http_catalog() {
    let server = mew_catalog().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), 60_000);

    let mut session = session::spawn(&config).unwrap();

    // The first round starts on spawn.
    let ready = wait_for_state(&mut session, RoundState::AwaitingGuess).await;
    let view = ready.entity.expect("entity loaded");
    assert_eq!(view.revealed_name, None);
    assert_eq!(view.category_tags, vec!["psychic".to_string()]);
    assert_eq!(view.first_letter_hint, "M");
    assert_eq!(view.last_letter_hint, "W");
    assert_eq!(ready.best_score, 0);

    assert_eq!(guess(&mut session, "mewtwo").await, GuessOutcome::Incorrect);
    assert_eq!(guess(&mut session, "  MEW ").await, GuessOutcome::Correct);

    let solved = wait_for_state(&mut session, RoundState::Resolved).await;
    assert_eq!(solved.session_score, 1);
    assert_eq!(solved.best_score, 1);
    assert_eq!(solved.message, "Correct! It's MEW");
    assert_eq!(solved.entity.unwrap().revealed_name.as_deref(), Some("mew"));

    session.shutdown().await;
    assert_eq!(stored_best(&config.db_path), 1);
}

#[tokio::test]
async fn rounds_auto_advance_and_accumulate_score() {
    let server = mew_catalog().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), 50);

    let mut session = session::spawn(&config).unwrap();

    for expected in 1..=3 {
        wait_for_state(&mut session, RoundState::AwaitingGuess).await;
        assert_eq!(guess(&mut session, "mew").await, GuessOutcome::Correct);
        let solved = wait_for_state(&mut session, RoundState::Resolved).await;
        assert_eq!(solved.session_score, expected);
    }

    session.shutdown().await;
    assert_eq!(stored_best(&config.db_path), 3);
}

// ===========================================================================
// Persistence across sessions
// ===========================================================================

#[tokio::test]
async fn best_score_survives_a_new_session_and_only_ratchets_up() {
    let server = mew_catalog().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), 50);

    // First session: score 2.
    let mut first = session::spawn(&config).unwrap();
    for _ in 0..2 {
        wait_for_state(&mut first, RoundState::AwaitingGuess).await;
        guess(&mut first, "mew").await;
    }
    first.shutdown().await;

    // Second session starts at 0 but shows the stored best.
    let mut second = session::spawn(&config).unwrap();
    let ready = wait_for_state(&mut second, RoundState::AwaitingGuess).await;
    assert_eq!(ready.session_score, 0);
    assert_eq!(ready.best_score, 2);

    // Scoring 1 does not lower the stored best.
    guess(&mut second, "mew").await;
    let solved = wait_for_state(&mut second, RoundState::Resolved).await;
    assert_eq!(solved.session_score, 1);
    assert_eq!(solved.best_score, 2);
    second.shutdown().await;

    assert_eq!(stored_best(&config.db_path), 2);
}

// ===========================================================================
// Failure handling
// ===========================================================================

#[tokio::test]
async fn server_error_fails_round_until_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(entity_path())
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(entity_path())
        .respond_with(ResponseTemplate::new(200).set_body_json(mew_body()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut session = session::spawn(&test_config(&server, dir.path(), 60_000)).unwrap();

    let failed = wait_for_state(&mut session, RoundState::Failed).await;
    assert_eq!(failed.message, ERROR_MESSAGE);
    assert!(failed.entity.is_none());

    // Guessing while failed is ignored.
    assert_eq!(guess(&mut session, "mew").await, GuessOutcome::Ignored);

    session.commands.send(UserCommand::Start).await.unwrap();
    let ready = wait_for_state(&mut session, RoundState::AwaitingGuess).await;
    assert!(ready.entity.is_some());
    assert_eq!(ready.session_score, 0);

    session.shutdown().await;
}

#[tokio::test]
async fn malformed_payload_fails_round() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(entity_path())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "name": "x" })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut session = session::spawn(&test_config(&server, dir.path(), 60_000)).unwrap();

    let failed = wait_for_state(&mut session, RoundState::Failed).await;
    assert_eq!(failed.message, ERROR_MESSAGE);
    session.shutdown().await;
}

// ===========================================================================
// Config-driven launch
// ===========================================================================

#[tokio::test]
async fn launch_copies_defaults_and_uses_configured_paths() {
    let server = mew_catalog().await;
    let dir = TempDir::new().unwrap();
    let defaults = dir.path().join("defaults");
    std::fs::create_dir_all(&defaults).unwrap();
    std::fs::write(
        defaults.join(CONFIG_FILE_NAME),
        format!(
            r#"
[catalog]
base_url = "{}{CATALOG_PATH}"
max_id = 10
timeout_secs = 5

[round]
advance_delay_ms = 60000

[database]
path = "data/scores.db"
"#,
            server.uri()
        ),
    )
    .unwrap();

    let mut session = session::launch(dir.path()).unwrap();
    assert!(dir.path().join("config").join(CONFIG_FILE_NAME).exists());

    wait_for_state(&mut session, RoundState::AwaitingGuess).await;
    guess(&mut session, "mew").await;
    session.shutdown().await;

    assert_eq!(stored_best(&dir.path().join("data").join("scores.db")), 1);
}

#[test]
fn shipped_defaults_are_valid() {
    let dir = TempDir::new().unwrap();
    let defaults = dir.path().join("defaults");
    std::fs::create_dir_all(&defaults).unwrap();
    std::fs::copy(
        Path::new("defaults").join(CONFIG_FILE_NAME),
        defaults.join(CONFIG_FILE_NAME),
    )
    .expect("defaults/whosthat.toml should exist");

    let config = config::load_config(dir.path()).unwrap();
    assert_eq!(config.catalog.base_url, "https://pokeapi.co/api/v2/pokemon");
    assert_eq!(config.catalog.max_id, 151);
    assert_eq!(config.round.advance_delay_ms, 2500);
}
