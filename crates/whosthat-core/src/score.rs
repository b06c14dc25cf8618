// Durable best-score tracking.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::store::KeyValueStore;

/// Key the best score is persisted under.
pub const BEST_SCORE_KEY: &str = "best_score";

/// High-water mark of session scores, persisted through a [`KeyValueStore`].
///
/// The stored value only ever grows: `record_score` writes a candidate only
/// when it is strictly greater than what is already stored.
pub struct ScoreStore {
    store: Arc<dyn KeyValueStore>,
    /// Serializes read-compare-write so two recorders sharing this store
    /// cannot interleave and lose the higher value.
    write_lock: Mutex<()>,
}

impl ScoreStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Current best score. Absent or unparseable data reads as 0.
    pub fn get_best(&self) -> Result<u32> {
        let raw = self.store.get(BEST_SCORE_KEY)?;
        Ok(raw.as_deref().map(parse_score).unwrap_or(0))
    }

    /// Persist `candidate` if it beats the stored best. Returns `true` when a
    /// write happened.
    pub fn record_score(&self, candidate: u32) -> Result<bool> {
        let _guard = self.write_lock.lock().expect("score store mutex poisoned");

        let current = self.get_best()?;
        if candidate <= current {
            debug!(candidate, current, "score does not beat stored best");
            return Ok(false);
        }

        self.store.set(BEST_SCORE_KEY, &candidate.to_string())?;
        info!(previous = current, best = candidate, "new best score");
        Ok(true)
    }
}

/// Decimal integer string to score. Anything else is treated as absent.
fn parse_score(raw: &str) -> u32 {
    match raw.trim().parse::<u32>() {
        Ok(n) => n,
        Err(e) => {
            warn!(raw, error = %e, "ignoring malformed persisted best score");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::store::MemoryStore;

    fn fresh() -> (Arc<MemoryStore>, ScoreStore) {
        let kv = Arc::new(MemoryStore::new());
        let scores = ScoreStore::new(kv.clone());
        (kv, scores)
    }

    #[test]
    fn fresh_store_reads_zero() {
        let (_, scores) = fresh();
        assert_eq!(scores.get_best().unwrap(), 0);
    }

    #[test]
    fn ratchet_scenario() {
        let (_, scores) = fresh();

        assert!(scores.record_score(3).unwrap());
        assert_eq!(scores.get_best().unwrap(), 3);

        assert!(!scores.record_score(2).unwrap());
        assert_eq!(scores.get_best().unwrap(), 3);

        assert!(scores.record_score(5).unwrap());
        assert_eq!(scores.get_best().unwrap(), 5);
    }

    #[test]
    fn ties_are_not_written() {
        let (_, scores) = fresh();
        scores.record_score(4).unwrap();
        assert!(!scores.record_score(4).unwrap());
        assert_eq!(scores.get_best().unwrap(), 4);
    }

    #[test]
    fn record_then_get_is_max_of_previous_and_candidate() {
        let (_, scores) = fresh();
        let mut previous = 0;
        for candidate in [0, 7, 1, 7, 8, 3, 20, 19] {
            scores.record_score(candidate).unwrap();
            let expected = previous.max(candidate);
            assert_eq!(scores.get_best().unwrap(), expected, "candidate {candidate}");
            previous = expected;
        }
    }

    #[test]
    fn zero_candidate_on_fresh_store_is_noop() {
        let (kv, scores) = fresh();
        assert!(!scores.record_score(0).unwrap());
        assert_eq!(kv.get(BEST_SCORE_KEY).unwrap(), None);
    }

    #[test]
    fn persists_as_decimal_string() {
        let (kv, scores) = fresh();
        scores.record_score(42).unwrap();
        assert_eq!(kv.get(BEST_SCORE_KEY).unwrap().as_deref(), Some("42"));
    }

    #[test]
    fn malformed_value_reads_as_zero() {
        let (kv, scores) = fresh();
        for garbage in ["", "abc", "-3", "4.5", "99999999999999999999"] {
            kv.set(BEST_SCORE_KEY, garbage).unwrap();
            assert_eq!(scores.get_best().unwrap(), 0, "value {garbage:?}");
        }
    }

    #[test]
    fn malformed_value_is_replaced_by_any_positive_score() {
        let (kv, scores) = fresh();
        kv.set(BEST_SCORE_KEY, "not a number").unwrap();
        assert!(scores.record_score(1).unwrap());
        assert_eq!(scores.get_best().unwrap(), 1);
    }

    #[test]
    fn concurrent_recorders_keep_the_maximum() {
        let (_, scores) = fresh();
        let scores = Arc::new(scores);

        let handles: Vec<_> = (1..=32)
            .map(|n| {
                let scores = Arc::clone(&scores);
                std::thread::spawn(move || scores.record_score(n).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(scores.get_best().unwrap(), 32);
    }

    #[test]
    fn best_score_survives_restart_with_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.db");
        let path = path.to_str().unwrap();

        {
            let scores = ScoreStore::new(Arc::new(Database::open(path).unwrap()));
            scores.record_score(9).unwrap();
        }

        let scores = ScoreStore::new(Arc::new(Database::open(path).unwrap()));
        assert_eq!(scores.get_best().unwrap(), 9);
        assert!(!scores.record_score(6).unwrap());
        assert_eq!(scores.get_best().unwrap(), 9);
    }
}
