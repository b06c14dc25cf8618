// Key-value persistence capability and an in-memory implementation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;

/// Minimal durable string store. The score store only needs `get`/`set`, so
/// anything from a SQLite file to a remote service can back it.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if it was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Process-local store. Nothing survives a restart; used for tests and for
/// sessions that don't want a database file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().expect("memory store mutex poisoned")
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope").unwrap(), None);
    }

    #[test]
    fn set_overwrites_previous_value() {
        let store = MemoryStore::new();
        store.set("k", "1").unwrap();
        store.set("k", "2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("2"));
    }
}
