//! Key-value store abstraction

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Storage failures surfaced to callers
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("malformed value under {key}: {reason}")]
    Malformed { key: String, reason: String },
}

/// The backing-store surface the telemetry core needs: atomic per-key
/// set/get with expiry, ordered list append/read, and key deletion.
///
/// Implementations provide per-call atomicity; the core layers no locking
/// of its own on top.
pub trait KvStore: Send + Sync {
    /// Set `key` to `value`, replacing any prior value, expiring after `ttl`.
    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Value at `key`, or `None` when absent or expired.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Append `value` to the list at `key`, creating the list if absent.
    fn list_push(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// All values in the list at `key`, in append order. Empty when
    /// absent or expired.
    fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Set or refresh the expiry on an existing key. No-op when absent.
    fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Remove `key` and any value under it.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        (**self).set_ex(key, value, ttl)
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn list_push(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).list_push(key, value)
    }

    fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        (**self).list_range(key)
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        (**self).expire(key, ttl)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory backend: one mutex over the whole map, expiry checked lazily
/// on access. The default for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl KvStore for MemoryKv {
    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(Entry { value: Value::Str(s), .. }) => Ok(Some(s.clone())),
            _ => Ok(None),
        }
    }

    fn list_push(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        if entries.get(key).is_some_and(|e| e.expired(now)) {
            entries.remove(key);
        }
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::List(Vec::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::List(items) => items.push(value.to_string()),
            // a string key is replaced wholesale, matching set_ex semantics
            other => *other = Value::List(vec![value.to_string()]),
        }
        Ok(())
    }

    fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expired(now) => {
                entries.remove(key);
                Ok(Vec::new())
            }
            Some(Entry { value: Value::List(items), .. }) => Ok(items.clone()),
            _ => Ok(Vec::new()),
        }
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        entries.remove(key);
        Ok(())
    }
}
