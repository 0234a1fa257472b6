use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde_json::Value;

/// How long a reference document stays valid once fetched.
pub const CACHE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, thiserror::Error)]
#[error("cannot add duplicate key '{0}'")]
pub struct DuplicateKey(pub String);

struct Entry {
  value: Value,
  expires_at: Instant,
}

/// In-memory store for reference documents. Every entry expires
/// independently, reads past the expiry behave as misses.
#[derive(Clone)]
pub struct DocumentCache {
  ttl: Duration,
  entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl DocumentCache {
  pub fn new() -> Self {
    Self::with_ttl(CACHE_TTL)
  }

  pub fn with_ttl(ttl: Duration) -> Self {
    Self { ttl, entries: Arc::new(RwLock::new(HashMap::new())) }
  }

  /// Store `value` under `key`. A key holding a live entry is rejected,
  /// an expired entry is replaced. Check and insert run under one write
  /// lock, so concurrent adds for the same key cannot both succeed.
  pub fn add(&self, key: &str, value: Value) -> Result<(), DuplicateKey> {
    let mut entries = self.entries.write().unwrap();
    if let Some(entry) = entries.get(key) {
      if entry.expires_at > Instant::now() {
        return Err(DuplicateKey(key.to_string()));
      }
    }
    let expires_at = Instant::now() + self.ttl;
    entries.insert(key.to_string(), Entry { value, expires_at });
    Ok(())
  }

  /// Live value under `key`, if any. Expired entries are dropped here.
  pub fn get(&self, key: &str) -> Option<Value> {
    let mut entries = self.entries.write().unwrap();
    match entries.get(key) {
      Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
      Some(_) => {
        entries.remove(key);
        None
      }
      None => None,
    }
  }

  pub fn contains(&self, key: &str) -> bool {
    let entries = self.entries.read().unwrap();
    entries.get(key).is_some_and(|e| e.expires_at > Instant::now())
  }
}

impl Default for DocumentCache {
  fn default() -> Self {
    Self::new()
  }
}
