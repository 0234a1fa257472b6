use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::cache::DocumentCache;
use crate::error::{AppError, AppResult};

/// Outbound client for the D&D 5e reference API. Every fetch goes through
/// the [`DocumentCache`] handed in at construction, repeat lookups within
/// the TTL never touch the network.
#[derive(Clone)]
pub struct RequestHandler {
  client: Client,
  base: Url,
  cache: DocumentCache,
}

impl RequestHandler {
  pub fn new(base_url: &str, cache: DocumentCache) -> Self {
    let base = Url::parse(base_url).expect("reference api base url must parse");
    Self { client: Client::new(), base, cache }
  }

  /// Cached GET. On a miss the endpoint is fetched, parsed as JSON and
  /// stored under `key` until the cache TTL runs out.
  pub async fn fetch_cached(&self, key: &str, url: &str) -> AppResult<Value> {
    if let Some(json) = self.cache.get(key) {
      debug!("cache hit for '{key}'");
      return Ok(json);
    }
    let json = self.fetch_json(url).await?;
    if let Err(e) = self.cache.add(key, json.clone()) {
      // lost a concurrent fill for the same key, keep the copy we fetched
      debug!("{e}");
    }
    Ok(json)
  }

  /// Find the `{name, url}` entry matching `name` in a reference
  /// collection, ignoring case, and fetch its detail document through the
  /// cache keyed by the entry's own name.
  pub async fn extract_named(&self, collection: &Value, name: &str) -> AppResult<Value> {
    let entry = collection
      .as_array()
      .into_iter()
      .flatten()
      .find(|e| e["name"].as_str().is_some_and(|n| n.eq_ignore_ascii_case(name)))
      .ok_or_else(|| AppError::NotFound(format!("'{name}'")))?;
    let key = entry["name"].as_str().unwrap_or(name).to_string();
    let url = entry["url"]
      .as_str()
      .ok_or_else(|| AppError::Upstream(format!("entry '{key}' carries no url")))?
      .to_string();
    self.fetch_cached(&key, &url).await
  }

  async fn fetch_json(&self, url: &str) -> AppResult<Value> {
    let target = self
      .base
      .join(self.strip_base(url))
      .map_err(|e| AppError::Upstream(format!("bad reference url '{url}': {e}")))?;
    info!("fetching {target}");
    let res = self
      .client
      .get(target.clone())
      .send()
      .await
      .map_err(|e| AppError::Upstream(e.to_string()))?;
    if !res.status().is_success() {
      return Err(AppError::Upstream(format!("'{target}' answered {}", res.status())));
    }
    res.json().await.map_err(|e| AppError::Upstream(e.to_string()))
  }

  /// Upstream documents link to each other with urls that already contain
  /// the api base. Those have to be stripped so both relative paths and
  /// full urls resolve the same way.
  fn strip_base<'a>(&self, url: &'a str) -> &'a str {
    url.strip_prefix(self.base.as_str()).unwrap_or(url)
  }
}
