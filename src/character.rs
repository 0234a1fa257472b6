use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::info;

use crate::db::CharacterStore;
use crate::dnd::DndHandler;
use crate::error::{AppError, AppResult};
use crate::model::character::{
  escape_html, CharacterPayload, CharacterSummary, CharacterView, MAX_AGE, MAX_BIO_LEN, MAX_LEVEL,
};

/// Orchestrates validation against the rules engine and persistence in
/// the store. The only place that decides what may be written.
#[derive(Clone)]
pub struct CharacterHandler {
  store: CharacterStore,
  dnd: DndHandler,
}

impl CharacterHandler {
  pub fn new(store: CharacterStore, dnd: DndHandler) -> Self {
    Self { store, dnd }
  }

  /// Sanitize, default, validate and insert. Every violated rule is
  /// reported in one pass.
  pub async fn add(&self, payload: CharacterPayload) -> AppResult<String> {
    let mut character = payload.sanitized();
    let mut violations = character.field_violations();
    if let Err(e) = self.dnd.validate_ability_scores(&character) {
      violations.push(e.to_string());
    }
    if character.race.is_empty() {
      violations.push("race must not be empty".to_string());
    } else if !self.dnd.validate_race(&character.race).await? {
      violations.push(format!("race '{}' is not a known race", character.race));
    }
    if character.class.is_empty() {
      violations.push("class must not be empty".to_string());
    } else if !self.dnd.validate_class(&character.class).await? {
      violations.push(format!("class '{}' is not a known class", character.class));
    }
    if !violations.is_empty() {
      return Err(AppError::Validation(violations.join("; ")));
    }

    character.caster = self.dnd.is_caster(&character.class).await?;
    self.store.insert(&character).await?;
    info!("character '{}' added", character.name);
    Ok(character.name)
  }

  pub async fn all(&self) -> AppResult<Vec<CharacterSummary>> {
    let characters = self.store.select_all().await?;
    Ok(characters.into_iter().map(CharacterSummary::from).collect())
  }

  /// One character, enriched with the attributes computed from reference
  /// data.
  pub async fn get(&self, name: &str) -> AppResult<CharacterView> {
    let mut character = self.store.select_one(name).await?;
    let hitpoints = self.dnd.hitpoints(&character).await?;
    character.caster = self.dnd.is_caster(&character.class).await?;
    Ok(CharacterView { character, hitpoints })
  }

  /// Partial update. The name keys the row and is stripped from the
  /// field map, touched fields are re-validated individually.
  pub async fn update(&self, mut fields: Map<String, Value>) -> AppResult<String> {
    let name = fields
      .remove("name")
      .and_then(|v| v.as_str().map(str::to_string))
      .ok_or_else(|| AppError::Validation("update requires a character name".to_string()))?;
    if fields.is_empty() {
      return Err(AppError::Validation("no fields to update".to_string()));
    }
    self.normalize_update(&mut fields).await?;
    self.store.update(&name, &fields).await?;
    info!("character '{name}' updated");
    Ok(name)
  }

  pub async fn delete(&self, name: &str) -> AppResult<()> {
    self.store.select_one(name).await?;
    self.store.delete(name).await?;
    info!("character '{name}' deleted");
    Ok(())
  }

  /// Serialize a character to XML, write it next to the other exports in
  /// the temp directory and hand the document back for streaming.
  pub async fn export_xml(&self, name: &str) -> AppResult<(String, Vec<u8>)> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
      return Err(AppError::Validation(format!("'{name}' is not a valid export name")));
    }
    let view = self.get(name).await?;
    let filename = format!("{name}.xml");
    let path: PathBuf = std::env::temp_dir().join(&filename);
    tokio::fs::write(&path, view.to_xml()).await?;
    let body = tokio::fs::read(&path).await?;
    info!("character '{name}' exported to {}", path.display());
    Ok((filename, body))
  }

  /// Per-field checks for partial updates. Numeric strings are folded to
  /// numbers so the store binds them with the right type. The
  /// creation-time ability budget is not re-checked, single scores only
  /// have to stay non-negative.
  async fn normalize_update(&self, fields: &mut Map<String, Value>) -> AppResult<()> {
    let mut violations = Vec::new();
    for (field, value) in fields.iter_mut() {
      match field.as_str() {
        "age" => match as_int(value) {
          Some(age) if (0..=MAX_AGE).contains(&age) => *value = age.into(),
          _ => violations.push(format!("age must be between 0 and {MAX_AGE}")),
        },
        "level" => match as_int(value) {
          Some(level) if (1..=MAX_LEVEL).contains(&level) => *value = level.into(),
          _ => violations.push(format!("level must be between 1 and {MAX_LEVEL}")),
        },
        "con" | "dex" | "str" | "cha" | "intel" | "wis" => match as_int(value) {
          Some(score) if score >= 0 => *value = score.into(),
          _ => violations.push(format!("{field} must be a non-negative number")),
        },
        "bio" => {
          let bio = value.as_str().map(str::to_string);
          match bio {
            Some(b) if b.chars().count() <= MAX_BIO_LEN => {
              *value = Value::String(escape_html(b.trim()));
            }
            _ => violations.push(format!("bio must not exceed {MAX_BIO_LEN} characters")),
          }
        }
        "gender" => {
          if let Some(g) = value.as_str().map(str::to_string) {
            *value = Value::String(escape_html(g.trim()));
          }
        }
        "race" => match value.as_str().map(str::to_string) {
          Some(r) => {
            if !self.dnd.validate_race(&r).await? {
              violations.push(format!("race '{r}' is not a known race"));
            }
          }
          None => violations.push("race must be a string".to_string()),
        },
        "class" => match value.as_str().map(str::to_string) {
          Some(c) => {
            if !self.dnd.validate_class(&c).await? {
              violations.push(format!("class '{c}' is not a known class"));
            }
          }
          None => violations.push("class must be a string".to_string()),
        },
        // unknown names fall through to the store's allow-list
        _ => {}
      }
    }
    if !violations.is_empty() {
      return Err(AppError::Validation(violations.join("; ")));
    }
    Ok(())
  }
}

fn as_int(value: &Value) -> Option<i64> {
  match value {
    Value::Number(n) => n.as_i64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}
