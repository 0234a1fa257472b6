use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::model::character::Character;
use crate::request::RequestHandler;

pub const API_BASE: &str = "https://www.dnd5eapi.co/api/";

const ALL_RACES: &str = "allRaces";
const ALL_CLASSES: &str = "allClasses";
const TOTAL_ABILITY_SCORE: i64 = 20;

/// Rules derived from the 5e reference data: race and class membership,
/// spellcasting, hitpoints and the ability score budget.
#[derive(Clone)]
pub struct DndHandler {
  requests: RequestHandler,
}

impl DndHandler {
  pub fn new(requests: RequestHandler) -> Self {
    Self { requests }
  }

  pub async fn all_race_names(&self) -> AppResult<Vec<String>> {
    Ok(extract_names(&self.races().await?))
  }

  pub async fn all_class_names(&self) -> AppResult<Vec<String>> {
    Ok(extract_names(&self.classes().await?))
  }

  /// Detail document for one race, resolved against the race collection.
  pub async fn race_details(&self, name: &str) -> AppResult<Value> {
    let races = self.races().await?;
    self.requests.extract_named(&races["results"], name).await
  }

  /// Detail document for one class, resolved against the class collection.
  pub async fn class_details(&self, name: &str) -> AppResult<Value> {
    let classes = self.classes().await?;
    self.requests.extract_named(&classes["results"], name).await
  }

  /// A class casts spells iff its detail document carries a
  /// `spellcasting` field.
  pub async fn is_caster(&self, class_name: &str) -> AppResult<bool> {
    let class = self.class_details(class_name).await?;
    Ok(class.get("spellcasting").is_some())
  }

  /// `level * hit_die + con`, with the hit die taken from the class
  /// detail document.
  pub async fn hitpoints(&self, character: &Character) -> AppResult<i64> {
    let class = self.class_details(&character.class).await?;
    let hit_die = class
      .get("hit_die")
      .and_then(Value::as_i64)
      .ok_or_else(|| AppError::Rules(format!("unable to determine hitpoints for {}", character.name)))?;
    Ok(character.level * hit_die + character.con)
  }

  /// The six ability scores have to spend the creation budget exactly.
  pub fn validate_ability_scores(&self, character: &Character) -> AppResult<()> {
    let total = character.ability_total();
    if total != TOTAL_ABILITY_SCORE {
      return Err(AppError::Rules(format!("total ability score '{total}' invalid")));
    }
    Ok(())
  }

  pub async fn validate_race(&self, name: &str) -> AppResult<bool> {
    Ok(self.all_race_names().await?.iter().any(|r| r.eq_ignore_ascii_case(name)))
  }

  pub async fn validate_class(&self, name: &str) -> AppResult<bool> {
    Ok(self.all_class_names().await?.iter().any(|c| c.eq_ignore_ascii_case(name)))
  }

  async fn races(&self) -> AppResult<Value> {
    self.requests.fetch_cached(ALL_RACES, "races").await
  }

  async fn classes(&self) -> AppResult<Value> {
    self.requests.fetch_cached(ALL_CLASSES, "classes").await
  }
}

fn extract_names(collection: &Value) -> Vec<String> {
  collection["results"]
    .as_array()
    .into_iter()
    .flatten()
    .filter_map(|entry| entry["name"].as_str())
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::DocumentCache;
  use serde_json::json;

  /// A handler whose cache already holds the reference documents, so no
  /// request ever leaves the process.
  fn seeded() -> DndHandler {
    let cache = DocumentCache::new();
    cache
      .add(ALL_RACES, json!({"count": 2, "results": [
        {"name": "Elf", "url": "/api/races/elf"},
        {"name": "Human", "url": "/api/races/human"}
      ]}))
      .unwrap();
    cache
      .add(ALL_CLASSES, json!({"count": 3, "results": [
        {"name": "Wizard", "url": "/api/classes/wizard"},
        {"name": "Barbarian", "url": "/api/classes/barbarian"},
        {"name": "Druid", "url": "/api/classes/druid"}
      ]}))
      .unwrap();
    cache
      .add("Wizard", json!({"name": "Wizard", "hit_die": 6, "spellcasting": {"level": 2}}))
      .unwrap();
    cache.add("Barbarian", json!({"name": "Barbarian", "hit_die": 12})).unwrap();
    // malformed on purpose, no hit die
    cache.add("Druid", json!({"name": "Druid", "spellcasting": {}})).unwrap();
    DndHandler::new(RequestHandler::new(API_BASE, cache))
  }

  fn aria() -> Character {
    Character {
      name: "Aria".to_string(),
      age: 25,
      gender: String::new(),
      bio: String::new(),
      level: 5,
      race: "Elf".to_string(),
      class: "Wizard".to_string(),
      caster: false,
      con: 2,
      dex: 3,
      str: 3,
      cha: 4,
      intel: 5,
      wis: 3,
    }
  }

  #[tokio::test]
  async fn race_and_class_names_keep_collection_order() {
    let dnd = seeded();
    assert_eq!(dnd.all_race_names().await.unwrap(), ["Elf", "Human"]);
    assert_eq!(dnd.all_class_names().await.unwrap(), ["Wizard", "Barbarian", "Druid"]);
  }

  #[tokio::test]
  async fn caster_flag_follows_the_spellcasting_field() {
    let dnd = seeded();
    assert!(dnd.is_caster("wizard").await.unwrap());
    assert!(!dnd.is_caster("Barbarian").await.unwrap());
  }

  #[tokio::test]
  async fn unknown_class_is_not_found() {
    let dnd = seeded();
    let err = dnd.is_caster("Artificer").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
  }

  #[tokio::test]
  async fn hitpoints_follow_level_hit_die_and_con() {
    let dnd = seeded();
    assert_eq!(dnd.hitpoints(&aria()).await.unwrap(), 5 * 6 + 2);
  }

  #[tokio::test]
  async fn missing_hit_die_names_the_character() {
    let dnd = seeded();
    let mut character = aria();
    character.class = "Druid".to_string();
    let err = dnd.hitpoints(&character).await.unwrap_err();
    assert_eq!(err.to_string(), "unable to determine hitpoints for Aria");
  }

  #[tokio::test]
  async fn ability_budget_must_be_spent_exactly() {
    let dnd = seeded();
    assert!(dnd.validate_ability_scores(&aria()).is_ok());
    let mut character = aria();
    character.wis = 2;
    let err = dnd.validate_ability_scores(&character).unwrap_err();
    assert_eq!(err.to_string(), "total ability score '19' invalid");
  }

  #[tokio::test]
  async fn membership_checks_ignore_case() {
    let dnd = seeded();
    assert!(dnd.validate_race("ELF").await.unwrap());
    assert!(!dnd.validate_race("Orc").await.unwrap());
    assert!(dnd.validate_class("wizard").await.unwrap());
    assert!(!dnd.validate_class("Bard").await.unwrap());
  }
}
