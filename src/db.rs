use serde_json::{Map, Value};
use sqlx::{Executor, Pool, Sqlite, SqlitePool};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::model::character::Character;

pub const DB_URL: &str = "sqlite://dndbuilder.sqlite?mode=rwc";

/// Columns a partial update may touch. Anything else is rejected before
/// it can reach the SQL text.
const UPDATABLE_COLUMNS: [&str; 12] = [
  "age", "gender", "bio", "level", "race", "class",
  "con", "dex", "str", "cha", "intel", "wis",
];

pub async fn get_db() -> anyhow::Result<Pool<Sqlite>> {
  let pool = SqlitePool::connect(DB_URL).await?;
  Ok(pool)
}

/// Single-table store for character rows, `name` is the primary key.
#[derive(Clone)]
pub struct CharacterStore {
  pool: Pool<Sqlite>,
}

impl CharacterStore {
  pub fn new(pool: Pool<Sqlite>) -> Self {
    Self { pool }
  }

  /// Create the characters table on a fresh database file.
  pub async fn init(&self) -> AppResult<()> {
    self
      .pool
      .execute(
        "CREATE TABLE IF NOT EXISTS characters (
          name TEXT PRIMARY KEY,
          age INTEGER,
          gender TEXT,
          bio TEXT,
          level INTEGER,
          race TEXT,
          class TEXT,
          caster BOOLEAN DEFAULT FALSE,
          con INTEGER,
          dex INTEGER,
          str INTEGER,
          cha INTEGER,
          intel INTEGER,
          wis INTEGER
        )",
      )
      .await?;
    Ok(())
  }

  /// Insert a row. The primary key constraint rejects a second character
  /// with the same name atomically.
  pub async fn insert(&self, character: &Character) -> AppResult<()> {
    let res = sqlx::query(
      "INSERT INTO characters (name, age, gender, bio, level, race, class, caster,
                               con, dex, str, cha, intel, wis)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )
    .bind(&character.name)
    .bind(character.age)
    .bind(&character.gender)
    .bind(&character.bio)
    .bind(character.level)
    .bind(&character.race)
    .bind(&character.class)
    .bind(character.caster)
    .bind(character.con)
    .bind(character.dex)
    .bind(character.str)
    .bind(character.cha)
    .bind(character.intel)
    .bind(character.wis)
    .execute(&self.pool)
    .await;

    match res {
      Ok(_) => {
        info!("character '{}' inserted", character.name);
        Ok(())
      }
      Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
        Err(AppError::DuplicateKey(character.name.clone()))
      }
      Err(e) => Err(AppError::Storage(e)),
    }
  }

  pub async fn select_one(&self, name: &str) -> AppResult<Character> {
    sqlx::query_as("SELECT * FROM characters WHERE name = ?1")
      .bind(name)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("character '{name}'")))
  }

  pub async fn select_all(&self) -> AppResult<Vec<Character>> {
    let rows = sqlx::query_as("SELECT * FROM characters").fetch_all(&self.pool).await?;
    Ok(rows)
  }

  /// Partial update. The SET clause is built from the allow-list above,
  /// values only ever travel as bind parameters.
  pub async fn update(&self, name: &str, fields: &Map<String, Value>) -> AppResult<()> {
    if fields.is_empty() {
      return Err(AppError::Validation("no fields to update".to_string()));
    }
    let mut set_clause = Vec::with_capacity(fields.len());
    for column in fields.keys() {
      if !UPDATABLE_COLUMNS.contains(&column.as_str()) {
        return Err(AppError::InvalidField(column.clone()));
      }
      set_clause.push(format!("{column} = ?"));
    }
    let sql = format!("UPDATE characters SET {} WHERE name = ?", set_clause.join(", "));

    let mut query = sqlx::query(&sql);
    for value in fields.values() {
      query = match value {
        Value::Number(n) => match n.as_i64() {
          Some(i) => query.bind(i),
          None => return Err(AppError::Validation(format!("'{n}' is not a whole number"))),
        },
        Value::String(s) => query.bind(s.clone()),
        Value::Bool(b) => query.bind(*b),
        other => return Err(AppError::Validation(format!("unsupported value '{other}'"))),
      };
    }
    let result = query.bind(name).execute(&self.pool).await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("character '{name}'")));
    }
    Ok(())
  }

  /// Idempotent, deleting an absent row is not an error.
  pub async fn delete(&self, name: &str) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM characters WHERE name = ?1")
      .bind(name)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected())
  }

  pub async fn table_exists(&self, table: &str) -> AppResult<bool> {
    let count: (i64,) =
      sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1")
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
    Ok(count.0 > 0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use sqlx::sqlite::SqlitePoolOptions;

  async fn test_store() -> CharacterStore {
    // one connection, the in-memory database is per-connection
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect("sqlite::memory:")
      .await
      .unwrap();
    let store = CharacterStore::new(pool);
    store.init().await.unwrap();
    store
  }

  fn character(name: &str) -> Character {
    Character {
      name: name.to_string(),
      age: 25,
      gender: String::new(),
      bio: "Lorem Ipsum Here".to_string(),
      level: 5,
      race: "Elf".to_string(),
      class: "Wizard".to_string(),
      caster: true,
      con: 2,
      dex: 3,
      str: 3,
      cha: 4,
      intel: 5,
      wis: 3,
    }
  }

  fn fields(json: Value) -> Map<String, Value> {
    json.as_object().unwrap().clone()
  }

  #[tokio::test]
  async fn init_creates_the_characters_table() {
    let store = test_store().await;
    assert!(store.table_exists("characters").await.unwrap());
    assert!(!store.table_exists("monsters").await.unwrap());
  }

  #[tokio::test]
  async fn insert_then_select_roundtrips() {
    let store = test_store().await;
    store.insert(&character("Aria")).await.unwrap();
    let row = store.select_one("Aria").await.unwrap();
    assert_eq!(row.age, 25);
    assert_eq!(row.level, 5);
    assert_eq!(row.class, "Wizard");
    assert!(row.caster);
    assert_eq!(row.intel, 5);
  }

  #[tokio::test]
  async fn duplicate_names_are_rejected() {
    let store = test_store().await;
    store.insert(&character("Aria")).await.unwrap();
    let mut second = character("Aria");
    second.age = 99;
    let err = store.insert(&second).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateKey(ref name) if name == "Aria"));
    // the first insert is unaffected
    assert_eq!(store.select_one("Aria").await.unwrap().age, 25);
  }

  #[tokio::test]
  async fn select_one_reports_missing_rows() {
    let store = test_store().await;
    let err = store.select_one("Nobody").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
  }

  #[tokio::test]
  async fn select_all_returns_every_row() {
    let store = test_store().await;
    store.insert(&character("Aria")).await.unwrap();
    store.insert(&character("Borin")).await.unwrap();
    let mut names: Vec<String> =
      store.select_all().await.unwrap().into_iter().map(|c| c.name).collect();
    names.sort();
    assert_eq!(names, ["Aria", "Borin"]);
  }

  #[tokio::test]
  async fn update_touches_only_the_given_columns() {
    let store = test_store().await;
    store.insert(&character("Aria")).await.unwrap();
    store.update("Aria", &fields(json!({"age": 45}))).await.unwrap();
    let before = character("Aria");
    let after = store.select_one("Aria").await.unwrap();
    assert_eq!(after.age, 45);
    assert_eq!(after.bio, before.bio);
    assert_eq!(after.level, before.level);
    assert_eq!(after.con, before.con);
    assert_eq!(after.wis, before.wis);
  }

  #[tokio::test]
  async fn update_rejects_unknown_columns() {
    let store = test_store().await;
    store.insert(&character("Aria")).await.unwrap();
    let err = store
      .update("Aria", &fields(json!({"age; DROP TABLE characters": 1})))
      .await
      .unwrap_err();
    assert!(matches!(err, AppError::InvalidField(_)));
    assert!(store.table_exists("characters").await.unwrap());
  }

  #[tokio::test]
  async fn update_reports_missing_rows() {
    let store = test_store().await;
    let err = store.update("Nobody", &fields(json!({"age": 45}))).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
  }

  #[tokio::test]
  async fn delete_is_idempotent() {
    let store = test_store().await;
    store.insert(&character("Aria")).await.unwrap();
    assert_eq!(store.delete("Aria").await.unwrap(), 1);
    assert_eq!(store.delete("Aria").await.unwrap(), 0);
    let err = store.select_one("Aria").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
  }
}
