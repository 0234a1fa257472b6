use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{Map, Value};

use crate::error::AppResult;
use crate::model::character::CharacterPayload;
use crate::AppState;

pub async fn character_add(
  State(state): State<AppState>,
  Json(payload): Json<CharacterPayload>,
) -> AppResult<impl IntoResponse> {
  let name = state.characters.add(payload).await?;
  Ok((StatusCode::CREATED, format!("character '{name}' added")))
}

pub async fn character_view_all(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
  Ok(Json(state.characters.all().await?))
}

pub async fn character_view(
  State(state): State<AppState>,
  Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
  Ok(Json(state.characters.get(&name).await?))
}

pub async fn character_update(
  State(state): State<AppState>,
  Json(fields): Json<Map<String, Value>>,
) -> AppResult<impl IntoResponse> {
  let name = state.characters.update(fields).await?;
  Ok((StatusCode::OK, format!("character '{name}' updated")))
}

pub async fn character_delete(
  State(state): State<AppState>,
  Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
  state.characters.delete(&name).await?;
  Ok((StatusCode::OK, format!("character '{name}' removed")))
}

pub async fn character_xml(
  State(state): State<AppState>,
  Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
  let (filename, body) = state.characters.export_xml(&name).await?;
  let headers = [
    (header::CONTENT_TYPE, "application/xml".to_string()),
    (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
  ];
  Ok((headers, body))
}

pub async fn dnd_races(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
  Ok(Json(state.dnd.all_race_names().await?))
}

pub async fn dnd_race(
  State(state): State<AppState>,
  Path(name): Path<String>,
) -> AppResult<Json<Value>> {
  Ok(Json(state.dnd.race_details(&name).await?))
}

pub async fn dnd_classes(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
  Ok(Json(state.dnd.all_class_names().await?))
}

pub async fn dnd_class(
  State(state): State<AppState>,
  Path(name): Path<String>,
) -> AppResult<Json<Value>> {
  Ok(Json(state.dnd.class_details(&name).await?))
}

pub async fn dnd_spellcaster(
  State(state): State<AppState>,
  Path(class_type): Path<String>,
) -> AppResult<Json<bool>> {
  Ok(Json(state.dnd.is_caster(&class_type).await?))
}
