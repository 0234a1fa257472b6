use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

const ADMIN_SUFFIX: &str = " If the problem persists, contact a server administrator";

/// Everything a request can fail with. Variants map one-to-one onto
/// response status codes in `into_response`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("{0}")]
  Validation(String),
  #[error("cannot add duplicate key '{0}'")]
  DuplicateKey(String),
  #[error("invalid field '{0}'")]
  InvalidField(String),
  #[error("{0} not found")]
  NotFound(String),
  #[error("{0}")]
  Rules(String),
  #[error("upstream request failed: {0}")]
  Upstream(String),
  #[error("database error: {0}")]
  Storage(#[from] sqlx::Error),
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      AppError::Validation(msg) | AppError::Rules(msg) => {
        (StatusCode::BAD_REQUEST, format!("Error: {msg}"))
      }
      AppError::DuplicateKey(key) => {
        (StatusCode::BAD_REQUEST, format!("Error: cannot add duplicate key '{key}'"))
      }
      AppError::InvalidField(field) => {
        (StatusCode::BAD_REQUEST, format!("Error: invalid field '{field}'"))
      }
      AppError::NotFound(what) => {
        (StatusCode::NOT_FOUND, format!("Error: {what} not found"))
      }
      AppError::Upstream(detail) => {
        error!("upstream failure: {detail}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: reference data is unavailable.{ADMIN_SUFFIX}"))
      }
      AppError::Storage(e) => {
        error!("database failure: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: character storage is unavailable.{ADMIN_SUFFIX}"))
      }
      AppError::Io(e) => {
        error!("io failure: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: export failed.{ADMIN_SUFFIX}"))
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
