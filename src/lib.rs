use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

pub mod cache;
pub mod character;
pub mod db;
pub mod dnd;
pub mod error;
pub mod model;
pub mod request;
pub mod routes;

use character::CharacterHandler;
use dnd::DndHandler;

#[derive(Clone)]
pub struct AppState {
  pub characters: CharacterHandler,
  pub dnd: DndHandler,
}

pub fn app(state: AppState) -> Router {
  let cors = CorsLayer::permissive();
  Router::new()
    .route("/", get(|| async { "DnDBuilder server" }))
    .route("/character/add", post(routes::character_add))
    .route("/character/view/all", get(routes::character_view_all))
    .route("/character/view/{name}", get(routes::character_view))
    .route("/character/update", put(routes::character_update))
    .route("/character/delete/{name}", delete(routes::character_delete))
    .route("/character/xml/{name}", get(routes::character_xml))
    .route("/dnd/races", get(routes::dnd_races))
    .route("/dnd/races/{name}", get(routes::dnd_race))
    .route("/dnd/classes", get(routes::dnd_classes))
    .route("/dnd/classes/{name}", get(routes::dnd_class))
    .route("/dnd/spellcaster/{class_type}", get(routes::dnd_spellcaster))
    .layer(cors)
    .with_state(state)
}
