use std::net::SocketAddr;

use dndbuilder_server::cache::DocumentCache;
use dndbuilder_server::character::CharacterHandler;
use dndbuilder_server::db::{get_db, CharacterStore};
use dndbuilder_server::dnd::{DndHandler, API_BASE};
use dndbuilder_server::request::RequestHandler;
use dndbuilder_server::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt().init();
  let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
  let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
  let name = env!("CARGO_PKG_NAME");
  let version = env!("CARGO_PKG_VERSION");
  println!();
  println!("{}", name.to_uppercase());
  println!("ver. {}", version);
  println!();
  println!("running on {}", addr);
  println!();
  let pool = get_db().await?;
  let store = CharacterStore::new(pool);
  store.init().await?;
  let cache = DocumentCache::new();
  let dnd = DndHandler::new(RequestHandler::new(API_BASE, cache));
  let characters = CharacterHandler::new(store, dnd.clone());
  let state = AppState { characters, dnd };
  axum::serve(listener, app(state)).await?;
  Ok(())
}
