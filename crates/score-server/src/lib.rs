//! Score persistence for finished games: a SQLite [`store`] plus the HTTP
//! routes that save and query it.

pub mod app;
pub mod routes;
pub mod store;

pub use app::{AppState, router};
pub use store::{GameScore, NewGameScore, ScoreQuery, ScoreStore, StoreError};
