use std::sync::{Arc, Mutex};

use axum::{
    Router,
    routing::{get, post},
};

use crate::routes;
use crate::store::ScoreStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<ScoreStore>>,
}

impl AppState {
    pub fn new(store: ScoreStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/game/save-score", post(routes::save_score))
        .route("/api/game/scores", get(routes::list_scores))
        .route("/health", get(routes::get_health))
        .with_state(state)
}
