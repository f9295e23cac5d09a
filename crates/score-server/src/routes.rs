use anyhow::anyhow;
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use gather_2048::GAME_TYPE;
use gather_2048::engine::DEFAULT_USER_ID;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::store::{self, GameScore, NewGameScore, ScoreQuery, ScoreStore, StoreError};

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "user-id";

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SaveScoreRequest {
    /// Kept loose so a missing or non-numeric score gets our own 400.
    score: Option<serde_json::Value>,
    duration: Option<u64>,
    moves: Option<u64>,
    max_tile: Option<u32>,
    game_type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveScoreResponse {
    message: String,
    game_score: GameScore,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScoresQuery {
    user_id: Option<String>,
    game_type: Option<String>,
    /// Parsed leniently; anything that is not a count falls back to the default.
    limit: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// JSON `{"error": ...}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    fn bad_request(message: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }

    fn internal(message: &'static str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

pub async fn save_score(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SaveScoreRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SaveScoreResponse>), ApiError> {
    let Json(body) = body.map_err(|err| {
        warn!("rejected score body: {err}");
        ApiError::bad_request("Score is required and must be a number")
    })?;
    let score = body
        .score
        .as_ref()
        .and_then(serde_json::Value::as_u64)
        .filter(|&s| i64::try_from(s).is_ok())
        .ok_or_else(|| {
            warn!("validation failed: missing or invalid score");
            ApiError::bad_request("Score is required and must be a number")
        })?;
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_USER_ID)
        .to_string();

    info!(%user_id, score, moves = ?body.moves, max_tile = ?body.max_tile, "saving game score");
    let new = NewGameScore {
        user_id,
        game_type: body.game_type,
        score,
        duration: body.duration,
        moves: body.moves,
        max_tile: body.max_tile,
    };
    let game_score = with_store(&state, move |store| store.save_score(new))
        .await
        .map_err(|err| {
            if let Some(StoreError::OutOfRange { .. }) = err.downcast_ref::<StoreError>() {
                warn!("validation failed: {err}");
                return ApiError::bad_request("Invalid game statistics");
            }
            error!("error saving game score: {err:#}");
            ApiError::internal("Failed to save game score")
        })?;
    info!(id = game_score.id, "game score saved");

    Ok((
        StatusCode::CREATED,
        Json(SaveScoreResponse {
            message: "Game score saved successfully".to_string(),
            game_score,
        }),
    ))
}

pub async fn list_scores(
    State(state): State<AppState>,
    Query(query): Query<ScoresQuery>,
) -> Result<Json<ScoreQuery>, ApiError> {
    let user_id = query
        .user_id
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("User ID is required"))?;
    let game_type = query
        .game_type
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| GAME_TYPE.to_string());
    let limit = query
        .limit
        .as_deref()
        .and_then(|l| l.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT);

    info!(%user_id, %game_type, limit, "fetching game scores");
    let result = with_store(&state, move |store| {
        store.query_scores(&user_id, &game_type, limit)
    })
    .await
    .map_err(|err| {
        error!("error fetching game scores: {err:#}");
        ApiError::internal("Failed to fetch game scores")
    })?;
    Ok(Json(result))
}

pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Run `f` against the store on the blocking pool.
async fn with_store<T, F>(state: &AppState, f: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut ScoreStore) -> store::Result<T> + Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || -> anyhow::Result<T> {
        let mut guard = store
            .lock()
            .map_err(|_| anyhow!("score store lock poisoned"))?;
        Ok(f(&mut guard)?)
    })
    .await?
}
