use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gather_2048::{GAME_TYPE, ScoreReport};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{field} {value} does not fit in an SQLite integer")]
    OutOfRange { field: &'static str, value: u64 },

    #[error("failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A score about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGameScore {
    pub user_id: String,
    pub game_type: Option<String>,
    pub score: u64,
    pub duration: Option<u64>,
    pub moves: Option<u64>,
    pub max_tile: Option<u32>,
}

impl From<ScoreReport> for NewGameScore {
    fn from(r: ScoreReport) -> Self {
        Self {
            user_id: r.user_id,
            game_type: Some(r.game_type),
            score: r.score,
            duration: Some(r.duration_seconds),
            moves: Some(r.moves),
            max_tile: Some(r.max_tile),
        }
    }
}

/// A stored score row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameScore {
    pub id: i64,
    pub score: u64,
    pub game_type: String,
    pub duration: Option<u64>,
    pub moves: Option<u64>,
    pub max_tile: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Recent scores plus aggregates for one user and game type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreQuery {
    pub scores: Vec<GameScore>,
    pub best_score: u64,
    pub total_games: u64,
    pub game_type: String,
}

/// Score store backed by a single SQLite file.
///
/// Schema:
/// - game_scores(id INTEGER PRIMARY KEY, user_id TEXT, game_type TEXT, score INT,
///   duration INT NULL, moves INT NULL, max_tile INT NULL, created_at TEXT)
pub struct ScoreStore {
    path: Option<PathBuf>,
    conn: Connection,
}

const SELECT_COLUMNS: &str = "id, score, game_type, duration, moves, max_tile, created_at";

impl ScoreStore {
    /// Create or open the database at `path`, ensure schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(&path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::with_connection(conn, Some(path))
    }

    /// Throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS game_scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                game_type TEXT NOT NULL,
                score INTEGER NOT NULL,
                duration INTEGER,
                moves INTEGER,
                max_tile INTEGER,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS game_scores_user_type_created
                ON game_scores (user_id, game_type, created_at);
            "#,
        )?;
        Ok(Self { path, conn })
    }

    /// Insert a score and return the stored row. Zero-valued optional
    /// statistics are stored as NULL.
    pub fn save_score(&mut self, new: NewGameScore) -> Result<GameScore> {
        let game_type = new
            .game_type
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| GAME_TYPE.to_string());
        let score = to_sql_int("score", new.score)?;
        let duration = non_zero(new.duration)
            .map(|v| to_sql_int("duration", v))
            .transpose()?;
        let moves = non_zero(new.moves)
            .map(|v| to_sql_int("moves", v))
            .transpose()?;
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO game_scores
                 (user_id, game_type, score, duration, moves, max_tile, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new.user_id,
                game_type,
                score,
                duration,
                moves,
                new.max_tile.filter(|&v| v > 0).map(i64::from),
                created_at,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        let stored = self.get_score(id)?;
        stored.ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_score(&self, id: i64) -> Result<Option<GameScore>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM game_scores WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_score)
            .optional()?)
    }

    /// Most recent `limit` scores, best score and game count for
    /// `user_id` playing `game_type`.
    pub fn query_scores(&self, user_id: &str, game_type: &str, limit: usize) -> Result<ScoreQuery> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM game_scores
             WHERE user_id = ?1 AND game_type = ?2
             ORDER BY created_at DESC, id DESC
             LIMIT ?3"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let scores = stmt
            .query_map(params![user_id, game_type, limit as i64], row_to_score)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let (best, total): (Option<i64>, i64) = self.conn.query_row(
            "SELECT MAX(score), COUNT(*) FROM game_scores WHERE user_id = ?1 AND game_type = ?2",
            params![user_id, game_type],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(ScoreQuery {
            scores,
            best_score: best.unwrap_or(0) as u64,
            total_games: total as u64,
            game_type: game_type.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn to_sql_int(field: &'static str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| StoreError::OutOfRange { field, value })
}

fn non_zero(v: Option<u64>) -> Option<u64> {
    v.filter(|&v| v > 0)
}

fn row_to_score(row: &Row<'_>) -> rusqlite::Result<GameScore> {
    Ok(GameScore {
        id: row.get(0)?,
        score: row.get::<_, i64>(1)? as u64,
        game_type: row.get(2)?,
        duration: row.get::<_, Option<i64>>(3)?.map(|v| v as u64),
        moves: row.get::<_, Option<i64>>(4)?.map(|v| v as u64),
        max_tile: row.get::<_, Option<i64>>(5)?.map(|v| v as u32),
        created_at: row.get(6)?,
    })
}
