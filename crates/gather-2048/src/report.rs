use serde::{Deserialize, Serialize};

/// Game type tag stored alongside every score produced by this engine.
pub const GAME_TYPE: &str = "2048";

/// End-of-game summary handed to the score store exactly once per play-through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub score: u64,
    pub duration_seconds: u64,
    pub moves: u64,
    pub max_tile: u32,
    pub game_type: String,
    pub user_id: String,
}

/// Sink for finished games.
///
/// Called synchronously from inside [`crate::GameSession::make_move`], so
/// implementations must hand the report off without blocking. Delivery
/// failures stay inside the reporter: log them and drop the report.
pub trait ScoreReporter: Send + Sync {
    fn report(&self, report: ScoreReport);
}

/// Reporter used when nothing is listening.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ScoreReporter for NullReporter {
    fn report(&self, report: ScoreReport) {
        log::debug!(
            "discarding score report: score={} moves={} max_tile={}",
            report.score,
            report.moves,
            report.max_tile
        );
    }
}

impl<T: ScoreReporter + ?Sized> ScoreReporter for std::sync::Arc<T> {
    fn report(&self, report: ScoreReport) {
        (**self).report(report)
    }
}
