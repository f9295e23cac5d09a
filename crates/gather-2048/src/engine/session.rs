use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::ops::{self, TileEvent};
use super::state::{Board, DEFAULT_SIZE, Move, Tile, TileIds};
use crate::error::{EngineError, Result};
use crate::report::{GAME_TYPE, NullReporter, ScoreReport, ScoreReporter};

/// User id attached to reports when the caller never set one.
pub const DEFAULT_USER_ID: &str = "default-user-id";

/// Everything a caller needs to know about one `make_move` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    pub direction: Move,
    pub changed: bool,
    pub score_gained: u64,
    pub merges: usize,
    /// Slides and merges, for animating the transition. Only valid for
    /// this move.
    pub events: Vec<TileEvent>,
    pub spawned: Option<Tile>,
    pub game_over: bool,
}

impl MoveOutcome {
    fn unchanged(direction: Move, game_over: bool) -> Self {
        Self {
            direction,
            changed: false,
            score_gained: 0,
            merges: 0,
            events: Vec::new(),
            spawned: None,
            game_over,
        }
    }
}

/// Serializable picture of a session, for saving and resuming a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub size: usize,
    /// Row-major tile values, 0 for empty.
    pub tiles: Vec<u32>,
    pub score: u64,
    pub best_score: u64,
    pub move_count: u64,
    pub max_tile_value: u32,
    pub started_at: DateTime<Utc>,
    pub is_over: bool,
}

/// One play-through: board, score and statistics, plus the `Active` ->
/// `GameOver` state machine.
///
/// Not reentrant: callers feeding it from an event loop must serialize
/// moves.
pub struct GameSession<R = StdRng> {
    board: Board,
    ids: TileIds,
    rng: R,
    score: u64,
    best_score: u64,
    move_count: u64,
    max_tile_value: u32,
    started_at: DateTime<Utc>,
    over: bool,
    reported: bool,
    user_id: String,
    reporter: Arc<dyn ScoreReporter>,
}

impl GameSession<StdRng> {
    /// A 4x4 session seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// A 4x4 session with a deterministic tile sequence.
    ///
    /// ```
    /// use gather_2048::GameSession;
    /// let a = GameSession::seeded(9);
    /// let b = GameSession::seeded(9);
    /// assert!(a.board().same_layout(b.board()));
    /// assert_eq!(a.board().tile_count(), 2);
    /// ```
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> GameSession<R> {
    /// A freshly initialized 4x4 session.
    pub fn new(rng: R) -> Self {
        Self::blank(Board::new(DEFAULT_SIZE), rng).initialized()
    }

    /// A freshly initialized `size`x`size` session.
    pub fn with_size(size: usize, rng: R) -> Result<Self> {
        if size == 0 {
            return Err(EngineError::InvalidArgument(
                "board size must be positive".into(),
            ));
        }
        Ok(Self::blank(Board::try_new(size)?, rng).initialized())
    }

    /// Continue from an existing board with zeroed statistics. The session
    /// stays `Active` until a move attempt finds no legal move.
    pub fn resume(board: Board, rng: R) -> Self {
        Self::blank(board, rng)
    }

    /// Rebuild a session from a snapshot. A snapshot of a finished game
    /// stays finished and is not reported again.
    pub fn restore(snapshot: SessionSnapshot, rng: R) -> Result<Self> {
        let board = Board::from_values(snapshot.size, &snapshot.tiles)?;
        let mut session = Self::blank(board, rng);
        session.score = snapshot.score;
        session.best_score = snapshot.best_score.max(snapshot.score);
        session.move_count = snapshot.move_count;
        session.max_tile_value = snapshot.max_tile_value;
        session.started_at = snapshot.started_at;
        session.over = snapshot.is_over;
        session.reported = snapshot.is_over;
        Ok(session)
    }

    fn blank(board: Board, rng: R) -> Self {
        Self {
            ids: TileIds::after(&board),
            board,
            rng,
            score: 0,
            best_score: 0,
            move_count: 0,
            max_tile_value: 0,
            started_at: Utc::now(),
            over: false,
            reported: false,
            user_id: DEFAULT_USER_ID.to_string(),
            reporter: Arc::new(NullReporter),
        }
    }

    fn initialized(mut self) -> Self {
        self.initialize();
        self
    }

    /// Seed the best score carried over from earlier sessions.
    pub fn with_best_score(mut self, best: u64) -> Self {
        self.best_score = self.best_score.max(best);
        self
    }

    /// Send the end-of-game report for `user_id` to `reporter`.
    pub fn with_reporter(
        mut self,
        user_id: impl Into<String>,
        reporter: Arc<dyn ScoreReporter>,
    ) -> Self {
        self.user_id = user_id.into();
        self.reporter = reporter;
        self
    }

    /// Start over: empty board plus two random tiles, zeroed statistics.
    /// `best_score` is kept.
    pub fn initialize(&mut self) {
        self.board = Board::new(self.board.size());
        self.ids = TileIds::new();
        for _ in 0..2 {
            ops::spawn_random_tile(&mut self.board, &mut self.rng, &mut self.ids);
        }
        self.score = 0;
        self.move_count = 0;
        self.max_tile_value = 0;
        self.started_at = Utc::now();
        // Only a 1x1 board can be terminal here; nothing was played, so
        // there is nothing to report.
        self.over = ops::is_game_over(&self.board);
        self.reported = self.over;
    }

    /// Apply one move: slide and merge, spawn a tile if anything changed,
    /// then check for game over. A no-op once the game is over.
    pub fn make_move(&mut self, direction: Move) -> MoveOutcome {
        if self.over {
            return MoveOutcome::unchanged(direction, true);
        }

        let slide = ops::slide(&self.board, direction, &mut self.ids);
        let mut outcome = MoveOutcome::unchanged(direction, false);
        if slide.changed() {
            outcome.changed = true;
            outcome.score_gained = slide.score_gained;
            outcome.merges = slide.merges;
            outcome.events = slide.events;
            self.board = slide.board;
            self.score += slide.score_gained;
            self.best_score = self.best_score.max(self.score);
            self.max_tile_value = self.max_tile_value.max(slide.max_merged);
            outcome.spawned =
                ops::spawn_random_tile(&mut self.board, &mut self.rng, &mut self.ids);
            self.move_count += 1;
        }

        if ops::is_game_over(&self.board) {
            self.finish();
        }
        outcome.game_over = self.over;
        outcome
    }

    /// [`make_move`](Self::make_move) taking a direction name such as
    /// `"left"` or `"ArrowLeft"`.
    ///
    /// ```
    /// use gather_2048::{EngineError, GameSession};
    /// let mut game = GameSession::seeded(1);
    /// assert!(game.make_move_named("up").is_ok());
    /// assert!(matches!(
    ///     game.make_move_named("sideways"),
    ///     Err(EngineError::InvalidArgument(_))
    /// ));
    /// ```
    pub fn make_move_named(&mut self, direction: &str) -> Result<MoveOutcome> {
        let direction = direction.parse::<Move>()?;
        Ok(self.make_move(direction))
    }

    fn finish(&mut self) {
        self.over = true;
        if self.reported {
            return;
        }
        self.reported = true;
        let report = ScoreReport {
            score: self.score,
            duration_seconds: self.duration_seconds(),
            moves: self.move_count,
            max_tile: self.max_tile_value,
            game_type: GAME_TYPE.to_string(),
            user_id: self.user_id.clone(),
        };
        log::debug!(
            "game over for {}: score={} moves={} max_tile={}",
            report.user_id,
            report.score,
            report.moves,
            report.max_tile
        );
        self.reporter.report(report);
    }

    /// Board-level terminal check: full and no adjacent equal pair.
    pub fn is_game_over(&self) -> bool {
        ops::is_game_over(&self.board)
    }

    /// True once the session has reached `GameOver`.
    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn tile_count(&self) -> usize {
        self.board.tile_count()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        if self.over {
            return Vec::new();
        }
        ops::legal_moves(&self.board)
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn best_score(&self) -> u64 {
        self.best_score
    }

    pub fn move_count(&self) -> u64 {
        self.move_count
    }

    /// Highest value produced by a merge this session (spawns do not count).
    pub fn max_tile_value(&self) -> u32 {
        self.max_tile_value
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Whole seconds since the session started.
    pub fn duration_seconds(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            size: self.board.size(),
            tiles: self.board.values(),
            score: self.score,
            best_score: self.best_score,
            move_count: self.move_count,
            max_tile_value: self.max_tile_value,
            started_at: self.started_at,
            is_over: self.over,
        }
    }
}
