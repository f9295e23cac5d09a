//! Engine module: the square tile board, the slide/merge move algorithm and
//! the per-game session state machine.
//!
//! - `Board`, `Tile` and `Move` live in `state`.
//! - Pure board operations (slide, spawn, terminal check) live in `ops`.
//! - `GameSession` owns one play-through and the end-of-game report.

pub mod ops;
pub mod session;
pub mod state;

pub use ops::{Slide, TileEvent, is_game_over, legal_moves, preview, slide, spawn_random_tile};
pub use session::{DEFAULT_USER_ID, GameSession, MoveOutcome, SessionSnapshot};
pub use state::{Board, DEFAULT_SIZE, Move, Position, Tile, TileId, TileIds};
