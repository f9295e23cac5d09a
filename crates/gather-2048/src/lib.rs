//! Tile-merging game engine used by the MyGather mini-game.
//!
//! - [`engine`] holds the board model, the move algorithm and the
//!   [`engine::GameSession`] state machine.
//! - [`report`] is the contract for handing a finished game to a score store.

pub mod engine;
pub mod error;
pub mod report;

pub use engine::{Board, GameSession, Move, MoveOutcome, Position, Tile, TileEvent, TileId};
pub use error::EngineError;
pub use report::{GAME_TYPE, NullReporter, ScoreReport, ScoreReporter};
