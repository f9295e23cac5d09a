use std::sync::Arc;

use anyhow::Result;
use gather_2048::ScoreReporter;
use gather_2048::engine::GameSession;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;

use crate::config::StrategyKind;

pub mod strategies;

/// Moves between cooperative yields, so one long game cannot starve the
/// other actors on the same worker.
const YIELD_EVERY: u64 = 64;

/// Per-game actor that plays one session to completion with a fixed
/// strategy. The session reports its final score through `reporter`.
pub struct GameActor {
    pub game_id: u32,
    pub seed: u64,
    pub strategy: StrategyKind,
    pub cancel: CancellationToken,
    session: GameSession,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    pub game_id: u32,
    pub seed: u64,
    pub moves: u64,
    pub score: u64,
    /// Largest tile produced by a merge.
    pub max_tile: u32,
    /// Largest tile on the final board, spawns included.
    pub highest_tile: u32,
    /// False when the run was cancelled before the game ended.
    pub completed: bool,
}

impl GameActor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        game_id: u32,
        seed: u64,
        board_size: usize,
        strategy: StrategyKind,
        best_score: u64,
        user_id: &str,
        reporter: Arc<dyn ScoreReporter>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let session = GameSession::with_size(board_size, StdRng::seed_from_u64(seed))?
            .with_best_score(best_score)
            .with_reporter(user_id, reporter);
        Ok(Self {
            game_id,
            seed,
            strategy,
            cancel,
            session,
        })
    }

    /// Run the actor loop to completion and return the result.
    pub async fn run(mut self) -> GameResult {
        // Separate stream so strategy choices do not shift tile spawns.
        let mut rng = StdRng::seed_from_u64(self.seed.rotate_left(32) ^ 0x2048);

        while !self.session.is_over() {
            if self.cancel.is_cancelled() {
                log::debug!(
                    "game {} cancelled after {} moves",
                    self.game_id,
                    self.session.move_count()
                );
                break;
            }
            let legal = self.session.legal_moves();
            let Some(mv) =
                strategies::select_move(self.strategy, self.session.board(), &legal, &mut rng)
            else {
                break;
            };
            let outcome = self.session.make_move(mv);
            if outcome.changed && self.session.move_count() % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
        }

        GameResult {
            game_id: self.game_id,
            seed: self.seed,
            moves: self.session.move_count(),
            score: self.session.score(),
            max_tile: self.session.max_tile_value(),
            highest_tile: self.session.board().highest_tile(),
            completed: self.session.is_over(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gather_2048::ScoreReport;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<ScoreReport>>);

    impl ScoreReporter for Collect {
        fn report(&self, report: ScoreReport) {
            self.0.lock().unwrap().push(report);
        }
    }

    fn actor(
        seed: u64,
        strategy: StrategyKind,
        sink: Arc<Collect>,
        cancel: CancellationToken,
    ) -> GameActor {
        GameActor::new(0, seed, 4, strategy, 0, "bot", sink, cancel).unwrap()
    }

    #[tokio::test]
    async fn plays_to_the_end_and_reports_once() {
        for strategy in [StrategyKind::Random, StrategyKind::Greedy, StrategyKind::Corner] {
            let sink = Arc::new(Collect::default());
            let result = actor(11, strategy, sink.clone(), CancellationToken::new())
                .run()
                .await;
            assert!(result.completed);
            assert!(result.moves > 0);
            let reports = sink.0.lock().unwrap();
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].score, result.score);
            assert_eq!(reports[0].moves, result.moves);
            assert_eq!(reports[0].user_id, "bot");
            assert!(result.highest_tile >= result.max_tile);
        }
    }

    #[tokio::test]
    async fn same_seed_same_game() {
        let play = || {
            actor(5, StrategyKind::Random, Arc::default(), CancellationToken::new()).run()
        };
        let a = play().await;
        let b = play().await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn cancelled_game_is_not_reported() {
        let sink = Arc::new(Collect::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = actor(3, StrategyKind::Greedy, sink.clone(), cancel).run().await;
        assert!(!result.completed);
        assert_eq!(result.moves, 0);
        assert!(sink.0.lock().unwrap().is_empty());
    }
}
