use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rand::RngCore;
use score_server::ScoreStore;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::actor::{GameActor, GameResult};
use crate::best::BestScoreFile;
use crate::config::Config;
use crate::reporter;

/// Totals for one run of the player.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Summary {
    pub games: u32,
    pub completed: u32,
    pub total_moves: u64,
    pub best_score: u64,
    pub mean_score: f64,
    /// Largest tile produced by a merge in any game.
    pub max_tile: u32,
    pub saved: u64,
    pub failed: u64,
}

impl Summary {
    fn add(&mut self, r: &GameResult) {
        self.games += 1;
        if r.completed {
            self.completed += 1;
        }
        self.total_moves += r.moves;
        self.best_score = self.best_score.max(r.score);
        self.max_tile = self.max_tile.max(r.max_tile);
        self.mean_score += (r.score as f64 - self.mean_score) / self.games as f64;
    }
}

/// Play `cfg.num_games` games with at most `cfg.max_concurrent_games` in
/// flight. Finished games are saved through the score store when one is
/// configured and raise the best-score file. Cancellation stops new games
/// from starting and ends running ones at their next move.
pub async fn run_games(cfg: &Config, cancel: CancellationToken) -> Result<Summary> {
    let store = match &cfg.store.db_path {
        Some(path) => {
            let store = ScoreStore::open(path)
                .with_context(|| format!("failed to open score store {}", path.display()))?;
            Some(Arc::new(Mutex::new(store)))
        }
        None => None,
    };
    let best_file = cfg.best.path.as_ref().map(BestScoreFile::new);
    let mut best_score = match best_file.clone() {
        Some(f) => tokio::task::spawn_blocking(move || f.load())
            .await
            .map_err(|e| anyhow!("best score load failed: {e}"))??,
        None => 0,
    };
    let base_seed = cfg.seed.unwrap_or_else(|| rand::thread_rng().next_u64());

    info!(
        "Starting {} games: size={} strategy={:?} concurrency={} seed={} store={:?}",
        cfg.num_games,
        cfg.board_size,
        cfg.strategy.kind,
        cfg.max_concurrent_games,
        base_seed,
        cfg.store.db_path
    );

    let (reporter, rx) = reporter::channel(cfg.store.queue_cap);
    let writer = reporter::spawn_writer(rx, store);
    let reporter = Arc::new(reporter);

    let pb = ProgressBar::new(u64::from(cfg.num_games));
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta}) {msg}",
        )?
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );

    let permits = Arc::new(Semaphore::new(cfg.max_concurrent_games));
    let mut tasks: JoinSet<GameResult> = JoinSet::new();
    let mut summary = Summary::default();

    for game_id in 0..cfg.num_games {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = permits.clone().acquire_owned() => permit?,
        };
        let actor = GameActor::new(
            game_id,
            base_seed.wrapping_add(u64::from(game_id)),
            cfg.board_size,
            cfg.strategy.kind,
            best_score,
            &cfg.user_id,
            reporter.clone(),
            cancel.clone(),
        )?;
        tasks.spawn(async move {
            let result = actor.run().await;
            drop(permit);
            result
        });

        // Collect whatever finished meanwhile so the best score stays fresh.
        while let Some(joined) = tasks.try_join_next() {
            let result = joined.map_err(|e| anyhow!("game task failed: {e}"))?;
            finish_game(&result, &mut summary, &mut best_score, best_file.as_ref(), &pb).await;
        }
    }

    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|e| anyhow!("game task failed: {e}"))?;
        finish_game(&result, &mut summary, &mut best_score, best_file.as_ref(), &pb).await;
    }

    // Every session holds a clone; the writer drains once these are gone.
    drop(reporter);
    let stats = writer
        .await
        .map_err(|e| anyhow!("score writer failed: {e}"))?;
    summary.saved = stats.saved;
    summary.failed = stats.failed;

    pb.finish_with_message(format!("best {}", summary.best_score));
    if cancel.is_cancelled() {
        warn!("run cancelled after {} of {} games", summary.games, cfg.num_games);
    }
    Ok(summary)
}

async fn finish_game(
    result: &GameResult,
    summary: &mut Summary,
    best_score: &mut u64,
    best_file: Option<&BestScoreFile>,
    pb: &ProgressBar,
) {
    summary.add(result);
    pb.inc(1);
    if !result.completed || result.score <= *best_score {
        return;
    }
    *best_score = result.score;
    pb.set_message(format!("best {}", result.score));
    if let Some(file) = best_file {
        if let Err(e) = record_best(file, result.score).await {
            warn!("failed to update {}: {e:#}", file.path().display());
        }
    }
}

/// [`BestScoreFile::record`] on the blocking pool.
async fn record_best(file: &BestScoreFile, score: u64) -> Result<u64> {
    let file = file.clone();
    tokio::task::spawn_blocking(move || file.record(score))
        .await
        .map_err(|e| anyhow!("best score update failed: {e}"))?
}
