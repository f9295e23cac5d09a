use std::sync::{Arc, Mutex};

use gather_2048::{ScoreReport, ScoreReporter};
use log::{debug, info, warn};
use score_server::ScoreStore;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Hands finished games to the writer task without blocking the actor.
/// A full or closed queue drops the report with a warning.
#[derive(Clone)]
pub struct ChannelReporter {
    tx: mpsc::Sender<ScoreReport>,
}

impl ScoreReporter for ChannelReporter {
    fn report(&self, report: ScoreReport) {
        match self.tx.try_send(report) {
            Ok(()) => {}
            Err(TrySendError::Full(r)) => warn!(
                "score queue full; dropping report (score={} moves={})",
                r.score, r.moves
            ),
            Err(TrySendError::Closed(r)) => warn!(
                "score writer gone; dropping report (score={} moves={})",
                r.score, r.moves
            ),
        }
    }
}

pub fn channel(cap: usize) -> (ChannelReporter, mpsc::Receiver<ScoreReport>) {
    let (tx, rx) = mpsc::channel(cap.max(1));
    (ChannelReporter { tx }, rx)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriterStats {
    pub saved: u64,
    pub failed: u64,
}

/// Drain `rx` until every sender is dropped, saving each report to `store`
/// on the blocking pool. Without a store reports are only logged.
pub fn spawn_writer(
    mut rx: mpsc::Receiver<ScoreReport>,
    store: Option<Arc<Mutex<ScoreStore>>>,
) -> JoinHandle<WriterStats> {
    tokio::spawn(async move {
        let mut stats = WriterStats::default();
        while let Some(report) = rx.recv().await {
            let Some(store) = store.clone() else {
                info!(
                    "game finished: user={} score={} moves={} max_tile={} duration={}s",
                    report.user_id,
                    report.score,
                    report.moves,
                    report.max_tile,
                    report.duration_seconds
                );
                stats.saved += 1;
                continue;
            };
            let saved = tokio::task::spawn_blocking(move || {
                let mut guard = store
                    .lock()
                    .map_err(|_| anyhow::anyhow!("score store lock poisoned"))?;
                Ok::<_, anyhow::Error>(guard.save_score(report.into())?)
            })
            .await;
            match saved {
                Ok(Ok(row)) => {
                    debug!("saved score {} (id {})", row.score, row.id);
                    stats.saved += 1;
                }
                Ok(Err(e)) => {
                    warn!("failed to save score: {e:#}");
                    stats.failed += 1;
                }
                Err(e) => {
                    warn!("score writer task panicked: {e}");
                    stats.failed += 1;
                }
            }
        }
        stats
    })
}
