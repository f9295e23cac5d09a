mod actor;
mod best;
mod config;
mod pipeline;
mod reporter;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use tokio_util::sync::CancellationToken;

use config::Config;

#[derive(Parser, Debug)]
#[command(about = "Play 2048 games headlessly and record their scores")]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "FILE", value_parser = clap::value_parser!(PathBuf))]
    config: PathBuf,
    /// Override `num_games` from the config
    #[arg(long, value_name = "N")]
    games: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let mut cfg = Config::from_toml(&args.config).context("failed to load config")?;
    if let Some(games) = args.games {
        cfg.num_games = games;
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("interrupt received; finishing up");
                    cancel.cancel();
                }
                Err(e) => error!("failed to listen for ctrl-c: {e}"),
            }
        });
    }

    let summary = pipeline::run_games(&cfg, cancel).await?;
    info!(
        "Played {} games ({} finished): best={} mean={:.1} max_tile={} moves={} saved={} failed={}",
        summary.games,
        summary.completed,
        summary.best_score,
        summary.mean_score,
        summary.max_tile,
        summary.total_moves,
        summary.saved,
        summary.failed
    );
    Ok(())
}
