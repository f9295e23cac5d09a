use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Uniform over the moves that change the board.
    #[default]
    Random,
    /// Largest immediate merge score; ties go to Up, Down, Left, Right order.
    Greedy,
    /// Fixed preference Down, Left, Right, Up.
    Corner,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct Strategy {
    #[serde(default)]
    pub kind: StrategyKind,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct Config {
    pub num_games: u32,
    #[serde(default = "defaults::max_concurrent_games")]
    pub max_concurrent_games: usize,
    #[serde(default = "defaults::board_size")]
    pub board_size: usize,
    #[serde(default = "defaults::user_id")]
    pub user_id: String,
    /// Base seed; game `i` uses `seed + i`. Drawn from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub store: Store,
    #[serde(default)]
    pub best: Best,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct Store {
    /// SQLite score database. Reports are only logged when unset.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default = "defaults::queue_cap")]
    pub queue_cap: usize,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            db_path: None,
            queue_cap: defaults::queue_cap(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct Best {
    /// JSON file holding the best score across runs.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.board_size < 2 {
            bail!("board_size must be at least 2, got {}", self.board_size);
        }
        if self.max_concurrent_games == 0 {
            bail!("max_concurrent_games must be positive");
        }
        if self.store.queue_cap == 0 {
            bail!("store.queue_cap must be positive");
        }
        Ok(())
    }
}

mod defaults {
    pub fn max_concurrent_games() -> usize { 4 }
    pub fn board_size() -> usize { gather_2048::engine::DEFAULT_SIZE }
    pub fn user_id() -> String { gather_2048::engine::DEFAULT_USER_ID.to_string() }
    pub fn queue_cap() -> usize { 1024 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = Config::from_toml_str("num_games = 3").unwrap();
        assert_eq!(cfg.num_games, 3);
        assert_eq!(cfg.max_concurrent_games, 4);
        assert_eq!(cfg.board_size, 4);
        assert_eq!(cfg.user_id, "default-user-id");
        assert_eq!(cfg.strategy.kind, StrategyKind::Random);
        assert_eq!(cfg.store.db_path, None);
        assert_eq!(cfg.store.queue_cap, 1024);
        assert_eq!(cfg.best.path, None);
    }

    #[test]
    fn full_config_parses() {
        let cfg = Config::from_toml_str(
            r#"
            num_games = 50
            max_concurrent_games = 8
            board_size = 5
            user_id = "bot-1"
            seed = 1234

            [strategy]
            kind = "greedy"

            [store]
            db_path = "data/gather.db"
            queue_cap = 16

            [best]
            path = "data/best.json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.strategy.kind, StrategyKind::Greedy);
        assert_eq!(cfg.seed, Some(1234));
        assert_eq!(cfg.store.db_path, Some(PathBuf::from("data/gather.db")));
        assert_eq!(cfg.best.path, Some(PathBuf::from("data/best.json")));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_toml_str("num_games = 1\nboard_size = 1").is_err());
        assert!(Config::from_toml_str("num_games = 1\nmax_concurrent_games = 0").is_err());
        assert!(Config::from_toml_str("num_games = 1\n[strategy]\nkind = \"psychic\"").is_err());
    }
}
