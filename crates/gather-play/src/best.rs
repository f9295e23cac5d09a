use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BestScore {
    best_score: u64,
}

/// Best score persisted across runs as `{"bestScore": n}`.
///
/// Not locked: concurrent runs sharing a file are last-writer-wins.
#[derive(Debug, Clone)]
pub struct BestScoreFile {
    path: PathBuf,
}

impl BestScoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored best, 0 when the file does not exist yet.
    pub fn load(&self) -> Result<u64> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()));
            }
        };
        let best: BestScore = serde_json::from_slice(&bytes)
            .with_context(|| format!("invalid best score file {}", self.path.display()))?;
        Ok(best.best_score)
    }

    /// Raise the stored best to `score` if higher. Returns the best after
    /// the update.
    pub fn record(&self, score: u64) -> Result<u64> {
        let current = self.load()?;
        if score <= current {
            return Ok(current);
        }
        self.write(score)?;
        Ok(score)
    }

    fn write(&self, best_score: u64) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(&BestScore { best_score })?;
        fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_zero() {
        let td = tempdir().unwrap();
        let best = BestScoreFile::new(td.path().join("best.json"));
        assert_eq!(best.load().unwrap(), 0);
    }

    #[test]
    fn record_only_raises() {
        let td = tempdir().unwrap();
        let best = BestScoreFile::new(td.path().join("state").join("best.json"));
        assert_eq!(best.record(1200).unwrap(), 1200);
        assert_eq!(best.record(800).unwrap(), 1200);
        assert_eq!(best.record(4000).unwrap(), 4000);
        assert_eq!(best.load().unwrap(), 4000);

        let raw = fs::read_to_string(best.path()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["bestScore"], 4000);
    }

    #[test]
    fn garbage_is_an_error() {
        let td = tempdir().unwrap();
        let path = td.path().join("best.json");
        fs::write(&path, "not json").unwrap();
        assert!(BestScoreFile::new(path).load().is_err());
    }
}
