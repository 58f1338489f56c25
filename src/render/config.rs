use std::path::{Path, PathBuf};

use crate::foundation::error::{DeckreelError, DeckreelResult};
use crate::foundation::io::read_json;

/// Render job manager configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagerConfig {
    /// Root of the per-job temporary trees.
    pub work_root: PathBuf,
    /// Directory final artifacts are written to; `<work_root>/out` when unset.
    pub output_dir: Option<PathBuf>,
    /// Jobs allowed in `processing` at once.
    pub max_concurrent_jobs: usize,
    /// Artifacts smaller than this fail postprocess as corrupt.
    pub min_output_bytes: u64,
    /// Colour of fallback unit rasters when the unit has no colour background.
    pub fallback_rgba: [u8; 4],
    /// Remove a job's temporary tree as soon as it is terminal.
    pub cleanup_on_finish: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir().join("deckreel"),
            output_dir: None,
            max_concurrent_jobs: 3,
            min_output_bytes: 1024,
            fallback_rgba: [24, 24, 32, 255],
            cleanup_on_finish: false,
        }
    }
}

impl ManagerConfig {
    /// Config rooted at `work_root`, everything else default.
    pub fn with_work_root(work_root: impl Into<PathBuf>) -> Self {
        Self {
            work_root: work_root.into(),
            ..Self::default()
        }
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> DeckreelResult<Self> {
        let cfg: Self = read_json(path, "manager config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject unusable values.
    pub fn validate(&self) -> DeckreelResult<()> {
        if self.max_concurrent_jobs == 0 {
            return Err(DeckreelError::validation("maxConcurrentJobs must be > 0"));
        }
        if self.work_root.as_os_str().is_empty() {
            return Err(DeckreelError::validation("workRoot must be non-empty"));
        }
        Ok(())
    }

    /// Resolved artifact directory.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.work_root.join("out"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/config.rs"]
mod tests;
