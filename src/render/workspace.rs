use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::encode::settings::OutputFormat;
use crate::foundation::core::{FrameIndex, JobId};
use crate::foundation::error::DeckreelResult;

/// A job's private temporary tree: `<work_root>/<job_id>/{rasters,frames,audio}`.
///
/// No two jobs share a tree, so nothing inside it needs locking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobWorkspace {
    root: PathBuf,
}

impl JobWorkspace {
    /// Workspace location for `job_id` (nothing is created).
    pub fn new(work_root: &Path, job_id: JobId) -> DeckreelResult<Self> {
        let work_root = std::path::absolute(work_root)
            .with_context(|| format!("resolve work root '{}'", work_root.display()))?;
        Ok(Self {
            root: work_root.join(job_id.to_string()),
        })
    }

    /// Create the directory tree.
    pub async fn create(&self) -> DeckreelResult<()> {
        for dir in [self.rasters_dir(), self.frames_dir(), self.audio_dir()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("create job directory '{}'", dir.display()))?;
        }
        Ok(())
    }

    /// Tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unit rasters.
    pub fn rasters_dir(&self) -> PathBuf {
        self.root.join("rasters")
    }

    /// Generated frames.
    pub fn frames_dir(&self) -> PathBuf {
        self.root.join("frames")
    }

    /// Audio stems.
    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    /// Raster for the `idx`-th unit. The index keeps names unique when ids sanitize alike.
    pub fn raster_path(&self, idx: usize, unit_id: &str) -> PathBuf {
        self.rasters_dir()
            .join(format!("unit_{idx:04}_{}.png", sanitize(unit_id)))
    }

    /// Frame file for an absolute output index.
    pub fn frame_path(&self, index: FrameIndex) -> PathBuf {
        self.frames_dir().join(format!("frame_{:06}.png", index.0))
    }

    /// Base audio stem.
    pub fn audio_path(&self) -> PathBuf {
        self.audio_dir().join("stem.wav")
    }

    /// Remove the tree. Returns `false` when there was nothing to remove.
    pub async fn remove(&self) -> DeckreelResult<bool> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("remove job directory '{}'", self.root.display()))
                .into()),
        }
    }
}

/// Final artifact location: `<output_dir>/<job_id>.<ext>`.
pub fn output_path(output_dir: &Path, job_id: JobId, format: OutputFormat) -> PathBuf {
    output_dir.join(format!("{job_id}.{}", format.extension()))
}

fn sanitize(id: &str) -> String {
    let s: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(48)
        .collect();
    if s.is_empty() { "unit".to_owned() } else { s }
}

#[cfg(test)]
#[path = "../../tests/unit/render/workspace.rs"]
mod tests;
