use std::fmt;
use std::path::PathBuf;

use crate::encode::settings::RenderSettings;
use crate::foundation::core::JobId;

/// Lifecycle state of a render job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a concurrency slot.
    Queued,
    /// Running its stages.
    Processing,
    /// Finished with an artifact.
    Completed,
    /// Finished without an artifact.
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Scheduling priority. Queued jobs start highest priority first, oldest first within a
/// priority; running jobs are never preempted.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background work.
    Low,
    /// Default.
    #[default]
    Normal,
    /// Ahead of normal work.
    High,
    /// Next job to start.
    Urgent,
}

/// Pipeline stage, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Rasterize every content unit.
    AssetPreparation,
    /// Emit one raster per output frame.
    FrameGeneration,
    /// Render the audio stem.
    AudioRender,
    /// Encode the artifact.
    Combine,
    /// Validate the artifact.
    Postprocess,
}

impl Stage {
    /// All stages in order.
    pub const ALL: [Stage; 5] = [
        Stage::AssetPreparation,
        Stage::FrameGeneration,
        Stage::AudioRender,
        Stage::Combine,
        Stage::Postprocess,
    ];

    /// Progress reached when the stage completes.
    pub fn checkpoint(self) -> u8 {
        match self {
            Self::AssetPreparation => 10,
            Self::FrameGeneration => 50,
            Self::AudioRender => 70,
            Self::Combine => 90,
            Self::Postprocess => 100,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::AssetPreparation => "asset preparation",
            Self::FrameGeneration => "frame generation",
            Self::AudioRender => "audio render",
            Self::Combine => "combine",
            Self::Postprocess => "postprocess",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a job failed, so cancellations are never counted as errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FailureKind {
    /// The caller cancelled the job.
    Cancelled,
    /// A stage failed.
    Stage {
        /// Failing stage.
        stage: Stage,
    },
    /// The artifact failed the size check.
    CorruptOutput,
}

/// Severity of a job log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Stage detail.
    Debug,
    /// Lifecycle.
    Info,
    /// Recovered failure.
    Warn,
    /// Fatal failure.
    Error,
}

/// One line of a job's in-memory log.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobLogEntry {
    /// Unix millis.
    pub at: u64,
    /// Severity.
    pub level: LogLevel,
    /// Message.
    pub message: String,
}

/// Snapshot of one render job.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    /// Job id.
    pub id: JobId,
    /// Lifecycle state.
    pub status: JobStatus,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: Priority,
    /// Percent complete, never decreasing.
    pub progress: u8,
    /// Stage currently running (or that was running when the job ended).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<Stage>,
    /// Submission time, unix millis.
    pub created_at: u64,
    /// Time processing began, unix millis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
    /// Time the job became terminal, unix millis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
    /// Final artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Reason for failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Failure classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Recovered problems, e.g. `"3 frames used fallback rendering"`.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Stage history.
    #[serde(default)]
    pub logs: Vec<JobLogEntry>,
    /// Estimated wall-clock render time in seconds.
    pub estimated_render_secs: u64,
    /// Settings the job was submitted with.
    pub settings: RenderSettings,
}

impl RenderJob {
    /// New queued job.
    pub fn new(id: JobId, settings: RenderSettings, estimated_render_secs: u64, now: u64) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            priority: Priority::Normal,
            progress: 0,
            current_stage: None,
            created_at: now,
            start_time: None,
            end_time: None,
            output_path: None,
            error_message: None,
            failure: None,
            warnings: Vec::new(),
            logs: Vec::new(),
            estimated_render_secs,
            settings,
        }
    }

    /// Set the scheduling priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Return `true` once `completed` or `failed`.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Return `true` for a job that failed because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.failure == Some(FailureKind::Cancelled)
    }

    /// `queued -> processing`. Returns `false` (and changes nothing) from any other state.
    pub fn begin(&mut self, now: u64) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Processing;
        self.start_time = Some(now);
        self.push_log(now, LogLevel::Info, "processing started");
        true
    }

    /// Enter `stage`. Ignored unless processing.
    pub fn enter_stage(&mut self, stage: Stage, now: u64) -> bool {
        if self.status != JobStatus::Processing {
            return false;
        }
        self.current_stage = Some(stage);
        self.push_log(now, LogLevel::Debug, format!("{stage} started"));
        true
    }

    /// Raise progress to `progress` (capped at 100). Lower values and updates to jobs that are
    /// not processing are ignored.
    pub fn advance(&mut self, progress: u8) -> bool {
        let progress = progress.min(100);
        if self.status != JobStatus::Processing || progress <= self.progress {
            return false;
        }
        self.progress = progress;
        true
    }

    /// `processing -> completed` with progress 100.
    pub fn complete(&mut self, output: PathBuf, now: u64) -> bool {
        if self.status != JobStatus::Processing {
            return false;
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.end_time = Some(now);
        self.push_log(now, LogLevel::Info, format!("completed: {}", output.display()));
        self.output_path = Some(output);
        true
    }

    /// Any non-terminal state `-> failed`. The message is never empty.
    pub fn fail(&mut self, failure: FailureKind, message: impl Into<String>, now: u64) -> bool {
        if self.is_terminal() {
            return false;
        }
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "unknown error".to_owned();
        }
        self.status = JobStatus::Failed;
        self.end_time = Some(now);
        self.failure = Some(failure);
        self.push_log(now, LogLevel::Error, message.clone());
        self.error_message = Some(message);
        true
    }

    /// Record a recovered problem.
    pub fn warn(&mut self, message: impl Into<String>, now: u64) {
        let message = message.into();
        self.push_log(now, LogLevel::Warn, message.clone());
        self.warnings.push(message);
    }

    /// Append a log line.
    pub fn push_log(&mut self, now: u64, level: LogLevel, message: impl Into<String>) {
        self.logs.push(JobLogEntry {
            at: now,
            level,
            message: message.into(),
        });
    }

    /// Processing wall time in millis, once terminal.
    pub fn wall_time_ms(&self) -> Option<u64> {
        Some(self.end_time?.saturating_sub(self.start_time?))
    }
}

/// Aggregate counters across every job the manager knows about.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetrics {
    /// All jobs.
    pub total: usize,
    /// Waiting for a slot.
    pub queued: usize,
    /// Running.
    pub processing: usize,
    /// Completed.
    pub completed: usize,
    /// Failed for reasons other than cancellation.
    pub failed: usize,
    /// Cancelled by the caller.
    pub cancelled: usize,
    /// Mean processing wall time of completed jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_render_ms: Option<u64>,
}

impl JobMetrics {
    /// Fold job snapshots into counters.
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a RenderJob>) -> Self {
        let mut m = Self::default();
        let (mut wall_sum, mut wall_n) = (0u64, 0u64);
        for job in jobs {
            m.total += 1;
            match job.status {
                JobStatus::Queued => m.queued += 1,
                JobStatus::Processing => m.processing += 1,
                JobStatus::Completed => {
                    m.completed += 1;
                    if let Some(ms) = job.wall_time_ms() {
                        wall_sum += ms;
                        wall_n += 1;
                    }
                }
                JobStatus::Failed if job.is_cancelled() => m.cancelled += 1,
                JobStatus::Failed => m.failed += 1,
            }
        }
        m.avg_render_ms = (wall_n > 0).then(|| wall_sum / wall_n);
        m
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/job.rs"]
mod tests;
