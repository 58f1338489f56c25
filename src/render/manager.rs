use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::animation::store::TrackStore;
use crate::encode::encoder::Encoder;
use crate::encode::settings::{RenderSettings, estimate_render_secs};
use crate::foundation::core::{JobId, now_millis};
use crate::foundation::error::{DeckreelError, DeckreelResult};
use crate::render::config::ManagerConfig;
use crate::render::job::{FailureKind, JobMetrics, JobStatus, Priority, RenderJob, Stage};
use crate::render::pipeline::{JobReporter, StageContext, run_stages};
use crate::render::scheduler::{SlotScheduler, SlotTicket};
use crate::render::workspace::{JobWorkspace, output_path};
use crate::timeline::model::{RenderTimeline, TrackKind};

/// What a job was submitted with; kept so terminal jobs can be retried.
#[derive(Clone, Debug)]
struct JobRequest {
    timeline: Arc<RenderTimeline>,
    settings: RenderSettings,
    animations: Arc<TrackStore>,
    priority: Priority,
}

struct JobEntry {
    request: JobRequest,
    reporter: JobReporter,
    cancel: CancellationToken,
    workspace: JobWorkspace,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl JobEntry {
    fn snapshot(&self) -> RenderJob {
        self.reporter.snapshot()
    }
}

struct Inner {
    encoder: Arc<dyn Encoder>,
    config: ManagerConfig,
    jobs: RwLock<HashMap<JobId, Arc<JobEntry>>>,
    slots: Arc<SlotScheduler>,
    runtime: Handle,
}

/// Owns the job table and runs each submitted job as its own task.
///
/// At most [`ManagerConfig::max_concurrent_jobs`] jobs are `processing` at once; the rest wait
/// `queued` and start by [`Priority`], oldest first within a priority. Status reads return whole [`RenderJob`] snapshots, so `progress` and `status` are
/// always observed together. Clones share the same table.
#[derive(Clone)]
pub struct RenderJobManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RenderJobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderJobManager")
            .field("config", &self.inner.config)
            .field("jobs", &self.inner.jobs.read().len())
            .field("waiting", &self.inner.slots.waiting())
            .finish()
    }
}

impl RenderJobManager {
    /// Manager spawning onto the current tokio runtime.
    pub fn new(encoder: Arc<dyn Encoder>, config: ManagerConfig) -> DeckreelResult<Self> {
        let runtime = Handle::try_current().context("RenderJobManager needs a tokio runtime")?;
        Self::with_runtime(encoder, config, runtime)
    }

    /// Manager spawning onto `runtime`.
    pub fn with_runtime(
        encoder: Arc<dyn Encoder>,
        config: ManagerConfig,
        runtime: Handle,
    ) -> DeckreelResult<Self> {
        config.validate()?;
        let slots = SlotScheduler::new(config.max_concurrent_jobs);
        Ok(Self {
            inner: Arc::new(Inner {
                encoder,
                config,
                jobs: RwLock::new(HashMap::new()),
                slots,
                runtime,
            }),
        })
    }

    /// Manager configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Queue a render of `timeline` with no animation tracks.
    pub fn submit_job(
        &self,
        timeline: RenderTimeline,
        settings: RenderSettings,
    ) -> DeckreelResult<JobId> {
        self.submit_animated(timeline, settings, TrackStore::new())
    }

    /// Queue a render of `timeline` at normal priority, sampling `animations` for every frame.
    pub fn submit_animated(
        &self,
        timeline: RenderTimeline,
        settings: RenderSettings,
        animations: TrackStore,
    ) -> DeckreelResult<JobId> {
        self.submit_with_priority(timeline, settings, animations, Priority::Normal)
    }

    /// Queue a render of `timeline` at `priority`.
    ///
    /// Settings and timeline are validated here; nothing is queued when either is rejected.
    #[tracing::instrument(
        skip(self, timeline, settings, animations),
        fields(tracks = timeline.tracks.len(), animations = animations.len())
    )]
    pub fn submit_with_priority(
        &self,
        timeline: RenderTimeline,
        settings: RenderSettings,
        animations: TrackStore,
        priority: Priority,
    ) -> DeckreelResult<JobId> {
        settings.validate()?;
        timeline.validate()?;
        if timeline.tracks_of(TrackKind::Video).next().is_none() {
            return Err(DeckreelError::validation("timeline has no video tracks"));
        }
        self.spawn_job(JobRequest {
            timeline: Arc::new(timeline),
            settings,
            animations: Arc::new(animations),
            priority,
        })
    }

    fn spawn_job(&self, request: JobRequest) -> DeckreelResult<JobId> {
        let id = JobId::generate();
        let workspace = JobWorkspace::new(&self.inner.config.work_root, id)?;
        let estimate = estimate_render_secs(&request.timeline, &request.settings);
        let priority = request.priority;
        let (tx, _rx) = watch::channel(
            RenderJob::new(id, request.settings.clone(), estimate, now_millis())
                .with_priority(priority),
        );
        let entry = Arc::new(JobEntry {
            request,
            reporter: JobReporter::new(tx),
            cancel: CancellationToken::new(),
            workspace,
            task: Mutex::new(None),
        });
        self.inner.jobs.write().insert(id, Arc::clone(&entry));
        let ticket = self.inner.slots.enqueue(priority);
        tracing::info!(job_id = %id, ?priority, estimated_secs = estimate, "job queued");

        let handle = self.inner.runtime.spawn(run_job(
            Arc::clone(&self.inner),
            Arc::clone(&entry),
            ticket,
        ));
        *entry.task.lock() = Some(handle);
        Ok(id)
    }

    /// Current snapshot of a job.
    pub fn get_job_status(&self, id: JobId) -> DeckreelResult<RenderJob> {
        Ok(self.entry(id)?.snapshot())
    }

    /// Snapshots of every job, oldest first.
    pub fn list_jobs(&self) -> Vec<RenderJob> {
        let mut jobs: Vec<RenderJob> = self
            .inner
            .jobs
            .read()
            .values()
            .map(|e| e.snapshot())
            .collect();
        jobs.sort_by_key(|j| (j.created_at, j.id.0));
        jobs
    }

    /// Cancel a `processing` job: it fails with `"cancelled"` and its in-flight encoder call is
    /// terminated. Returns `false` for queued, terminal and unknown jobs.
    pub fn cancel_job(&self, id: JobId) -> bool {
        let Ok(entry) = self.entry(id) else {
            return false;
        };
        let cancelled = entry.reporter.update(|job| {
            job.status == JobStatus::Processing
                && job.fail(FailureKind::Cancelled, "cancelled", now_millis())
        });
        if cancelled {
            entry.cancel.cancel();
            tracing::info!(job_id = %id, "job cancelled");
        }
        cancelled
    }

    /// Remove a job's intermediate files. The final artifact is kept.
    ///
    /// Returns `Ok(false)` for unknown jobs or when there was nothing to remove. Errors do not
    /// change the job's status.
    pub async fn cleanup_job(&self, id: JobId) -> DeckreelResult<bool> {
        let Ok(entry) = self.entry(id) else {
            return Ok(false);
        };
        let removed = entry.workspace.remove().await?;
        tracing::debug!(job_id = %id, removed, "job workspace cleaned");
        Ok(removed)
    }

    /// Drop a terminal job from the table and remove its intermediate files. The final
    /// artifact is kept.
    ///
    /// Returns `Ok(false)` for unknown jobs; running and queued jobs are rejected.
    pub async fn remove_job(&self, id: JobId) -> DeckreelResult<bool> {
        let entry = {
            let mut jobs = self.inner.jobs.write();
            let Some(entry) = jobs.get(&id) else {
                return Ok(false);
            };
            if !entry.snapshot().is_terminal() {
                return Err(DeckreelError::validation(format!(
                    "job {id} is still running and cannot be removed"
                )));
            }
            jobs.remove(&id)
        };
        if let Some(entry) = entry {
            entry.workspace.remove().await?;
            tracing::debug!(job_id = %id, "job removed");
        }
        Ok(true)
    }

    /// Evict every terminal job that ended at least `older_than` ago, removing its intermediate
    /// files. Returns how many jobs were evicted.
    pub async fn clean_finished_jobs(&self, older_than: Duration) -> usize {
        let age_ms = u64::try_from(older_than.as_millis()).unwrap_or(u64::MAX);
        let cutoff = now_millis().saturating_sub(age_ms);
        let evicted: Vec<(JobId, Arc<JobEntry>)> = {
            let mut jobs = self.inner.jobs.write();
            let stale: Vec<JobId> = jobs
                .iter()
                .filter(|(_, e)| {
                    let job = e.snapshot();
                    job.is_terminal() && job.end_time.is_some_and(|end| end <= cutoff)
                })
                .map(|(id, _)| *id)
                .collect();
            stale
                .into_iter()
                .filter_map(|id| jobs.remove(&id).map(|e| (id, e)))
                .collect()
        };

        for (id, entry) in &evicted {
            if let Err(e) = entry.workspace.remove().await {
                tracing::warn!(job_id = %id, error = %e, "evicted job workspace cleanup failed");
            }
        }
        if !evicted.is_empty() {
            tracing::info!(evicted = evicted.len(), "finished jobs cleaned");
        }
        evicted.len()
    }

    /// Resubmit a terminal job's request as a new job.
    pub fn retry_job(&self, id: JobId) -> DeckreelResult<JobId> {
        let entry = self.entry(id)?;
        if !entry.snapshot().is_terminal() {
            return Err(DeckreelError::validation(format!(
                "job {id} is still running and cannot be retried"
            )));
        }
        let new_id = self.spawn_job(entry.request.clone())?;
        tracing::info!(job_id = %new_id, retry_of = %id, "job resubmitted");
        Ok(new_id)
    }

    /// Receiver of a job's snapshots; it sees every later change.
    pub fn subscribe(&self, id: JobId) -> DeckreelResult<watch::Receiver<RenderJob>> {
        Ok(self.entry(id)?.reporter.sender().subscribe())
    }

    /// Wait until the job is terminal and return its final snapshot.
    pub async fn wait_for(&self, id: JobId) -> DeckreelResult<RenderJob> {
        let entry = self.entry(id)?;
        let mut rx = entry.reporter.sender().subscribe();
        let job = rx
            .wait_for(RenderJob::is_terminal)
            .await
            .map(|job| job.clone())
            .map_err(|_| DeckreelError::not_found(format!("job {id} was dropped")))?;
        Ok(job)
    }

    /// Aggregate counters across all jobs.
    pub fn metrics(&self) -> JobMetrics {
        JobMetrics::from_jobs(&self.list_jobs())
    }

    /// Fail every non-terminal job as cancelled, stop their encoder calls and wait for the tasks.
    pub async fn shutdown(&self) {
        let entries: Vec<Arc<JobEntry>> = self.inner.jobs.read().values().cloned().collect();
        let mut handles = Vec::new();
        for entry in &entries {
            entry
                .reporter
                .update(|job| job.fail(FailureKind::Cancelled, "cancelled", now_millis()));
            entry.cancel.cancel();
            if let Some(h) = entry.task.lock().take() {
                handles.push(h);
            }
        }
        for h in handles {
            if let Err(e) = h.await {
                tracing::warn!(error = %e, "job task ended abnormally");
            }
        }
        tracing::info!(jobs = entries.len(), "render job manager shut down");
    }

    fn entry(&self, id: JobId) -> DeckreelResult<Arc<JobEntry>> {
        self.inner
            .jobs
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| DeckreelError::not_found(format!("job {id}")))
    }
}

async fn run_job(inner: Arc<Inner>, entry: Arc<JobEntry>, ticket: SlotTicket) {
    let id = entry.snapshot().id;
    let permit = tokio::select! {
        biased;
        _ = entry.cancel.cancelled() => return,
        permit = ticket.acquire() => match permit {
            Some(p) => p,
            None => {
                entry.reporter.update(|job| {
                    job.fail(FailureKind::Cancelled, "cancelled", now_millis())
                });
                return;
            }
        },
    };

    if !entry.reporter.update(|job| job.begin(now_millis())) {
        return;
    }
    tracing::info!(job_id = %id, "job started");

    let result = process(&inner, &entry, id).await;
    drop(permit);

    match result {
        Ok(output) => {
            let done = entry
                .reporter
                .update(|job| job.complete(output.clone(), now_millis()));
            if done {
                let job = entry.snapshot();
                tracing::info!(
                    job_id = %id,
                    output = %output.display(),
                    warnings = job.warnings.len(),
                    wall_ms = job.wall_time_ms().unwrap_or(0),
                    "job completed"
                );
            }
        }
        Err(e) => {
            let stage = entry
                .snapshot()
                .current_stage
                .unwrap_or(Stage::AssetPreparation);
            let (kind, message) = classify(&e, stage);
            entry
                .reporter
                .update(|job| job.fail(kind, message, now_millis()));
            if e.is_cancelled() {
                tracing::info!(job_id = %id, %stage, "job stopped after cancellation");
            } else {
                tracing::error!(job_id = %id, %stage, error = %e, "job failed");
            }
        }
    }

    if inner.config.cleanup_on_finish {
        if let Err(e) = entry.workspace.remove().await {
            tracing::warn!(job_id = %id, error = %e, "job workspace cleanup failed");
        }
    }
}

async fn process(inner: &Inner, entry: &JobEntry, id: JobId) -> DeckreelResult<PathBuf> {
    entry.workspace.create().await?;
    let output_dir = inner.config.output_dir();
    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("create output directory '{}'", output_dir.display()))?;

    let req = &entry.request;
    let ctx = StageContext {
        encoder: inner.encoder.as_ref(),
        cancel: &entry.cancel,
        reporter: &entry.reporter,
        workspace: &entry.workspace,
        timeline: &req.timeline,
        settings: &req.settings,
        animations: &req.animations,
        config: &inner.config,
        output: output_path(&output_dir, id, req.settings.format),
    };
    run_stages(&ctx).await
}

fn classify(e: &DeckreelError, stage: Stage) -> (FailureKind, String) {
    match e {
        DeckreelError::Cancelled => (FailureKind::Cancelled, "cancelled".to_owned()),
        DeckreelError::CorruptOutput { .. } => (FailureKind::CorruptOutput, e.to_string()),
        _ => (FailureKind::Stage { stage }, e.to_string()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/manager.rs"]
mod tests;
