//! Job lifecycle controller.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::order::{normalize_remote, Order, OrderLine, SheetSize};
use crate::remote::{
    FileRef, JobStatusReport, JobSummary, RemoteError, RemoteJobService, RemoteStatus,
};
use crate::session::{validated_credential, Credential, SessionProvider};

use super::transition::{needs_files, step, Step};
use super::{
    JobHandle, JobPhase, JobSnapshot, LifecycleConfig, LifecycleError, PanelRequest,
    ProgressEstimate, ValidationError,
};

/// Mutable state of the current job.
#[derive(Debug, Default)]
struct JobState {
    phase: JobPhase,
    job_id: Option<String>,
    epoch: u64,
    order: Vec<OrderLine>,
    sheet_size: Option<SheetSize>,
    progress: ProgressEstimate,
    elapsed_ms: u64,
    files: Vec<FileRef>,
    archive_url: Option<String>,
    error: Option<String>,
    confirm_in_flight: bool,
    last_remote_status: Option<String>,
    /// Sequence number of the last poll issued in this epoch.
    polls_issued: u64,
    /// Sequence number of the last poll applied in this epoch.
    polls_applied: u64,
}

impl JobState {
    /// Fresh state for a new epoch.
    fn begin(epoch: u64) -> Self {
        Self {
            epoch,
            ..Self::default()
        }
    }

    /// Whether a poll response issued as `(epoch, seq)` may still be applied.
    fn accepts(&self, epoch: u64, seq: u64) -> bool {
        self.epoch == epoch && seq > self.polls_applied && self.phase.is_polling()
    }

    /// The active job id if a confirm may start now.
    fn check_confirmable(&self) -> Result<String, ValidationError> {
        let rejected = if self.confirm_in_flight {
            Some(ValidationError::ConfirmInFlight)
        } else if self.phase != JobPhase::PreviewReady {
            Some(ValidationError::ConfirmNotAllowed { phase: self.phase })
        } else {
            None
        };
        if let Some(e) = rejected {
            metrics::CONFIRMATIONS.with_label_values(&["rejected"]).inc();
            return Err(e);
        }
        self.job_id.clone().ok_or(ValidationError::NoActiveJob)
    }

    fn fail(&mut self, message: String) {
        self.phase = JobPhase::Error;
        self.error = Some(message);
        self.files.clear();
        self.archive_url = None;
        self.confirm_in_flight = false;
        metrics::TERMINAL_OUTCOMES.with_label_values(&["error"]).inc();
    }
}

#[derive(Default)]
struct Timers {
    poll: Option<JoinHandle<()>>,
    countdown: Option<JoinHandle<()>>,
}

impl Timers {
    fn abort_all(&mut self) {
        if let Some(handle) = self.poll.take() {
            handle.abort();
        }
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
    }
}

struct Inner {
    remote: Arc<dyn RemoteJobService>,
    session: Arc<dyn SessionProvider>,
    config: LifecycleConfig,
    state: RwLock<JobState>,
    timers: Mutex<Timers>,
}

/// Drives one print job from preview request to final files.
///
/// The controller owns the only copy of the job state. Presentation code
/// reads it through [`snapshot`](Self::snapshot) and changes it only through
/// the lifecycle operations. Status polling and the display countdown run as
/// two independent background tasks while the job is in a polling phase.
///
/// Cloning is cheap; clones share the same job.
#[derive(Clone)]
pub struct JobLifecycleController {
    inner: Arc<Inner>,
}

impl JobLifecycleController {
    pub fn new(
        remote: Arc<dyn RemoteJobService>,
        session: Arc<dyn SessionProvider>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote,
                session,
                config,
                state: RwLock::new(JobState::default()),
                timers: Mutex::new(Timers::default()),
            }),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.inner.config
    }

    /// Validate and coalesce `lines`, create a job and start polling it.
    ///
    /// Supersedes any previous job. Validation and session failures leave
    /// the current state untouched.
    pub async fn submit_preview(
        &self,
        lines: &[OrderLine],
        sheet_size: SheetSize,
    ) -> Result<JobHandle, LifecycleError> {
        let order = Order::new(lines, sheet_size, self.inner.config.unit_cap())?;
        let credential = validated_credential(self.inner.session.as_ref()).await?;

        let epoch = self
            .inner
            .begin_epoch(|state| {
                state.phase = JobPhase::PreviewRequested;
                state.order = order.lines().to_vec();
                state.sheet_size = Some(sheet_size);
            })
            .await;
        metrics::JOBS_SUBMITTED.inc();
        info!(
            epoch,
            lines = order.lines().len(),
            units = order.total_units(),
            "Requesting preview"
        );

        let result = self.inner.remote.create_job(&credential, &order).await;

        let mut state = self.inner.state.write().await;
        if state.epoch != epoch {
            drop(state);
            self.inner.drop_stale("create_job", epoch);
            return Err(LifecycleError::Stale);
        }

        match result {
            Ok(job_id) => {
                state.job_id = Some(job_id.clone());
                drop(state);
                info!(job_id = %job_id, epoch, "Preview requested");
                self.inner.start_timers(epoch).await;
                Ok(JobHandle { job_id, epoch })
            }
            Err(e) => {
                warn!(epoch, error = %e, "Failed to create job");
                state.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Take over a job created earlier and place it with an immediate poll.
    pub async fn attach(&self, job_id: &str) -> Result<JobHandle, LifecycleError> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(ValidationError::EmptyJobId.into());
        }
        validated_credential(self.inner.session.as_ref()).await?;

        let epoch = self
            .inner
            .begin_epoch(|state| {
                state.phase = JobPhase::PreviewRequested;
                state.job_id = Some(job_id.to_string());
            })
            .await;
        info!(job_id = %job_id, epoch, "Attached to existing job");

        let phase = self.inner.poll().await?;
        if phase.is_polling() {
            self.inner.start_timers(epoch).await;
        }

        Ok(JobHandle {
            job_id: job_id.to_string(),
            epoch,
        })
    }

    /// Open the panel with either a new selection or an existing job.
    pub async fn open(&self, request: PanelRequest) -> Result<JobHandle, LifecycleError> {
        match request {
            PanelRequest::PreSubmission {
                order_lines,
                sheet_size,
            } => self.submit_preview(&order_lines, sheet_size).await,
            PanelRequest::PostSubmission { job_id } => self.attach(&job_id).await,
        }
    }

    /// Poll the job service once and apply the result.
    ///
    /// Outside a polling phase this makes no remote call and returns the
    /// current phase.
    pub async fn poll(&self) -> Result<JobPhase, LifecycleError> {
        self.inner.poll().await
    }

    /// Commit the previewed job to final rendering.
    ///
    /// Phase checks come before the session check, so a confirm outside
    /// `PreviewReady` is a validation error even when signed out.
    pub async fn confirm(&self) -> Result<(), LifecycleError> {
        self.inner.state.read().await.check_confirmable()?;
        let credential = validated_credential(self.inner.session.as_ref()).await?;

        let (epoch, job_id) = {
            let mut state = self.inner.state.write().await;
            let job_id = state.check_confirmable()?;
            state.confirm_in_flight = true;
            (state.epoch, job_id)
        };

        info!(job_id = %job_id, epoch, "Confirming job");
        let result = self.inner.remote.confirm_job(&credential, &job_id).await;

        let mut state = self.inner.state.write().await;
        if state.epoch != epoch {
            drop(state);
            self.inner.drop_stale("confirm_job", epoch);
            return Err(LifecycleError::Stale);
        }
        state.confirm_in_flight = false;

        match result {
            Ok(()) => {
                state.phase = JobPhase::Confirmed;
                state.files.clear();
                state.elapsed_ms = 0;
                state.progress = ProgressEstimate::default();
                drop(state);
                metrics::CONFIRMATIONS.with_label_values(&["success"]).inc();
                info!(job_id = %job_id, epoch, "Job confirmed");
                self.inner.start_timers(epoch).await;
                Ok(())
            }
            Err(e) => {
                metrics::CONFIRMATIONS.with_label_values(&["failed"]).inc();
                warn!(job_id = %job_id, error = %e, "Failed to confirm job");
                state.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Confirm, checking that `job_id` is the active job.
    pub async fn confirm_job(&self, job_id: &str) -> Result<(), LifecycleError> {
        {
            let state = self.inner.state.read().await;
            match state.job_id.as_deref() {
                None => return Err(ValidationError::NoActiveJob.into()),
                Some(active) if active != job_id => {
                    return Err(ValidationError::JobMismatch {
                        requested: job_id.to_string(),
                    }
                    .into())
                }
                Some(_) => {}
            }
        }
        self.confirm().await
    }

    /// Jobs previously submitted by the signed-in user, for picking one to
    /// [`attach`](Self::attach). Leaves the current job untouched.
    pub async fn history(&self) -> Result<Vec<JobSummary>, LifecycleError> {
        let credential = validated_credential(self.inner.session.as_ref()).await?;
        let jobs = self.inner.remote.job_history(&credential).await?;
        debug!(jobs = jobs.len(), "Fetched job history");
        Ok(jobs)
    }

    /// Abandon the current job and return to `Initial`. No remote call.
    pub async fn reset(&self) {
        let epoch = self.inner.begin_epoch(|_| {}).await;
        info!(epoch, "Job reset");
    }

    pub async fn snapshot(&self) -> JobSnapshot {
        let state = self.inner.state.read().await;
        let config = &self.inner.config;

        let remaining_secs = match state.phase {
            JobPhase::PreviewReady | JobPhase::Done => 0,
            _ => config
                .eta_budget_secs
                .saturating_sub(state.elapsed_ms / 1000),
        };

        JobSnapshot {
            phase: state.phase,
            job_id: state.job_id.clone(),
            epoch: state.epoch,
            order: state.order.clone(),
            sheet_size: state.sheet_size,
            progress_percent: state.progress.percent(),
            progress_is_estimate: state.progress.is_estimate(),
            remaining_secs,
            files: state.files.clone(),
            archive_url: state.archive_url.clone(),
            error: state.error.clone(),
            status_text: status_text(&state),
            confirm_in_flight: state.confirm_in_flight,
            last_remote_status: state.last_remote_status.clone(),
        }
    }
}

impl Inner {
    /// Stop timers and start a new epoch, letting `init` fill the fresh state.
    async fn begin_epoch(&self, init: impl FnOnce(&mut JobState)) -> u64 {
        let mut state = self.state.write().await;
        self.timers.lock().await.abort_all();

        let epoch = state.epoch + 1;
        *state = JobState::begin(epoch);
        init(&mut state);
        epoch
    }

    fn drop_stale(&self, operation: &str, epoch: u64) {
        metrics::STALE_RESPONSES.inc();
        debug!(operation, epoch, "Dropping stale job service response");
    }

    async fn poll(&self) -> Result<JobPhase, LifecycleError> {
        let (epoch, seq, phase, job_id) = {
            let mut state = self.state.write().await;
            let job_id = match state.job_id.clone() {
                Some(id) if state.phase.is_polling() => id,
                _ => return Ok(state.phase),
            };
            state.polls_issued += 1;
            (state.epoch, state.polls_issued, state.phase, job_id)
        };

        let credential = validated_credential(self.session.as_ref()).await?;
        debug!(job_id = %job_id, epoch, seq, "Polling job status");

        let report = match self.remote.job_status(&credential, &job_id).await {
            Ok(report) => report,
            Err(e) => return self.apply_failure(epoch, seq, &job_id, e).await,
        };

        let files = if needs_files(phase, &report.status) {
            match self.result_files(&credential, &report).await {
                Ok(files) => Some(files),
                Err(e) => return self.apply_failure(epoch, seq, &job_id, e).await,
            }
        } else {
            None
        };

        let mut state = self.state.write().await;
        if !state.accepts(epoch, seq) {
            drop(state);
            self.drop_stale("job_status", epoch);
            return Err(LifecycleError::Stale);
        }

        let next = step(state.phase, &report, self.config.unrecognized_status);
        if matches!(next, Step::Enter(JobPhase::PreviewReady | JobPhase::Done)) && files.is_none() {
            // Phase moved between issuing and applying; files were not fetched.
            drop(state);
            self.drop_stale("job_status", epoch);
            return Err(LifecycleError::Stale);
        }

        state.polls_applied = seq;
        state.last_remote_status = Some(report.status.to_string());
        if state.order.is_empty() {
            if let Some(items) = &report.items {
                state.order = normalize_remote(items);
            }
        }

        let outcome = match next {
            Step::Advance => {
                if let RemoteStatus::Unrecognized(raw) = &report.status {
                    warn!(job_id = %job_id, status = %raw, "Unrecognized job status, treating as in progress");
                }
                state
                    .progress
                    .advance(self.config.progress_step_pct, self.config.progress_cap_pct);
                if matches!(report.status, RemoteStatus::Unrecognized(_)) {
                    "unrecognized"
                } else {
                    "in_progress"
                }
            }
            Step::Enter(phase @ (JobPhase::PreviewReady | JobPhase::Done)) => {
                state.files = files.unwrap_or_default();
                if phase == JobPhase::Done {
                    state.archive_url = report.archive_url.clone();
                }
                state.progress.complete();
                state.phase = phase;
                info!(job_id = %job_id, phase = %phase, files = state.files.len(), "Job files ready");
                if phase == JobPhase::Done {
                    metrics::TERMINAL_OUTCOMES.with_label_values(&["done"]).inc();
                }
                phase.as_str()
            }
            Step::Enter(phase) => {
                state.phase = phase;
                state
                    .progress
                    .advance(self.config.progress_step_pct, self.config.progress_cap_pct);
                info!(job_id = %job_id, phase = %phase, "Job phase changed");
                "in_progress"
            }
            Step::Fail(message) => {
                warn!(job_id = %job_id, error = %message, "Job failed");
                state.fail(message);
                "error"
            }
        };
        metrics::POLLS_TOTAL.with_label_values(&[outcome]).inc();

        Ok(state.phase)
    }

    /// Files listed inline with the report, else from the files endpoint.
    /// A service without a files endpoint yields an empty list.
    async fn result_files(
        &self,
        credential: &Credential,
        report: &JobStatusReport,
    ) -> Result<Vec<FileRef>, RemoteError> {
        if let Some(files) = report.inline_files() {
            return Ok(files.to_vec());
        }
        match self.remote.job_files(credential, &report.job_id).await {
            Err(RemoteError::NotFound(path)) => {
                debug!(job_id = %report.job_id, path = %path, "No files endpoint, job has no files");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn apply_failure(
        &self,
        epoch: u64,
        seq: u64,
        job_id: &str,
        error: RemoteError,
    ) -> Result<JobPhase, LifecycleError> {
        let mut state = self.state.write().await;
        if !state.accepts(epoch, seq) {
            drop(state);
            self.drop_stale("job_status", epoch);
            return Err(LifecycleError::Stale);
        }

        state.polls_applied = seq;
        warn!(job_id = %job_id, error = %error, "Job service request failed");
        state.fail(error.to_string());
        metrics::POLLS_TOTAL.with_label_values(&["failed"]).inc();
        Err(error.into())
    }

    /// Replace any running timers with fresh ones for `epoch`.
    ///
    /// Does nothing if `epoch` was superseded or stopped polling meanwhile.
    /// The state lock is held across the swap, in the same order as
    /// `begin_epoch`, so a newer epoch cannot start in between.
    async fn start_timers(self: &Arc<Self>, epoch: u64) {
        let state = self.state.read().await;
        if state.epoch != epoch || !state.phase.is_polling() {
            debug!(epoch, current = state.epoch, "Not starting timers for a superseded job");
            return;
        }
        let mut timers = self.timers.lock().await;
        timers.abort_all();

        timers.poll = Some(tokio::spawn(run_poll_loop(
            Arc::downgrade(self),
            epoch,
            self.config.poll_interval(),
        )));
        timers.countdown = Some(tokio::spawn(run_countdown(
            Arc::downgrade(self),
            epoch,
            self.config.countdown_tick(),
        )));
    }

    async fn still_polling(&self, epoch: u64) -> bool {
        let state = self.state.read().await;
        state.epoch == epoch && state.phase.is_polling()
    }
}

async fn run_poll_loop(inner: Weak<Inner>, epoch: u64, interval: Duration) {
    debug!(epoch, "Poll loop started");
    loop {
        tokio::time::sleep(interval).await;

        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !inner.still_polling(epoch).await {
            break;
        }

        match inner.poll().await {
            Ok(phase) if !phase.is_polling() => break,
            Ok(_) => {}
            Err(LifecycleError::Auth(e)) => {
                warn!(epoch, error = %e, "No valid session for job poll, retrying next tick");
            }
            // Overtaken by a newer poll of the same job.
            Err(LifecycleError::Stale) => {}
            Err(_) => break,
        }
    }
    debug!(epoch, "Poll loop stopped");
}

async fn run_countdown(inner: Weak<Inner>, epoch: u64, tick: Duration) {
    let tick_ms = tick.as_millis() as u64;
    loop {
        tokio::time::sleep(tick).await;

        let Some(inner) = inner.upgrade() else {
            break;
        };
        let mut state = inner.state.write().await;
        if state.epoch != epoch || !state.phase.is_polling() {
            break;
        }
        state.elapsed_ms = state.elapsed_ms.saturating_add(tick_ms);
    }
}

fn status_text(state: &JobState) -> String {
    match state.phase {
        JobPhase::Initial => "Select prints to request a preview".to_string(),
        JobPhase::PreviewRequested => format!(
            "Generating preview (about {}%)",
            state.progress.percent()
        ),
        JobPhase::PreviewReady => "Preview ready, confirm to generate final files".to_string(),
        JobPhase::Confirmed => format!(
            "Generating final files (about {}%)",
            state.progress.percent()
        ),
        JobPhase::Finalizing => "Packaging final files".to_string(),
        JobPhase::Done => "Final files ready".to_string(),
        JobPhase::Error => format!(
            "Failed: {}",
            state.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
