//! Mock job service for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::order::{Order, OrderLine, SheetSize};
use crate::remote::{
    FileRef, JobStatusReport, JobSummary, RemoteError, RemoteJobService, RemoteStatus,
};
use crate::session::Credential;

/// A recorded job service call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    CreateJob {
        lines: Vec<OrderLine>,
        sheet_size: SheetSize,
        token: String,
    },
    JobStatus {
        job_id: String,
    },
    JobFiles {
        job_id: String,
    },
    ConfirmJob {
        job_id: String,
    },
    JobHistory {
        token: String,
    },
}

/// Mock implementation of the RemoteJobService trait.
///
/// Provides controllable behavior for testing:
/// - Scripted status sequences per job
/// - Recorded calls for assertions
/// - Injected failures and response delays
///
/// New jobs report `queued` until scripted otherwise. A script is consumed
/// one report per status call; its last report repeats. Confirming a job
/// that reports `preview_ready` moves it back to `queued`.
///
/// # Example
///
/// ```rust,ignore
/// let service = MockJobService::new();
/// let job_id = service.create_job(&credential, &order).await?;
///
/// service
///     .script_statuses(&job_id, vec![RemoteStatus::Processing, RemoteStatus::PreviewReady])
///     .await;
///
/// assert_eq!(service.status_calls().await, 0);
/// ```
#[derive(Debug)]
pub struct MockJobService {
    /// Recorded calls, in order.
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    /// Remaining status reports per job id.
    scripts: Arc<RwLock<HashMap<String, VecDeque<JobStatusReport>>>>,
    /// Files per job id.
    files: Arc<RwLock<HashMap<String, Vec<FileRef>>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<RemoteError>>>,
    /// Delay applied before every response.
    delay: Arc<RwLock<Duration>>,
    /// Counter for generating job ids.
    job_counter: Arc<RwLock<u32>>,
    /// When false, the files endpoint answers 404 like a service without it.
    files_route: Arc<RwLock<bool>>,
    /// Entries returned by `job_history`.
    history: Arc<RwLock<Vec<JobSummary>>>,
}

impl Default for MockJobService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockJobService {
    /// Create a new mock job service.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            scripts: Arc::new(RwLock::new(HashMap::new())),
            files: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            job_counter: Arc::new(RwLock::new(0)),
            files_route: Arc::new(RwLock::new(true)),
            history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Replace the status script of a job.
    pub async fn script_statuses(&self, job_id: &str, statuses: Vec<RemoteStatus>) {
        let reports = statuses
            .into_iter()
            .map(|s| JobStatusReport::new(job_id, s))
            .collect();
        self.scripts
            .write()
            .await
            .insert(job_id.to_string(), reports);
    }

    /// Make a job report a single status from now on.
    pub async fn set_status(&self, job_id: &str, status: RemoteStatus) {
        self.script_statuses(job_id, vec![status]).await;
    }

    /// Make a job report a full status report from now on.
    pub async fn set_report(&self, report: JobStatusReport) {
        self.scripts
            .write()
            .await
            .insert(report.job_id.clone(), VecDeque::from([report]));
    }

    /// Make `job_files` fail with `NotFound` for every job.
    pub async fn remove_files_route(&self) {
        *self.files_route.write().await = false;
    }

    /// Set the entries returned by `job_history`.
    pub async fn set_history(&self, jobs: Vec<JobSummary>) {
        *self.history.write().await = jobs;
    }

    /// Set the files returned for a job.
    pub async fn set_files(&self, job_id: &str, files: Vec<FileRef>) {
        self.files.write().await.insert(job_id.to_string(), files);
    }

    /// Make the next operation fail with the given error.
    pub async fn set_next_error(&self, error: RemoteError) {
        *self.next_error.write().await = Some(error);
    }

    /// Delay every response by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Get all recorded calls.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Order lines of every create_job call.
    pub async fn created_orders(&self) -> Vec<Vec<OrderLine>> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordedCall::CreateJob { lines, .. } => Some(lines.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn status_calls(&self) -> usize {
        self.count(|c| matches!(c, RecordedCall::JobStatus { .. }))
            .await
    }

    pub async fn files_calls(&self) -> usize {
        self.count(|c| matches!(c, RecordedCall::JobFiles { .. })).await
    }

    pub async fn confirm_calls(&self) -> usize {
        self.count(|c| matches!(c, RecordedCall::ConfirmJob { .. }))
            .await
    }

    async fn count(&self, pred: impl Fn(&RecordedCall) -> bool) -> usize {
        self.calls.read().await.iter().filter(|c| pred(c)).count()
    }

    async fn record(&self, call: RecordedCall) -> Result<(), RemoteError> {
        self.calls.write().await.push(call);

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteJobService for MockJobService {
    async fn create_job(
        &self,
        credential: &Credential,
        order: &Order,
    ) -> Result<String, RemoteError> {
        self.record(RecordedCall::CreateJob {
            lines: order.lines().to_vec(),
            sheet_size: order.sheet_size(),
            token: credential.token.clone(),
        })
        .await?;

        let job_id = {
            let mut counter = self.job_counter.write().await;
            *counter += 1;
            format!("job-{}", *counter)
        };
        self.set_status(&job_id, RemoteStatus::Queued).await;
        Ok(job_id)
    }

    async fn job_status(
        &self,
        _credential: &Credential,
        job_id: &str,
    ) -> Result<JobStatusReport, RemoteError> {
        self.record(RecordedCall::JobStatus {
            job_id: job_id.to_string(),
        })
        .await?;

        let mut scripts = self.scripts.write().await;
        let script = scripts
            .get_mut(job_id)
            .ok_or_else(|| RemoteError::NotFound(job_id.to_string()))?;
        let report = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        report.ok_or_else(|| RemoteError::NotFound(job_id.to_string()))
    }

    async fn job_files(
        &self,
        _credential: &Credential,
        job_id: &str,
    ) -> Result<Vec<FileRef>, RemoteError> {
        self.record(RecordedCall::JobFiles {
            job_id: job_id.to_string(),
        })
        .await?;

        if !*self.files_route.read().await {
            return Err(RemoteError::NotFound(format!("/jobs/{}/files", job_id)));
        }
        let files = self.files.read().await.get(job_id).cloned();
        Ok(files.unwrap_or_else(|| {
            vec![FileRef {
                id: format!("{}-sheet-1", job_id),
                url: format!("https://files.mock/{}/sheet-1.png", job_id),
                page_index: Some(0),
            }]
        }))
    }

    async fn confirm_job(&self, _credential: &Credential, job_id: &str) -> Result<(), RemoteError> {
        self.record(RecordedCall::ConfirmJob {
            job_id: job_id.to_string(),
        })
        .await?;

        let mut scripts = self.scripts.write().await;
        let script = scripts
            .get_mut(job_id)
            .ok_or_else(|| RemoteError::NotFound(job_id.to_string()))?;
        if script.back().map(|r| &r.status) == Some(&RemoteStatus::PreviewReady) {
            *script = VecDeque::from([JobStatusReport::new(job_id, RemoteStatus::Queued)]);
        }
        Ok(())
    }

    async fn job_history(&self, credential: &Credential) -> Result<Vec<JobSummary>, RemoteError> {
        self.record(RecordedCall::JobHistory {
            token: credential.token.clone(),
        })
        .await?;

        Ok(self.history.read().await.clone())
    }

    fn service_name(&self) -> &'static str {
        "mock"
    }
}
