//! Types for job service operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::order::{Order, OrderLine};
use crate::session::Credential;

/// Errors returned by the job service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Job service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job service rejected the session credential")]
    Unauthorized,

    #[error("Job service did not return a job id")]
    MissingJobId,

    #[error("Failed to parse job service response: {0}")]
    Parse(String),
}

/// Job status as reported by the job service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    /// Preview render requested, not started yet.
    PreviewRequested,
    /// Preview sheets are available.
    PreviewReady,
    /// Accepted and waiting for a worker.
    Queued,
    /// A worker is rendering.
    Processing,
    /// Final render committed by the user.
    Confirmed,
    /// Final files are being packaged.
    Finalizing,
    /// Final files are available.
    Done,
    /// Rendering failed.
    Error,
    /// A status this client does not know about.
    Unrecognized(String),
}

impl RemoteStatus {
    /// Parse the wire representation. Never fails; unknown values are kept.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "preview_requested" | "preview" => RemoteStatus::PreviewRequested,
            "preview_ready" | "preview_done" => RemoteStatus::PreviewReady,
            "queued" => RemoteStatus::Queued,
            "processing" => RemoteStatus::Processing,
            "confirmed" => RemoteStatus::Confirmed,
            "finalizing" => RemoteStatus::Finalizing,
            "done" => RemoteStatus::Done,
            "error" | "failed" => RemoteStatus::Error,
            _ => RemoteStatus::Unrecognized(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RemoteStatus::PreviewRequested => "preview_requested",
            RemoteStatus::PreviewReady => "preview_ready",
            RemoteStatus::Queued => "queued",
            RemoteStatus::Processing => "processing",
            RemoteStatus::Confirmed => "confirmed",
            RemoteStatus::Finalizing => "finalizing",
            RemoteStatus::Done => "done",
            RemoteStatus::Error => "error",
            RemoteStatus::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status poll result.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatusReport {
    pub job_id: String,
    pub status: RemoteStatus,
    pub error: Option<String>,
    /// Order lines echoed by the service, if it includes them.
    pub items: Option<Vec<OrderLine>>,
    /// Rendered files listed inline with the status, if the service does so.
    pub result_files: Option<Vec<FileRef>>,
    /// Download URL of the final archive.
    pub archive_url: Option<String>,
}

impl JobStatusReport {
    pub fn new(job_id: impl Into<String>, status: RemoteStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            error: None,
            items: None,
            result_files: None,
            archive_url: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_items(mut self, items: Vec<OrderLine>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_result_files(mut self, files: Vec<FileRef>) -> Self {
        self.result_files = Some(files);
        self
    }

    pub fn with_archive_url(mut self, url: impl Into<String>) -> Self {
        self.archive_url = Some(url.into());
        self
    }

    /// Inline result files, if the report carries a non-empty list.
    pub fn inline_files(&self) -> Option<&[FileRef]> {
        self.result_files
            .as_deref()
            .filter(|files| !files.is_empty())
    }
}

/// Pointer to a rendered file in external storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    #[serde(alias = "public_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_index: Option<u32>,
}

impl FileRef {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            page_index: None,
        }
    }
}

/// One entry of the signed-in user's job history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default, alias = "zip_url")]
    pub archive_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobSummary {
    pub fn new(id: impl Into<String>, status: RemoteStatus) -> Self {
        Self {
            id: id.into(),
            status: status.to_string(),
            created_at: None,
            finished_at: None,
            archive_url: None,
            error: None,
        }
    }

    pub fn remote_status(&self) -> RemoteStatus {
        RemoteStatus::parse(&self.status)
    }
}

/// The job service that creates, renders and finalizes print jobs.
#[async_trait]
pub trait RemoteJobService: Send + Sync {
    /// Create a job for the order and return its id.
    async fn create_job(&self, credential: &Credential, order: &Order)
        -> Result<String, RemoteError>;

    /// Fetch the current status of a job.
    async fn job_status(
        &self,
        credential: &Credential,
        job_id: &str,
    ) -> Result<JobStatusReport, RemoteError>;

    /// Fetch the rendered files of a job.
    async fn job_files(
        &self,
        credential: &Credential,
        job_id: &str,
    ) -> Result<Vec<FileRef>, RemoteError>;

    /// Commit a previewed job to final rendering.
    async fn confirm_job(&self, credential: &Credential, job_id: &str) -> Result<(), RemoteError>;

    /// List the jobs of the credential's owner, newest first.
    async fn job_history(&self, credential: &Credential) -> Result<Vec<JobSummary>, RemoteError>;

    /// Name of this backend, for logs.
    fn service_name(&self) -> &'static str;
}
