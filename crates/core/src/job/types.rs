//! Types for the job lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::order::{OrderError, OrderLine, SheetSize};
use crate::remote::{FileRef, RemoteError};
use crate::session::SessionError;

/// Lifecycle phase of the current job, as seen by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// No job; waiting for an order.
    #[default]
    Initial,
    /// Preview requested, waiting for the service to render it.
    PreviewRequested,
    /// Preview sheets available; waiting for the user to confirm.
    PreviewReady,
    /// Confirmed; waiting for the final render.
    Confirmed,
    /// Final files are being packaged.
    Finalizing,
    /// Final files available.
    Done,
    /// The job failed.
    Error,
}

impl JobPhase {
    /// `Done` and `Error` only exit through a reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Done | JobPhase::Error)
    }

    /// Phases in which the job service is polled.
    pub fn is_polling(&self) -> bool {
        matches!(
            self,
            JobPhase::PreviewRequested | JobPhase::Confirmed | JobPhase::Finalizing
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Initial => "initial",
            JobPhase::PreviewRequested => "preview_requested",
            JobPhase::PreviewReady => "preview_ready",
            JobPhase::Confirmed => "confirmed",
            JobPhase::Finalizing => "finalizing",
            JobPhase::Done => "done",
            JobPhase::Error => "error",
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to a submitted job.
///
/// `epoch` is the controller generation the job belongs to. Any later
/// submission, attach or reset moves the controller to a newer epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
    pub epoch: u64,
}

/// What the preview panel was opened with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelRequest {
    /// A fresh selection that still needs a job.
    PreSubmission {
        order_lines: Vec<OrderLine>,
        #[serde(default)]
        sheet_size: SheetSize,
    },
    /// A job created earlier, e.g. from the job history.
    PostSubmission { job_id: String },
}

/// Client-side progress heuristic.
///
/// The job service reports no progress, so this is only ever an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProgressEstimate {
    percent: u8,
}

impl ProgressEstimate {
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Add `step` points without exceeding `cap`. Never decreases.
    pub fn advance(&mut self, step: u8, cap: u8) {
        let next = self.percent.saturating_add(step).min(cap);
        self.percent = self.percent.max(next);
    }

    /// Jump to 100%. Only for ready states.
    pub fn complete(&mut self) {
        self.percent = 100;
    }

    pub fn is_estimate(&self) -> bool {
        true
    }
}

/// Read-only view of the controller for presentation code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub phase: JobPhase,
    pub job_id: Option<String>,
    pub epoch: u64,
    pub order: Vec<OrderLine>,
    pub sheet_size: Option<SheetSize>,
    pub progress_percent: u8,
    pub progress_is_estimate: bool,
    pub remaining_secs: u64,
    pub files: Vec<FileRef>,
    /// Download URL of the final archive, once the job is done.
    pub archive_url: Option<String>,
    pub error: Option<String>,
    pub status_text: String,
    pub confirm_in_flight: bool,
    pub last_remote_status: Option<String>,
}

/// Local rejections. No remote call is made and state is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid order: {0}")]
    Order(#[from] OrderError),

    #[error("Cannot confirm a job in phase {phase}")]
    ConfirmNotAllowed { phase: JobPhase },

    #[error("A confirmation is already in flight")]
    ConfirmInFlight,

    #[error("No active job")]
    NoActiveJob,

    #[error("Job {requested} is not the active job")]
    JobMismatch { requested: String },

    #[error("Job id cannot be empty")]
    EmptyJobId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Authentication required: {0}")]
    Auth(#[from] SessionError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Response belongs to a job that is no longer active")]
    Stale,
}

impl From<OrderError> for LifecycleError {
    fn from(e: OrderError) -> Self {
        LifecycleError::Validation(ValidationError::Order(e))
    }
}

impl LifecycleError {
    /// Short machine-readable kind, for API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::Validation(ValidationError::ConfirmInFlight) => "confirm_in_flight",
            LifecycleError::Validation(_) => "validation",
            LifecycleError::Auth(_) => "auth",
            LifecycleError::Remote(_) => "remote",
            LifecycleError::Stale => "stale",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_classification() {
        assert!(JobPhase::Done.is_terminal());
        assert!(JobPhase::Error.is_terminal());
        assert!(!JobPhase::PreviewReady.is_terminal());

        assert!(JobPhase::PreviewRequested.is_polling());
        assert!(JobPhase::Confirmed.is_polling());
        assert!(JobPhase::Finalizing.is_polling());
        assert!(!JobPhase::PreviewReady.is_polling());
        assert!(!JobPhase::Initial.is_polling());
        assert!(!JobPhase::Done.is_polling());
    }

    #[test]
    fn test_progress_caps_below_100() {
        let mut progress = ProgressEstimate::default();
        let mut last = 0;
        for _ in 0..16 {
            progress.advance(6, 95);
            assert!(progress.percent() >= last);
            last = progress.percent();
        }
        assert_eq!(progress.percent(), 95);
        assert!(progress.is_estimate());
    }

    #[test]
    fn test_progress_never_decreases_after_complete() {
        let mut progress = ProgressEstimate::default();
        progress.complete();
        progress.advance(6, 95);
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn test_panel_request_is_tagged() {
        let pre: PanelRequest = serde_json::from_str(
            r#"{"kind": "pre_submission", "order_lines": [{"print_id": "A", "qty": 2}]}"#,
        )
        .unwrap();
        assert_eq!(
            pre,
            PanelRequest::PreSubmission {
                order_lines: vec![OrderLine::new("A", 2)],
                sheet_size: SheetSize::Standard,
            }
        );

        let post: PanelRequest =
            serde_json::from_str(r#"{"kind": "post_submission", "job_id": "job-7"}"#).unwrap();
        assert_eq!(
            post,
            PanelRequest::PostSubmission {
                job_id: "job-7".to_string()
            }
        );
    }

    #[test]
    fn test_panel_request_requires_kind() {
        let result: Result<PanelRequest, _> = serde_json::from_str(r#"{"job_id": "job-7"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            LifecycleError::from(ValidationError::ConfirmInFlight).kind(),
            "confirm_in_flight"
        );
        assert_eq!(
            LifecycleError::from(OrderError::Empty).kind(),
            "validation"
        );
        assert_eq!(
            LifecycleError::from(SessionError::NotAuthenticated).kind(),
            "auth"
        );
        assert_eq!(LifecycleError::from(RemoteError::Timeout).kind(), "remote");
        assert_eq!(LifecycleError::Stale.kind(), "stale");
    }
}
