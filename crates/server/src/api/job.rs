//! Job lifecycle endpoints.
//!
//! Every handler acts on the controller of the calling session, which the
//! session middleware places in the request extensions.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use printwizard_core::{
    JobLifecycleController, JobSnapshot, JobSummary, LifecycleError, PanelRequest,
    ValidationError,
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmParams {
    /// When given, must match the active job.
    pub job_id: Option<String>,
}

pub type JobResult = Result<Json<JobSnapshot>, (StatusCode, Json<JobErrorResponse>)>;

/// Map a lifecycle error to its HTTP status and body.
pub fn error_response(err: &LifecycleError) -> (StatusCode, Json<JobErrorResponse>) {
    let status = match err {
        LifecycleError::Validation(ValidationError::ConfirmInFlight) => StatusCode::CONFLICT,
        LifecycleError::Validation(_) => StatusCode::BAD_REQUEST,
        LifecycleError::Auth(_) => StatusCode::UNAUTHORIZED,
        LifecycleError::Remote(_) => StatusCode::BAD_GATEWAY,
        LifecycleError::Stale => StatusCode::CONFLICT,
    };
    (
        status,
        Json(JobErrorResponse {
            error: err.to_string(),
            kind: err.kind().to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/job
pub async fn get_job(Extension(controller): Extension<JobLifecycleController>) -> Json<JobSnapshot> {
    Json(controller.snapshot().await)
}

/// POST /api/v1/job
///
/// Opens the panel with a fresh selection or an existing job id.
pub async fn open_job(
    Extension(controller): Extension<JobLifecycleController>,
    Json(request): Json<PanelRequest>,
) -> JobResult {
    controller
        .open(request)
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(controller.snapshot().await))
}

/// POST /api/v1/job/poll
pub async fn poll_job(Extension(controller): Extension<JobLifecycleController>) -> JobResult {
    match controller.poll().await {
        Ok(phase) => debug!(phase = %phase, "Manual poll"),
        Err(e) => return Err(error_response(&e)),
    }
    Ok(Json(controller.snapshot().await))
}

/// POST /api/v1/job/confirm
pub async fn confirm_job(
    Extension(controller): Extension<JobLifecycleController>,
    Query(params): Query<ConfirmParams>,
) -> JobResult {
    let result = match params.job_id {
        Some(job_id) => controller.confirm_job(&job_id).await,
        None => controller.confirm().await,
    };
    result.map_err(|e| error_response(&e))?;
    Ok(Json(controller.snapshot().await))
}

/// POST /api/v1/job/reset
pub async fn reset_job(
    Extension(controller): Extension<JobLifecycleController>,
) -> Json<JobSnapshot> {
    controller.reset().await;
    Json(controller.snapshot().await)
}

/// GET /api/v1/job/history
///
/// Earlier jobs of the caller, to reopen one with a `post_submission` request.
pub async fn job_history(
    Extension(controller): Extension<JobLifecycleController>,
) -> Result<Json<Vec<JobSummary>>, (StatusCode, Json<JobErrorResponse>)> {
    let jobs = controller.history().await.map_err(|e| error_response(&e))?;
    Ok(Json(jobs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use printwizard_core::{JobPhase, OrderError, RemoteError, SessionError};

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (LifecycleError::from(OrderError::Empty), StatusCode::BAD_REQUEST),
            (
                LifecycleError::from(ValidationError::ConfirmNotAllowed {
                    phase: JobPhase::Initial,
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                LifecycleError::from(ValidationError::ConfirmInFlight),
                StatusCode::CONFLICT,
            ),
            (
                LifecycleError::from(SessionError::Expired),
                StatusCode::UNAUTHORIZED,
            ),
            (
                LifecycleError::from(RemoteError::Timeout),
                StatusCode::BAD_GATEWAY,
            ),
            (LifecycleError::Stale, StatusCode::CONFLICT),
        ];

        for (err, expected) in cases {
            let (status, body) = error_response(&err);
            assert_eq!(status, expected, "{:?}", err);
            assert_eq!(body.kind, err.kind());
        }
    }
}
