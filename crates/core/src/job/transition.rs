//! Mapping from polled job service status to the next local phase.

use crate::remote::{JobStatusReport, RemoteStatus};

use super::{JobPhase, UnrecognizedStatusPolicy};

/// What a poll result does to the current phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    /// Still working; advance the progress estimate.
    Advance,
    /// Move to another phase.
    Enter(JobPhase),
    /// Move to `Error` with a message.
    Fail(String),
}

/// Decide the step for a report polled while in `current`.
///
/// `current` is always a polling phase.
pub(crate) fn step(
    current: JobPhase,
    report: &JobStatusReport,
    policy: UnrecognizedStatusPolicy,
) -> Step {
    match (&report.status, current) {
        (RemoteStatus::Error, _) => Step::Fail(
            report
                .error
                .clone()
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "Job failed".to_string()),
        ),
        (RemoteStatus::Done, _) => Step::Enter(JobPhase::Done),
        (RemoteStatus::PreviewReady, JobPhase::PreviewRequested) => {
            Step::Enter(JobPhase::PreviewReady)
        }
        (RemoteStatus::Confirmed, JobPhase::PreviewRequested) => Step::Enter(JobPhase::Confirmed),
        (RemoteStatus::Finalizing, JobPhase::PreviewRequested | JobPhase::Confirmed) => {
            Step::Enter(JobPhase::Finalizing)
        }
        (RemoteStatus::Unrecognized(raw), _) => match policy {
            UnrecognizedStatusPolicy::InProgress => Step::Advance,
            UnrecognizedStatusPolicy::Error => Step::Fail(format!("unrecognized job status: {}", raw)),
        },
        _ => Step::Advance,
    }
}

/// Whether a status may lead to a phase that needs the file list.
pub(crate) fn needs_files(current: JobPhase, status: &RemoteStatus) -> bool {
    match status {
        RemoteStatus::Done => true,
        RemoteStatus::PreviewReady => current == JobPhase::PreviewRequested,
        _ => false,
    }
}
