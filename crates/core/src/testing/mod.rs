//! Testing utilities and mock implementations.
//!
//! This module provides a mock job service so the lifecycle can be tested
//! end to end without a rendering backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use printwizard_core::testing::{fixtures, MockJobService};
//!
//! let remote = Arc::new(MockJobService::new());
//! let controller = JobLifecycleController::new(
//!     remote.clone(),
//!     Arc::new(fixtures::signed_in_session()),
//!     fixtures::fast_lifecycle_config(),
//! );
//! ```

mod mock_job_service;

pub use mock_job_service::{MockJobService, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::job::LifecycleConfig;
    use crate::order::OrderLine;
    use crate::remote::FileRef;
    use crate::session::{Credential, TokenSession};

    /// Token used by [`credential`].
    pub const TEST_TOKEN: &str = "test-token";

    /// Order lines with a repeated print id: `[{A,2},{B,1},{A,3}]`.
    pub fn order_lines() -> Vec<OrderLine> {
        vec![
            OrderLine::new("A", 2),
            OrderLine::new("B", 1),
            OrderLine::new("A", 3),
        ]
    }

    /// A credential without expiry.
    pub fn credential() -> Credential {
        Credential::new(TEST_TOKEN)
    }

    /// A session holding [`credential`].
    pub fn signed_in_session() -> TokenSession {
        TokenSession::new(credential())
    }

    /// Lifecycle config with short intervals for wall-clock tests.
    pub fn fast_lifecycle_config() -> LifecycleConfig {
        LifecycleConfig {
            poll_interval_ms: 20,
            countdown_tick_ms: 10,
            ..LifecycleConfig::default()
        }
    }

    /// A rendered sheet of `job_id`.
    pub fn sheet(job_id: &str, page: u32) -> FileRef {
        FileRef {
            id: format!("{}-sheet-{}", job_id, page + 1),
            url: format!("https://files.mock/{}/sheet-{}.png", job_id, page + 1),
            page_index: Some(page),
        }
    }
}
