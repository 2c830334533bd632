//! Print job lifecycle.
//!
//! [`JobLifecycleController`] takes one job from preview request through
//! confirmation to final files:
//!
//! ```text
//! Initial --submit_preview--> PreviewRequested --poll--> PreviewReady
//! PreviewReady --confirm--> Confirmed --poll--> Finalizing --poll--> Done
//! any polling phase --poll:error--> Error
//! any --reset--> Initial
//! ```
//!
//! Every submission, attach and reset starts a new epoch. Responses that
//! belong to an older epoch are dropped on arrival.

mod config;
mod controller;
mod transition;
mod types;

pub use config::*;
pub use controller::JobLifecycleController;
pub use types::*;
