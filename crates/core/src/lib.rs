pub mod config;
pub mod job;
pub mod metrics;
pub mod order;
pub mod remote;
pub mod session;
pub mod testing;

pub use config::{
    config_path, load_config, load_config_from_str, validate_config, Config, ConfigError,
    RemoteConfig, SanitizedConfig, ServerConfig,
};
pub use job::{
    JobHandle, JobLifecycleController, JobPhase, JobSnapshot, LifecycleConfig, LifecycleError,
    PanelRequest, ProgressEstimate, UnrecognizedStatusPolicy, ValidationError,
};
pub use order::{coalesce, Order, OrderError, OrderLine, SheetSize};
pub use remote::{
    FileRef, HttpJobService, JobStatusReport, JobSummary, RemoteError, RemoteJobService,
    RemoteStatus,
};
pub use session::{Credential, SessionError, SessionProvider, TokenSession};
