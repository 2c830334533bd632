//! Job service client.
//!
//! The rendering backend is reached only through [`RemoteJobService`]. The
//! production implementation is [`HttpJobService`]; tests use
//! `testing::MockJobService`.

mod http;
mod types;

pub use http::HttpJobService;
pub use types::*;
