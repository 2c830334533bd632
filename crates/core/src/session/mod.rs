//! Session credentials for the job service.

mod token;
mod traits;
mod types;

pub use token::*;
pub use traits::*;
pub use types::*;
