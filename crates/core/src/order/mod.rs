//! Order lines submitted for sheet rendering.
//!
//! The item selector hands over raw `(print_id, quantity)` pairs. Before a job
//! is created they are validated and coalesced into an [`Order`], which is
//! immutable once built: changing quantities means building a new order and
//! requesting a new preview.

mod coalesce;
mod types;

pub use coalesce::{coalesce, normalize_remote};
pub use types::*;

use thiserror::Error;

/// Default cap on the number of units per job.
pub const DEFAULT_MAX_UNITS: u32 = 100;

/// Validation failures for an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("order has no lines")]
    Empty,

    #[error("quantity for print {print_id} must be positive")]
    NonPositiveQuantity { print_id: String },

    #[error("order line has an empty print id")]
    EmptyPrintId,

    #[error("order has {total} units, maximum is {max}")]
    TooManyUnits { total: u32, max: u32 },
}
