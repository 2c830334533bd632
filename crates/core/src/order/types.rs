//! Order data types.

use serde::{Deserialize, Serialize};

use super::{coalesce, OrderError};

/// Width of the standard production sheet, in centimetres.
pub const STANDARD_SHEET_WIDTH_CM: f64 = 57.0;

/// Height of the standard production sheet, in centimetres.
pub const STANDARD_SHEET_HEIGHT_CM: f64 = 100.0;

/// A requested quantity of one print.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderLine {
    /// Identifier of the print in the shop's library.
    pub print_id: String,
    /// Number of units requested.
    #[serde(alias = "qty")]
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(print_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            print_id: print_id.into(),
            quantity,
        }
    }
}

/// Sheet format the rendering service packs prints onto.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SheetSize {
    /// 57 x 100 cm production sheet.
    #[default]
    Standard,
    /// Custom sheet dimensions.
    Custom { width_cm: f64, height_cm: f64 },
}

impl SheetSize {
    /// Sheet dimensions as `(width_cm, height_cm)`.
    pub fn dimensions_cm(&self) -> (f64, f64) {
        match self {
            SheetSize::Standard => (STANDARD_SHEET_WIDTH_CM, STANDARD_SHEET_HEIGHT_CM),
            SheetSize::Custom {
                width_cm,
                height_cm,
            } => (*width_cm, *height_cm),
        }
    }
}

/// A validated, coalesced order.
///
/// There is no way to mutate an order after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    lines: Vec<OrderLine>,
    sheet_size: SheetSize,
}

impl Order {
    /// Validate and coalesce raw lines into an order.
    ///
    /// Every input line must have a non-blank print id and a positive
    /// quantity. `max_units` caps the total after coalescing.
    pub fn new(
        lines: &[OrderLine],
        sheet_size: SheetSize,
        max_units: Option<u32>,
    ) -> Result<Self, OrderError> {
        for line in lines {
            if line.print_id.trim().is_empty() {
                return Err(OrderError::EmptyPrintId);
            }
            if line.quantity == 0 {
                return Err(OrderError::NonPositiveQuantity {
                    print_id: line.print_id.clone(),
                });
            }
        }

        let lines = coalesce(lines);
        if lines.is_empty() {
            return Err(OrderError::Empty);
        }

        let order = Self { lines, sheet_size };
        if let Some(max) = max_units {
            let total = order.total_units();
            if total > max {
                return Err(OrderError::TooManyUnits { total, max });
            }
        }

        Ok(order)
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn sheet_size(&self) -> SheetSize {
        self.sheet_size
    }

    /// Sum of all quantities.
    pub fn total_units(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }
}
