use std::collections::HashMap;

use super::OrderLine;

/// Merge lines sharing a `print_id` by summing their quantities.
///
/// The result has one line per print id, in order of first appearance.
pub fn coalesce(lines: &[OrderLine]) -> Vec<OrderLine> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut merged: Vec<OrderLine> = Vec::with_capacity(lines.len());

    for line in lines {
        match index.get(line.print_id.as_str()) {
            Some(&pos) => {
                merged[pos].quantity = merged[pos].quantity.saturating_add(line.quantity);
            }
            None => {
                index.insert(line.print_id.as_str(), merged.len());
                merged.push(line.clone());
            }
        }
    }

    merged
}

/// Normalize order lines echoed back by the job service.
///
/// The service may return either the raw per-line payload or an already
/// coalesced one; zero-quantity lines are dropped in both cases.
pub fn normalize_remote(lines: &[OrderLine]) -> Vec<OrderLine> {
    let kept: Vec<OrderLine> = lines
        .iter()
        .filter(|l| l.quantity > 0 && !l.print_id.trim().is_empty())
        .cloned()
        .collect();
    coalesce(&kept)
}
