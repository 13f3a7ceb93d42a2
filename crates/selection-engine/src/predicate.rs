//! Cell predicates for conditional selection and edits.

use serde::{Deserialize, Serialize};

/// A per-cell predicate over value and masking state.
///
/// Value comparators only ever match unmasked cells; `IsMasked` /
/// `IsNotMasked` test the mask itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    /// value < v
    Less(f64),
    /// value <= v
    LessEq(f64),
    /// value == v, exact
    Equal(f64),
    /// value >= v
    GreaterEq(f64),
    /// value > v
    Greater(f64),
    /// value is NaN
    IsNan,
    /// v1 <= value <= v2
    InClosed(f64, f64),
    /// v1 < value < v2
    InOpen(f64, f64),
    /// value < v1 or value > v2
    Outside(f64, f64),
    /// the cell is masked
    IsMasked,
    /// the cell is unmasked
    IsNotMasked,
}

impl Condition {
    /// Whether this predicate addresses masking state rather than values.
    pub fn is_mask_predicate(&self) -> bool {
        matches!(self, Condition::IsMasked | Condition::IsNotMasked)
    }

    /// Evaluate against one cell.
    pub fn matches(&self, value: f64, valid: bool) -> bool {
        match *self {
            Condition::IsMasked => !valid,
            Condition::IsNotMasked => valid,
            // every value comparator is restricted to unmasked cells
            _ if !valid => false,
            Condition::Less(v) => value < v,
            Condition::LessEq(v) => value <= v,
            Condition::Equal(v) => value == v,
            Condition::GreaterEq(v) => value >= v,
            Condition::Greater(v) => value > v,
            Condition::IsNan => value.is_nan(),
            Condition::InClosed(lo, hi) => value >= lo && value <= hi,
            Condition::InOpen(lo, hi) => value > lo && value < hi,
            Condition::Outside(lo, hi) => value < lo || value > hi,
        }
    }
}
