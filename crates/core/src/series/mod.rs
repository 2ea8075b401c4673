//! Estimation series catalog
//!
//! Predefined value sets a room can vote with, plus validation for
//! user-defined (custom) series.

use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::models::{SeriesType, VoteValue};

/// Minimum number of entries in a custom series
pub const MIN_CUSTOM_SERIES_LEN: usize = 3;

/// A catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct PredefinedSeries {
    pub series_type: SeriesType,
    pub name: &'static str,
    pub values: Vec<VoteValue>,
}

fn numeric(values: &[f64]) -> Vec<VoteValue> {
    values.iter().map(|v| VoteValue::Numeric(*v)).collect()
}

fn labels(values: &[&str]) -> Vec<VoteValue> {
    values.iter().map(|v| VoteValue::Label((*v).to_string())).collect()
}

/// The predefined catalog, in display order
pub fn predefined() -> &'static [PredefinedSeries] {
    static CATALOG: OnceLock<Vec<PredefinedSeries>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        vec![
            PredefinedSeries {
                series_type: SeriesType::Fibonacci,
                name: "Fibonacci",
                values: numeric(&[0.5, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0]),
            },
            PredefinedSeries {
                series_type: SeriesType::ModifiedFibonacci,
                name: "Modified Fibonacci",
                values: numeric(&[1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0, 34.0]),
            },
            PredefinedSeries {
                series_type: SeriesType::Tshirt,
                name: "T-Shirt Sizes",
                values: labels(&["XS", "S", "M", "L", "XL", "XXL"]),
            },
            PredefinedSeries {
                series_type: SeriesType::PowersOf2,
                name: "Powers of 2",
                values: numeric(&[1.0, 2.0, 4.0, 8.0, 16.0, 32.0]),
            },
        ]
    })
}

fn find(series_type: SeriesType) -> Option<&'static PredefinedSeries> {
    predefined().iter().find(|s| s.series_type == series_type)
}

/// Catalog values for a type; anything outside the catalog (including
/// `custom`) falls back to the first entry.
pub fn values_for(series_type: SeriesType) -> Vec<VoteValue> {
    find(series_type)
        .unwrap_or(&predefined()[0])
        .values
        .clone()
}

pub fn name_for(series_type: SeriesType) -> &'static str {
    find(series_type).map(|s| s.name).unwrap_or("Custom")
}

/// Every entry is a number, so averages and outliers apply
pub fn is_numeric(values: &[VoteValue]) -> bool {
    values.iter().all(VoteValue::is_numeric)
}

/// Check a user-defined series.
///
/// Needs at least three entries and no duplicates once numeric-looking
/// labels are read as numbers (`"1"` and `1` collide). Size is unbounded and
/// numbers and labels may be mixed.
pub fn validate_custom(values: &[VoteValue]) -> Result<()> {
    if values.len() < MIN_CUSTOM_SERIES_LEN {
        return Err(Error::validation(format!(
            "Series must have at least {} values",
            MIN_CUSTOM_SERIES_LEN
        )));
    }

    let normalized: Vec<VoteValue> = values.iter().map(VoteValue::normalized).collect();
    for (i, value) in normalized.iter().enumerate() {
        if normalized[..i].contains(value) {
            return Err(Error::validation("Series cannot have duplicate values"));
        }
    }

    Ok(())
}

/// Parse free-form input such as `"1, 2, 3, ?, coffee"` into series values.
/// Entries are separated by commas or whitespace; empty entries are dropped.
pub fn parse_custom(input: &str) -> Vec<VoteValue> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.trim().is_empty())
        .map(VoteValue::from_input)
        .collect()
}
