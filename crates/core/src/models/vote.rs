//! Vote value model

use serde::{Deserialize, Serialize};

/// A selectable estimation value.
///
/// Numbers and labels never compare equal to each other, so `Numeric(1.0)`
/// and `Label("1")` are distinct until a caller explicitly normalizes the
/// label with [`VoteValue::normalized`]. On the wire numbers are JSON numbers
/// and labels are JSON strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VoteValue {
    Numeric(f64),
    Label(String),
}

impl VoteValue {
    /// Build a value from user-entered text.
    ///
    /// Blank input stays a (blank) label; anything that parses as a finite
    /// number becomes numeric.
    pub fn from_input(text: &str) -> Self {
        let trimmed = text.trim();
        match parse_number(trimmed) {
            Some(n) => VoteValue::Numeric(n),
            None => VoteValue::Label(trimmed.to_string()),
        }
    }

    /// Numeric-looking labels become numbers, everything else is unchanged
    pub fn normalized(&self) -> VoteValue {
        match self {
            VoteValue::Numeric(n) => VoteValue::Numeric(*n),
            VoteValue::Label(s) => VoteValue::from_input(s),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            VoteValue::Numeric(n) => Some(*n),
            VoteValue::Label(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, VoteValue::Numeric(_))
    }
}

fn parse_number(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl std::fmt::Display for VoteValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteValue::Numeric(n) => write!(f, "{}", n),
            VoteValue::Label(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for VoteValue {
    fn from(value: f64) -> Self {
        VoteValue::Numeric(value)
    }
}

impl From<&str> for VoteValue {
    fn from(value: &str) -> Self {
        VoteValue::Label(value.to_string())
    }
}

impl From<String> for VoteValue {
    fn from(value: String) -> Self {
        VoteValue::Label(value)
    }
}
