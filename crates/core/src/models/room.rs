//! Room model - one estimation session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RoomCode, VoteValue};

/// Which value set a room votes with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesType {
    #[serde(rename = "fibonacci")]
    Fibonacci,
    #[serde(rename = "modified-fibonacci")]
    ModifiedFibonacci,
    #[serde(rename = "tshirt")]
    Tshirt,
    #[serde(rename = "powers-of-2")]
    PowersOf2,
    #[serde(rename = "custom")]
    Custom,
}

impl SeriesType {
    /// Wire tag for this series type
    pub fn tag(&self) -> &'static str {
        match self {
            SeriesType::Fibonacci => "fibonacci",
            SeriesType::ModifiedFibonacci => "modified-fibonacci",
            SeriesType::Tshirt => "tshirt",
            SeriesType::PowersOf2 => "powers-of-2",
            SeriesType::Custom => "custom",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.tag().eq_ignore_ascii_case(tag.trim()))
    }

    pub fn all() -> &'static [SeriesType] {
        &[
            SeriesType::Fibonacci,
            SeriesType::ModifiedFibonacci,
            SeriesType::Tshirt,
            SeriesType::PowersOf2,
            SeriesType::Custom,
        ]
    }
}

impl std::fmt::Display for SeriesType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A room as seen by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub room_id: RoomCode,
    pub created_by: String,
    pub active_series: Vec<VoteValue>,
    pub series_type: SeriesType,
    pub is_revealed: bool,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Local stand-in used until the first authoritative push arrives.
    /// Carries no series; only the code is meaningful.
    pub fn placeholder(room_id: RoomCode) -> Self {
        Self {
            room_id,
            created_by: String::new(),
            active_series: Vec::new(),
            series_type: SeriesType::Fibonacci,
            is_revealed: false,
            created_at: Utc::now(),
        }
    }

    pub fn from_document(room_id: RoomCode, doc: RoomDocument) -> Self {
        Self {
            room_id,
            created_by: doc.created_by,
            active_series: doc.active_series,
            series_type: doc.series_type,
            is_revealed: doc.is_revealed,
            created_at: doc.created_at,
        }
    }
}

/// Stored shape of a room (`rooms/{code}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDocument {
    pub created_by: String,
    pub active_series: Vec<VoteValue>,
    pub series_type: SeriesType,
    pub is_revealed: bool,
    pub created_at: DateTime<Utc>,
}
