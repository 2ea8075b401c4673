//! Planit Core Library
//!
//! Models, series catalog, vote statistics, permissions, config and
//! device-local storage for Planit planning poker.

pub mod config;
pub mod error;
pub mod models;
pub mod permissions;
pub mod series;
pub mod stats;
pub mod storage;

pub use config::{AppConfig, LogConfig, SessionConfig, ShareConfig, StorageConfig};
pub use error::{Error, Result};
pub use models::*;
pub use permissions::*;
pub use stats::{CastVote, VoteStatistics};
pub use storage::{Database, LocalStateRepository};
