//! Storage repository traits
//!
//! The session controller only needs these records, so it depends on the
//! trait instead of the SQLite handle.

use crate::error::Result;
use crate::models::RoomCode;

/// Records kept on this device between runs
pub trait LocalStateRepository {
    /// Display name chosen at sign-in
    fn display_name(&self) -> Result<Option<String>>;

    fn set_display_name(&self, name: &str) -> Result<()>;

    fn clear_display_name(&self) -> Result<()>;

    /// Room the user was last bound to
    fn current_room(&self) -> Result<Option<RoomCode>>;

    fn set_current_room(&self, code: &RoomCode) -> Result<()>;

    fn clear_current_room(&self) -> Result<()>;
}
