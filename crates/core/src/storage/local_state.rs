//! Local client state persistence
//!
//! Two records survive restarts on this device: the display name and the
//! code of the room the user was last in. Neither is authoritative; the
//! room code only tells the session where to try resubscribing.

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::instrument;

use super::parse::OptionalExt;
use crate::error::Result;
use crate::models::RoomCode;

/// Key for the user's display name
pub const DISPLAY_NAME_KEY: &str = "displayName";

/// Key for the current room code
pub const CURRENT_ROOM_KEY: &str = "currentRoomId";

pub struct LocalStateStore<'a> {
    conn: &'a Connection,
}

impl<'a> LocalStateStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM local_state WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO local_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM local_state WHERE key = ?1", params![key])?;
        Ok(())
    }

    pub fn display_name(&self) -> Result<Option<String>> {
        self.get(DISPLAY_NAME_KEY)
    }

    #[instrument(skip(self))]
    pub fn set_display_name(&self, name: &str) -> Result<()> {
        self.set(DISPLAY_NAME_KEY, name)
    }

    pub fn clear_display_name(&self) -> Result<()> {
        self.remove(DISPLAY_NAME_KEY)
    }

    pub fn current_room(&self) -> Result<Option<RoomCode>> {
        Ok(self.get(CURRENT_ROOM_KEY)?.map(RoomCode::from_stored))
    }

    #[instrument(skip(self), fields(room_id = %code))]
    pub fn set_current_room(&self, code: &RoomCode) -> Result<()> {
        self.set(CURRENT_ROOM_KEY, code.as_str())
    }

    pub fn clear_current_room(&self) -> Result<()> {
        self.remove(CURRENT_ROOM_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_display_name_save_load() {
        let db = Database::open_in_memory().unwrap();
        let store = db.local_state();

        assert_eq!(store.display_name().unwrap(), None);
        store.set_display_name("Ada").unwrap();
        store.set_display_name("Ada L.").unwrap();
        assert_eq!(store.display_name().unwrap(), Some("Ada L.".to_string()));

        store.clear_display_name().unwrap();
        assert_eq!(store.display_name().unwrap(), None);
    }

    #[test]
    fn test_current_room_save_load() {
        let db = Database::open_in_memory().unwrap();
        let store = db.local_state();
        let code = RoomCode::parse("QW12ER").unwrap();

        store.set_current_room(&code).unwrap();
        assert_eq!(store.current_room().unwrap(), Some(code));

        // Clearing the room leaves the name alone
        store.set_display_name("Ada").unwrap();
        store.clear_current_room().unwrap();
        assert_eq!(store.current_room().unwrap(), None);
        assert_eq!(store.display_name().unwrap(), Some("Ada".to_string()));

        // Clearing twice is fine
        store.clear_current_room().unwrap();
    }
}
