//! SQLite storage layer for Planit
//!
//! Only device-local state lives here. Rooms and participants are owned by
//! the shared document store.

mod identity;
mod local_state;
mod migrations;
mod parse;
mod traits;

use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

use crate::error::Result;
use crate::models::RoomCode;

pub use identity::{AnonymousSession, AnonymousSessionStore};
pub use local_state::{LocalStateStore, CURRENT_ROOM_KEY, DISPLAY_NAME_KEY};
pub use traits::LocalStateRepository;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Get local state store (display name, current room)
    pub fn local_state(&self) -> LocalStateStore<'_> {
        LocalStateStore::new(&self.conn)
    }

    /// Get anonymous session store for the identity provider
    pub fn anonymous_sessions(&self) -> AnonymousSessionStore<'_> {
        AnonymousSessionStore::new(&self.conn)
    }
}

impl LocalStateRepository for Database {
    fn display_name(&self) -> Result<Option<String>> {
        self.local_state().display_name()
    }

    fn set_display_name(&self, name: &str) -> Result<()> {
        self.local_state().set_display_name(name)
    }

    fn clear_display_name(&self) -> Result<()> {
        self.local_state().clear_display_name()
    }

    fn current_room(&self) -> Result<Option<RoomCode>> {
        self.local_state().current_room()
    }

    fn set_current_room(&self, code: &RoomCode) -> Result<()> {
        self.local_state().set_current_room(code)
    }

    fn clear_current_room(&self) -> Result<()> {
        self.local_state().clear_current_room()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version(), 2);
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("planit.db");
        let code = RoomCode::parse("ab34cd").unwrap();

        {
            let db = Database::open(&path).unwrap();
            db.set_display_name("Grace").unwrap();
            db.set_current_room(&code).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.display_name().unwrap(), Some("Grace".to_string()));
        assert_eq!(db.current_room().unwrap(), Some(code));
    }

    #[test]
    fn test_repository_trait_object() {
        let db = Database::open_in_memory().unwrap();
        let repo: &dyn LocalStateRepository = &db;
        repo.set_display_name("Linus").unwrap();
        repo.clear_display_name().unwrap();
        assert_eq!(repo.display_name().unwrap(), None);
    }
}
