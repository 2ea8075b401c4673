//! Anonymous session persistence
//!
//! The identity provider keeps its issued session id here so a restarted
//! client comes back as the same participant.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::instrument;

use super::parse::{parse_datetime, OptionalExt};
use crate::error::Result;

/// Persisted anonymous session
#[derive(Debug, Clone, PartialEq)]
pub struct AnonymousSession {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

pub struct AnonymousSessionStore<'a> {
    conn: &'a Connection,
}

impl<'a> AnonymousSessionStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Save the session, replacing any previous one
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub fn save(&self, session: &AnonymousSession) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO anonymous_session (slot, user_id, created_at)
             VALUES (1, ?1, ?2)",
            params![session.user_id, session.created_at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<AnonymousSession>> {
        let session = self
            .conn
            .query_row(
                "SELECT user_id, created_at FROM anonymous_session WHERE slot = 1",
                [],
                |row| {
                    Ok(AnonymousSession {
                        user_id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(1)?)?,
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM anonymous_session", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_session_replace_and_clear() {
        let db = Database::open_in_memory().unwrap();
        let store = db.anonymous_sessions();
        assert_eq!(store.load().unwrap(), None);

        let first = AnonymousSession {
            user_id: "first".into(),
            created_at: Utc::now(),
        };
        store.save(&first).unwrap();

        let second = AnonymousSession {
            user_id: "second".into(),
            created_at: Utc::now(),
        };
        store.save(&second).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.user_id, "second");

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
