//! Anonymous identity
//!
//! A participant is identified by an opaque session id issued on sign-in.
//! The display name is chosen by the user and kept on this device only.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use planit_core::storage::AnonymousSession;
use planit_core::{Database, Error, LocalStateRepository, Result};
use tracing::{info, instrument};
use uuid::Uuid;

/// Name shown when a restored session has no stored display name
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Who the current client is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub display_name: String,
}

/// Source of the current identity.
///
/// `current` may be `None` for a while after sign-in; callers that need an
/// identity poll for it.
pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> Option<Identity>;
}

struct SignedIn {
    identity: Identity,
    ready_at: Instant,
}

/// Device-local anonymous sign-in
pub struct AnonymousAuth {
    db: Arc<Mutex<Database>>,
    state: RwLock<Option<SignedIn>>,
    propagation_delay: Duration,
}

impl AnonymousAuth {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self {
            db,
            state: RwLock::new(None),
            propagation_delay: Duration::ZERO,
        }
    }

    /// Keep a fresh sign-in hidden from `current` for `delay`
    pub fn with_propagation_delay(mut self, delay: Duration) -> Self {
        self.propagation_delay = delay;
        self
    }

    /// Sign in under `display_name`, reusing this device's session id when
    /// one was issued before.
    #[instrument(skip(self))]
    pub fn sign_in_anonymously(&self, display_name: &str) -> Result<Identity> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(Error::validation("Please enter your name"));
        }

        let uid = {
            let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
            let sessions = db.anonymous_sessions();
            let session = match sessions.load()? {
                Some(session) => session,
                None => {
                    let session = AnonymousSession {
                        user_id: Uuid::new_v4().to_string(),
                        created_at: Utc::now(),
                    };
                    sessions.save(&session)?;
                    session
                }
            };
            db.set_display_name(display_name)?;
            session.user_id
        };

        let identity = Identity {
            uid,
            display_name: display_name.to_string(),
        };
        info!(user_id = %identity.uid, "Signed in");
        self.publish(identity.clone(), Instant::now() + self.propagation_delay);
        Ok(identity)
    }

    /// Forget the session and the stored display name
    #[instrument(skip(self))]
    pub fn sign_out(&self) -> Result<()> {
        {
            let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
            db.anonymous_sessions().clear()?;
            db.clear_display_name()?;
        }
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = None;
        info!("Signed out");
        Ok(())
    }

    /// Pick up a session persisted by an earlier run
    pub fn restore(&self) -> Result<Option<Identity>> {
        let identity = {
            let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
            match db.anonymous_sessions().load()? {
                Some(session) => Identity {
                    uid: session.user_id,
                    display_name: db
                        .display_name()?
                        .unwrap_or_else(|| ANONYMOUS_NAME.to_string()),
                },
                None => return Ok(None),
            }
        };

        info!(user_id = %identity.uid, "Restored session");
        self.publish(identity.clone(), Instant::now());
        Ok(Some(identity))
    }

    fn publish(&self, identity: Identity, ready_at: Instant) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) =
            Some(SignedIn { identity, ready_at });
    }
}

impl IdentityProvider for AnonymousAuth {
    fn current(&self) -> Option<Identity> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .as_ref()
            .filter(|s| Instant::now() >= s.ready_at)
            .map(|s| s.identity.clone())
    }
}
