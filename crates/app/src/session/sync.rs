//! Subscription task for one room binding
//!
//! Multiplexes the room and participant watches into the session state.
//! Every write is tagged with the binding's epoch and dropped once the
//! session has moved on.

use std::sync::{Arc, Mutex, PoisonError};

use planit_core::{Database, LocalStateRepository, RoomCode};
use planit_store::{RoomEvent, RoomWatch, UsersWatch};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::{SessionPhase, SessionState};

/// Message recorded when the bound room goes away
pub const ROOM_NOT_FOUND: &str = "Room not found";

pub(super) struct Binding {
    pub code: RoomCode,
    pub epoch: u64,
    pub state: Arc<watch::Sender<SessionState>>,
    pub local: Arc<Mutex<Database>>,
}

impl Binding {
    /// Apply `f` if this binding is still the current one
    fn apply(&self, f: impl FnOnce(&mut SessionState)) -> bool {
        self.state.send_if_modified(|s| {
            if s.epoch != self.epoch {
                return false;
            }
            f(s);
            true
        })
    }

    fn room_gone(&self) {
        let current = self.apply(|s| {
            s.phase = SessionPhase::NotFound;
            s.room = None;
            s.users.clear();
            s.error = Some(ROOM_NOT_FOUND.to_string());
        });
        if !current {
            return;
        }

        // Drop the resume record so the next start does not chase a dead room
        let db = self.local.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = db.current_room();
        match stored {
            Ok(Some(code)) if code == self.code => {
                if let Err(e) = db.clear_current_room() {
                    warn!(room_id = %self.code, error = %e, "Failed to clear stored room");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(room_id = %self.code, error = %e, "Failed to read stored room"),
        }
    }
}

pub(super) async fn run(binding: Binding, mut room: RoomWatch, mut users: UsersWatch) {
    let code = binding.code.clone();
    loop {
        tokio::select! {
            event = room.next() => match event {
                Some(RoomEvent::Changed(next)) => {
                    debug!(room_id = %code, revealed = next.is_revealed, "Room pushed");
                    let mut newly_bound = false;
                    let current = binding.apply(|s| {
                        newly_bound = s.phase != SessionPhase::Bound;
                        s.phase = SessionPhase::Bound;
                        s.room = Some(next);
                    });
                    if !current {
                        break;
                    }
                    if newly_bound {
                        info!(room_id = %code, "Room bound");
                    }
                }
                Some(RoomEvent::NotFound) => {
                    warn!(room_id = %code, "Room no longer exists");
                    binding.room_gone();
                    break;
                }
                None => {
                    debug!(room_id = %code, "Room subscription closed");
                    break;
                }
            },
            next = users.next() => match next {
                Some(next) => {
                    debug!(room_id = %code, count = next.len(), "Participants pushed");
                    if !binding.apply(|s| s.users = next) {
                        break;
                    }
                }
                None => {
                    debug!(room_id = %code, "Participant subscription closed");
                    break;
                }
            },
        }
    }
    debug!(room_id = %code, epoch = binding.epoch, "Sync task finished");
}
