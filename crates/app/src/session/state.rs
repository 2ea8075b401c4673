//! Observable session state

use planit_core::stats::{self, VoteStatistics};
use planit_core::{Room, RoomCode, RoomUser, VotingProgress};

/// Where a session stands with respect to its room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No room
    #[default]
    Unbound,
    /// Joined locally; waiting for the first authoritative room push
    Pending,
    /// Room and participants are being pushed by the store
    Bound,
    /// The room disappeared from the store
    NotFound,
}

/// Snapshot published to observers after every change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub room: Option<Room>,
    pub users: Vec<RoomUser>,
    /// A create or join is in flight
    pub loading: bool,
    /// Message of the most recent failure
    pub error: Option<String>,
    /// Bumped on every bind and leave; pushes tagged with an older epoch are stale
    pub epoch: u64,
}

impl SessionState {
    pub fn room_code(&self) -> Option<&RoomCode> {
        self.room.as_ref().map(|r| &r.room_id)
    }

    /// The participant record for `user_id`, once the store has pushed it
    pub fn user(&self, user_id: &str) -> Option<&RoomUser> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    pub fn progress(&self) -> VotingProgress {
        VotingProgress::of(&self.users)
    }

    /// Statistics over the current participants; nothing until revealed
    pub fn statistics(&self) -> Option<VoteStatistics> {
        stats::for_room(self.room.as_ref()?, &self.users)
    }
}
