//! Permission system for room operations

use crate::error::{Error, Result};
use crate::models::RoomUser;

/// Role of a participant within a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum RoomRole {
    /// Room creator - runs the round
    Admin = 2,
    /// Everyone else
    Voter = 1,
}

impl RoomRole {
    pub fn of(user: &RoomUser) -> Self {
        if user.is_admin {
            RoomRole::Admin
        } else {
            RoomRole::Voter
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RoomRole::Admin => "Admin",
            RoomRole::Voter => "Voter",
        }
    }
}

impl std::fmt::Display for RoomRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Actions that can be performed in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAction {
    RevealVotes,
    ResetVotes,
    ChangeSeries,
}

impl RoomAction {
    fn denial(&self) -> &'static str {
        match self {
            RoomAction::RevealVotes => "Only admin can reveal votes",
            RoomAction::ResetVotes => "Only admin can reset votes",
            RoomAction::ChangeSeries => "Only admin can update series",
        }
    }
}

/// Permission matrix for room roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: RoomRole, action: RoomAction) -> bool {
        match action {
            RoomAction::RevealVotes | RoomAction::ResetVotes | RoomAction::ChangeSeries => {
                role == RoomRole::Admin
            }
        }
    }

    /// Like [`PermissionMatrix::can_perform`] for an optional participant,
    /// failing with `PermissionDenied`. A caller without a record in the
    /// room holds no role at all.
    pub fn require(user: Option<&RoomUser>, action: RoomAction) -> Result<()> {
        match user {
            Some(user) if Self::can_perform(RoomRole::of(user), action) => Ok(()),
            _ => Err(Error::permission_denied(action.denial())),
        }
    }
}
