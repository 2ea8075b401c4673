//! Planit client
//!
//! Anonymous identity, share links and the room session controller that
//! keeps one client in sync with its room.

pub mod commands;
pub mod identity;
pub mod link;
pub mod session;

pub use identity::{AnonymousAuth, Identity, IdentityProvider};
pub use link::ShareLink;
pub use session::{RoomSession, SessionPhase, SessionState};
