//! Data models for Planit

mod room;
mod room_code;
mod room_user;
mod vote;

pub use room::*;
pub use room_code::*;
pub use room_user::*;
pub use vote::*;
