//! Room code model
//!
//! Rooms are addressed by a short code: 6 characters from `A-Z0-9`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Alphabet room codes are drawn from
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a generated room code
pub const ROOM_CODE_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Generate a random code, each character picked independently
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..ROOM_CODE_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..ROOM_CODE_ALPHABET.len());
                ROOM_CODE_ALPHABET[idx] as char
            })
            .collect();
        Self(code)
    }

    /// Parse user input: trimmed and uppercased, must not be empty.
    ///
    /// Shape is not checked here; a code that was never issued simply
    /// does not resolve to a room.
    pub fn parse(input: &str) -> Result<Self> {
        let code = input.trim().to_uppercase();
        if code.is_empty() {
            return Err(Error::validation("Please enter a room code"));
        }
        Ok(Self(code))
    }

    /// Wrap a code read back from storage without normalizing it
    pub fn from_stored(code: String) -> Self {
        Self(code)
    }

    /// True for codes of the generated shape
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == ROOM_CODE_LEN && self.0.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RoomCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_well_formed() {
        for _ in 0..1000 {
            let code = RoomCode::generate();
            assert_eq!(code.as_str().len(), 6);
            assert!(code
                .as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            assert!(code.is_well_formed());
        }
    }

    #[test]
    fn test_parse_normalizes() {
        let code = RoomCode::parse("  ab12cd ").unwrap();
        assert_eq!(code.as_str(), "AB12CD");
        assert!(code.is_well_formed());

        // Unusual shapes still parse, they just won't match a room
        let odd = RoomCode::parse("abc").unwrap();
        assert!(!odd.is_well_formed());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(RoomCode::parse("   "), Err(Error::Validation(_))));
    }
}
