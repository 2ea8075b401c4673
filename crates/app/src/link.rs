//! Shareable room links
//!
//! Link format: `<base-url>?room=<CODE>`. Any other query parameters on the
//! base address are kept.

use std::str::FromStr;

use planit_core::{Error, Result, RoomCode};

/// Query parameter carrying the room code
pub const ROOM_PARAM: &str = "room";

/// A link that opens the join form for one room
#[derive(Debug, Clone, PartialEq)]
pub struct ShareLink {
    /// Address with the room parameter stripped
    pub base_url: String,
    pub code: RoomCode,
}

impl ShareLink {
    pub fn new(base_url: impl Into<String>, code: RoomCode) -> Self {
        Self {
            base_url: base_url.into(),
            code,
        }
    }

    /// Format as URL string
    pub fn to_url(&self) -> String {
        let (address, fragment) = split_fragment(&self.base_url);
        let separator = if address.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}={}{}",
            address, separator, ROOM_PARAM, self.code, fragment
        )
    }

    /// Parse from URL string. The code is uppercased; the returned base
    /// address no longer carries the room parameter.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        let (address, fragment) = split_fragment(url);
        let (path, query) = address
            .split_once('?')
            .ok_or_else(|| Error::validation("Link has no room code"))?;

        let mut code = None;
        let mut kept = Vec::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some((ROOM_PARAM, value)) if code.is_none() => {
                    code = Some(RoomCode::parse(value)?);
                }
                _ => kept.push(pair),
            }
        }
        let code = code.ok_or_else(|| Error::validation("Link has no room code"))?;

        let base_url = if kept.is_empty() {
            format!("{}{}", path, fragment)
        } else {
            format!("{}?{}{}", path, kept.join("&"), fragment)
        };
        Ok(Self { base_url, code })
    }
}

/// Accept either a bare room code or a share link
pub fn room_code_from_input(input: &str) -> Result<RoomCode> {
    if input.contains('?') {
        return Ok(ShareLink::parse(input)?.code);
    }
    RoomCode::parse(input)
}

fn split_fragment(url: &str) -> (&str, &str) {
    match url.find('#') {
        Some(idx) => url.split_at(idx),
        None => (url, ""),
    }
}

impl std::fmt::Display for ShareLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_url())
    }
}

impl FromStr for ShareLink {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> RoomCode {
        RoomCode::parse(s).unwrap()
    }

    #[test]
    fn test_link_format() {
        let link = ShareLink::new("https://planit.local/", code("ab12cd"));
        assert_eq!(link.to_url(), "https://planit.local/?room=AB12CD");

        let link = ShareLink::new("https://planit.local/?theme=dark#top", code("AB12CD"));
        assert_eq!(link.to_url(), "https://planit.local/?theme=dark&room=AB12CD#top");
    }

    #[test]
    fn test_parse_strips_room_param() {
        let link = ShareLink::parse("https://planit.local/?room=ab12cd").unwrap();
        assert_eq!(link.code.as_str(), "AB12CD");
        assert_eq!(link.base_url, "https://planit.local/");

        let link: ShareLink = "https://planit.local/?theme=dark&room=QQ11ZZ&lang=en#top"
            .parse()
            .unwrap();
        assert_eq!(link.code.as_str(), "QQ11ZZ");
        assert_eq!(link.base_url, "https://planit.local/?theme=dark&lang=en#top");
    }

    #[test]
    fn test_parse_invalid() {
        // No query at all
        assert!(ShareLink::parse("https://planit.local/").is_err());

        // Query without the room parameter
        assert!(ShareLink::parse("https://planit.local/?theme=dark").is_err());

        // Empty code
        assert!(ShareLink::parse("https://planit.local/?room=").is_err());
    }

    #[test]
    fn test_code_or_link_input() {
        assert_eq!(room_code_from_input(" xy98ab ").unwrap().as_str(), "XY98AB");
        assert_eq!(
            room_code_from_input("https://planit.local/?room=xy98ab").unwrap().as_str(),
            "XY98AB"
        );
        assert!(room_code_from_input("").is_err());
    }
}
