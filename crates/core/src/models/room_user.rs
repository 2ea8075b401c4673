//! Room participant model

use serde::{Deserialize, Serialize};

use super::VoteValue;

/// A participant's record in a room, keyed by session id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomUser {
    pub user_id: String,
    pub name: String,
    pub vote: Option<VoteValue>,
    pub has_voted: bool,
    pub is_admin: bool,
}

impl RoomUser {
    pub fn from_document(user_id: String, doc: RoomUserDocument) -> Self {
        Self {
            user_id,
            name: doc.name,
            vote: doc.vote,
            has_voted: doc.has_voted,
            is_admin: doc.is_admin,
        }
    }

    /// The vote as `viewer_id` may see it: other people's votes stay hidden
    /// until the room is revealed.
    pub fn visible_vote(&self, is_revealed: bool, viewer_id: &str) -> Option<&VoteValue> {
        if is_revealed || self.user_id == viewer_id {
            self.vote.as_ref()
        } else {
            None
        }
    }

    /// Voted with an actual value
    pub fn cast_vote(&self) -> Option<&VoteValue> {
        if self.has_voted {
            self.vote.as_ref()
        } else {
            None
        }
    }
}

/// Stored shape of a participant (`roomUsers/{code}/users/{userId}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUserDocument {
    pub name: String,
    #[serde(default)]
    pub vote: Option<VoteValue>,
    #[serde(default)]
    pub has_voted: bool,
    #[serde(default)]
    pub is_admin: bool,
}

impl RoomUserDocument {
    /// Fresh record written on join
    pub fn joining(name: impl Into<String>, is_admin: bool) -> Self {
        Self {
            name: name.into(),
            vote: None,
            has_voted: false,
            is_admin,
        }
    }
}

/// How many participants have voted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotingProgress {
    pub voted: usize,
    pub total: usize,
}

impl VotingProgress {
    pub fn of(users: &[RoomUser]) -> Self {
        Self {
            voted: users.iter().filter(|u| u.has_voted).count(),
            total: users.len(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.voted == self.total
    }

    /// Share of participants that voted, 0-100
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.voted * 100) / self.total) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, vote: Option<VoteValue>) -> RoomUser {
        RoomUser {
            user_id: id.into(),
            name: id.to_uppercase(),
            has_voted: vote.is_some(),
            vote,
            is_admin: false,
        }
    }

    #[test]
    fn test_visible_vote_hides_others_until_revealed() {
        let alice = user("alice", Some(VoteValue::Numeric(5.0)));

        assert_eq!(alice.visible_vote(false, "bob"), None);
        assert_eq!(alice.visible_vote(false, "alice"), Some(&VoteValue::Numeric(5.0)));
        assert_eq!(alice.visible_vote(true, "bob"), Some(&VoteValue::Numeric(5.0)));
    }

    #[test]
    fn test_progress() {
        let users = vec![
            user("a", Some(VoteValue::Numeric(1.0))),
            user("b", None),
            user("c", Some("XL".into())),
        ];
        let progress = VotingProgress::of(&users);
        assert_eq!(progress, VotingProgress { voted: 2, total: 3 });
        assert_eq!(progress.percent(), 66);
        assert!(!progress.is_complete());
        assert!(!VotingProgress::of(&[]).is_complete());
    }

    #[test]
    fn test_document_defaults() {
        let doc: RoomUserDocument = serde_json::from_str(r#"{"name":"Ann"}"#).unwrap();
        assert_eq!(doc, RoomUserDocument::joining("Ann", false));

        let json = serde_json::to_value(RoomUserDocument::joining("Ann", true)).unwrap();
        assert_eq!(json["vote"], serde_json::Value::Null);
        assert_eq!(json["hasVoted"], false);
        assert_eq!(json["isAdmin"], true);
    }
}
