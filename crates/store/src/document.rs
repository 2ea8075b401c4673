//! Document store contract
//!
//! A document is a JSON object addressed by a slash-separated path. A
//! collection is every document one level below a path prefix.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;

use planit_core::RoomCode;

use crate::error::{Error, Result};

/// Stored document body
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Top-level collection of room documents
pub const ROOMS: &str = "rooms";

/// Top-level collection holding one participant subcollection per room
pub const ROOM_USERS: &str = "roomUsers";

/// `rooms/{code}`
pub fn room_path(code: &RoomCode) -> String {
    format!("{}/{}", ROOMS, code)
}

/// `roomUsers/{code}/users`
pub fn users_collection(code: &RoomCode) -> String {
    format!("{}/{}/users", ROOM_USERS, code)
}

/// `roomUsers/{code}/users/{userId}`
pub fn user_path(code: &RoomCode, user_id: &str) -> String {
    format!("{}/{}", users_collection(code), user_id)
}

/// Collection a document path belongs to, and its id within it
pub fn split_path(path: &str) -> Option<(&str, &str)> {
    path.rsplit_once('/')
}

/// Serialize a value into a document body
pub fn to_document<T: Serialize>(path: &str, value: &T) -> Result<Document> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(Error::decode(path, "not a JSON object")),
        Err(e) => Err(Error::decode(path, e)),
    }
}

/// Deserialize a document body
pub fn from_document<T: DeserializeOwned>(path: &str, doc: Document) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(doc)).map_err(|e| Error::decode(path, e))
}

/// Build a field map for [`DocumentStore::update`]
#[macro_export]
macro_rules! fields {
    ($($key:literal => $value:expr),* $(,)?) => {{
        let mut fields = $crate::Document::new();
        $(fields.insert($key.to_string(), $crate::__json::json!($value));)*
        fields
    }};
}

/// Live view of one document.
///
/// Yields the current body (`None` when absent) right after subscribing and
/// again after every change. Dropping the watch unsubscribes it.
pub struct DocumentWatch {
    rx: mpsc::UnboundedReceiver<Option<Document>>,
}

impl DocumentWatch {
    pub fn new(rx: mpsc::UnboundedReceiver<Option<Document>>) -> Self {
        Self { rx }
    }

    /// Next push; `None` once the store has gone away
    pub async fn next(&mut self) -> Option<Option<Document>> {
        self.rx.recv().await
    }
}

/// Live view of a collection.
///
/// Every push carries the complete `(id, body)` set, in no particular order.
pub struct CollectionWatch {
    rx: mpsc::UnboundedReceiver<Vec<(String, Document)>>,
}

impl CollectionWatch {
    pub fn new(rx: mpsc::UnboundedReceiver<Vec<(String, Document)>>) -> Self {
        Self { rx }
    }

    pub async fn next(&mut self) -> Option<Vec<(String, Document)>> {
        self.rx.recv().await
    }
}

/// Shared document store.
///
/// Writes are last-write-wins per document with no cross-document
/// transactions. Watches deliver pushes in the order writes were applied.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read
    async fn get(&self, path: &str) -> Result<Option<Document>>;

    /// Write a document, replacing whatever was there
    async fn set(&self, path: &str, doc: Document) -> Result<()>;

    /// Write a document only if none exists; `false` when one already did
    async fn create(&self, path: &str, doc: Document) -> Result<bool>;

    /// Merge fields into an existing document
    async fn update(&self, path: &str, fields: Document) -> Result<()>;

    async fn delete(&self, path: &str) -> Result<()>;

    async fn watch_document(&self, path: &str) -> Result<DocumentWatch>;

    async fn watch_collection(&self, collection: &str) -> Result<CollectionWatch>;

    /// Store clock, used for server-assigned timestamps
    async fn server_time(&self) -> Result<DateTime<Utc>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let code = RoomCode::parse("ab12cd").unwrap();
        assert_eq!(room_path(&code), "rooms/AB12CD");
        assert_eq!(users_collection(&code), "roomUsers/AB12CD/users");
        assert_eq!(user_path(&code, "u-1"), "roomUsers/AB12CD/users/u-1");
        assert_eq!(
            split_path("roomUsers/AB12CD/users/u-1"),
            Some(("roomUsers/AB12CD/users", "u-1"))
        );
    }

    #[test]
    fn test_fields_macro() {
        let fields = fields! { "isRevealed" => true, "vote" => serde_json::Value::Null };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["isRevealed"], true);
        assert!(fields["vote"].is_null());
    }

    #[test]
    fn test_non_object_is_decode_error() {
        let err = to_document("rooms/X", &vec![1, 2]).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }
}
