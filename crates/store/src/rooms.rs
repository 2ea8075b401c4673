//! Room store adapter
//!
//! Maps room intents onto document writes and document pushes back onto
//! typed rooms and participants. No business rules live here beyond the
//! upsert shapes; store errors are returned as they come.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use planit_core::models::{
    Room, RoomCode, RoomDocument, RoomUser, RoomUserDocument, SeriesType, VoteValue,
};

use crate::document::{
    from_document, room_path, to_document, user_path, users_collection, CollectionWatch,
    DocumentStore, DocumentWatch,
};
use crate::error::{Error, Result};
use crate::fields;

/// Fresh codes tried before `create_room` gives up
pub const DEFAULT_CODE_ATTEMPTS: u32 = 5;

/// Source of candidate room codes
pub type CodeSource = Arc<dyn Fn() -> RoomCode + Send + Sync>;

/// What a room subscription reports
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    Changed(Room),
    /// The room document is missing, either deleted or never created
    NotFound,
}

/// Typed room subscription
pub struct RoomWatch {
    code: RoomCode,
    inner: DocumentWatch,
}

impl RoomWatch {
    /// Next event; `None` once the store closed the subscription.
    /// Documents that fail to decode are logged and skipped.
    pub async fn next(&mut self) -> Option<RoomEvent> {
        let path = room_path(&self.code);
        loop {
            match self.inner.next().await? {
                None => return Some(RoomEvent::NotFound),
                Some(doc) => match from_document::<RoomDocument>(&path, doc) {
                    Ok(doc) => {
                        let room = Room::from_document(self.code.clone(), doc);
                        return Some(RoomEvent::Changed(room));
                    }
                    Err(e) => {
                        warn!(room_id = %self.code, error = %e, "Skipping malformed room document")
                    }
                },
            }
        }
    }
}

/// Typed participant subscription
pub struct UsersWatch {
    code: RoomCode,
    inner: CollectionWatch,
}

impl UsersWatch {
    /// Next complete participant set. Malformed records are left out.
    pub async fn next(&mut self) -> Option<Vec<RoomUser>> {
        let members = self.inner.next().await?;
        let users = members
            .into_iter()
            .filter_map(|(user_id, doc)| {
                let path = user_path(&self.code, &user_id);
                match from_document::<RoomUserDocument>(&path, doc) {
                    Ok(doc) => Some(RoomUser::from_document(user_id, doc)),
                    Err(e) => {
                        warn!(room_id = %self.code, user_id = %user_id, error = %e, "Skipping malformed participant");
                        None
                    }
                }
            })
            .collect();
        Some(users)
    }
}

/// Room operations over a [`DocumentStore`]
#[derive(Clone)]
pub struct RoomStore {
    docs: Arc<dyn DocumentStore>,
    code_attempts: u32,
    code_source: CodeSource,
}

impl RoomStore {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self {
            docs,
            code_attempts: DEFAULT_CODE_ATTEMPTS,
            code_source: Arc::new(RoomCode::generate),
        }
    }

    /// Cap on fresh codes tried when a generated one is taken (at least one)
    pub fn with_code_attempts(mut self, attempts: u32) -> Self {
        self.code_attempts = attempts.max(1);
        self
    }

    /// Replace the random code generator
    pub fn with_code_source(mut self, source: CodeSource) -> Self {
        self.code_source = source;
        self
    }

    /// A candidate code; uniqueness is settled when the room is written
    pub fn generate_room_code(&self) -> RoomCode {
        (self.code_source)()
    }

    /// Write a new, unrevealed room under a free code and return the code.
    ///
    /// The write is insert-if-absent, so an existing room is never
    /// overwritten. A taken code is retried with a fresh one.
    #[instrument(skip(self, series), fields(user_id = %creator_id))]
    pub async fn create_room(
        &self,
        creator_id: &str,
        series: &[VoteValue],
        series_type: SeriesType,
    ) -> Result<RoomCode> {
        let room = RoomDocument {
            created_by: creator_id.to_string(),
            active_series: series.to_vec(),
            series_type,
            is_revealed: false,
            created_at: self.docs.server_time().await?,
        };

        for attempt in 1..=self.code_attempts {
            let code = self.generate_room_code();
            let path = room_path(&code);
            if self.docs.create(&path, to_document(&path, &room)?).await? {
                info!(room_id = %code, "Room created");
                return Ok(code);
            }
            warn!(room_id = %code, attempt, "Room code already taken");
        }

        Err(Error::Conflict(self.code_attempts))
    }

    /// Write (or overwrite) the caller's participant record with no vote
    #[instrument(skip(self), fields(room_id = %code))]
    pub async fn join_room(
        &self,
        code: &RoomCode,
        user_id: &str,
        name: &str,
        is_admin: bool,
    ) -> Result<()> {
        let path = user_path(code, user_id);
        let doc = to_document(&path, &RoomUserDocument::joining(name, is_admin))?;
        self.docs.set(&path, doc).await?;
        info!("Joined room");
        Ok(())
    }

    #[instrument(skip(self), fields(room_id = %code))]
    pub async fn room_exists(&self, code: &RoomCode) -> Result<bool> {
        Ok(self.docs.get(&room_path(code)).await?.is_some())
    }

    /// Record a vote on one participant. The value is not checked against
    /// the room's series.
    #[instrument(skip(self), fields(room_id = %code))]
    pub async fn update_vote(&self, code: &RoomCode, user_id: &str, vote: &VoteValue) -> Result<()> {
        self.docs
            .update(
                &user_path(code, user_id),
                fields! { "vote" => vote, "hasVoted" => true },
            )
            .await
    }

    /// Flip the room to revealed; participant records are untouched
    #[instrument(skip(self), fields(room_id = %code))]
    pub async fn reveal_votes(&self, code: &RoomCode) -> Result<()> {
        self.docs
            .update(&room_path(code), fields! { "isRevealed" => true })
            .await
    }

    /// Flip the room back to hidden. Votes stay until each participant is
    /// cleared with [`RoomStore::clear_user_vote`].
    #[instrument(skip(self), fields(room_id = %code))]
    pub async fn reset_votes(&self, code: &RoomCode) -> Result<()> {
        self.docs
            .update(&room_path(code), fields! { "isRevealed" => false })
            .await
    }

    /// Swap the room's series; always hides votes again
    #[instrument(skip(self, series), fields(room_id = %code))]
    pub async fn update_estimation_series(
        &self,
        code: &RoomCode,
        series: &[VoteValue],
        series_type: SeriesType,
    ) -> Result<()> {
        self.docs
            .update(
                &room_path(code),
                fields! {
                    "activeSeries" => series,
                    "seriesType" => series_type,
                    "isRevealed" => false,
                },
            )
            .await
    }

    #[instrument(skip(self), fields(room_id = %code))]
    pub async fn clear_user_vote(&self, code: &RoomCode, user_id: &str) -> Result<()> {
        self.docs
            .update(
                &user_path(code, user_id),
                fields! { "vote" => serde_json::Value::Null, "hasVoted" => false },
            )
            .await
    }

    /// Subscribe to a room; the first event arrives right away
    #[instrument(skip(self), fields(room_id = %code))]
    pub async fn subscribe_to_room(&self, code: &RoomCode) -> Result<RoomWatch> {
        let inner = self.docs.watch_document(&room_path(code)).await?;
        debug!("Subscribed to room");
        Ok(RoomWatch {
            code: code.clone(),
            inner,
        })
    }

    /// Subscribe to a room's participants; the first set arrives right away
    #[instrument(skip(self), fields(room_id = %code))]
    pub async fn subscribe_to_room_users(&self, code: &RoomCode) -> Result<UsersWatch> {
        let inner = self.docs.watch_collection(&users_collection(code)).await?;
        debug!("Subscribed to room users");
        Ok(UsersWatch {
            code: code.clone(),
            inner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocumentStore;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn fib() -> Vec<VoteValue> {
        planit_core::series::values_for(SeriesType::Fibonacci)
    }

    fn scripted(codes: &[&str]) -> CodeSource {
        let queue: Mutex<VecDeque<RoomCode>> = Mutex::new(
            codes.iter().map(|c| RoomCode::parse(c).unwrap()).collect(),
        );
        Arc::new(move || queue.lock().unwrap().pop_front().unwrap())
    }

    fn setup() -> (MemoryDocumentStore, RoomStore) {
        let docs = MemoryDocumentStore::new();
        let rooms = RoomStore::new(Arc::new(docs.clone()));
        (docs, rooms)
    }

    #[tokio::test]
    async fn test_create_room_writes_unrevealed_room() {
        let (_docs, rooms) = setup();
        let code = rooms.create_room("u1", &fib(), SeriesType::Fibonacci).await.unwrap();

        assert!(code.is_well_formed());
        assert!(rooms.room_exists(&code).await.unwrap());

        let mut watch = rooms.subscribe_to_room(&code).await.unwrap();
        match watch.next().await.unwrap() {
            RoomEvent::Changed(room) => {
                assert_eq!(room.room_id, code);
                assert_eq!(room.created_by, "u1");
                assert_eq!(room.active_series, fib());
                assert!(!room.is_revealed);
            }
            RoomEvent::NotFound => panic!("room missing"),
        }
    }

    #[tokio::test]
    async fn test_taken_code_is_retried() {
        let (docs, rooms) = setup();
        let rooms = rooms.with_code_source(scripted(&["AAAAAA", "AAAAAA", "BBBBBB"]));

        let first = rooms.create_room("u1", &fib(), SeriesType::Fibonacci).await.unwrap();
        let second = rooms.create_room("u2", &fib(), SeriesType::Fibonacci).await.unwrap();
        assert_eq!(first.as_str(), "AAAAAA");
        assert_eq!(second.as_str(), "BBBBBB");

        // The first room still belongs to its creator
        let stored = docs.get("rooms/AAAAAA").await.unwrap().unwrap();
        assert_eq!(stored["createdBy"], "u1");
    }

    #[tokio::test]
    async fn test_code_space_exhausted() {
        let (_docs, rooms) = setup();
        let rooms = rooms
            .with_code_attempts(2)
            .with_code_source(scripted(&["AAAAAA", "AAAAAA", "AAAAAA"]));

        rooms.create_room("u1", &fib(), SeriesType::Fibonacci).await.unwrap();
        let err = rooms.create_room("u2", &fib(), SeriesType::Fibonacci).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(2)));
    }

    #[tokio::test]
    async fn test_vote_lifecycle() {
        let (_docs, rooms) = setup();
        let code = rooms.create_room("u1", &fib(), SeriesType::Fibonacci).await.unwrap();
        rooms.join_room(&code, "u1", "Ada", true).await.unwrap();
        rooms.join_room(&code, "u2", "Bob", false).await.unwrap();

        let mut users = rooms.subscribe_to_room_users(&code).await.unwrap();
        assert_eq!(users.next().await.unwrap().len(), 2);

        rooms.update_vote(&code, "u2", &VoteValue::Numeric(5.0)).await.unwrap();
        let snapshot = users.next().await.unwrap();
        let bob = snapshot.iter().find(|u| u.user_id == "u2").unwrap();
        assert!(bob.has_voted);
        assert_eq!(bob.vote, Some(VoteValue::Numeric(5.0)));
        assert!(!bob.is_admin);

        rooms.clear_user_vote(&code, "u2").await.unwrap();
        let snapshot = users.next().await.unwrap();
        let bob = snapshot.iter().find(|u| u.user_id == "u2").unwrap();
        assert!(!bob.has_voted);
        assert_eq!(bob.vote, None);

        // Rejoining resets the record
        rooms.update_vote(&code, "u1", &"XL".into()).await.unwrap();
        rooms.join_room(&code, "u1", "Ada", true).await.unwrap();
        users.next().await.unwrap();
        let snapshot = users.next().await.unwrap();
        let ada = snapshot.iter().find(|u| u.user_id == "u1").unwrap();
        assert!(!ada.has_voted);
        assert!(ada.is_admin);
    }

    #[tokio::test]
    async fn test_reveal_reset_and_series_change() {
        let (_docs, rooms) = setup();
        let code = rooms.create_room("u1", &fib(), SeriesType::Fibonacci).await.unwrap();
        rooms.join_room(&code, "u1", "Ada", true).await.unwrap();
        rooms.update_vote(&code, "u1", &VoteValue::Numeric(3.0)).await.unwrap();

        let mut watch = rooms.subscribe_to_room(&code).await.unwrap();
        watch.next().await.unwrap();

        rooms.reveal_votes(&code).await.unwrap();
        assert!(matches!(watch.next().await, Some(RoomEvent::Changed(r)) if r.is_revealed));

        // Reset only touches the flag
        rooms.reset_votes(&code).await.unwrap();
        assert!(matches!(watch.next().await, Some(RoomEvent::Changed(r)) if !r.is_revealed));
        let mut users = rooms.subscribe_to_room_users(&code).await.unwrap();
        assert!(users.next().await.unwrap()[0].has_voted);

        rooms.reveal_votes(&code).await.unwrap();
        watch.next().await.unwrap();

        let tshirt = planit_core::series::values_for(SeriesType::Tshirt);
        rooms.update_estimation_series(&code, &tshirt, SeriesType::Tshirt).await.unwrap();
        match watch.next().await.unwrap() {
            RoomEvent::Changed(room) => {
                assert_eq!(room.series_type, SeriesType::Tshirt);
                assert_eq!(room.active_series, tshirt);
                assert!(!room.is_revealed);
            }
            RoomEvent::NotFound => panic!("room missing"),
        }
    }

    #[tokio::test]
    async fn test_missing_and_deleted_room() {
        let (docs, rooms) = setup();
        let missing = RoomCode::parse("ZZZZZZ").unwrap();
        assert!(!rooms.room_exists(&missing).await.unwrap());

        let mut watch = rooms.subscribe_to_room(&missing).await.unwrap();
        assert_eq!(watch.next().await, Some(RoomEvent::NotFound));

        let err = rooms.reveal_votes(&missing).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let code = rooms.create_room("u1", &fib(), SeriesType::Fibonacci).await.unwrap();
        let mut watch = rooms.subscribe_to_room(&code).await.unwrap();
        watch.next().await.unwrap();
        docs.delete(&room_path(&code)).await.unwrap();
        assert_eq!(watch.next().await, Some(RoomEvent::NotFound));
    }

    #[tokio::test]
    async fn test_malformed_documents_are_skipped() {
        let (docs, rooms) = setup();
        let code = rooms.create_room("u1", &fib(), SeriesType::Fibonacci).await.unwrap();
        rooms.join_room(&code, "u1", "Ada", true).await.unwrap();
        docs.set(&user_path(&code, "ghost"), fields! { "vote" => 3 }).await.unwrap();

        let mut users = rooms.subscribe_to_room_users(&code).await.unwrap();
        let snapshot = users.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].user_id, "u1");

        let mut watch = rooms.subscribe_to_room(&code).await.unwrap();
        watch.next().await.unwrap();
        docs.update(&room_path(&code), fields! { "seriesType" => "planets" }).await.unwrap();
        docs.update(&room_path(&code), fields! { "seriesType" => "tshirt" }).await.unwrap();
        // The bad push is skipped; the next good one comes through
        assert!(matches!(watch.next().await, Some(RoomEvent::Changed(r)) if r.series_type == SeriesType::Tshirt));
    }

    #[tokio::test]
    async fn test_store_errors_pass_through() {
        let (docs, rooms) = setup();
        docs.set_available(false);
        let err = rooms.create_room("u1", &fib(), SeriesType::Fibonacci).await.unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
        assert!(docs.is_empty().await);
    }
}
