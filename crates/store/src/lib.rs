//! Planit Store Library
//!
//! The shared document store rooms and participants live in, and the
//! adapter that maps room intents onto it.
//!
//! # Layout
//!
//! - `rooms/{code}`: one document per room
//! - `roomUsers/{code}/users/{userId}`: one document per participant
//!
//! # Usage
//!
//! ```ignore
//! let docs = Arc::new(MemoryDocumentStore::new());
//! let rooms = RoomStore::new(docs);
//!
//! let code = rooms.create_room(&uid, &series, SeriesType::Fibonacci).await?;
//! rooms.join_room(&code, &uid, "Ada", true).await?;
//!
//! let mut watch = rooms.subscribe_to_room(&code).await?;
//! while let Some(event) = watch.next().await {
//!     match event {
//!         RoomEvent::Changed(room) => { /* render */ }
//!         RoomEvent::NotFound => break,
//!     }
//! }
//! ```

pub mod document;
pub mod error;
pub mod memory;
pub mod rooms;

pub use document::{CollectionWatch, Document, DocumentStore, DocumentWatch};
pub use error::{Error, Result};
pub use memory::MemoryDocumentStore;
pub use rooms::{RoomEvent, RoomStore, RoomWatch, UsersWatch};

#[doc(hidden)]
pub use serde_json as __json;
