//! In-process document store
//!
//! Backs the terminal client and tests. Every handle cloned from the same
//! store sees the same documents, so several sessions sharing one store
//! behave like several clients of one backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, instrument};

use crate::document::{split_path, CollectionWatch, Document, DocumentStore, DocumentWatch};
use crate::error::{Error, Result};

#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: RwLock<StoreState>,
    offline: AtomicBool,
    read_only: AtomicBool,
}

#[derive(Default)]
struct StoreState {
    docs: BTreeMap<String, Document>,
    doc_watchers: HashMap<String, Vec<mpsc::UnboundedSender<Option<Document>>>>,
    collection_watchers: HashMap<String, Vec<mpsc::UnboundedSender<Vec<(String, Document)>>>>,
}

impl StoreState {
    fn collection(&self, collection: &str) -> Vec<(String, Document)> {
        let prefix = format!("{}/", collection);
        self.docs
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter_map(|(path, doc)| {
                let id = &path[prefix.len()..];
                (!id.contains('/')).then(|| (id.to_string(), doc.clone()))
            })
            .collect()
    }

    /// Push the new state of `path` to its watchers and to watchers of its
    /// collection. Closed watchers are dropped here.
    fn notify(&mut self, path: &str) {
        let current = self.docs.get(path).cloned();
        if let Some(watchers) = self.doc_watchers.get_mut(path) {
            watchers.retain(|tx| tx.send(current.clone()).is_ok());
            if watchers.is_empty() {
                self.doc_watchers.remove(path);
            }
        }

        if let Some((collection, _)) = split_path(path) {
            if self.collection_watchers.contains_key(collection) {
                let members = self.collection(collection);
                if let Some(watchers) = self.collection_watchers.get_mut(collection) {
                    watchers.retain(|tx| tx.send(members.clone()).is_ok());
                    if watchers.is_empty() {
                        self.collection_watchers.remove(collection);
                    }
                }
            }
        }
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the connection. While offline every
    /// call fails with [`Error::Unavailable`]; existing watches stay open.
    pub fn set_available(&self, available: bool) {
        self.inner.offline.store(!available, Ordering::SeqCst);
    }

    /// Simulate a rule layer that rejects every write
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Number of documents currently stored
    pub async fn len(&self) -> usize {
        self.inner.state.read().await.docs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_online(&self) -> Result<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(Error::Unavailable("client is offline".into()));
        }
        Ok(())
    }

    fn check_writable(&self, path: &str) -> Result<()> {
        self.check_online()?;
        if self.inner.read_only.load(Ordering::SeqCst) {
            return Err(Error::PermissionDenied(path.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Document>> {
        self.check_online()?;
        Ok(self.inner.state.read().await.docs.get(path).cloned())
    }

    #[instrument(skip(self, doc))]
    async fn set(&self, path: &str, doc: Document) -> Result<()> {
        self.check_writable(path)?;
        let mut state = self.inner.state.write().await;
        state.docs.insert(path.to_string(), doc);
        state.notify(path);
        Ok(())
    }

    #[instrument(skip(self, doc))]
    async fn create(&self, path: &str, doc: Document) -> Result<bool> {
        self.check_writable(path)?;
        let mut state = self.inner.state.write().await;
        if state.docs.contains_key(path) {
            debug!("Document already exists");
            return Ok(false);
        }
        state.docs.insert(path.to_string(), doc);
        state.notify(path);
        Ok(true)
    }

    #[instrument(skip(self, fields))]
    async fn update(&self, path: &str, fields: Document) -> Result<()> {
        self.check_writable(path)?;
        let mut state = self.inner.state.write().await;
        let doc = state
            .docs
            .get_mut(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        doc.extend(fields);
        state.notify(path);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, path: &str) -> Result<()> {
        self.check_writable(path)?;
        let mut state = self.inner.state.write().await;
        if state.docs.remove(path).is_some() {
            state.notify(path);
        }
        Ok(())
    }

    async fn watch_document(&self, path: &str) -> Result<DocumentWatch> {
        self.check_online()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.state.write().await;
        // Initial push goes out under the lock so no change can slip in before it
        let _ = tx.send(state.docs.get(path).cloned());
        state
            .doc_watchers
            .entry(path.to_string())
            .or_default()
            .push(tx);
        Ok(DocumentWatch::new(rx))
    }

    async fn watch_collection(&self, collection: &str) -> Result<CollectionWatch> {
        self.check_online()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.state.write().await;
        let _ = tx.send(state.collection(collection));
        state
            .collection_watchers
            .entry(collection.to_string())
            .or_default()
            .push(tx);
        Ok(CollectionWatch::new(rx))
    }

    async fn server_time(&self) -> Result<DateTime<Utc>> {
        self.check_online()?;
        Ok(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;

    fn doc(name: &str) -> Document {
        fields! { "name" => name }
    }

    #[tokio::test]
    async fn test_create_only_if_absent() {
        let store = MemoryDocumentStore::new();
        assert!(store.create("rooms/A", doc("first")).await.unwrap());
        assert!(!store.create("rooms/A", doc("second")).await.unwrap());

        let stored = store.get("rooms/A").await.unwrap().unwrap();
        assert_eq!(stored["name"], "first");

        store.set("rooms/A", doc("third")).await.unwrap();
        let stored = store.get("rooms/A").await.unwrap().unwrap();
        assert_eq!(stored["name"], "third");
    }

    #[tokio::test]
    async fn test_update_merges_and_requires_document() {
        let store = MemoryDocumentStore::new();
        let err = store.update("rooms/A", doc("x")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        store.set("rooms/A", fields! { "name" => "a", "open" => true }).await.unwrap();
        store.update("rooms/A", fields! { "open" => false }).await.unwrap();

        let stored = store.get("rooms/A").await.unwrap().unwrap();
        assert_eq!(stored["name"], "a");
        assert_eq!(stored["open"], false);
    }

    #[tokio::test]
    async fn test_document_watch() {
        let store = MemoryDocumentStore::new();
        let mut watch = store.watch_document("rooms/A").await.unwrap();

        assert_eq!(watch.next().await, Some(None));

        store.set("rooms/A", doc("a")).await.unwrap();
        assert_eq!(watch.next().await.unwrap().unwrap()["name"], "a");

        // Writes elsewhere are not pushed
        store.set("rooms/B", doc("b")).await.unwrap();
        store.delete("rooms/A").await.unwrap();
        assert_eq!(watch.next().await, Some(None));
    }

    #[tokio::test]
    async fn test_collection_watch_pushes_full_set() {
        let store = MemoryDocumentStore::new();
        store.set("roomUsers/R/users/a", doc("a")).await.unwrap();

        let mut watch = store.watch_collection("roomUsers/R/users").await.unwrap();
        assert_eq!(watch.next().await.unwrap().len(), 1);

        store.set("roomUsers/R/users/b", doc("b")).await.unwrap();
        let mut ids: Vec<String> = watch.next().await.unwrap().into_iter().map(|(id, _)| id).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);

        // Other rooms and the parent path are not members
        store.set("roomUsers/S/users/c", doc("c")).await.unwrap();
        store.set("roomUsers/R", doc("r")).await.unwrap();
        store.update("roomUsers/R/users/a", fields! { "vote" => 3 }).await.unwrap();
        let members = watch.next().await.unwrap();
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn test_dropped_watch_is_pruned() {
        let store = MemoryDocumentStore::new();
        let watch = store.watch_document("rooms/A").await.unwrap();
        drop(watch);

        store.set("rooms/A", doc("a")).await.unwrap();
        assert!(store.inner.state.read().await.doc_watchers.is_empty());
    }

    #[tokio::test]
    async fn test_offline_and_read_only() {
        let store = MemoryDocumentStore::new();
        store.set_available(false);
        assert!(matches!(store.get("rooms/A").await, Err(Error::Unavailable(_))));
        assert!(matches!(store.watch_document("rooms/A").await, Err(Error::Unavailable(_))));

        store.set_available(true);
        store.set_read_only(true);
        assert!(matches!(
            store.set("rooms/A", doc("a")).await,
            Err(Error::PermissionDenied(_))
        ));
        assert!(store.get("rooms/A").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }
}
