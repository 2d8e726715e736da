//! Sessions and transactions for the in-memory store.
//!
//! Inserts made through a session with a transaction in progress are staged on
//! the session and only become visible when the transaction commits. Aborting
//! the transaction, or dropping the session before it commits, discards them.
//! Reads never observe staged writes.

use async_trait::async_trait;
use bson::{Bson, Document};
use chrono::{DateTime, Utc};
use std::sync::atomic::Ordering;
use uuid::Uuid;

use docrepo_core::{
    backend::StoreSession,
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
};

use crate::store::{InMemoryStore, ensure_unique};

/// A session against an [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemorySession {
    id: Uuid,
    started_at: DateTime<Utc>,
    store: InMemoryStore,
    in_transaction: bool,
    staged: Vec<(String, Document)>,
}

impl InMemorySession {
    pub(crate) fn new(store: InMemoryStore) -> Self {
        store.open_sessions.fetch_add(1, Ordering::SeqCst);

        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            store,
            in_transaction: false,
            staged: Vec::new(),
        }
    }

    /// When the session was opened.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Number of inserts waiting for the current transaction to commit.
    pub fn staged_writes(&self) -> usize {
        self.staged.len()
    }

    pub(crate) fn belongs_to(&self, store: &InMemoryStore) -> bool {
        store.same_store(&self.store)
    }

    pub(crate) fn stage(&mut self, collection: &str, document: Document) -> DocumentStoreResult<()> {
        let id = document.get(ID_FIELD).cloned().unwrap_or(Bson::Null);

        let already_staged = self.staged
            .iter()
            .any(|(name, staged)| name == collection && staged.get(ID_FIELD) == Some(&id));

        if already_staged {
            return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string()));
        }

        self.staged.push((collection.to_string(), document));
        Ok(())
    }

    fn ensure_in_transaction(&self) -> DocumentStoreResult<()> {
        if !self.in_transaction {
            return Err(DocumentStoreError::Transaction(format!(
                "no transaction in progress on session {}",
                self.id
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl StoreSession for InMemorySession {
    fn id(&self) -> String {
        self.id.to_string()
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    async fn start_transaction(&mut self) -> DocumentStoreResult<()> {
        if self.in_transaction {
            return Err(DocumentStoreError::Transaction(format!(
                "transaction already in progress on session {}",
                self.id
            )));
        }

        self.in_transaction = true;
        Ok(())
    }

    async fn commit_transaction(&mut self) -> DocumentStoreResult<()> {
        self.ensure_in_transaction()?;

        self.in_transaction = false;
        let staged = std::mem::take(&mut self.staged);

        let mut store = self.store.store.write().await;

        // Validate everything before applying anything so a conflicting write
        // leaves the store untouched.
        for (collection, document) in &staged {
            let existing = store
                .get(collection)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let id = document.get(ID_FIELD).cloned().unwrap_or(Bson::Null);

            ensure_unique(existing, &id, collection)?;
        }

        for (collection, document) in staged {
            store
                .entry(collection)
                .or_default()
                .push(document);
        }

        Ok(())
    }

    async fn abort_transaction(&mut self) -> DocumentStoreResult<()> {
        self.ensure_in_transaction()?;

        self.in_transaction = false;
        self.staged.clear();

        Ok(())
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.store.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}
