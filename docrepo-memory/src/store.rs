//! In-memory storage implementation for document stores.
//!
//! Collections are kept as insertion-ordered vectors of BSON documents behind an
//! async-aware read-write lock, so "first match" means "earliest inserted match",
//! matching the natural order a MongoDB collection without indexes reports.

use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
use std::collections::HashMap;
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, oid::ObjectId};

use docrepo_core::{
    backend::{FindOneAndUpdateOptions, ReturnDocument, SaveOptions, StoreBackend, StoreBackendBuilder},
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
    query::Expr,
    update::Update,
};

use crate::{
    evaluator::DocumentEvaluator,
    session::InMemorySession,
    update::{UpdateMode, apply_update},
};

type CollectionDocuments = Vec<Document>;
pub(crate) type StoreMap = HashMap<String, CollectionDocuments>;


/// Thread-safe in-memory document storage backend.
///
/// This struct implements the [`StoreBackend`] trait to provide a document store
/// that operates entirely in memory using async-aware read-write locks. Every
/// find-and-modify runs under the write lock, so it is atomic with respect to
/// every other operation on the store.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data and the same session count.
///
/// # Performance
///
/// Lookups scan the collection in insertion order (no indexing). For larger
/// datasets, use a persistent backend like MongoDB.
///
/// # Example
///
/// ```ignore
/// use docrepo_memory::InMemoryStore;
/// use docrepo::backend::{StoreBackend, SaveOptions};
/// use docrepo::query::Filter;
/// use bson::{doc, oid::ObjectId};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///
///     let id = ObjectId::new();
///     store.insert_one("users", doc! { "_id": id, "name": "Alice" }, SaveOptions::default()).await?;
///
///     let found = store.find_one("users", &Filter::id(id)).await?;
///     assert!(found.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents in insertion order
    pub(crate) store: Arc<RwLock<StoreMap>>,
    /// Sessions handed out and not yet dropped
    pub(crate) open_sessions: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
            open_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use docrepo_memory::InMemoryStore;
    ///
    /// let store = InMemoryStore::builder().build().await?;
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Number of sessions opened on this store and not yet released.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Number of committed documents in a collection.
    pub async fn count_documents(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub(crate) fn same_store(&self, other: &InMemoryStore) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }
}

fn identity<'a>(document: &'a Document, collection: &str) -> DocumentStoreResult<&'a Bson> {
    document
        .get(ID_FIELD)
        .ok_or_else(|| DocumentStoreError::InvalidDocument(format!(
            "document inserted into {collection} has no {ID_FIELD}"
        )))
}

pub(crate) fn ensure_unique(documents: &[Document], id: &Bson, collection: &str) -> DocumentStoreResult<()> {
    if documents.iter().any(|document| document.get(ID_FIELD) == Some(id)) {
        return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string()));
    }

    Ok(())
}

/// The document an upsert inserts when nothing matches: the filter's equality
/// constraints, an identity, then the update applied in insert mode.
fn seed_document(filter: &Expr, update: &Update) -> DocumentStoreResult<Document> {
    let constraints = filter.equality_fields();

    let mut seeded = Document::new();
    seeded.insert(
        ID_FIELD,
        constraints
            .get(ID_FIELD)
            .cloned()
            .unwrap_or_else(|| Bson::ObjectId(ObjectId::new())),
    );
    for (field, value) in constraints {
        seeded.insert(field, value);
    }

    apply_update(&mut seeded, update, UpdateMode::Insert)?;

    Ok(seeded)
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    type Session = InMemorySession;

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
        options: SaveOptions<'_, Self::Session>,
    ) -> DocumentStoreResult<Document> {
        let id = identity(&document, collection)?.clone();

        match options.session {
            Some(session) if session.in_transaction() => {
                if !session.belongs_to(self) {
                    return Err(DocumentStoreError::Transaction(
                        "session was started on a different store".to_string(),
                    ));
                }

                {
                    let store = self.store.read().await;
                    let existing = store
                        .get(collection)
                        .map(Vec::as_slice)
                        .unwrap_or_default();

                    ensure_unique(existing, &id, collection)?;
                }

                session.stage(collection, document.clone())?;
            }
            _ => {
                let mut store = self.store.write().await;
                let documents = store
                    .entry(collection.to_string())
                    .or_default();

                ensure_unique(documents, &id, collection)?;
                documents.push(document.clone());
            }
        }

        Ok(document)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Expr,
    ) -> DocumentStoreResult<Option<Document>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(None);
        };

        Ok(
            DocumentEvaluator::position(documents, filter)?
                .map(|index| documents[index].clone())
        )
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Expr,
        update: &Update,
        options: FindOneAndUpdateOptions,
    ) -> DocumentStoreResult<Option<Document>> {
        let mut store = self.store.write().await;

        if let Some(documents) = store.get_mut(collection) {
            if let Some(index) = DocumentEvaluator::position(documents, filter)? {
                let before = documents[index].clone();
                let mut after = before.clone();

                apply_update(&mut after, update, UpdateMode::Modify)?;
                documents[index] = after.clone();

                return Ok(Some(match options.return_document {
                    ReturnDocument::Before => before,
                    ReturnDocument::After => after,
                }));
            }
        }

        if !options.upsert {
            return Ok(None);
        }

        let seeded = seed_document(filter, update)?;
        let id = identity(&seeded, collection)?;
        let documents = store
            .entry(collection.to_string())
            .or_default();

        ensure_unique(documents, id, collection)?;
        documents.push(seeded.clone());

        Ok(match options.return_document {
            ReturnDocument::Before => None,
            ReturnDocument::After => Some(seeded),
        })
    }

    async fn start_session(&self) -> DocumentStoreResult<Self::Session> {
        Ok(InMemorySession::new(self.clone()))
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// The in-memory store takes no configuration; the builder exists so it can be
/// constructed through [`StoreBackendBuilder`] like any other backend.
///
/// # Example
///
/// ```ignore
/// use docrepo_memory::InMemoryStore;
/// use docrepo::backend::StoreBackendBuilder;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryStore::builder().build().await.unwrap();
/// }
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
