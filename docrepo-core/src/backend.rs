//! Storage backend abstraction for the repository layer.
//!
//! This module defines the traits that stand in for a document-store driver.
//! A repository issues exactly four query shapes against a backend: insert-one,
//! find-one, find-one-and-update, and find-one-and-update in upsert mode. The
//! connection side of a backend only starts sessions.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The query surface plus session creation
//! - [`StoreSession`]: A driver session able to scope a transaction
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use docrepo::backend::{StoreBackend, SaveOptions};
//! use docrepo::query::Filter;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//! let saved = backend
//!     .insert_one("users", doc! { "_id": ObjectId::new(), "name": "Alice" }, SaveOptions::default())
//!     .await?;
//! let found = backend.find_one("users", &Filter::eq("name", "Alice")).await?;
//! ```

use async_trait::async_trait;
use bson::Document as BsonDocument;
use std::fmt::Debug;

use crate::{error::DocumentStoreResult, query::Expr, update::Update};

/// Which version of a document a find-and-modify operation reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnDocument {
    /// The document as it was before the update was applied.
    Before,
    /// The document after the update was applied.
    #[default]
    After,
}

/// Options for [`StoreBackend::find_one_and_update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOneAndUpdateOptions {
    /// Insert a new document when nothing matches the filter.
    pub upsert: bool,
    /// Which version of the document to return.
    pub return_document: ReturnDocument,
}

impl FindOneAndUpdateOptions {
    /// Return the post-update document, never insert.
    pub fn update() -> Self {
        Self { upsert: false, return_document: ReturnDocument::After }
    }

    /// Return the post-update document, inserting when nothing matches.
    pub fn upsert() -> Self {
        Self { upsert: true, return_document: ReturnDocument::After }
    }
}

/// Options for inserting a single document.
///
/// The session ties the write to an open transaction; without one the write is
/// applied immediately.
#[derive(Debug)]
pub struct SaveOptions<'a, S> {
    /// Session the insert runs in.
    pub session: Option<&'a mut S>,
    /// Skip the store's document validation rules, when the store has any.
    pub bypass_document_validation: bool,
}

impl<'a, S> SaveOptions<'a, S> {
    /// Runs the insert inside the given session.
    pub fn session(mut self, session: &'a mut S) -> Self {
        self.session = Some(session);
        self
    }

    /// Skips store-side validation rules.
    pub fn bypass_document_validation(mut self, bypass: bool) -> Self {
        self.bypass_document_validation = bypass;
        self
    }
}

impl<S> Default for SaveOptions<'_, S> {
    fn default() -> Self {
        Self { session: None, bypass_document_validation: false }
    }
}

/// A driver session capable of scoping one transaction at a time.
///
/// Sessions are released when dropped. A session dropped while its transaction is
/// still in progress must leave the store as if the transaction had been aborted.
#[async_trait]
pub trait StoreSession: Send + Sync + Debug {
    /// A printable identifier for diagnostics.
    fn id(&self) -> String;

    /// Whether a transaction is currently in progress on this session.
    fn in_transaction(&self) -> bool;

    /// Begins a transaction on this session.
    ///
    /// # Errors
    ///
    /// Fails if a transaction is already in progress or the driver rejects it.
    async fn start_transaction(&mut self) -> DocumentStoreResult<()>;

    /// Commits the in-progress transaction.
    async fn commit_transaction(&mut self) -> DocumentStoreResult<()>;

    /// Aborts the in-progress transaction, discarding its writes.
    async fn abort_transaction(&mut self) -> DocumentStoreResult<()>;
}

/// Abstract interface for document-store drivers.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and support concurrent access from multiple
/// async tasks. Ordering between concurrent calls is whatever the store guarantees;
/// callers of this trait add no locking of their own.
///
/// # Error Handling
///
/// Driver failures should be reported as
/// [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend) carrying
/// the driver's own error value.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// The session type handed out by [`StoreBackend::start_session`].
    type Session: StoreSession;

    /// Persists one document and returns the stored record.
    ///
    /// The document already carries its `_id`. The returned document reflects any
    /// store-side defaults or transforms.
    async fn insert_one(
        &self,
        collection: &str,
        document: BsonDocument,
        options: SaveOptions<'_, Self::Session>,
    ) -> DocumentStoreResult<BsonDocument>;

    /// Returns the first document matching the filter, in store order.
    async fn find_one(
        &self,
        collection: &str,
        filter: &Expr,
    ) -> DocumentStoreResult<Option<BsonDocument>>;

    /// Atomically finds the first matching document and applies the update.
    ///
    /// Returns `None` when nothing matched and no document was inserted.
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Expr,
        update: &Update,
        options: FindOneAndUpdateOptions,
    ) -> DocumentStoreResult<Option<BsonDocument>>;

    /// Opens a new session against the store.
    async fn start_session(&self) -> DocumentStoreResult<Self::Session>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    type Session = B::Session;

    async fn insert_one(
        &self,
        collection: &str,
        document: BsonDocument,
        options: SaveOptions<'_, Self::Session>,
    ) -> DocumentStoreResult<BsonDocument> {
        (*self)
            .insert_one(collection, document, options)
            .await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Expr,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        (*self)
            .find_one(collection, filter)
            .await
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Expr,
        update: &Update,
        options: FindOneAndUpdateOptions,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        (*self)
            .find_one_and_update(collection, filter, update, options)
            .await
    }

    async fn start_session(&self) -> DocumentStoreResult<Self::Session> {
        (*self).start_session().await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
