//! Typed collection handles.
//!
//! A [`Model`] binds a document type to one collection of a backend and decodes
//! every record it reads into an owned value of that type. It performs no
//! not-found handling of its own; absence is reported as `None`.

use bson::Document as BsonDocument;
use std::{fmt, marker::PhantomData};

use crate::{
    backend::{FindOneAndUpdateOptions, SaveOptions, StoreBackend},
    document::{Document, DocumentExt},
    error::DocumentStoreResult,
    query::Expr,
    update::Update,
};

/// A type-safe accessor bound to one collection.
///
/// # Type Parameters
///
/// * `D` - The document type stored in the collection
/// * `B` - The storage backend, owned or borrowed
pub struct Model<D: Document, B: StoreBackend> {
    name: String,
    backend: B,
    _document: PhantomData<fn() -> D>,
}

impl<D: Document, B: StoreBackend> Model<D, B> {
    /// Binds `D` to the collection named by [`Document::collection_name`].
    pub fn new(backend: B) -> Self {
        Self::with_collection(D::collection_name(), backend)
    }

    /// Binds `D` to an explicitly named collection.
    pub fn with_collection(name: impl Into<String>, backend: B) -> Self {
        Self {
            name: name.into(),
            backend,
            _document: PhantomData,
        }
    }

    /// Returns the name of the bound collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backend this model issues queries against.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Persists a store-native record and decodes what the store reports back.
    pub async fn insert_one(
        &self,
        record: BsonDocument,
        options: SaveOptions<'_, B::Session>,
    ) -> DocumentStoreResult<D> {
        D::from_bson(
            self.backend
                .insert_one(&self.name, record, options)
                .await?,
        )
    }

    /// Returns the first matching document, if any.
    pub async fn find_one(&self, filter: &Expr) -> DocumentStoreResult<Option<D>> {
        self.backend
            .find_one(&self.name, filter)
            .await?
            .map(D::from_bson)
            .transpose()
    }

    /// Atomically updates the first matching document, if any.
    pub async fn find_one_and_update(
        &self,
        filter: &Expr,
        update: &Update,
        options: FindOneAndUpdateOptions,
    ) -> DocumentStoreResult<Option<D>> {
        self.backend
            .find_one_and_update(&self.name, filter, update, options)
            .await?
            .map(D::from_bson)
            .transpose()
    }
}

impl<D: Document, B: StoreBackend + Clone> Clone for Model<D, B> {
    fn clone(&self) -> Self {
        Self::with_collection(self.name.clone(), self.backend.clone())
    }
}

impl<D: Document, B: StoreBackend> fmt::Debug for Model<D, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("backend", &self.backend)
            .finish()
    }
}
