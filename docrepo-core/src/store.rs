//! Entry point tying a backend to models, connections, and repositories.
//!
//! [`DocumentStore`] owns one backend and hands out collaborators bound to it.
//! Borrowed handles come from [`DocumentStore::model`] and
//! [`DocumentStore::connection`]; owned repositories, which can be stored in
//! long-lived services, come from [`DocumentStore::repository`] when the backend
//! is cheaply cloneable.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::prelude::*;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let users = store.repository::<User>(TracingLogger::new("UsersRepository"));
//! let alice = users.create(&NewUser { name: "alice" }, SaveOptions::default()).await?;
//! ```

use crate::{
    backend::StoreBackend,
    connection::Connection,
    document::Document,
    error::DocumentStoreResult,
    logger::RepositoryLogger,
    model::Model,
    repository::Repository,
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets a model for the specified document type, borrowing the backend.
    ///
    /// The collection name is determined by the document type's `collection_name()` method.
    pub fn model<'a, D: Document>(&'a self) -> Model<D, &'a B> {
        Model::new(&self.backend)
    }

    /// Gets a connection handle borrowing the backend.
    pub fn connection<'a>(&'a self) -> Connection<&'a B> {
        Connection::new(&self.backend)
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown operation fails.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

impl<B: StoreBackend + Clone> DocumentStore<B> {
    /// Builds an owned repository for `D` with the given logger.
    pub fn repository<D: Document>(&self, logger: impl RepositoryLogger + 'static) -> Repository<D, B> {
        Repository::new(
            Model::new(self.backend.clone()),
            Connection::new(self.backend.clone()),
            logger,
        )
    }
}
