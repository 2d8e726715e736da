//! Convenient re-exports of commonly used types from docrepo.
//!
//! ```ignore
//! use docrepo::prelude::*;
//! ```
//!
//! This provides access to:
//! - The repository and its collaborators
//! - Document traits and the `Document` derive
//! - Filter and update construction
//! - Store backends, sessions and transactions
//! - Logging and error types

pub use docrepo_core::{
    repository::Repository,
    model::Model,
    connection::Connection,
    store::DocumentStore,
    document::{Document, DocumentExt},
    backend::{StoreBackend, StoreBackendBuilder, StoreSession, SaveOptions, FindOneAndUpdateOptions, ReturnDocument},
    query::{Expr, FieldOp, Filter},
    update::{Update, UpdateOp},
    transaction::Transaction,
    logger::{RepositoryLogger, TracingLogger},
    error::{DocumentStoreError, DocumentStoreResult},
};
pub use docrepo_macros::Document;
pub use docrepo_memory::InMemoryStore;
pub use bson::oid::ObjectId;
