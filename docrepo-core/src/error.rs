//! Error types and result types for repository and store operations.
//!
//! Every fallible operation in the workspace returns [`DocumentStoreResult<T>`].
//! Only [`DocumentStoreError::NotFound`] is produced by the repository itself; every
//! other variant originates in a storage backend and reaches the caller untranslated.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use std::error::Error as StdError;
use thiserror::Error;

/// Boxed driver error carried verbatim by [`DocumentStoreError::Backend`].
pub type BoxedBackendError = Box<dyn StdError + Send + Sync + 'static>;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// No document matched the filter of a read or read-modify operation.
    /// The argument is the collection name.
    #[error("Document not found in collection {0}")]
    NotFound(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The document or update violates the store's structural rules.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A session was used in a way its transaction state does not allow.
    #[error("Transaction error: {0}")]
    Transaction(String),
    /// An error raised by the underlying storage driver, preserved as-is.
    ///
    /// Use [`std::error::Error::source`] or downcast the boxed value to reach the
    /// driver's own error type.
    #[error("Backend error: {0}")]
    Backend(#[source] BoxedBackendError),
}

impl DocumentStoreError {
    /// Wraps a driver error without altering it.
    pub fn backend(err: impl Into<BoxedBackendError>) -> Self {
        DocumentStoreError::Backend(err.into())
    }

    /// Returns `true` for the repository's uniform not-found signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentStoreError::NotFound(_))
    }

    /// Attempts to view a [`DocumentStoreError::Backend`] payload as a concrete driver error.
    pub fn downcast_backend<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            DocumentStoreError::Backend(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
