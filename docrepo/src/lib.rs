//! Main docrepo crate providing a generic repository over document stores.
//!
//! This crate is the primary entry point for users of the docrepo project.
//! It re-exports the core types and functionality from the sub-crates and
//! provides convenient access to the storage backends.
//!
//! # Features
//!
//! - **Generic repository** - `create`, `find_one`, `find_one_and_update`, `upsert` and
//!   transactions for any document type, with one not-found policy
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//! - **Composable filters and updates** - Typed filter expressions and update operators
//! - **Diagnostics** - Misses are logged through `tracing` with the offending filter
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "users")]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub email: String,
//!     pub name: String,
//! }
//!
//! #[derive(Serialize)]
//! pub struct NewUser<'a> {
//!     pub email: &'a str,
//!     pub name: &'a str,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.repository::<User>(TracingLogger::new("UsersRepository"));
//!
//!     // Insert with a generated identity
//!     let alice = users
//!         .create(&NewUser { email: "alice@example.com", name: "Alice" }, SaveOptions::default())
//!         .await?;
//!
//!     // Read it back, update it, or upsert by a natural key
//!     let found = users.find_one(&Filter::id(alice.id)).await?;
//!     let renamed = users
//!         .find_one_and_update(&Filter::id(alice.id), &Update::set("name", "Alicia"))
//!         .await?;
//!
//!     // A miss is an error, logged with its filter
//!     let missing = users.find_one(&Filter::eq("email", "nobody@example.com")).await;
//!     assert!(matches!(missing, Err(DocumentStoreError::NotFound(_))));
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Transactions
//!
//! ```ignore
//! let mut txn = users.start_transaction().await?;
//! users.create(&NewUser { email: "b@example.com", name: "B" }, txn.save_options()).await?;
//! txn.commit().await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docrepo;

pub mod prelude;

pub use docrepo_core::{
    backend, connection, document, error, logger, model, query, repository, store, transaction, update,
};
pub use docrepo_macros::Document;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docrepo_memory::{InMemoryStore, InMemoryStoreBuilder, InMemorySession};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docrepo_mongodb::{MongoDbStore, MongoDbStoreBuilder, MongoDbSession};
}
