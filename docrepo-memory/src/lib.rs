//! In-memory document storage backend for docrepo.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development
//! and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Insertion order** - "First match" is the earliest inserted matching document
//! - **MongoDB update semantics** - `$set`, `$unset`, `$inc`, `$push` and `$setOnInsert`
//! - **Transactions** - Session-scoped inserts that become visible on commit
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::prelude::*;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "users")]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub name: String,
//! }
//!
//! #[derive(Serialize)]
//! pub struct NewUser<'a> {
//!     pub name: &'a str,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let store = DocumentStore::new(backend);
//!     let users = store.repository::<User>(TracingLogger::new("UsersRepository"));
//!
//!     let alice = users.create(&NewUser { name: "Alice" }, SaveOptions::default()).await?;
//!     let found = users.find_one(&Filter::id(alice.id)).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_memory;

pub mod store;
pub mod session;
mod evaluator;
mod update;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
pub use session::InMemorySession;
