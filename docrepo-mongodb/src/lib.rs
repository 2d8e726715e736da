//! MongoDB backend implementation for docrepo.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Filters are translated to MongoDB query documents, updates to operator
//! documents, and sessions wrap the driver's `ClientSession`, so transactions are
//! real server-side transactions (they require a replica set or sharded cluster).
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docrepo = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! Driver errors are passed through unchanged inside
//! `DocumentStoreError::Backend`; use `downcast_backend::<mongodb::error::Error>()`
//! to inspect them.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "my_database")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_mongodb;

pub mod store;
mod query;

pub use store::{MongoDbStore, MongoDbStoreBuilder, MongoDbSession};
