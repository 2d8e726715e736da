//! A generic repository layer over BSON document stores.
//!
//! This crate is the core of the docrepo project and provides:
//!
//! - **Document traits** ([`document`]) - The identity contract every entity implements
//! - **Store backend abstraction** ([`backend`]) - Traits standing in for a store driver
//! - **Filters** ([`query`]) - Predicates selecting a single document
//! - **Updates** ([`update`]) - Field mutations for find-and-modify operations
//! - **Models and connections** ([`model`], [`connection`]) - The repository's injected collaborators
//! - **Repository** ([`repository`]) - Uniform create / find / update / upsert / transaction surface
//! - **Transactions** ([`transaction`]) - Guarded transaction scopes
//! - **Logging** ([`logger`]) - Not-found diagnostics
//! - **Document store** ([`store`]) - Convenience entry point over one backend
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
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
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_core;

pub mod backend;
pub mod connection;
pub mod document;
pub mod error;
pub mod logger;
pub mod model;
pub mod query;
pub mod repository;
pub mod store;
pub mod transaction;
pub mod update;
