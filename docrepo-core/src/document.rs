//! Core traits for document representation and serialization.
//!
//! This module provides the trait every stored entity implements, as well as
//! utilities for converting documents between BSON and JSON.

use bson::{
    Document as BsonDocument,
    de::deserialize_from_document,
    oid::ObjectId,
    ser::serialize_to_document,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::error::DocumentStoreResult;

/// Name of the identity field every stored document carries.
pub const ID_FIELD: &str = "_id";

/// Core trait that all documents handled by a repository must implement.
///
/// A document has an immutable, store-generated identity stored under [`ID_FIELD`]
/// and belongs to exactly one collection. Implementations are usually derived:
///
/// ```ignore
/// use docrepo::prelude::*;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize, Document)]
/// #[document(collection = "users")]
/// pub struct User {
///     #[serde(rename = "_id")]
///     pub id: ObjectId,
///     pub name: String,
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns a reference to this document's unique identifier.
    fn id(&self) -> &ObjectId;

    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;
}

/// Extension trait providing serialization utilities for documents.
///
/// Automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the value is not a map.
    fn to_bson(&self) -> DocumentStoreResult<BsonDocument>;

    /// Creates a document from a BSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_bson(document: BsonDocument) -> DocumentStoreResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a document from a JSON value.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> DocumentStoreResult<BsonDocument> {
        Ok(serialize_to_document(self)?)
    }

    fn from_bson(document: BsonDocument) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_document(document)?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// Serializes any value into a BSON document.
///
/// Used for the identity-less field sets passed to `create` and `upsert`.
pub fn to_fields<T: Serialize + ?Sized>(value: &T) -> DocumentStoreResult<BsonDocument> {
    Ok(serialize_to_document(value)?)
}
