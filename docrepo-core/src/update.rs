//! Update directives applied by find-and-modify operations.
//!
//! An [`Update`] is an ordered list of field mutations. Backends translate it to
//! their native form (MongoDB operator documents) or apply it directly (the
//! in-memory store), so the semantics below follow MongoDB's update operators.
//!
//! ```ignore
//! use docrepo::update::Update;
//!
//! let update = Update::set("status", "active").inc("logins", 1);
//! ```

use bson::{Bson, Document as BsonDocument};
use std::fmt;

/// A single field mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Sets the field to the value, creating it when missing (`$set`).
    Set(String, Bson),
    /// Removes the field (`$unset`).
    Unset(String),
    /// Adds a numeric amount to the field; a missing field is set to the amount (`$inc`).
    Inc(String, Bson),
    /// Appends the value to an array field; a missing field becomes a one-element array (`$push`).
    Push(String, Bson),
    /// Sets the field only when the operation inserts a new document (`$setOnInsert`).
    SetOnInsert(String, Bson),
}

impl UpdateOp {
    /// The MongoDB operator this mutation corresponds to.
    pub fn operator(&self) -> &'static str {
        match self {
            UpdateOp::Set(..) => "$set",
            UpdateOp::Unset(..) => "$unset",
            UpdateOp::Inc(..) => "$inc",
            UpdateOp::Push(..) => "$push",
            UpdateOp::SetOnInsert(..) => "$setOnInsert",
        }
    }

    /// The field this mutation targets.
    pub fn field(&self) -> &str {
        match self {
            UpdateOp::Set(field, _)
            | UpdateOp::Unset(field)
            | UpdateOp::Inc(field, _)
            | UpdateOp::Push(field, _)
            | UpdateOp::SetOnInsert(field, _) => field,
        }
    }
}

/// An ordered set of field mutations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a `$set` update from every field of a partial document.
    pub fn from_fields(fields: BsonDocument) -> Self {
        Self {
            ops: fields
                .into_iter()
                .map(|(field, value)| UpdateOp::Set(field, value))
                .collect(),
        }
    }

    /// Starts an update with a `$set` mutation.
    pub fn set(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new().and_set(field, value)
    }

    /// Appends a `$set` mutation.
    pub fn and_set(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push_op(UpdateOp::Set(field.into(), value.into()))
    }

    /// Appends an `$unset` mutation.
    pub fn unset(self, field: impl Into<String>) -> Self {
        self.push_op(UpdateOp::Unset(field.into()))
    }

    /// Appends an `$inc` mutation.
    pub fn inc(self, field: impl Into<String>, amount: impl Into<Bson>) -> Self {
        self.push_op(UpdateOp::Inc(field.into(), amount.into()))
    }

    /// Appends a `$push` mutation.
    pub fn push(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push_op(UpdateOp::Push(field.into(), value.into()))
    }

    /// Appends a `$setOnInsert` mutation.
    pub fn set_on_insert(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push_op(UpdateOp::SetOnInsert(field.into(), value.into()))
    }

    /// Appends an arbitrary mutation.
    pub fn push_op(mut self, op: UpdateOp) -> Self {
        self.ops.push(op);
        self
    }

    /// The mutations in application order.
    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Groups the mutations into a MongoDB update document.
    ///
    /// Later mutations of the same operator and field overwrite earlier ones, as
    /// they would in a hand-written operator document.
    pub fn to_document(&self) -> BsonDocument {
        let mut grouped = BsonDocument::new();

        for op in &self.ops {
            let value = match op {
                UpdateOp::Unset(_) => Bson::String(String::new()),
                UpdateOp::Set(_, value)
                | UpdateOp::Inc(_, value)
                | UpdateOp::Push(_, value)
                | UpdateOp::SetOnInsert(_, value) => value.clone(),
            };

            match grouped.get_mut(op.operator()) {
                Some(Bson::Document(fields)) => {
                    fields.insert(op.field().to_string(), value);
                }
                _ => {
                    let mut fields = BsonDocument::new();
                    fields.insert(op.field().to_string(), value);
                    grouped.insert(op.operator(), fields);
                }
            }
        }

        grouped
    }
}

impl From<BsonDocument> for Update {
    fn from(fields: BsonDocument) -> Self {
        Update::from_fields(fields)
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_document())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn from_fields_sets_every_field() {
        let update = Update::from_fields(doc! { "name": "a", "count": 1 });

        assert_eq!(
            update.ops(),
            &[
                UpdateOp::Set("name".into(), Bson::from("a")),
                UpdateOp::Set("count".into(), Bson::Int32(1)),
            ],
        );
    }

    #[test]
    fn to_document_groups_by_operator() {
        let update = Update::set("name", "a")
            .inc("count", 2)
            .and_set("kind", "b")
            .unset("legacy")
            .push("tags", "x")
            .set_on_insert("created", true);

        assert_eq!(
            update.to_document(),
            doc! {
                "$set": { "name": "a", "kind": "b" },
                "$inc": { "count": 2 },
                "$unset": { "legacy": "" },
                "$push": { "tags": "x" },
                "$setOnInsert": { "created": true },
            },
        );
    }

    #[test]
    fn empty_update_renders_empty_document() {
        assert!(Update::new().is_empty());
        assert!(Update::new().to_document().is_empty());
    }
}
