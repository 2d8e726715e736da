//! Filter evaluation for in-memory documents.
//!
//! This module decides whether a stored BSON document satisfies a filter
//! expression, mirroring MongoDB's comparison rules closely enough for tests
//! and development use.

use std::{collections::HashMap, cmp::Ordering};
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docrepo_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::{DocumentStoreError, DocumentStoreResult},
};


/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to `f64`. BSON types with no ordering of their
/// own (binary, regex, code, ...) collapse to `Unsupported`, which equals nothing.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    /// All integers and floats normalized to f64
    Number(f64),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    Unsupported,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Unsupported,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Position of the first document matching `expr`, in storage order.
    pub fn position(
        documents: &[Document],
        expr: &Expr,
    ) -> DocumentStoreResult<Option<usize>> {
        for (index, document) in documents.iter().enumerate() {
            if DocumentEvaluator::new(document).evaluate(expr)? {
                return Ok(Some(index));
            }
        }

        Ok(None)
    }
}

fn contains_value(array: &[Comparable<'_>], value: &Comparable<'_>) -> bool {
    array.iter().any(|item| item == value)
}

/// Mongo's `$eq`: an array field also matches when one of its elements equals
/// a non-array value.
fn equals(field: &Comparable<'_>, value: &Comparable<'_>) -> bool {
    match (field, value) {
        (Comparable::Array(array), other) if !matches!(other, Comparable::Array(_)) => contains_value(array, other),
        _ => field == value,
    }
}

/// Mongo's `$in`: a scalar field matches when it equals any listed value, an
/// array field when any of its elements does.
fn any_of(field: &Comparable<'_>, values: &Comparable<'_>) -> bool {
    match values {
        Comparable::Array(values) => values
            .iter()
            .any(|val| equals(field, val)),
        single_value => equals(field, single_value),
    }
}

/// Mongo's `$all`: every listed value must match the field. An empty list
/// matches nothing.
fn all_of(field: &Comparable<'_>, values: &[Comparable<'_>]) -> bool {
    !values.is_empty() && values.iter().all(|val| equals(field, val))
}

/// Substring match against a string field, or against any string element of
/// an array field, as an unanchored `$regex` does.
fn contains_text(field: &Comparable<'_>, needle: &str) -> bool {
    match field {
        Comparable::String(haystack) => haystack.contains(needle),
        Comparable::Array(array) => array.iter().any(|item| contains_text(item, needle)),
        _ => false,
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(self.document.contains_key(field) == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        // A missing field compares as null, as it does in a MongoDB query.
        let left = self.document
            .get(field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);
        let right = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => equals(&left, &right),
            FieldOp::Ne => !equals(&left, &right),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => match left.partial_cmp(&right) {
                Some(ordering) => match op {
                    FieldOp::Gt => ordering == Ordering::Greater,
                    FieldOp::Gte => ordering != Ordering::Less,
                    FieldOp::Lt => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                },
                None => false,
            },
            FieldOp::Contains => match &right {
                Comparable::String(needle) => contains_text(&left, needle),
                Comparable::Array(values) => all_of(&left, values),
                other => equals(&left, other),
            },
            FieldOp::NotContains => match &right {
                Comparable::String(needle) => !contains_text(&left, needle),
                Comparable::Array(_) => !any_of(&left, &right),
                other => !equals(&left, other),
            },
            FieldOp::StartsWith => match (&left, &right) {
                (Comparable::String(text), Comparable::String(prefix)) => text.starts_with(prefix),
                _ => false,
            },
            FieldOp::EndsWith => match (&left, &right) {
                (Comparable::String(text), Comparable::String(suffix)) => text.ends_with(suffix),
                _ => false,
            },
            FieldOp::AnyOf => any_of(&left, &right),
            FieldOp::NoneOf => !any_of(&left, &right),
        })
    }
}
