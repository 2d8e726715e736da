//! Applies [`Update`] directives to stored documents.
//!
//! Semantics follow MongoDB's update operators for top-level fields. The target
//! document is mutated in place, so callers apply updates to a copy and only
//! commit it when every operation succeeded.

use bson::{Bson, Document};

use docrepo_core::{
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
    update::{Update, UpdateOp},
};

/// Whether an update runs against an existing document or seeds a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpdateMode {
    Modify,
    Insert,
}

pub(crate) fn apply_update(document: &mut Document, update: &Update, mode: UpdateMode) -> DocumentStoreResult<()> {
    let original_id = document.get(ID_FIELD).cloned();

    for op in update.ops() {
        match op {
            UpdateOp::Set(field, value) => {
                document.insert(field.clone(), value.clone());
            }
            UpdateOp::Unset(field) => {
                document.remove(field);
            }
            UpdateOp::Inc(field, amount) => {
                let incremented = match document.get(field) {
                    Some(current) => add(field, current, amount)?,
                    None => {
                        ensure_numeric(field, amount)?;
                        amount.clone()
                    }
                };
                document.insert(field.clone(), incremented);
            }
            UpdateOp::Push(field, value) => match document.get_mut(field) {
                Some(Bson::Array(items)) => items.push(value.clone()),
                Some(other) => {
                    return Err(DocumentStoreError::InvalidDocument(format!(
                        "The field '{field}' must be an array but is of type {:?}",
                        other.element_type()
                    )));
                }
                None => {
                    document.insert(field.clone(), Bson::Array(vec![value.clone()]));
                }
            },
            UpdateOp::SetOnInsert(field, value) => {
                if mode == UpdateMode::Insert {
                    document.insert(field.clone(), value.clone());
                }
            }
        }
    }

    if mode == UpdateMode::Modify && document.get(ID_FIELD) != original_id.as_ref() {
        return Err(DocumentStoreError::InvalidDocument(format!(
            "Performing an update on the path '{ID_FIELD}' would modify the immutable field '{ID_FIELD}'"
        )));
    }

    Ok(())
}

fn ensure_numeric(field: &str, value: &Bson) -> DocumentStoreResult<()> {
    match value {
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => Ok(()),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "Cannot increment '{field}' with non-numeric argument of type {:?}",
            other.element_type()
        ))),
    }
}

/// Numeric addition with MongoDB's type promotion: int32 widens to int64 on
/// overflow, int64 overflow is rejected, and any double operand yields a double.
fn add(field: &str, current: &Bson, amount: &Bson) -> DocumentStoreResult<Bson> {
    ensure_numeric(field, amount)?;

    let sum = match (current, amount) {
        (Bson::Int32(a), Bson::Int32(b)) => a
            .checked_add(*b)
            .map(Bson::Int32)
            .unwrap_or(Bson::Int64(*a as i64 + *b as i64)),
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            let (a, b) = (as_i64(current), as_i64(amount));
            a.checked_add(b)
                .map(Bson::Int64)
                .ok_or_else(|| DocumentStoreError::InvalidDocument(format!(
                    "Failed to apply $inc to '{field}': result overflows a 64-bit integer"
                )))?
        }
        (Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_), _) => {
            Bson::Double(as_f64(current) + as_f64(amount))
        }
        (other, _) => {
            return Err(DocumentStoreError::InvalidDocument(format!(
                "Cannot apply $inc to '{field}' of non-numeric type {:?}",
                other.element_type()
            )));
        }
    };

    Ok(sum)
}

fn as_i64(value: &Bson) -> i64 {
    match value {
        Bson::Int32(v) => *v as i64,
        Bson::Int64(v) => *v,
        Bson::Double(v) => *v as i64,
        _ => 0,
    }
}

fn as_f64(value: &Bson) -> f64 {
    match value {
        Bson::Int32(v) => *v as f64,
        Bson::Int64(v) => *v as f64,
        Bson::Double(v) => *v,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    #[test]
    fn set_and_unset_touch_only_named_fields() {
        let mut document = doc! { "_id": 1, "a": 1, "b": 2 };
        let update = Update::set("a", 10).and_set("c", "new").unset("b");

        apply_update(&mut document, &update, UpdateMode::Modify).unwrap();

        assert_eq!(document, doc! { "_id": 1, "a": 10, "c": "new" });
    }

    #[test]
    fn inc_promotes_numeric_types() {
        let mut document = doc! { "small": i32::MAX, "wide": 5_i64, "ratio": 1 };
        let update = Update::new()
            .inc("small", 1)
            .inc("wide", 2)
            .inc("ratio", 0.5)
            .inc("fresh", 3);

        apply_update(&mut document, &update, UpdateMode::Modify).unwrap();

        assert_eq!(document.get("small"), Some(&Bson::Int64(i32::MAX as i64 + 1)));
        assert_eq!(document.get("wide"), Some(&Bson::Int64(7)));
        assert_eq!(document.get("ratio"), Some(&Bson::Double(1.5)));
        assert_eq!(document.get("fresh"), Some(&Bson::Int32(3)));
    }

    #[test]
    fn inc_rejects_non_numeric_values() {
        let mut document = doc! { "name": "a" };

        let err = apply_update(&mut document, &Update::new().inc("name", 1), UpdateMode::Modify).unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));

        let err = apply_update(&mut document, &Update::new().inc("count", "x"), UpdateMode::Modify).unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    }

    #[test]
    fn inc_rejects_int64_overflow() {
        let mut document = doc! { "wide": i64::MAX };

        let err = apply_update(&mut document, &Update::new().inc("wide", 1), UpdateMode::Modify).unwrap_err();

        assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
        assert_eq!(document.get("wide"), Some(&Bson::Int64(i64::MAX)));
    }

    #[test]
    fn push_appends_or_creates_arrays() {
        let mut document = doc! { "tags": ["a"], "name": "n" };

        apply_update(&mut document, &Update::new().push("tags", "b").push("fresh", 1), UpdateMode::Modify).unwrap();
        assert_eq!(document.get_array("tags").unwrap(), &vec![Bson::from("a"), Bson::from("b")]);
        assert_eq!(document.get_array("fresh").unwrap(), &vec![Bson::Int32(1)]);

        let err = apply_update(&mut document, &Update::new().push("name", "x"), UpdateMode::Modify).unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    }

    #[test]
    fn set_on_insert_applies_only_when_inserting() {
        let update = Update::set("a", 1).set_on_insert("created", true);

        let mut existing = doc! {};
        apply_update(&mut existing, &update, UpdateMode::Modify).unwrap();
        assert!(!existing.contains_key("created"));

        let mut seeded = doc! {};
        apply_update(&mut seeded, &update, UpdateMode::Insert).unwrap();
        assert!(seeded.get_bool("created").unwrap());
    }

    #[test]
    fn modifying_the_identity_is_rejected() {
        let mut document = doc! { "_id": ObjectId::new() };

        let err = apply_update(&mut document, &Update::set("_id", ObjectId::new()), UpdateMode::Modify).unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    }
}
