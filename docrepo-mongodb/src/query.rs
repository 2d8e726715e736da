//! Query translation from docrepo filters to MongoDB query syntax.
//!
//! This module translates docrepo's filter expressions into MongoDB BSON
//! documents for execution by the MongoDB query engine. String operators are
//! compiled to anchored, escaped regular expressions so they behave like the
//! in-memory backend (case-sensitive, literal text).

use bson::{Document, Bson, doc};

use docrepo_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::{DocumentStoreError, DocumentStoreResult},
};


/// Translates docrepo filter expressions into MongoDB query documents.
///
/// This struct implements the [`QueryVisitor`] trait to convert abstract
/// filter expressions into MongoDB's native BSON query syntax.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    pub fn translate(expr: &Expr) -> DocumentStoreResult<Document> {
        MongoQueryTranslator.visit_expr(expr)
    }
}

fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for ch in text.chars() {
        if "\\^$.|?*+()[]{}".contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

fn string_operand<'a>(op: &FieldOp, value: &'a Bson) -> DocumentStoreResult<&'a str> {
    match value {
        Bson::String(s) => Ok(s),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "{} operator requires a string value, got {:?}",
            op.operator(),
            other.element_type()
        ))),
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    // MongoDB rejects empty `$and`/`$or` arrays. An empty conjunction matches
    // every document and an empty disjunction matches none.
    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(Document::new());
        }

        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! { "$expr": false });
        }

        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    // `$not` only applies to a single field's operator expression; `$nor` negates
    // a whole clause.
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::Contains => match value {
                    Bson::String(s) => doc! { "$regex": escape_regex(s) },
                    Bson::Array(arr) => doc! { "$all": arr },
                    other => doc! { "$eq": other },
                },
                FieldOp::NotContains => match value {
                    Bson::String(s) => doc! { "$not": { "$regex": escape_regex(s) } },
                    Bson::Array(arr) => doc! { "$nin": arr },
                    other => doc! { "$ne": other },
                },
                FieldOp::StartsWith => doc! { "$regex": format!("^{}", escape_regex(string_operand(op, value)?)) },
                FieldOp::EndsWith => doc! { "$regex": format!("{}$", escape_regex(string_operand(op, value)?)) },
                FieldOp::AnyOf => match value {
                    Bson::Array(arr) => doc! { "$in": arr },
                    other => doc! { "$in": [other] },
                },
                FieldOp::NoneOf => match value {
                    Bson::Array(arr) => doc! { "$nin": arr },
                    other => doc! { "$nin": [other] },
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use docrepo_core::query::Filter;

    #[test]
    fn equality_and_identity_filters() {
        let id = ObjectId::new();

        assert_eq!(
            MongoQueryTranslator::translate(&Filter::id(id)).unwrap(),
            doc! { "_id": { "$eq": id } },
        );
        assert_eq!(
            MongoQueryTranslator::translate(&Filter::eq("email", "a@x.io").and(Filter::gte("age", 18))).unwrap(),
            doc! { "$and": [
                { "email": { "$eq": "a@x.io" } },
                { "age": { "$gte": 18 } },
            ] },
        );
    }

    #[test]
    fn empty_conjunctions_match_everything() {
        assert_eq!(
            MongoQueryTranslator::translate(&Filter::matching(doc! {})).unwrap(),
            doc! {},
        );
        assert_eq!(
            MongoQueryTranslator::translate(&Filter::and([])).unwrap(),
            doc! {},
        );
        assert_eq!(
            MongoQueryTranslator::translate(&Filter::or([])).unwrap(),
            doc! { "$expr": false },
        );
    }

    #[test]
    fn negation_uses_nor() {
        assert_eq!(
            MongoQueryTranslator::translate(&Filter::eq("status", "closed").not()).unwrap(),
            doc! { "$nor": [{ "status": { "$eq": "closed" } }] },
        );
    }

    #[test]
    fn string_operators_escape_their_operand() {
        assert_eq!(
            MongoQueryTranslator::translate(&Filter::starts_with("name", "a.b")).unwrap(),
            doc! { "name": { "$regex": "^a\\.b" } },
        );
        assert_eq!(
            MongoQueryTranslator::translate(&Filter::contains("name", "(x)")).unwrap(),
            doc! { "name": { "$regex": "\\(x\\)" } },
        );
    }

    #[test]
    fn string_operators_reject_other_values() {
        let err = MongoQueryTranslator::translate(&Filter::ends_with("n", 5)).unwrap_err();

        assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    }

    #[test]
    fn membership_accepts_scalars() {
        assert_eq!(
            MongoQueryTranslator::translate(&Filter::any_of("status", "open")).unwrap(),
            doc! { "status": { "$in": ["open"] } },
        );
        assert_eq!(
            MongoQueryTranslator::translate(&Filter::none_of("status", vec!["a", "b"])).unwrap(),
            doc! { "status": { "$nin": ["a", "b"] } },
        );
    }
}
