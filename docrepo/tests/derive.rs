use docrepo::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Document)]
struct Widget {
    #[serde(rename = "_id")]
    id: ObjectId,
}

#[derive(Debug, Clone, Serialize, Deserialize, Document)]
struct Status {
    #[serde(rename = "_id")]
    id: ObjectId,
}

#[derive(Debug, Clone, Serialize, Deserialize, Document)]
#[document(collection = "ledger_entries")]
struct Entry {
    #[document(id)]
    #[serde(rename = "_id")]
    key: ObjectId,
    #[allow(dead_code)]
    id: String,
}

#[test]
fn collection_defaults_to_the_lowercased_name_with_a_trailing_s() {
    assert_eq!(Widget::collection_name(), "widgets");
    assert_eq!(Status::collection_name(), "status");
}

#[test]
fn explicit_collection_and_marked_identity_win() {
    let key = ObjectId::new();
    let entry = Entry { key, id: "E-1".to_string() };

    assert_eq!(Entry::collection_name(), "ledger_entries");
    assert_eq!(entry.id(), &key);
}

#[test]
fn derived_documents_convert_through_bson() {
    let widget = Widget { id: ObjectId::new() };

    let bson = widget.to_bson().unwrap();
    assert_eq!(bson.get_object_id("_id").unwrap(), widget.id);
}
