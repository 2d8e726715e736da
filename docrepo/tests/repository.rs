use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bson::{doc, Document as BsonDocument};
use docrepo::{memory::InMemorySession, prelude::*};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
#[document(collection = "items")]
struct Item {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    count: Option<i32>,
}

#[derive(Debug, Serialize)]
struct NewItem<'a> {
    name: &'a str,
}

#[derive(Debug, Clone, Default)]
struct RecordingLogger {
    entries: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingLogger {
    fn entries(&self) -> Vec<(String, String)> {
        self.entries.lock().unwrap().clone()
    }
}

impl RepositoryLogger for RecordingLogger {
    fn warn(&self, message: &str, filter: &Expr) {
        self.entries
            .lock()
            .unwrap()
            .push((message.to_string(), filter.to_string()));
    }
}

fn repository() -> (Repository<Item, InMemoryStore>, InMemoryStore, RecordingLogger) {
    let store = InMemoryStore::new();
    let logger = RecordingLogger::default();
    let repository = Repository::new(
        Model::new(store.clone()),
        Connection::new(store.clone()),
        logger.clone(),
    );

    (repository, store, logger)
}

#[tokio::test]
async fn create_then_find_round_trips_with_a_fresh_identity() {
    let (items, store, logger) = repository();

    let created = items
        .create(&NewItem { name: "a" }, SaveOptions::default())
        .await
        .unwrap();
    assert_eq!(created.name, "a");
    assert_eq!(created.count, None);

    let found = items.find_one(&Filter::eq("name", "a")).await.unwrap();
    assert_eq!(found, created);

    let by_id = items.find_one(&Filter::id(created.id)).await.unwrap();
    assert_eq!(by_id, created);

    let err = items.find_one(&Filter::eq("name", "b")).await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::NotFound(ref collection) if collection == "items"));

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "document not found for filter");
    assert!(entries[0].1.contains("name"));
    assert!(entries[0].1.contains("\"b\""));

    assert_eq!(store.count_documents("items").await, 1);
}

#[tokio::test]
async fn create_generates_distinct_identities() {
    let (items, _, _) = repository();

    let fields = NewItem { name: "same" };

    let created = join_all((0..8).map(|_| items.create(&fields, SaveOptions::default())))
        .await
        .into_iter()
        .collect::<DocumentStoreResult<Vec<_>>>()
        .unwrap();

    let mut ids = created.iter().map(|item| item.id).collect::<Vec<_>>();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}

#[tokio::test]
async fn create_discards_a_supplied_identity() {
    let (items, _, _) = repository();
    let supplied = ObjectId::new();

    let created = items
        .create(&doc! { "_id": supplied, "name": "a" }, SaveOptions::default())
        .await
        .unwrap();

    assert_ne!(created.id, supplied);
    assert!(items.find_one(&Filter::id(supplied)).await.is_err());
}

#[tokio::test]
async fn find_one_and_update_applies_and_persists() {
    let (items, _, logger) = repository();
    let created = items.create(&NewItem { name: "a" }, SaveOptions::default()).await.unwrap();

    let updated = items
        .find_one_and_update(&Filter::id(created.id), &Update::set("name", "b").inc("count", 2))
        .await
        .unwrap();

    assert_eq!(updated, Item { id: created.id, name: "b".to_string(), count: Some(2) });
    assert_eq!(items.find_one(&Filter::id(created.id)).await.unwrap(), updated);
    assert!(logger.entries().is_empty());
}

#[tokio::test]
async fn find_one_and_update_miss_changes_nothing() {
    let (items, store, logger) = repository();
    let created = items.create(&NewItem { name: "a" }, SaveOptions::default()).await.unwrap();

    let err = items
        .find_one_and_update(&Filter::eq("name", "zzz"), &Update::set("name", "b"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(logger.entries().len(), 1);
    assert_eq!(store.count_documents("items").await, 1);
    assert_eq!(items.find_one(&Filter::id(created.id)).await.unwrap(), created);
}

#[tokio::test]
async fn upsert_updates_an_existing_document_in_place() {
    let (items, store, _) = repository();
    let created = items.create(&NewItem { name: "a" }, SaveOptions::default()).await.unwrap();

    let upserted = items
        .upsert(&Filter::eq("name", "a"), &doc! { "count": 1 })
        .await
        .unwrap();

    assert_eq!(upserted, Item { id: created.id, name: "a".to_string(), count: Some(1) });
    assert_eq!(store.count_documents("items").await, 1);
}

#[tokio::test]
async fn upsert_inserts_the_union_of_filter_and_fields() {
    let (items, store, logger) = repository();

    let upserted = items
        .upsert(&Filter::eq("name", "fresh"), &doc! { "count": 5 })
        .await
        .unwrap();

    assert_eq!(upserted.name, "fresh");
    assert_eq!(upserted.count, Some(5));
    assert_eq!(store.count_documents("items").await, 1);
    assert_eq!(items.find_one(&Filter::id(upserted.id)).await.unwrap(), upserted);
    assert!(logger.entries().is_empty());
}

/// In-memory backend whose upserts report no document, as a misbehaving driver might.
#[derive(Debug, Clone, Default)]
struct LossyUpsertStore {
    inner: InMemoryStore,
}

#[async_trait]
impl StoreBackend for LossyUpsertStore {
    type Session = InMemorySession;

    async fn insert_one(
        &self,
        collection: &str,
        document: BsonDocument,
        options: SaveOptions<'_, Self::Session>,
    ) -> DocumentStoreResult<BsonDocument> {
        self.inner.insert_one(collection, document, options).await
    }

    async fn find_one(&self, collection: &str, filter: &Expr) -> DocumentStoreResult<Option<BsonDocument>> {
        self.inner.find_one(collection, filter).await
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Expr,
        update: &Update,
        options: FindOneAndUpdateOptions,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        if options.upsert {
            return Ok(None);
        }

        self.inner.find_one_and_update(collection, filter, update, options).await
    }

    async fn start_session(&self) -> DocumentStoreResult<Self::Session> {
        self.inner.start_session().await
    }
}

#[tokio::test]
async fn upsert_reports_a_backend_that_returns_nothing_as_not_found() {
    let store = LossyUpsertStore::default();
    let logger = RecordingLogger::default();
    let items: Repository<Item, LossyUpsertStore> = Repository::new(
        Model::new(store.clone()),
        Connection::new(store.clone()),
        logger.clone(),
    );

    let err = items
        .upsert(&Filter::eq("name", "ghost"), &doc! { "count": 1 })
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::NotFound(ref collection) if collection == "items"));

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "document not found for filter");
    assert!(entries[0].1.contains("name"));
    assert!(entries[0].1.contains("\"ghost\""));
}

#[tokio::test]
async fn store_failures_propagate_without_logging() {
    let (items, _, logger) = repository();
    let created = items.create(&NewItem { name: "a" }, SaveOptions::default()).await.unwrap();

    let err = items
        .find_one_and_update(&Filter::id(created.id), &Update::new().inc("name", 1))
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    assert!(logger.entries().is_empty());
}

#[tokio::test]
async fn committed_transactions_persist_their_inserts() {
    let (items, store, _) = repository();

    let mut txn = items.start_transaction().await.unwrap();
    assert!(txn.is_active());

    let created = items.create(&NewItem { name: "t" }, txn.save_options()).await.unwrap();
    assert!(items.find_one(&Filter::id(created.id)).await.is_err());

    txn.commit().await.unwrap();

    assert_eq!(items.find_one(&Filter::id(created.id)).await.unwrap(), created);
    assert_eq!(store.open_sessions(), 0);
}

#[tokio::test]
async fn aborted_and_dropped_transactions_discard_their_inserts() {
    let (items, store, _) = repository();

    let mut aborted = items.start_transaction().await.unwrap();
    items.create(&NewItem { name: "x" }, aborted.save_options()).await.unwrap();
    aborted.abort().await.unwrap();

    {
        let mut dropped = items.start_transaction().await.unwrap();
        items.create(&NewItem { name: "y" }, dropped.save_options()).await.unwrap();
        assert_eq!(dropped.session_mut().staged_writes(), 1);
    }

    assert_eq!(store.count_documents("items").await, 0);
    assert_eq!(store.open_sessions(), 0);
}

#[tokio::test]
async fn with_transaction_commits_on_success() {
    let (items, store, _) = repository();
    let scoped = items.clone();

    let created = items
        .with_transaction(move |txn| Box::pin(async move {
            let first = scoped.create(&NewItem { name: "one" }, txn.save_options()).await?;
            scoped.create(&NewItem { name: "two" }, txn.save_options()).await?;
            Ok(first)
        }))
        .await
        .unwrap();

    assert_eq!(store.count_documents("items").await, 2);
    assert_eq!(items.find_one(&Filter::eq("name", "one")).await.unwrap(), created);
    assert_eq!(store.open_sessions(), 0);
}

#[tokio::test]
async fn with_transaction_aborts_and_returns_the_scope_error() {
    let (items, store, logger) = repository();
    let scoped = items.clone();

    let err = items
        .with_transaction(move |txn| Box::pin(async move {
            scoped.create(&NewItem { name: "one" }, txn.save_options()).await?;
            scoped.find_one(&Filter::eq("name", "missing")).await
        }))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(logger.entries().len(), 1);
    assert_eq!(store.count_documents("items").await, 0);
    assert_eq!(store.open_sessions(), 0);
}

/// A concrete entity repository composing the generic one with its own logger.
struct ItemsRepository {
    inner: Repository<Item, InMemoryStore>,
}

impl ItemsRepository {
    fn new(store: &DocumentStore<InMemoryStore>) -> Self {
        Self { inner: store.repository::<Item>(TracingLogger::new("ItemsRepository")) }
    }

    async fn by_name(&self, name: &str) -> DocumentStoreResult<Item> {
        self.inner.find_one(&Filter::eq("name", name)).await
    }

    async fn bump(&self, name: &str) -> DocumentStoreResult<Item> {
        self.inner
            .find_one_and_update(&Filter::eq("name", name), &Update::new().inc("count", 1))
            .await
    }
}

#[tokio::test]
async fn entity_repositories_compose_the_generic_core() {
    let store = DocumentStore::new(InMemoryStore::builder().build().await.unwrap());
    let items = ItemsRepository::new(&store);

    items.inner.create(&NewItem { name: "widget" }, SaveOptions::default()).await.unwrap();
    items.bump("widget").await.unwrap();
    let bumped = items.bump("widget").await.unwrap();

    assert_eq!(bumped.count, Some(2));
    assert_eq!(items.by_name("widget").await.unwrap(), bumped);
    assert!(items.by_name("gadget").await.unwrap_err().is_not_found());
    assert_eq!(items.inner.model().name(), "items");

    store.shutdown().await.unwrap();
}
