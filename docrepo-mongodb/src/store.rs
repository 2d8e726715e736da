use async_trait::async_trait;
use bson::{Document, doc};
use mongodb::{
    Client, ClientSession, Collection as MongoCollection,
    options::{ClientOptions, ReturnDocument as MongoReturnDocument},
};
use std::fmt;

use docrepo_core::{
    backend::{FindOneAndUpdateOptions, ReturnDocument, SaveOptions, StoreBackend, StoreBackendBuilder, StoreSession},
    error::{DocumentStoreError, DocumentStoreResult},
    query::Expr,
    update::Update,
};

use crate::query::MongoQueryTranslator;


#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

/// Renders an [`Update`] as an operator document.
///
/// An empty update becomes an empty `$set`, which MongoDB 5.0+ accepts as a no-op.
pub(crate) fn update_document(update: &Update) -> Document {
    if update.is_empty() {
        return doc! { "$set": {} };
    }

    update.to_document()
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    type Session = MongoDbSession;

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
        options: SaveOptions<'_, Self::Session>,
    ) -> DocumentStoreResult<Document> {
        let target = self.get_collection(collection);
        let insert = target
            .insert_one(&document)
            .bypass_document_validation(options.bypass_document_validation);

        let result = match options.session {
            Some(session) => insert
                .session(&mut session.inner)
                .await,
            None => insert.await,
        };
        result.map_err(DocumentStoreError::backend)?;

        Ok(document)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Expr,
    ) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(MongoQueryTranslator::translate(filter)?)
            .await
            .map_err(DocumentStoreError::backend)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Expr,
        update: &Update,
        options: FindOneAndUpdateOptions,
    ) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one_and_update(
                MongoQueryTranslator::translate(filter)?,
                update_document(update),
            )
            .upsert(options.upsert)
            .return_document(match options.return_document {
                ReturnDocument::Before => MongoReturnDocument::Before,
                ReturnDocument::After => MongoReturnDocument::After,
            })
            .await
            .map_err(DocumentStoreError::backend)
    }

    async fn start_session(&self) -> DocumentStoreResult<Self::Session> {
        Ok(MongoDbSession::new(
            self.client
                .start_session()
                .await
                .map_err(DocumentStoreError::backend)?,
        ))
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}


/// A MongoDB client session.
///
/// Dropping the session while a transaction is in progress makes the driver
/// abort that transaction.
pub struct MongoDbSession {
    inner: ClientSession,
    in_transaction: bool,
}

impl MongoDbSession {
    fn new(inner: ClientSession) -> Self {
        Self { inner, in_transaction: false }
    }

    /// The underlying driver session, for operations outside the repository.
    pub fn client_session(&mut self) -> &mut ClientSession {
        &mut self.inner
    }
}

impl fmt::Debug for MongoDbSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoDbSession")
            .field("id", &self.inner.id())
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

#[async_trait]
impl StoreSession for MongoDbSession {
    fn id(&self) -> String {
        self.inner.id().to_string()
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    async fn start_transaction(&mut self) -> DocumentStoreResult<()> {
        self.inner
            .start_transaction()
            .await
            .map_err(DocumentStoreError::backend)?;
        self.in_transaction = true;

        Ok(())
    }

    async fn commit_transaction(&mut self) -> DocumentStoreResult<()> {
        // The driver may leave the transaction open after a transient commit
        // failure, so the flag only clears on success.
        self.inner
            .commit_transaction()
            .await
            .map_err(DocumentStoreError::backend)?;
        self.in_transaction = false;

        Ok(())
    }

    async fn abort_transaction(&mut self) -> DocumentStoreResult<()> {
        let result = self.inner
            .abort_transaction()
            .await;
        self.in_transaction = false;

        result.map_err(DocumentStoreError::backend)
    }
}


/// Builds a [`MongoDbStore`] from a connection string.
///
/// # Example
///
/// ```ignore
/// use docrepo::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
///
/// let store = MongoDbStore::builder("mongodb://localhost:27017", "app")
///     .app_name("billing")
///     .build()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
    app_name: Option<String>,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            app_name: None,
        }
    }

    /// Name reported to the server in the connection handshake.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        if let Some(app_name) = self.app_name {
            options.app_name = Some(app_name);
        }

        Ok(MongoDbStore::new(
            Client::with_options(options)
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
