//! The generic repository.
//!
//! [`Repository`] gives any [`Document`] type a uniform create / find / update /
//! upsert / transaction surface. It composes three injected collaborators: a
//! [`Model`] bound to the entity's collection, a [`Connection`] for sessions, and
//! a [`RepositoryLogger`]. Concrete entity repositories wrap it rather than
//! re-implementing persistence:
//!
//! ```ignore
//! use docrepo::prelude::*;
//!
//! pub struct UsersRepository(Repository<User, InMemoryStore>);
//!
//! impl UsersRepository {
//!     pub fn new(store: InMemoryStore) -> Self {
//!         Self(Repository::new(
//!             Model::new(store.clone()),
//!             Connection::new(store),
//!             TracingLogger::new("UsersRepository"),
//!         ))
//!     }
//!
//!     pub async fn by_email(&self, email: &str) -> DocumentStoreResult<User> {
//!         self.0.find_one(&Filter::eq("email", email)).await
//!     }
//! }
//! ```
//!
//! Every read-modify operation shares one not-found policy: when nothing matches,
//! the filter is logged at warning level and [`DocumentStoreError::NotFound`] is
//! returned. All other failures come straight from the backend.

use bson::oid::ObjectId;
use futures::future::BoxFuture;
use serde::Serialize;
use std::{fmt, sync::Arc};

use crate::{
    backend::{FindOneAndUpdateOptions, SaveOptions, StoreBackend},
    connection::Connection,
    document::{Document, ID_FIELD, to_fields},
    error::{DocumentStoreError, DocumentStoreResult},
    logger::{NOT_FOUND_MESSAGE, RepositoryLogger},
    model::Model,
    query::Expr,
    transaction::Transaction,
    update::Update,
};

/// Uniform persistence operations for one document type.
pub struct Repository<D: Document, B: StoreBackend> {
    model: Model<D, B>,
    connection: Connection<B>,
    logger: Arc<dyn RepositoryLogger>,
}

impl<D: Document, B: StoreBackend> Repository<D, B> {
    pub fn new(
        model: Model<D, B>,
        connection: Connection<B>,
        logger: impl RepositoryLogger + 'static,
    ) -> Self {
        Self::with_shared_logger(model, connection, Arc::new(logger))
    }

    /// Like [`Repository::new`], for a logger shared between repositories.
    pub fn with_shared_logger(
        model: Model<D, B>,
        connection: Connection<B>,
        logger: Arc<dyn RepositoryLogger>,
    ) -> Self {
        Self { model, connection, logger }
    }

    pub fn model(&self) -> &Model<D, B> {
        &self.model
    }

    pub fn connection(&self) -> &Connection<B> {
        &self.connection
    }

    /// Persists a new document and returns the stored snapshot.
    ///
    /// `fields` is the document without its identity. Any `_id` it serializes is
    /// discarded; a fresh identity is generated for every call. No uniqueness
    /// check is made beyond what the store enforces.
    ///
    /// # Errors
    ///
    /// Serialization failures, and any store failure (validation, duplicate key,
    /// connectivity) unchanged.
    pub async fn create<T>(&self, fields: &T, options: SaveOptions<'_, B::Session>) -> DocumentStoreResult<D>
    where
        T: Serialize + Sync + ?Sized,
    {
        let mut record = to_fields(fields)?;
        record.remove(ID_FIELD);
        record.insert(ID_FIELD, ObjectId::new());

        self.model
            .insert_one(record, options)
            .await
    }

    /// Returns the first document matching `filter`.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::NotFound`] when nothing matches, after logging the filter.
    pub async fn find_one(&self, filter: &Expr) -> DocumentStoreResult<D> {
        let document = self.model
            .find_one(filter)
            .await?;

        self.found(document, filter)
    }

    /// Atomically applies `update` to the first matching document and returns the
    /// post-update snapshot.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::NotFound`] when nothing matches; the store is untouched.
    pub async fn find_one_and_update(&self, filter: &Expr, update: &Update) -> DocumentStoreResult<D> {
        let document = self.model
            .find_one_and_update(filter, update, FindOneAndUpdateOptions::update())
            .await?;

        self.found(document, filter)
    }

    /// Sets `fields` on the first matching document, or inserts a document built
    /// from the filter's equality constraints and `fields`. Returns the
    /// post-operation snapshot.
    pub async fn upsert<T>(&self, filter: &Expr, fields: &T) -> DocumentStoreResult<D>
    where
        T: Serialize + Sync + ?Sized,
    {
        let update = Update::from_fields(to_fields(fields)?);
        let document = self.model
            .find_one_and_update(filter, &update, FindOneAndUpdateOptions::upsert())
            .await?;

        // An upserting find-and-modify always yields a document; a miss here means
        // the backend broke that contract, and is reported like any other miss.
        self.found(document, filter)
    }

    /// Opens a session and begins a transaction on it.
    ///
    /// The caller owns the returned guard and must commit or abort it. Dropping it
    /// unfinished releases the session and the store discards its writes.
    pub async fn start_transaction(&self) -> DocumentStoreResult<Transaction<B::Session>> {
        self.connection.start_transaction().await
    }

    /// Runs `scope` inside a transaction, committing when it returns `Ok` and
    /// aborting when it returns `Err`. The session is released on every path.
    ///
    /// ```ignore
    /// let users = repository.clone();
    /// repository
    ///     .with_transaction(move |txn| Box::pin(async move {
    ///         users.create(&NewUser { name: "a" }, txn.save_options()).await
    ///     }))
    ///     .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// The scope's error, or a start or commit failure. When the scope fails and the
    /// abort fails too, the scope's error is returned and the abort failure is
    /// logged at warning level.
    pub async fn with_transaction<R, F>(&self, scope: F) -> DocumentStoreResult<R>
    where
        R: Send,
        F: for<'t> FnOnce(&'t mut Transaction<B::Session>) -> BoxFuture<'t, DocumentStoreResult<R>> + Send,
    {
        let mut transaction = self.start_transaction().await?;

        match scope(&mut transaction).await {
            Ok(value) => {
                transaction.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if transaction.is_active() {
                    let id = transaction.id();
                    if let Err(abort_err) = transaction.abort().await {
                        tracing::warn!(
                            target: "docrepo",
                            transaction = %id,
                            error = %abort_err,
                            "failed to abort transaction",
                        );
                    }
                }
                Err(err)
            }
        }
    }

    fn found(&self, document: Option<D>, filter: &Expr) -> DocumentStoreResult<D> {
        document.ok_or_else(|| {
            self.logger.warn(NOT_FOUND_MESSAGE, filter);
            DocumentStoreError::NotFound(self.model.name().to_string())
        })
    }
}

impl<D: Document, B: StoreBackend + Clone> Clone for Repository<D, B> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            connection: self.connection.clone(),
            logger: self.logger.clone(),
        }
    }
}

impl<D: Document, B: StoreBackend> fmt::Debug for Repository<D, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("model", &self.model)
            .field("logger", &self.logger)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bson::Document as BsonDocument;
    use serde::Deserialize;
    use std::{
        io,
        sync::Mutex,
    };

    use crate::backend::StoreSession;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        #[serde(rename = "_id")]
        id: ObjectId,
    }

    impl Document for Note {
        fn id(&self) -> &ObjectId {
            &self.id
        }

        fn collection_name() -> &'static str {
            "notes"
        }
    }

    #[derive(Debug, Default)]
    struct StuckSession {
        in_transaction: bool,
    }

    #[async_trait]
    impl StoreSession for StuckSession {
        fn id(&self) -> String {
            "stuck".to_string()
        }

        fn in_transaction(&self) -> bool {
            self.in_transaction
        }

        async fn start_transaction(&mut self) -> DocumentStoreResult<()> {
            self.in_transaction = true;
            Ok(())
        }

        async fn commit_transaction(&mut self) -> DocumentStoreResult<()> {
            self.in_transaction = false;
            Ok(())
        }

        async fn abort_transaction(&mut self) -> DocumentStoreResult<()> {
            Err(DocumentStoreError::Transaction("connection reset".to_string()))
        }
    }

    /// Backend whose sessions cannot abort; nothing else is ever called.
    #[derive(Debug, Clone)]
    struct StuckBackend;

    #[async_trait]
    impl StoreBackend for StuckBackend {
        type Session = StuckSession;

        async fn insert_one(
            &self,
            _collection: &str,
            document: BsonDocument,
            _options: SaveOptions<'_, Self::Session>,
        ) -> DocumentStoreResult<BsonDocument> {
            Ok(document)
        }

        async fn find_one(&self, _collection: &str, _filter: &Expr) -> DocumentStoreResult<Option<BsonDocument>> {
            Ok(None)
        }

        async fn find_one_and_update(
            &self,
            _collection: &str,
            _filter: &Expr,
            _update: &Update,
            _options: FindOneAndUpdateOptions,
        ) -> DocumentStoreResult<Option<BsonDocument>> {
            Ok(None)
        }

        async fn start_session(&self) -> DocumentStoreResult<Self::Session> {
            Ok(StuckSession::default())
        }
    }

    #[derive(Debug)]
    struct Silent;

    impl RepositoryLogger for Silent {
        fn warn(&self, _message: &str, _filter: &Expr) {}
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_aborts_are_logged_and_the_scope_error_returned() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let notes: Repository<Note, StuckBackend> = Repository::new(
            Model::new(StuckBackend),
            Connection::new(StuckBackend),
            Silent,
        );

        let err = notes
            .with_transaction(|_| Box::pin(async {
                Err::<(), _>(DocumentStoreError::InvalidDocument("rejected".to_string()))
            }))
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::InvalidDocument(ref reason) if reason == "rejected"));

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("failed to abort transaction"));
        assert!(output.contains("transaction=stuck"));
        assert!(output.contains("connection reset"));
    }
}
