//! Guarded transaction scopes.
//!
//! [`Transaction`] owns a [`StoreSession`] with a transaction in progress. It is
//! finished exactly once, by [`Transaction::commit`] or [`Transaction::abort`],
//! both of which consume the guard and release the session. A guard dropped
//! without being finished releases its session, and the backend discards the
//! transaction's writes.
//!
//! ```ignore
//! let mut txn = repository.start_transaction().await?;
//! repository
//!     .create(new_user, SaveOptions::default().session(txn.session_mut()))
//!     .await?;
//! txn.commit().await?;
//! ```

use crate::{
    backend::{SaveOptions, StoreSession},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// A session with an in-progress transaction, owned by the caller.
#[derive(Debug)]
#[must_use = "a transaction must be committed or aborted"]
pub struct Transaction<S: StoreSession> {
    session: S,
}

impl<S: StoreSession> Transaction<S> {
    /// Begins a transaction on the session and takes ownership of it.
    pub async fn begin(mut session: S) -> DocumentStoreResult<Self> {
        session.start_transaction().await?;

        Ok(Self { session })
    }

    /// Identifier of the underlying session.
    pub fn id(&self) -> String {
        self.session.id()
    }

    /// Whether the transaction is still open on the session.
    pub fn is_active(&self) -> bool {
        self.session.in_transaction()
    }

    /// The session operations must run in to join this transaction.
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Save options bound to this transaction's session.
    pub fn save_options(&mut self) -> SaveOptions<'_, S> {
        SaveOptions::default().session(&mut self.session)
    }

    /// Commits the transaction and releases the session.
    ///
    /// # Errors
    ///
    /// Driver errors propagate unchanged. The session is released either way.
    pub async fn commit(mut self) -> DocumentStoreResult<()> {
        self.ensure_active()?;
        self.session.commit_transaction().await
    }

    /// Aborts the transaction and releases the session.
    pub async fn abort(mut self) -> DocumentStoreResult<()> {
        self.ensure_active()?;
        self.session.abort_transaction().await
    }

    /// Hands the raw session back to the caller, who then owns its lifecycle.
    pub fn into_session(self) -> S {
        self.session
    }

    fn ensure_active(&self) -> DocumentStoreResult<()> {
        if !self.session.in_transaction() {
            return Err(DocumentStoreError::Transaction(format!(
                "session {} has no transaction in progress",
                self.session.id(),
            )));
        }

        Ok(())
    }
}
