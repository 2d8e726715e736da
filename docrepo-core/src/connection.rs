//! Store connection handle.
//!
//! A [`Connection`] wraps a backend purely for session management: it never
//! issues queries itself.

use crate::{
    backend::StoreBackend,
    error::DocumentStoreResult,
    transaction::Transaction,
};

/// Handle used to spawn sessions and transactions on a store.
#[derive(Debug, Clone)]
pub struct Connection<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> Connection<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Opens a bare session; the caller manages any transaction on it.
    pub async fn start_session(&self) -> DocumentStoreResult<B::Session> {
        self.backend.start_session().await
    }

    /// Opens a session and begins a transaction on it.
    pub async fn start_transaction(&self) -> DocumentStoreResult<Transaction<B::Session>> {
        Transaction::begin(self.start_session().await?).await
    }
}
