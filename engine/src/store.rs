//! Transaction provider seam.
//!
//! A [`Store`] opens one serializable [`Transaction`] per push or pull. All
//! bookkeeping reads and writes the engine performs, and every domain write a
//! [`Handler`](crate::Handler) performs, go through that one transaction
//! handle, passed explicitly.
//!
//! Dropping a transaction without calling [`Transaction::commit`] must discard
//! every change made through it. Cancellation of a request relies on this.

use crate::{error::Result, Client, ClientGroup};
use async_trait::async_trait;

/// Opens transactions against durable state.
#[async_trait]
pub trait Store: Send + Sync {
    /// Transaction handle produced by [`Store::begin`].
    type Tx: Transaction;

    /// Open a transaction at serializable isolation.
    async fn begin(&self) -> Result<Self::Tx>;
}

/// One open serializable transaction.
///
/// Any statement may fail with [`Error::TransactionConflict`](crate::Error)
/// when the store detects a serialization anomaly; so may `commit`.
#[async_trait]
pub trait Transaction: Send + Sized {
    /// Look up a client group.
    async fn client_group(&mut self, id: &str) -> Result<Option<ClientGroup>>;

    /// Insert a new client group.
    async fn insert_client_group(&mut self, group: &ClientGroup) -> Result<()>;

    /// Look up a client.
    async fn client(&mut self, id: &str) -> Result<Option<Client>>;

    /// Insert or update a client.
    async fn put_client(&mut self, client: &Client) -> Result<()>;

    /// All clients belonging to a group.
    async fn clients_in_group(&mut self, client_group_id: &str) -> Result<Vec<Client>>;

    /// Persist every change atomically.
    async fn commit(self) -> Result<()>;

    /// Discard every change.
    async fn rollback(self) -> Result<()>;
}
