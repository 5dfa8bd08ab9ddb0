//! Handler boundary: where domain logic plugs into the protocol.
//!
//! The engine decides *whether* and *in which order* mutations are applied;
//! a [`Handler`] decides *what* applying one means, and what changed since a
//! cookie. Both calls receive the request's open transaction so that domain
//! writes commit or roll back together with the engine's bookkeeping.

use crate::{error::Result, ClientInfo, Cookie, Mutation, Transaction};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One step of a pull patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    /// Set `key` to `value`.
    Put {
        key: String,
        value: serde_json::Value,
    },
    /// Remove `key`.
    Del { key: String },
    /// Remove every key.
    Clear,
}

impl PatchOperation {
    /// Build a put operation.
    pub fn put(key: impl Into<String>, value: serde_json::Value) -> Self {
        PatchOperation::Put {
            key: key.into(),
            value,
        }
    }

    /// Build a delete operation.
    pub fn del(key: impl Into<String>) -> Self {
        PatchOperation::Del { key: key.into() }
    }
}

/// What a handler computed for one pull.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PullPatch {
    /// Cookie to hand back to the client
    pub cookie: Cookie,
    /// Changes since the cookie the client sent
    pub patch: Vec<PatchOperation>,
}

/// Domain logic supplied by the embedding application.
#[async_trait]
pub trait Handler<T: Transaction>: Send + Sync {
    /// Apply one mutation.
    ///
    /// Called at most once per `(client_id, id)` in any committed transaction.
    /// Domain failures should be returned as [`Error::Handler`](crate::Error);
    /// they abort the whole push.
    async fn apply_mutation(&self, tx: &mut T, info: &ClientInfo, mutation: &Mutation)
        -> Result<()>;

    /// Compute the patch from `cookie` to the current state and the new cookie.
    async fn compute_pull(&self, tx: &mut T, info: &ClientInfo, cookie: &Cookie)
        -> Result<PullPatch>;
}
