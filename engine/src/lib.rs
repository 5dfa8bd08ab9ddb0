//! # Syncline Engine
//!
//! Server-side core of an offline-first sync protocol.
//!
//! Clients mutate a local replica while disconnected, then *push* the recorded
//! mutations in batches and *pull* a description of what changed. This crate
//! guarantees that every mutation is applied exactly once, in per-client order,
//! atomically with the domain effects it causes, regardless of retries,
//! duplicates and concurrent requests.
//!
//! ## Design Principles
//!
//! - **Mechanism, not policy**: domain logic lives behind the [`Handler`] trait
//! - **One transaction per request**: passed explicitly, never ambient
//! - **Serializable isolation**: the only concurrency control, conflicts are retried
//! - **Storage agnostic**: anything implementing [`Store`] will do
//!
//! ## Core Concepts
//!
//! ### Clients and Client Groups
//!
//! A [`Client`] is one replica. It belongs to exactly one [`ClientGroup`] for
//! its lifetime and carries `last_mutation_id`, the high-water mark of its
//! applied mutations.
//!
//! ### Push
//!
//! [`process_push`] walks a batch in order. A mutation whose id is at or below
//! the client's high-water mark is skipped, the next id is applied through the
//! handler, anything beyond is a gap and fails the push with
//! [`Error::MutationOrderGap`].
//!
//! ### Pull
//!
//! [`process_pull`] asks the handler for a patch since the client's cookie and
//! reports the high-water mark of every client in the group.
//!
//! ### Syncer
//!
//! [`Syncer`] wires a store, a handler and a [`SyncConfig`] together, runs each
//! request in one transaction and retries serialization conflicts.
//!
//! ## Quick Start
//!
//! ```rust
//! use syncline_engine::{
//!     async_trait, ClientInfo, Cookie, Handler, MemoryStore, MemoryTransaction,
//!     Mutation, PatchOperation, PullPatch, Result, Syncer,
//! };
//! use serde_json::json;
//!
//! struct Notes;
//!
//! #[async_trait]
//! impl Handler<MemoryTransaction> for Notes {
//!     async fn apply_mutation(
//!         &self,
//!         tx: &mut MemoryTransaction,
//!         _info: &ClientInfo,
//!         mutation: &Mutation,
//!     ) -> Result<()> {
//!         tx.put("note", mutation.args.clone());
//!         Ok(())
//!     }
//!
//!     async fn compute_pull(
//!         &self,
//!         tx: &mut MemoryTransaction,
//!         _info: &ClientInfo,
//!         _cookie: &Cookie,
//!     ) -> Result<PullPatch> {
//!         let note = tx.get("note").unwrap_or_default();
//!         Ok(PullPatch {
//!             cookie: json!(1),
//!             patch: vec![PatchOperation::put("note", note)],
//!         })
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let syncer = Syncer::new(MemoryStore::new(), Notes);
//! let info = ClientInfo::new("group-1", "profile-1");
//!
//! syncer
//!     .push(&info, &[Mutation::new("client-1", 1, "setNote", json!("hi"))])
//!     .await
//!     .unwrap();
//!
//! let pulled = syncer.pull(&info, &json!(null)).await.unwrap();
//! assert_eq!(pulled.last_mutation_id_changes["client-1"], 1);
//! # });
//! ```

pub mod client;
pub mod error;
pub mod handler;
pub mod memory;
pub mod mutation;
pub mod pull;
pub mod push;
pub mod registry;
pub mod store;
pub mod syncer;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use async_trait::async_trait;
pub use client::{Client, ClientGroup};
pub use error::{Error, Recovery, Result, VersionKind};
pub use handler::{Handler, PatchOperation, PullPatch};
pub use memory::{MemoryStore, MemoryTransaction};
pub use mutation::{ClientInfo, Mutation};
pub use pull::{process_pull, PullResponse};
pub use push::{process_push, PushOutcome};
pub use registry::Registry;
pub use store::{Store, Transaction};
pub use syncer::{SyncConfig, Syncer};

/// Type aliases for clarity
pub type ClientId = String;
pub type ClientGroupId = String;
pub type ProfileId = String;
pub type MutationId = u64;

/// Opaque marker of the last state a client observed, `null` before the first pull.
pub type Cookie = serde_json::Value;
