//! Shared fixtures for unit tests.

use crate::{
    error::Result, Client, ClientGroup, ClientInfo, Cookie, Error, Handler, MemoryStore,
    MemoryTransaction, Mutation, PatchOperation, PullPatch, Store, Transaction,
};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Appends `"{client}:{id}"` to the entry `{group}/log` for every applied
/// mutation. Mutations named `fail` are rejected. A pull returns the whole log
/// with its length as cookie.
pub struct Recorder;

fn log_key(group: &str) -> String {
    format!("{group}/log")
}

#[async_trait]
impl Handler<MemoryTransaction> for Recorder {
    async fn apply_mutation(
        &self,
        tx: &mut MemoryTransaction,
        info: &ClientInfo,
        mutation: &Mutation,
    ) -> Result<()> {
        if mutation.name == "fail" {
            return Err(Error::handler(format!("mutation {} refused", mutation.id)));
        }
        let key = log_key(&info.client_group_id);
        let mut log = tx.get(&key).unwrap_or_else(|| json!([]));
        if let Value::Array(items) = &mut log {
            items.push(json!(format!("{}:{}", mutation.client_id, mutation.id)));
        }
        tx.put(key, log);
        Ok(())
    }

    async fn compute_pull(
        &self,
        tx: &mut MemoryTransaction,
        info: &ClientInfo,
        _cookie: &Cookie,
    ) -> Result<PullPatch> {
        let log = tx
            .get(&log_key(&info.client_group_id))
            .unwrap_or_else(|| json!([]));
        let len = log.as_array().map(Vec::len).unwrap_or(0);
        Ok(PullPatch {
            cookie: json!(len),
            patch: vec![PatchOperation::put("log", log)],
        })
    }
}

/// Store with group `g1` of profile `p1` and client `c1` at `last_mutation_id`.
pub async fn seeded_store(last_mutation_id: u64) -> MemoryStore {
    let store = MemoryStore::new();
    let mut tx = store.begin().await.expect("begin");
    tx.insert_client_group(&ClientGroup::new("g1", "p1"))
        .await
        .expect("group");
    let mut client = Client::new("c1", "g1");
    client.last_mutation_id = last_mutation_id;
    tx.put_client(&client).await.expect("client");
    tx.commit().await.expect("commit");
    store
}

/// Committed log of a group as plain strings.
pub fn log_of(store: &MemoryStore, group: &str) -> Vec<String> {
    store
        .committed_entry(&log_key(group))
        .and_then(|log| {
            log.as_array().map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
        })
        .unwrap_or_default()
}
