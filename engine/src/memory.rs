//! In-process transactional store.
//!
//! [`MemoryStore`] provides serializable transactions through optimistic
//! validation: every key a transaction touches records the committed version
//! it saw, writes are buffered, and `commit` succeeds only if none of those
//! versions moved in the meantime. Otherwise it fails with
//! [`Error::TransactionConflict`] and nothing is applied.
//!
//! Besides the client bookkeeping tables it carries a flat key space of JSON
//! values that handlers can use for domain state, inside the same transaction.

use crate::{error::Result, Client, ClientGroup, Error, Store, Transaction};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Versioned unit of conflict detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Group(String),
    Client(String),
    /// Membership list of a group; moves when a client joins.
    Members(String),
    Entry(String),
}

#[derive(Debug, Default)]
struct MemoryState {
    groups: HashMap<String, ClientGroup>,
    clients: HashMap<String, Client>,
    members: HashMap<String, BTreeSet<String>>,
    entries: BTreeMap<String, Value>,
    versions: HashMap<Key, u64>,
    commits: u64,
}

impl MemoryState {
    fn version(&self, key: &Key) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: Key) {
        *self.versions.entry(key).or_insert(0) += 1;
    }
}

/// Remember the first committed version a transaction observed for `key`.
fn observe(reads: &mut HashMap<Key, u64>, state: &MemoryState, key: Key) {
    let version = state.version(&key);
    reads.entry(key).or_insert(version);
}

/// Shared in-memory store. Cloning yields another handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions committed so far.
    pub fn commit_count(&self) -> u64 {
        self.state.lock().commits
    }

    /// Committed state of a client, outside any transaction.
    pub fn committed_client(&self, id: &str) -> Option<Client> {
        self.state.lock().clients.get(id).cloned()
    }

    /// Committed value of a domain entry, outside any transaction.
    pub fn committed_entry(&self, key: &str) -> Option<Value> {
        self.state.lock().entries.get(key).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        Ok(MemoryTransaction {
            state: Arc::clone(&self.state),
            reads: HashMap::new(),
            groups: HashMap::new(),
            clients: HashMap::new(),
            entries: BTreeMap::new(),
        })
    }
}

/// Transaction over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTransaction {
    state: Arc<Mutex<MemoryState>>,
    reads: HashMap<Key, u64>,
    groups: HashMap<String, ClientGroup>,
    clients: HashMap<String, Client>,
    /// `None` marks a deletion.
    entries: BTreeMap<String, Option<Value>>,
}

impl MemoryTransaction {
    /// Read a domain entry.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        if let Some(pending) = self.entries.get(key) {
            return pending.clone();
        }
        let state = self.state.lock();
        observe(&mut self.reads, &state, Key::Entry(key.to_string()));
        state.entries.get(key).cloned()
    }

    /// Write a domain entry.
    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        {
            let state = self.state.lock();
            observe(&mut self.reads, &state, Key::Entry(key.clone()));
        }
        self.entries.insert(key, Some(value));
    }

    /// Delete a domain entry.
    pub fn delete(&mut self, key: impl Into<String>) {
        let key = key.into();
        {
            let state = self.state.lock();
            observe(&mut self.reads, &state, Key::Entry(key.clone()));
        }
        self.entries.insert(key, None);
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn client_group(&mut self, id: &str) -> Result<Option<ClientGroup>> {
        if let Some(group) = self.groups.get(id) {
            return Ok(Some(group.clone()));
        }
        let state = self.state.lock();
        observe(&mut self.reads, &state, Key::Group(id.to_string()));
        Ok(state.groups.get(id).cloned())
    }

    async fn insert_client_group(&mut self, group: &ClientGroup) -> Result<()> {
        {
            let state = self.state.lock();
            observe(&mut self.reads, &state, Key::Group(group.id.clone()));
        }
        self.groups.insert(group.id.clone(), group.clone());
        Ok(())
    }

    async fn client(&mut self, id: &str) -> Result<Option<Client>> {
        if let Some(client) = self.clients.get(id) {
            return Ok(Some(client.clone()));
        }
        let state = self.state.lock();
        observe(&mut self.reads, &state, Key::Client(id.to_string()));
        Ok(state.clients.get(id).cloned())
    }

    async fn put_client(&mut self, client: &Client) -> Result<()> {
        {
            let state = self.state.lock();
            observe(&mut self.reads, &state, Key::Client(client.id.clone()));
        }
        self.clients.insert(client.id.clone(), client.clone());
        Ok(())
    }

    async fn clients_in_group(&mut self, client_group_id: &str) -> Result<Vec<Client>> {
        let state = self.state.lock();
        observe(
            &mut self.reads,
            &state,
            Key::Members(client_group_id.to_string()),
        );

        let mut found: BTreeMap<String, Client> = BTreeMap::new();
        if let Some(ids) = state.members.get(client_group_id) {
            for id in ids {
                observe(&mut self.reads, &state, Key::Client(id.clone()));
                if let Some(client) = state.clients.get(id) {
                    found.insert(id.clone(), client.clone());
                }
            }
        }
        for client in self.clients.values() {
            if client.client_group_id == client_group_id {
                found.insert(client.id.clone(), client.clone());
            }
        }

        Ok(found.into_values().collect())
    }

    async fn commit(self) -> Result<()> {
        let mut state = self.state.lock();

        for (key, seen) in &self.reads {
            if state.version(key) != *seen {
                tracing::debug!(key = ?key, "memory transaction lost validation");
                return Err(Error::TransactionConflict);
            }
        }

        for (id, group) in self.groups {
            state.groups.insert(id.clone(), group);
            state.bump(Key::Group(id));
        }
        for (id, client) in self.clients {
            if !state.clients.contains_key(&id) {
                let group_id = client.client_group_id.clone();
                state
                    .members
                    .entry(group_id.clone())
                    .or_default()
                    .insert(id.clone());
                state.bump(Key::Members(group_id));
            }
            state.clients.insert(id.clone(), client);
            state.bump(Key::Client(id));
        }
        for (key, value) in self.entries {
            match value {
                Some(value) => {
                    state.entries.insert(key.clone(), value);
                }
                None => {
                    state.entries.remove(&key);
                }
            }
            state.bump(Key::Entry(key));
        }

        state.commits += 1;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
