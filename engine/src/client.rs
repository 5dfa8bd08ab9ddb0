//! Client and client group bookkeeping records.

use crate::{ClientGroupId, ClientId, MutationId, ProfileId};
use serde::{Deserialize, Serialize};

/// A set of client replicas sharing one sync session, owned by one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientGroup {
    /// Unique identifier for this group
    pub id: ClientGroupId,
    /// Profile that owns the group
    pub profile_id: ProfileId,
}

impl ClientGroup {
    /// Create a new client group record.
    pub fn new(id: impl Into<ClientGroupId>, profile_id: impl Into<ProfileId>) -> Self {
        Self {
            id: id.into(),
            profile_id: profile_id.into(),
        }
    }

    /// Check whether the group is owned by `profile_id`.
    pub fn is_owned_by(&self, profile_id: &str) -> bool {
        self.profile_id == profile_id
    }
}

/// One client replica and the high-water mark of its applied mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Group this client belongs to for its whole lifetime
    pub client_group_id: ClientGroupId,
    /// Id of the last mutation applied for this client, 0 if none
    pub last_mutation_id: MutationId,
}

impl Client {
    /// Create a fresh client that has not had any mutation applied.
    pub fn new(id: impl Into<ClientId>, client_group_id: impl Into<ClientGroupId>) -> Self {
        Self {
            id: id.into(),
            client_group_id: client_group_id.into(),
            last_mutation_id: 0,
        }
    }

    /// The only mutation id that may be applied next.
    pub fn next_mutation_id(&self) -> MutationId {
        self.last_mutation_id + 1
    }
}
