//! Pull pipeline - reports domain changes since a cookie together with the
//! last applied mutation id of every client in the group.

use crate::{
    error::Result, ClientId, ClientInfo, Cookie, Handler, MutationId, PatchOperation, Registry,
    Transaction,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of a pull.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    /// Cookie the client sends with its next pull
    pub cookie: Cookie,
    /// Last applied mutation id per client of the group
    #[serde(rename = "lastMutationIDChanges")]
    pub last_mutation_id_changes: BTreeMap<ClientId, MutationId>,
    /// Domain changes since the request cookie
    pub patch: Vec<PatchOperation>,
}

/// Run a pull inside `tx`. Client bookkeeping is only read, never written,
/// unless the registry is configured to create unknown groups on pull.
pub async fn process_pull<T, H>(
    tx: &mut T,
    registry: &Registry,
    handler: &H,
    info: &ClientInfo,
    cookie: &Cookie,
) -> Result<PullResponse>
where
    T: Transaction,
    H: Handler<T>,
{
    let group = registry.resolve_for_pull(tx, info).await?;

    let computed = handler.compute_pull(tx, info, cookie).await?;

    let last_mutation_id_changes = tx
        .clients_in_group(&group.id)
        .await?
        .into_iter()
        .map(|client| (client.id, client.last_mutation_id))
        .collect();

    tracing::debug!(
        client_group_id = %group.id,
        patch_len = computed.patch.len(),
        "pull computed"
    );

    Ok(PullResponse {
        cookie: computed.cookie,
        last_mutation_id_changes,
        patch: computed.patch,
    })
}
