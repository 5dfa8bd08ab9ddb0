//! Push pipeline - applies a client group's mutation batch exactly once.
//!
//! Ordering rule per client, with `expected = last_mutation_id + 1`:
//! - `id < expected`: already applied by an earlier push, skipped silently
//! - `id == expected`: handed to the handler, then the counter advances
//! - `id > expected`: a gap; the whole push fails with `MutationOrderGap`
//!
//! The caller owns the transaction and commits only on `Ok`.

use crate::{
    error::Result, Client, ClientId, ClientInfo, Error, Handler, Mutation, MutationId, Registry,
    Transaction,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Summary of one processed push batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PushOutcome {
    /// Mutations handed to the handler
    pub applied: usize,
    /// Mutations skipped as already applied
    pub skipped: usize,
    /// Last mutation id of every client named in the batch, after the push
    pub last_mutation_ids: BTreeMap<ClientId, MutationId>,
}

/// Run a push batch inside `tx`.
pub async fn process_push<T, H>(
    tx: &mut T,
    registry: &Registry,
    handler: &H,
    info: &ClientInfo,
    mutations: &[Mutation],
) -> Result<PushOutcome>
where
    T: Transaction,
    H: Handler<T>,
{
    let (_, resolved) = registry.resolve_for_push(tx, info, mutations).await?;
    let mut clients: HashMap<ClientId, Client> = resolved
        .into_iter()
        .map(|client| (client.id.clone(), client))
        .collect();

    let mut advanced = BTreeSet::new();
    let mut outcome = PushOutcome::default();

    for mutation in mutations {
        let client = clients
            .get_mut(&mutation.client_id)
            .ok_or_else(|| Error::Storage(format!("unresolved client {}", mutation.client_id)))?;
        let expected = client.next_mutation_id();

        if mutation.id < expected {
            tracing::debug!(
                client_id = %mutation.client_id,
                mutation_id = mutation.id,
                last_mutation_id = client.last_mutation_id,
                "skipping already applied mutation"
            );
            outcome.skipped += 1;
            continue;
        }

        if mutation.id > expected {
            tracing::warn!(
                client_id = %mutation.client_id,
                expected,
                actual = mutation.id,
                "mutation gap, client must resync"
            );
            return Err(Error::MutationOrderGap {
                client_id: mutation.client_id.clone(),
                expected,
                actual: mutation.id,
            });
        }

        if let Err(err) = handler.apply_mutation(tx, info, mutation).await {
            tracing::warn!(
                client_id = %mutation.client_id,
                mutation_id = mutation.id,
                name = %mutation.name,
                error = %err,
                "mutation failed, aborting push"
            );
            return Err(err);
        }

        client.last_mutation_id = mutation.id;
        advanced.insert(mutation.client_id.clone());
        outcome.applied += 1;
    }

    for client in clients.values().filter(|c| advanced.contains(&c.id)) {
        tx.put_client(client).await?;
    }

    outcome.last_mutation_ids = clients
        .into_iter()
        .map(|(id, client)| (id, client.last_mutation_id))
        .collect();

    Ok(outcome)
}
