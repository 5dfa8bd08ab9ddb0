//! Client group registry.
//!
//! Resolves the group and client identities a request refers to, creating
//! them when policy allows, and enforces that a client never changes group.

use crate::{error::Result, Client, ClientGroup, ClientInfo, Error, Mutation, Transaction};
use std::collections::HashSet;

/// Identity resolution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registry {
    /// Create unknown client groups on push
    pub create_on_push: bool,
    /// Create unknown client groups on pull
    pub create_on_pull: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            create_on_push: true,
            create_on_pull: false,
        }
    }
}

impl Registry {
    /// Create a registry with explicit creation policy.
    pub fn new(create_on_push: bool, create_on_pull: bool) -> Self {
        Self {
            create_on_push,
            create_on_pull,
        }
    }

    /// Look up a group, creating it under `profile_id` if absent and `create` is set.
    pub async fn resolve_or_create_group<T: Transaction>(
        &self,
        tx: &mut T,
        client_group_id: &str,
        profile_id: &str,
        create: bool,
    ) -> Result<ClientGroup> {
        match tx.client_group(client_group_id).await? {
            Some(group) if group.is_owned_by(profile_id) => Ok(group),
            Some(_) => Err(Error::AuthMismatch {
                client_group_id: client_group_id.to_string(),
                profile_id: profile_id.to_string(),
            }),
            None if create => {
                let group = ClientGroup::new(client_group_id, profile_id);
                tx.insert_client_group(&group).await?;
                tracing::info!(
                    client_group_id = %client_group_id,
                    profile_id = %profile_id,
                    "client group created"
                );
                Ok(group)
            }
            None => Err(Error::UnknownClientGroup(client_group_id.to_string())),
        }
    }

    /// Look up a client of `client_group_id`, creating it with no applied mutations if absent.
    pub async fn resolve_or_create_client<T: Transaction>(
        &self,
        tx: &mut T,
        client_id: &str,
        client_group_id: &str,
    ) -> Result<Client> {
        match tx.client(client_id).await? {
            Some(client) if client.client_group_id == client_group_id => Ok(client),
            Some(client) => Err(Error::ClientGroupMismatch {
                client_id: client_id.to_string(),
                expected: client_group_id.to_string(),
                actual: client.client_group_id,
            }),
            None => {
                let client = Client::new(client_id, client_group_id);
                tx.put_client(&client).await?;
                tracing::debug!(
                    client_id = %client_id,
                    client_group_id = %client_group_id,
                    "client created"
                );
                Ok(client)
            }
        }
    }

    /// Resolve the request's group and every distinct client referenced by `mutations`.
    ///
    /// Runs to completion before any mutation is applied, so a batch naming a
    /// client of another group fails without side effects. Clients are returned
    /// in order of first appearance.
    pub async fn resolve_for_push<T: Transaction>(
        &self,
        tx: &mut T,
        info: &ClientInfo,
        mutations: &[Mutation],
    ) -> Result<(ClientGroup, Vec<Client>)> {
        let group = self
            .resolve_or_create_group(
                tx,
                &info.client_group_id,
                &info.profile_id,
                self.create_on_push,
            )
            .await?;

        let mut seen = HashSet::new();
        let mut clients = Vec::new();
        for mutation in mutations {
            if !seen.insert(mutation.client_id.as_str()) {
                continue;
            }
            let client = self
                .resolve_or_create_client(tx, &mutation.client_id, &group.id)
                .await?;
            clients.push(client);
        }

        Ok((group, clients))
    }

    /// Resolve the request's group for a pull.
    pub async fn resolve_for_pull<T: Transaction>(
        &self,
        tx: &mut T,
        info: &ClientInfo,
    ) -> Result<ClientGroup> {
        self.resolve_or_create_group(
            tx,
            &info.client_group_id,
            &info.profile_id,
            self.create_on_pull,
        )
        .await
    }
}
