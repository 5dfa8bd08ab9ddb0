//! Push handler - applies a client group's pending mutations.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use syncline_engine::{
    ClientInfo, Error, Handler, Mutation, PushOutcome, Store, Syncer, VersionKind,
};

/// The only push protocol version this server speaks.
pub const PUSH_VERSION: i64 = 1;

/// Request body for push.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub push_version: i64,
    #[serde(rename = "clientGroupID")]
    pub client_group_id: String,
    #[serde(rename = "profileID")]
    pub profile_id: String,
    #[serde(default)]
    pub schema_version: String,
    #[serde(default)]
    pub mutations: Vec<Mutation>,
}

impl PushRequest {
    /// Request context handed to the mutators.
    pub fn client_info(&self, auth: &str) -> ClientInfo {
        ClientInfo::new(&self.client_group_id, &self.profile_id)
            .with_schema_version(&self.schema_version)
            .with_auth(auth)
    }
}

/// Process a push request.
pub async fn handle_push<S, H>(
    syncer: &Syncer<S, H>,
    auth: &str,
    request: PushRequest,
) -> Result<PushOutcome>
where
    S: Store,
    H: Handler<S::Tx>,
{
    if request.push_version != PUSH_VERSION {
        return Err(Error::ProtocolVersion {
            kind: VersionKind::Push,
            version: request.push_version,
        }
        .into());
    }

    let info = request.client_info(auth);
    let outcome = syncer.push(&info, &request.mutations).await?;

    tracing::info!(
        client_group_id = %info.client_group_id,
        applied = outcome.applied,
        skipped = outcome.skipped,
        "Push processed"
    );

    Ok(outcome)
}
