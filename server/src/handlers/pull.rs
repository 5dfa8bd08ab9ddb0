//! Pull handler - serves state changes since a client's cookie.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use syncline_engine::{
    ClientInfo, Cookie, Error, Handler, PullResponse, Store, Syncer, VersionKind,
};

/// The only pull protocol version this server speaks.
pub const PULL_VERSION: i64 = 1;

/// Request body for pull.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub pull_version: i64,
    #[serde(rename = "clientGroupID")]
    pub client_group_id: String,
    #[serde(rename = "profileID")]
    pub profile_id: String,
    #[serde(default)]
    pub schema_version: String,
    /// `null` on the first pull
    #[serde(default)]
    pub cookie: Cookie,
}

impl PullRequest {
    pub fn client_info(&self, auth: &str) -> ClientInfo {
        ClientInfo::new(&self.client_group_id, &self.profile_id)
            .with_schema_version(&self.schema_version)
            .with_auth(auth)
    }
}

/// Process a pull request.
pub async fn handle_pull<S, H>(
    syncer: &Syncer<S, H>,
    auth: &str,
    request: PullRequest,
) -> Result<PullResponse>
where
    S: Store,
    H: Handler<S::Tx>,
{
    if request.pull_version != PULL_VERSION {
        return Err(Error::ProtocolVersion {
            kind: VersionKind::Pull,
            version: request.pull_version,
        }
        .into());
    }

    let info = request.client_info(auth);
    let response = syncer.pull(&info, &request.cookie).await?;

    tracing::debug!(
        client_group_id = %info.client_group_id,
        clients = response.last_mutation_id_changes.len(),
        patch_ops = response.patch.len(),
        "Pull served"
    );

    Ok(response)
}
