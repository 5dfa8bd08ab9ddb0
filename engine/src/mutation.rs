//! Mutations and per-request client context.
//!
//! A mutation is a named, client-recorded change with an opaque argument
//! payload. The engine only looks at `client_id` and `id`; everything else is
//! for the [`Handler`](crate::Handler).

use crate::{ClientGroupId, ClientId, MutationId, ProfileId};
use serde::{Deserialize, Serialize};

/// A mutation recorded by a client while working against its local replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    /// Client that recorded the mutation
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Client-local sequence number, 1-based and contiguous
    pub id: MutationId,
    /// Mutator name
    pub name: String,
    /// Opaque arguments, interpreted by the handler
    #[serde(default)]
    pub args: serde_json::Value,
    /// Client-side high resolution timestamp, advisory only
    #[serde(default)]
    pub timestamp: f64,
}

impl Mutation {
    /// Create a new mutation.
    pub fn new(
        client_id: impl Into<ClientId>,
        id: MutationId,
        name: impl Into<String>,
        args: serde_json::Value,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            id,
            name: name.into(),
            args,
            timestamp: 0.0,
        }
    }
}

/// Immutable context of a single push or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientInfo {
    /// Opaque authorization token, forwarded unchanged
    pub auth: String,
    /// Client group the request is made on behalf of
    pub client_group_id: ClientGroupId,
    /// Profile (browser profile or device) owning the group
    pub profile_id: ProfileId,
    /// Client schema version
    pub schema_version: String,
}

impl ClientInfo {
    /// Create a context with no auth token and an empty schema version.
    pub fn new(client_group_id: impl Into<ClientGroupId>, profile_id: impl Into<ProfileId>) -> Self {
        Self {
            auth: String::new(),
            client_group_id: client_group_id.into(),
            profile_id: profile_id.into(),
            schema_version: String::new(),
        }
    }

    /// Attach the authorization token.
    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = auth.into();
        self
    }

    /// Attach the client schema version.
    pub fn with_schema_version(mut self, schema_version: impl Into<String>) -> Self {
        self.schema_version = schema_version.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mutation_wire_names() {
        let m = Mutation::new("c1", 4, "addTodo", json!({"text": "milk"}));
        let value = serde_json::to_value(&m).unwrap();

        assert_eq!(value["clientID"], "c1");
        assert_eq!(value["id"], 4);
        assert_eq!(value["name"], "addTodo");
        assert_eq!(value["args"]["text"], "milk");
    }

    #[test]
    fn mutation_without_args_or_timestamp() {
        let m: Mutation =
            serde_json::from_str(r#"{"clientID":"c1","id":1,"name":"noop"}"#).unwrap();

        assert_eq!(m.args, serde_json::Value::Null);
        assert_eq!(m.timestamp, 0.0);
    }

    #[test]
    fn client_info_builder() {
        let info = ClientInfo::new("g1", "p1")
            .with_auth("Bearer abc")
            .with_schema_version("v3");

        assert_eq!(info.client_group_id, "g1");
        assert_eq!(info.profile_id, "p1");
        assert_eq!(info.auth, "Bearer abc");
        assert_eq!(info.schema_version, "v3");
    }
}
