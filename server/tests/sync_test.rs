//! Wire-protocol tests for push and pull payloads.
//!
//! These run the engine over its in-memory store and check the JSON the
//! server puts on the wire; no database is needed.

use serde_json::{json, Value};
use syncline_engine::{
    async_trait, ClientInfo, Cookie, Error, Handler, MemoryStore, MemoryTransaction, Mutation,
    PatchOperation, PullPatch, PullResponse, Recovery, Result, Syncer,
};

/// Keyed writes, pulled back as a full snapshot.
struct Kv;

#[async_trait]
impl Handler<MemoryTransaction> for Kv {
    async fn apply_mutation(
        &self,
        tx: &mut MemoryTransaction,
        _info: &ClientInfo,
        mutation: &Mutation,
    ) -> Result<()> {
        let key = mutation.args["key"]
            .as_str()
            .ok_or_else(|| Error::handler("missing key"))?;
        match mutation.name.as_str() {
            "putRecord" => tx.put(format!("kv/{key}"), mutation.args["value"].clone()),
            "deleteRecord" => tx.delete(format!("kv/{key}")),
            other => return Err(Error::handler(format!("unknown mutator {other}"))),
        }
        let keys = tx.get("keys").unwrap_or_else(|| json!([]));
        let mut keys: Vec<String> = serde_json::from_value(keys).unwrap_or_default();
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
        tx.put("keys", json!(keys));
        Ok(())
    }

    async fn compute_pull(
        &self,
        tx: &mut MemoryTransaction,
        _info: &ClientInfo,
        _cookie: &Cookie,
    ) -> Result<PullPatch> {
        let keys: Vec<String> =
            serde_json::from_value(tx.get("keys").unwrap_or_else(|| json!([])))
                .unwrap_or_default();
        let mut patch = vec![PatchOperation::Clear];
        for key in &keys {
            if let Some(value) = tx.get(&format!("kv/{key}")) {
                patch.push(PatchOperation::put(key.clone(), value));
            }
        }
        Ok(PullPatch {
            cookie: json!(keys.len()),
            patch,
        })
    }
}

fn mutations_from_wire(body: Value) -> Vec<Mutation> {
    serde_json::from_value(body["mutations"].clone()).unwrap()
}

#[cfg(test)]
mod protocol_tests {
    use super::*;

    #[tokio::test]
    async fn test_push_then_pull_wire_shapes() {
        let syncer = Syncer::new(MemoryStore::new(), Kv);
        let info = ClientInfo::new("group-1", "profile-1");

        let body = json!({
            "pushVersion": 1,
            "clientGroupID": "group-1",
            "profileID": "profile-1",
            "schemaVersion": "1",
            "mutations": [
                {"clientID": "tab-a", "id": 1, "name": "putRecord", "args": {"key": "todo/1", "value": {"title": "milk"}}, "timestamp": 1706745600000.0},
                {"clientID": "tab-b", "id": 1, "name": "putRecord", "args": {"key": "todo/2", "value": {"title": "eggs"}}, "timestamp": 1706745600001.0},
                {"clientID": "tab-a", "id": 2, "name": "deleteRecord", "args": {"key": "todo/1"}, "timestamp": 1706745600002.0}
            ]
        });

        let outcome = syncer.push(&info, &mutations_from_wire(body)).await.unwrap();
        assert_eq!(outcome.applied, 3);

        let response = syncer.pull(&info, &Cookie::Null).await.unwrap();
        let wire = serde_json::to_value(&response).unwrap();

        assert_eq!(
            wire,
            json!({
                "cookie": 2,
                "lastMutationIDChanges": {"tab-a": 2, "tab-b": 1},
                "patch": [
                    {"op": "clear"},
                    {"op": "put", "key": "todo/2", "value": {"title": "eggs"}}
                ]
            })
        );

        let parsed: PullResponse = serde_json::from_value(wire).unwrap();
        assert_eq!(parsed, response);
    }

    #[tokio::test]
    async fn test_retried_push_reports_same_ids() {
        let syncer = Syncer::new(MemoryStore::new(), Kv);
        let info = ClientInfo::new("group-1", "profile-1");
        let batch = vec![
            Mutation::new("tab-a", 1, "putRecord", json!({"key": "a", "value": 1})),
            Mutation::new("tab-a", 2, "putRecord", json!({"key": "b", "value": 2})),
        ];

        let first = syncer.push(&info, &batch).await.unwrap();
        let retried = syncer.push(&info, &batch).await.unwrap();

        assert_eq!(retried.applied, 0);
        assert_eq!(retried.skipped, 2);
        assert_eq!(first.last_mutation_ids, retried.last_mutation_ids);
    }

    #[tokio::test]
    async fn test_error_recovery_classes() {
        let syncer = Syncer::new(MemoryStore::new(), Kv);
        let info = ClientInfo::new("group-1", "profile-1");

        let gap = syncer
            .push(
                &info,
                &[Mutation::new("tab-a", 2, "putRecord", json!({"key": "a", "value": 1}))],
            )
            .await
            .unwrap_err();
        assert_eq!(gap.recovery(), Recovery::Resync);

        let unknown = syncer
            .pull(&ClientInfo::new("group-2", "profile-1"), &Cookie::Null)
            .await
            .unwrap_err();
        assert_eq!(unknown, Error::UnknownClientGroup("group-2".into()));
        assert_eq!(unknown.recovery(), Recovery::Fatal);

        let refused = syncer
            .push(&info, &[Mutation::new("tab-a", 1, "dropTable", json!({"key": "a"}))])
            .await
            .unwrap_err();
        assert_eq!(refused.recovery(), Recovery::Fatal);
        assert_eq!(refused.recovery().as_str(), "fatal");
    }

    #[test]
    fn test_mutation_defaults() {
        let mutation: Mutation =
            serde_json::from_str(r#"{"clientID": "tab-a", "id": 7, "name": "noop"}"#).unwrap();

        assert_eq!(mutation.client_id, "tab-a");
        assert_eq!(mutation.id, 7);
        assert_eq!(mutation.args, Value::Null);
        assert_eq!(mutation.timestamp, 0.0);
    }
}
