//! Record-space mutators served by this binary.
//!
//! Each profile owns one space. `putRecord` and `deleteRecord` write into it,
//! and pull returns whatever changed since the version held in the cookie.

use serde::Deserialize;
use serde_json::json;
use syncline_engine::{
    async_trait, ClientInfo, Cookie, Error, Handler, Mutation, PatchOperation, PullPatch, Result,
};

use crate::db::{self, map_db_error, PgTransaction, StoredRecord};

#[derive(Debug, Deserialize)]
struct PutRecordArgs {
    key: String,
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DeleteRecordArgs {
    key: String,
}

/// A typed mutator invocation.
#[derive(Debug)]
enum Mutator {
    Put(PutRecordArgs),
    Delete(DeleteRecordArgs),
}

impl Mutator {
    fn parse(mutation: &Mutation) -> Result<Self> {
        let args = mutation.args.clone();
        let parsed = match mutation.name.as_str() {
            "putRecord" => serde_json::from_value(args).map(Mutator::Put),
            "deleteRecord" => serde_json::from_value(args).map(Mutator::Delete),
            other => return Err(Error::handler(format!("unknown mutator: {other}"))),
        };
        parsed.map_err(|e| Error::handler(format!("invalid {} args: {e}", mutation.name)))
    }
}

/// Versioned key/value space per profile.
#[derive(Debug, Clone, Default)]
pub struct RecordSpace;

impl RecordSpace {
    pub fn new() -> Self {
        Self
    }
}

/// Version a client last saw, if the cookie is usable against `current`.
fn cookie_version(cookie: &Cookie, current: i64) -> Option<i64> {
    cookie.as_i64().filter(|v| (0..=current).contains(v))
}

/// Patch for `records`. A reset starts from `clear` and leaves tombstones out.
fn build_patch(records: Vec<StoredRecord>, reset: bool) -> Vec<PatchOperation> {
    let head = reset.then_some(PatchOperation::Clear);
    head.into_iter()
        .chain(records.into_iter().filter_map(|record| match record.deleted {
            true if reset => None,
            true => Some(PatchOperation::del(record.key)),
            false => Some(PatchOperation::put(record.key, record.value)),
        }))
        .collect()
}

#[async_trait]
impl Handler<PgTransaction> for RecordSpace {
    async fn apply_mutation(
        &self,
        tx: &mut PgTransaction,
        info: &ClientInfo,
        mutation: &Mutation,
    ) -> Result<()> {
        let mutator = Mutator::parse(mutation)?;
        let space_id = info.profile_id.as_str();
        let version = db::next_space_version(tx.conn(), space_id)
            .await
            .map_err(map_db_error)?;

        match mutator {
            Mutator::Put(args) => {
                db::put_record(tx.conn(), space_id, &args.key, &args.value, version)
                    .await
                    .map_err(map_db_error)?;
            }
            Mutator::Delete(args) => {
                let deleted = db::delete_record(tx.conn(), space_id, &args.key, version)
                    .await
                    .map_err(map_db_error)?;
                if !deleted {
                    tracing::debug!(key = %args.key, "deleteRecord on missing key");
                }
            }
        }
        Ok(())
    }

    async fn compute_pull(
        &self,
        tx: &mut PgTransaction,
        info: &ClientInfo,
        cookie: &Cookie,
    ) -> Result<PullPatch> {
        let space_id = info.profile_id.as_str();
        let current = db::space_version(tx.conn(), space_id)
            .await
            .map_err(map_db_error)?;

        let (since, reset) = match cookie_version(cookie, current) {
            Some(since) => (since, false),
            None => (0, true),
        };

        let records = db::records_since(tx.conn(), space_id, since)
            .await
            .map_err(map_db_error)?;

        Ok(PullPatch {
            cookie: json!(current),
            patch: build_patch(records, reset),
        })
    }
}
