//! Database operations for record spaces.
//!
//! A space is a versioned key/value namespace. Every write stamps the record
//! with the space's next version, so "what changed since version N" is a
//! range scan. Deletes leave a tombstone for the same reason.

use sqlx::{PgConnection, Row};

/// A stored record row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: String,
    pub value: serde_json::Value,
    pub deleted: bool,
    pub version: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredRecord {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredRecord {
            key: row.try_get("key")?,
            value: row.try_get("value")?,
            deleted: row.try_get("deleted")?,
            version: row.try_get("version")?,
        })
    }
}

/// Advance a space's version, creating the space on first use.
pub async fn next_space_version(conn: &mut PgConnection, space_id: &str) -> Result<i64, sqlx::Error> {
    let (version,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO spaces (id, version)
        VALUES ($1, 1)
        ON CONFLICT (id) DO UPDATE SET version = spaces.version + 1
        RETURNING version
        "#,
    )
    .bind(space_id)
    .fetch_one(conn)
    .await?;

    Ok(version)
}

/// Current version of a space, 0 if it has never been written.
pub async fn space_version(conn: &mut PgConnection, space_id: &str) -> Result<i64, sqlx::Error> {
    let version: Option<(i64,)> = sqlx::query_as(r#"SELECT version FROM spaces WHERE id = $1"#)
        .bind(space_id)
        .fetch_optional(conn)
        .await?;

    Ok(version.map(|(v,)| v).unwrap_or(0))
}

/// Upsert a live record.
pub async fn put_record(
    conn: &mut PgConnection,
    space_id: &str,
    key: &str,
    value: &serde_json::Value,
    version: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO records (space_id, key, value, deleted, version)
        VALUES ($1, $2, $3, false, $4)
        ON CONFLICT (space_id, key) DO UPDATE SET
            value = EXCLUDED.value,
            deleted = false,
            version = EXCLUDED.version
        "#,
    )
    .bind(space_id)
    .bind(key)
    .bind(value)
    .bind(version)
    .execute(conn)
    .await?;

    Ok(())
}

/// Tombstone a record. Returns whether a live record was deleted.
pub async fn delete_record(
    conn: &mut PgConnection,
    space_id: &str,
    key: &str,
    version: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE records
        SET deleted = true, value = 'null'::jsonb, version = $3
        WHERE space_id = $1 AND key = $2 AND deleted = false
        "#,
    )
    .bind(space_id)
    .bind(key)
    .bind(version)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Records, tombstones included, written after `since`.
pub async fn records_since(
    conn: &mut PgConnection,
    space_id: &str,
    since: i64,
) -> Result<Vec<StoredRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoredRecord>(
        r#"
        SELECT key, value, deleted, version
        FROM records
        WHERE space_id = $1 AND version > $2
        ORDER BY key ASC
        "#,
    )
    .bind(space_id)
    .bind(since)
    .fetch_all(conn)
    .await
}
