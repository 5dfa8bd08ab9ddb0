//! PostgreSQL transaction provider for the sync engine.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Row};
use syncline_engine::{Client, ClientGroup, Error, Result, Store, Transaction};

/// PostgreSQL error codes that mean "run the transaction again".
///
/// - `40001` serialization_failure
/// - `40P01` deadlock_detected
/// - `23505` unique_violation, from two transactions creating the same row
pub fn is_retryable_code(code: &str) -> bool {
    matches!(code, "40001" | "40P01" | "23505")
}

/// Convert a database error into an engine error.
pub fn map_db_error(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().map(|c| is_retryable_code(&c)).unwrap_or(false) {
            tracing::debug!("Serialization conflict: {}", db_err);
            return Error::TransactionConflict;
        }
    }
    tracing::error!("Database error: {:?}", err);
    Error::Storage(err.to_string())
}

/// Store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        Ok(PgTransaction { tx })
    }
}

/// A serializable PostgreSQL transaction.
///
/// Dropping it without `commit` rolls back.
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl PgTransaction {
    /// Connection for domain queries that must run inside this transaction.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }
}

fn client_from_row(row: &sqlx::postgres::PgRow) -> std::result::Result<Client, sqlx::Error> {
    Ok(Client {
        id: row.try_get("id")?,
        client_group_id: row.try_get("client_group_id")?,
        last_mutation_id: row.try_get::<i64, _>("last_mutation_id")? as u64,
    })
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn client_group(&mut self, id: &str) -> Result<Option<ClientGroup>> {
        let row = sqlx::query(r#"SELECT id, profile_id FROM client_groups WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)?;

        row.map(|row| {
            Ok::<_, sqlx::Error>(ClientGroup {
                id: row.try_get("id")?,
                profile_id: row.try_get("profile_id")?,
            })
        })
        .transpose()
        .map_err(map_db_error)
    }

    async fn insert_client_group(&mut self, group: &ClientGroup) -> Result<()> {
        sqlx::query(r#"INSERT INTO client_groups (id, profile_id) VALUES ($1, $2)"#)
            .bind(&group.id)
            .bind(&group.profile_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn client(&mut self, id: &str) -> Result<Option<Client>> {
        let row = sqlx::query(
            r#"SELECT id, client_group_id, last_mutation_id FROM clients WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        row.as_ref()
            .map(client_from_row)
            .transpose()
            .map_err(map_db_error)
    }

    async fn put_client(&mut self, client: &Client) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, client_group_id, last_mutation_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                last_mutation_id = EXCLUDED.last_mutation_id,
                updated_at = now()
            "#,
        )
        .bind(&client.id)
        .bind(&client.client_group_id)
        .bind(client.last_mutation_id as i64)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn clients_in_group(&mut self, client_group_id: &str) -> Result<Vec<Client>> {
        let rows = sqlx::query(
            r#"
            SELECT id, client_group_id, last_mutation_id
            FROM clients
            WHERE client_group_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(client_group_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        rows.iter()
            .map(client_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(map_db_error)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(map_db_error)
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.map_err(map_db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_codes() {
        assert!(is_retryable_code("40001"));
        assert!(is_retryable_code("40P01"));
        assert!(is_retryable_code("23505"));
        assert!(!is_retryable_code("23503"));
        assert!(!is_retryable_code("42P01"));
    }

    #[test]
    fn non_database_errors_are_storage_errors() {
        assert!(matches!(
            map_db_error(sqlx::Error::PoolTimedOut),
            Error::Storage(_)
        ));
        assert!(matches!(
            map_db_error(sqlx::Error::RowNotFound),
            Error::Storage(_)
        ));
    }
}
