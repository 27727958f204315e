//! Postgres-backed [`RecordStore`].
//!
//! All SQL lives here as constants, decoupling the persistence dialect from
//! the pipeline stages. The connection is process-scoped: opened once before
//! the first schema-dependent call and released exactly once by the
//! orchestrator's terminal step.

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::NoTls;
use tracing::{error, info};

use crate::config::{Config, DB_HOST};
use crate::contract::{NameRecord, RecordStore, StoreError, StoredRecord};

/// Idempotent schema definition; timestamps are storage-assigned.
const CREATE_SQL: &str = "\
    CREATE TABLE IF NOT EXISTS baby_names ( \
        id         BIGSERIAL PRIMARY KEY, \
        name       VARCHAR(45), \
        sex        VARCHAR(10), \
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now() \
    )";

/// One round trip for the whole batch; UNNEST keeps the array order, so ids
/// follow the source file order.
const INSERT_SQL: &str = "\
    INSERT INTO baby_names (name, sex) \
    SELECT * FROM UNNEST($1::varchar[], $2::varchar[])";

const SELECT_SQL: &str = "SELECT id, name, sex FROM baby_names ORDER BY id";

pub struct PgStore {
    client: tokio_postgres::Client,
    connection: JoinHandle<()>,
}

impl PgStore {
    /// Connect to the fixed local host using the configured credentials.
    pub async fn connect(config: &Config) -> Result<Self, tokio_postgres::Error> {
        let (client, connection) = tokio_postgres::Config::new()
            .host(DB_HOST)
            .user(&config.db_user)
            .password(&config.db_password)
            .dbname(&config.db_name)
            .connect(NoTls)
            .await?;

        // The connection future must be driven for the client to make
        // progress; it lives on its own task until close() aborts it.
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "[STORE] Connection task ended with error");
            }
        });

        info!(host = DB_HOST, db = %config.db_name, "[STORE] Connected to database");
        Ok(Self { client, connection })
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn init_schema(&self) -> Result<(), StoreError> {
        self.client.batch_execute(CREATE_SQL).await?;
        Ok(())
    }

    async fn insert_all(&self, records: &[NameRecord]) -> Result<u64, StoreError> {
        let names: Vec<Option<&str>> = records.iter().map(|r| r.name.as_deref()).collect();
        let sexes: Vec<Option<&str>> = records.iter().map(|r| r.sex.as_deref()).collect();
        let count = self.client.execute(INSERT_SQL, &[&names, &sexes]).await?;
        Ok(count)
    }

    async fn fetch_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let rows = self.client.query(SELECT_SQL, &[]).await?;
        Ok(rows
            .into_iter()
            .map(|row| StoredRecord {
                id: row.get(0),
                name: row.get(1),
                sex: row.get(2),
            })
            .collect())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.connection.abort();
        info!("[STORE] Database connection released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creation_is_idempotent_sql() {
        assert!(CREATE_SQL.contains("IF NOT EXISTS"));
    }

    #[test]
    fn column_bounds_match_the_source_fields() {
        assert!(CREATE_SQL.contains("VARCHAR(45)"));
        assert!(CREATE_SQL.contains("VARCHAR(10)"));
    }

    #[test]
    fn read_back_preserves_storage_order() {
        assert!(SELECT_SQL.ends_with("ORDER BY id"));
    }
}
