//! SQLite store implementation
//!
//! Durable sample storage in a local SQLite file. WAL journal mode keeps
//! reads concurrent with the scheduler's writes; the connection pool is
//! shared between the write path and the query API. Writes within a
//! partition serialize through SQLite itself, while appends for different
//! metric kinds proceed independently.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument};

use super::backend::TimeSeriesStore;
use super::error::{StoreError, StoreResult};
use super::schema::{MetricKind, Sample};

pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) the database file and run migrations.
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = db_path.as_ref().to_string_lossy().to_string();

        info!("opening sample store at {db_path}");

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

        debug!("sample store migrations complete");

        Ok(Self { pool })
    }

    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn row_to_sample(row: &sqlx::sqlite::SqliteRow) -> StoreResult<Sample> {
        let kind_str: String = row.get("metric_kind");
        let kind: MetricKind = kind_str
            .parse()
            .map_err(StoreError::Serialization)?;

        Ok(Sample {
            kind,
            source: row.get("source_id"),
            value: row.get("value"),
            timestamp: Self::millis_to_timestamp(row.get("timestamp")),
        })
    }
}

#[async_trait]
impl TimeSeriesStore for SqliteStore {
    #[instrument(skip(self, sample), fields(kind = %sample.kind, source = %sample.source))]
    async fn append(&self, sample: Sample) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO samples (metric_kind, source_id, value, timestamp)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(sample.kind.to_string())
        .bind(&sample.source)
        .bind(sample.value)
        .bind(Self::timestamp_to_millis(&sample.timestamp))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent(
        &self,
        kind: MetricKind,
        source: &str,
        limit: usize,
    ) -> StoreResult<Vec<Sample>> {
        let rows = sqlx::query(
            r#"
            SELECT metric_kind, source_id, value, timestamp
            FROM samples
            WHERE metric_kind = ? AND source_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(kind.to_string())
        .bind(source)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let samples: StoreResult<Vec<Sample>> =
            rows.iter().map(Self::row_to_sample).collect();
        let samples = samples?;

        debug!("query returned {} samples", samples.len());
        Ok(samples)
    }

    #[instrument(skip(self), fields(before = %before))]
    async fn prune_before(&self, before: DateTime<Utc>) -> StoreResult<usize> {
        let result = sqlx::query("DELETE FROM samples WHERE timestamp < ?")
            .bind(Self::timestamp_to_millis(&before))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let deleted = result.rows_affected() as usize;
        if deleted > 0 {
            info!("pruned {deleted} samples older than {before}");
        }

        Ok(deleted)
    }

    async fn close(&self) -> StoreResult<()> {
        info!("closing sample store");
        self.pool.close().await;
        Ok(())
    }
}
