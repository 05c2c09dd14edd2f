// SQLite store of raw VM snapshots, keyed by VM id and capture time.
// Uses sqlx for async + connection pooling. `data` holds the acquisition layer's JSON document.

mod row;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::{instrument, warn};

use crate::models::CounterSample;

pub use row::RawSnapshot;

pub struct SnapshotRepo {
    pool: SqlitePool,
}

impl SnapshotRepo {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL.
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vm_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vm_id TEXT NOT NULL,
                captured_at INTEGER NOT NULL,
                data TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_snapshots_vm_captured_at ON vm_snapshots(vm_id, captured_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_snapshots_captured_at ON vm_snapshots(captured_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, data), fields(repo = "snapshots", operation = "save_snapshot"))]
    pub async fn save_snapshot(
        &self,
        vm_id: &str,
        captured_at: DateTime<Utc>,
        data: &Value,
    ) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO vm_snapshots (vm_id, captured_at, data) VALUES ($1, $2, $3)")
            .bind(vm_id)
            .bind(captured_at.timestamp_millis())
            .bind(serde_json::to_string(data)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, snapshots), fields(repo = "snapshots", operation = "save_snapshots", snapshots_count = snapshots.len()))]
    pub async fn save_snapshots(&self, snapshots: &[RawSnapshot]) -> anyhow::Result<()> {
        if snapshots.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for s in snapshots {
            sqlx::query(
                "INSERT INTO vm_snapshots (vm_id, captured_at, data) VALUES ($1, $2, $3)",
            )
            .bind(&s.vm_id)
            .bind(s.captured_at.timestamp_millis())
            .bind(serde_json::to_string(&s.data)?)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Distinct VM ids, sorted.
    #[instrument(skip(self), fields(repo = "snapshots", operation = "list_vms"))]
    pub async fn list_vms(&self) -> anyhow::Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT vm_id FROM vm_snapshots ORDER BY vm_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// First and last capture time over all VMs, `None` for an empty store.
    pub async fn time_bounds(&self) -> anyhow::Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let (min, max) = sqlx::query_as::<_, (Option<i64>, Option<i64>)>(
            "SELECT MIN(captured_at), MAX(captured_at) FROM vm_snapshots",
        )
        .fetch_one(&self.pool)
        .await?;
        let (Some(min), Some(max)) = (min, max) else {
            return Ok(None);
        };
        Ok(row::from_millis(min).zip(row::from_millis(max)))
    }

    /// Samples of `vm_id` captured in `[from, to]` (either bound optional), ascending.
    /// Rows whose document cannot be decoded are skipped with a warning.
    #[instrument(skip(self), fields(repo = "snapshots", operation = "get_vm_samples"))]
    pub async fn get_vm_samples(
        &self,
        vm_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<CounterSample>> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT captured_at, data FROM vm_snapshots
             WHERE vm_id = $1 AND captured_at >= $2 AND captured_at <= $3
             ORDER BY captured_at ASC, id ASC",
        )
        .bind(vm_id)
        .bind(from.map_or(i64::MIN, |t| t.timestamp_millis()))
        .bind(to.map_or(i64::MAX, |t| t.timestamp_millis()))
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for (captured_at, data) in rows {
            match row::decode(captured_at, &data) {
                Ok(sample) => out.push(sample),
                Err(e) => warn!(
                    vm_id = %vm_id,
                    captured_at,
                    error = %e,
                    "skipping undecodable snapshot"
                ),
            }
        }
        Ok(out)
    }

    /// Delete snapshots captured before `cutoff`. Returns the number of rows removed.
    #[instrument(skip(self), fields(repo = "snapshots", operation = "prune_before"))]
    pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM vm_snapshots WHERE captured_at < $1")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn vacuum(&self) -> anyhow::Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }
}
