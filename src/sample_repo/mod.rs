// SQLite sample store: idempotent inserts keyed by timestamp, trailing-window
// summaries, anomaly audit log and retention cleanup.
// One connection only, so multi-statement operations never interleave.

mod error;
mod schema;

pub use error::StoreError;

use crate::clock::Clock;
use crate::models::{AnomalyLogRow, Baseline, MetricKind, SamplePoint, Severity, StoredSample, Summary};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

const SECS_PER_MINUTE: f64 = 60.0;
const SECS_PER_DAY: f64 = 86_400.0;

/// Rows removed by a retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub samples_deleted: u64,
    pub anomalies_deleted: u64,
}

/// Tuning for query bounds.
#[derive(Debug, Clone, Copy)]
pub struct RepoLimits {
    /// Hard cap on rows returned by `recent`.
    pub recent_row_limit: u32,
    /// Rows required before `baseline` reports ready.
    pub baseline_min_samples: u64,
}

impl Default for RepoLimits {
    fn default() -> Self {
        Self {
            recent_row_limit: 3600,
            baseline_min_samples: 10,
        }
    }
}

pub struct SampleRepo {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    limits: RepoLimits,
}

/// Population stddev from E[x] and E[x^2]; rounding can make the variance slightly negative.
fn stddev_from_moments(mean: f64, mean_sq: f64) -> f64 {
    (mean_sq - mean * mean).max(0.0).sqrt()
}

impl SampleRepo {
    pub async fn connect(
        path: &str,
        clock: Arc<dyn Clock>,
        limits: RepoLimits,
    ) -> Result<Self, StoreError> {
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
            .max_connections(1)
            .connect_with(opts)
            .await?;
        Ok(Self {
            pool,
            clock,
            limits,
        })
    }

    /// Creates tables and indexes if missing. Safe on every startup.
    #[instrument(skip(self), fields(repo = "samples", operation = "init"))]
    pub async fn init(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        schema::init_sample_table(&mut tx).await?;
        schema::init_anomaly_table(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    fn now_ms(&self) -> i64 {
        (self.clock.now() * 1000.0) as i64
    }

    /// Inserts a sample stamped with the current time.
    pub async fn save(&self, cpu: f64, ram: f64) -> Result<bool, StoreError> {
        self.save_at(self.clock.now(), cpu, ram).await
    }

    /// Inserts a sample at `timestamp`. Returns false when a row with that timestamp
    /// already exists; the duplicate is ignored, not an error.
    #[instrument(skip(self), fields(repo = "samples", operation = "save"))]
    pub async fn save_at(&self, timestamp: f64, cpu: f64, ram: f64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let r = sqlx::query(
            "INSERT OR IGNORE INTO samples (timestamp, cpu, ram, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(timestamp)
        .bind(cpu)
        .bind(ram)
        .bind(self.now_ms())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(r.rows_affected() > 0)
    }

    /// Samples from the last `minutes`, most recent first, capped at the row limit.
    #[instrument(skip(self), fields(repo = "samples", operation = "recent"))]
    pub async fn recent(&self, minutes: u32) -> Result<Vec<SamplePoint>, StoreError> {
        let since = self.clock.now() - minutes as f64 * SECS_PER_MINUTE;
        let rows = sqlx::query(
            "SELECT timestamp, cpu, ram FROM samples WHERE timestamp >= $1
             ORDER BY timestamp DESC LIMIT $2",
        )
        .bind(since)
        .bind(self.limits.recent_row_limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(SamplePoint {
                timestamp: row.try_get("timestamp")?,
                cpu: row.try_get("cpu")?,
                ram: row.try_get("ram")?,
            });
        }
        Ok(out)
    }

    /// Full rows, most recent first.
    pub async fn latest_samples(&self, limit: u32) -> Result<Vec<StoredSample>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, timestamp, cpu, ram, created_at FROM samples ORDER BY timestamp DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(StoredSample {
                id: row.try_get("id")?,
                timestamp: row.try_get("timestamp")?,
                cpu: row.try_get("cpu")?,
                ram: row.try_get("ram")?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(out)
    }

    pub async fn count_samples(&self) -> Result<u64, StoreError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM samples")
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    /// Count, mean, max and population stddev over the last `minutes`.
    /// An empty window yields an all-zero summary.
    #[instrument(skip(self), fields(repo = "samples", operation = "summary"))]
    pub async fn summary(&self, minutes: u32) -> Result<Summary, StoreError> {
        let since = self.clock.now() - minutes as f64 * SECS_PER_MINUTE;
        let row = sqlx::query(
            "SELECT COUNT(*) AS samples,
                    AVG(cpu) AS avg_cpu, AVG(ram) AS avg_ram,
                    MAX(cpu) AS max_cpu, MAX(ram) AS max_ram,
                    AVG(cpu * cpu) AS sq_cpu, AVG(ram * ram) AS sq_ram
             FROM samples WHERE timestamp >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        let samples: i64 = row.try_get("samples")?;
        if samples <= 0 {
            return Ok(Summary::default());
        }
        let avg_cpu = row.try_get::<Option<f64>, _>("avg_cpu")?.unwrap_or(0.0);
        let avg_ram = row.try_get::<Option<f64>, _>("avg_ram")?.unwrap_or(0.0);
        let sq_cpu = row.try_get::<Option<f64>, _>("sq_cpu")?.unwrap_or(0.0);
        let sq_ram = row.try_get::<Option<f64>, _>("sq_ram")?.unwrap_or(0.0);

        Ok(Summary {
            samples: samples as u64,
            avg_cpu,
            avg_ram,
            max_cpu: row.try_get::<Option<f64>, _>("max_cpu")?.unwrap_or(0.0),
            max_ram: row.try_get::<Option<f64>, _>("max_ram")?.unwrap_or(0.0),
            stddev_cpu: stddev_from_moments(avg_cpu, sq_cpu),
            stddev_ram: stddev_from_moments(avg_ram, sq_ram),
        })
    }

    /// Mean/stddev reference over the last `minutes`; not ready until the window
    /// holds `baseline_min_samples` rows.
    pub async fn baseline(&self, minutes: u32) -> Result<Baseline, StoreError> {
        let s = self.summary(minutes).await?;
        if s.samples < self.limits.baseline_min_samples {
            return Ok(Baseline::not_ready(s.samples));
        }
        Ok(Baseline {
            avg_cpu: s.avg_cpu,
            std_cpu: s.stddev_cpu,
            avg_ram: s.avg_ram,
            std_ram: s.stddev_ram,
            samples: s.samples,
            ready: true,
        })
    }

    #[instrument(skip(self, row), fields(repo = "samples", operation = "log_anomaly", metric = %row.metric))]
    pub async fn log_anomaly(&self, row: &AnomalyLogRow) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO anomaly_log (timestamp, metric, value, baseline, stddev, severity)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(row.timestamp)
        .bind(row.metric.as_str())
        .bind(row.value)
        .bind(row.baseline)
        .bind(row.stddev)
        .bind(row.severity.as_str())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Audit rows, most recent first. Rows naming an unknown metric are skipped.
    pub async fn recent_anomalies(&self, limit: u32) -> Result<Vec<AnomalyLogRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT timestamp, metric, value, baseline, stddev, severity FROM anomaly_log
             ORDER BY timestamp DESC, id DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let metric: String = row.try_get("metric")?;
            let Some(metric) = MetricKind::parse(&metric) else {
                tracing::debug!(metric = %metric, "skipping anomaly row with unknown metric");
                continue;
            };
            let severity: String = row.try_get("severity")?;
            out.push(AnomalyLogRow {
                timestamp: row.try_get("timestamp")?,
                metric,
                value: row.try_get("value")?,
                baseline: row.try_get("baseline")?,
                stddev: row.try_get("stddev")?,
                severity: Severity::from_db(&severity),
            });
        }
        Ok(out)
    }

    /// Deletes samples and anomaly rows older than `days` in one transaction.
    #[instrument(skip(self), fields(repo = "samples", operation = "cleanup"))]
    pub async fn cleanup(&self, days: u32) -> Result<CleanupReport, StoreError> {
        let now = self.clock.now();
        if now <= 0.0 {
            return Err(StoreError::Clock(format!("refusing cleanup with clock at {}", now)));
        }
        let cutoff = now - days as f64 * SECS_PER_DAY;
        let mut tx = self.pool.begin().await?;
        let samples = sqlx::query("DELETE FROM samples WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;
        let anomalies = sqlx::query("DELETE FROM anomaly_log WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(CleanupReport {
            samples_deleted: samples.rows_affected(),
            anomalies_deleted: anomalies.rows_affected(),
        })
    }

    /// Reclaim space after deletes (run periodically after cleanup).
    #[instrument(skip(self), fields(repo = "samples", operation = "vacuum"))]
    pub async fn vacuum(&self) -> Result<(), StoreError> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
