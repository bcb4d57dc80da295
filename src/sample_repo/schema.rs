// Table definitions. Every statement is IF NOT EXISTS so init can run on every startup.

use sqlx::{Sqlite, Transaction};

pub(super) async fn init_sample_table(tx: &mut Transaction<'_, Sqlite>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp REAL NOT NULL UNIQUE,
            cpu REAL NOT NULL,
            ram REAL NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&mut **tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_samples_timestamp ON samples(timestamp)")
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub(super) async fn init_anomaly_table(
    tx: &mut Transaction<'_, Sqlite>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS anomaly_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp REAL NOT NULL,
            metric TEXT NOT NULL,
            value REAL NOT NULL,
            baseline REAL NOT NULL,
            stddev REAL NOT NULL,
            severity TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut **tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_anomaly_log_timestamp ON anomaly_log(timestamp)")
        .execute(&mut **tx)
        .await?;
    Ok(())
}
