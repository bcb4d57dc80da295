// Background worker: retention cleanup every cleanup_interval_secs, VACUUM on a
// configurable schedule (cron expression or fixed interval).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::time::Instant;

use crate::sample_repo::{CleanupReport, SampleRepo, StoreError};
use tracing::{info, instrument, warn};

/// Retry delay when a cron expression has no upcoming fire time.
const IDLE_SCHEDULE_RETRY: Duration = Duration::from_secs(3600);

/// Config for the maintenance worker.
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    pub cleanup_interval_secs: u64,
    pub retention_days: u32,
    /// Optional cron expression for VACUUM (seconds field first). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    pub vacuum_interval_secs: u64,
}

/// When VACUUM runs next. Cron wins over the fixed interval.
#[derive(Debug, Clone)]
pub enum VacuumPlan {
    Cron(Box<cron::Schedule>),
    Every(Duration),
}

impl VacuumPlan {
    /// An unparsable schedule is logged and falls back to the fixed interval.
    pub fn from_config(config: &MaintenanceConfig) -> Self {
        let every = Self::Every(Duration::from_secs(config.vacuum_interval_secs));
        let Some(expr) = config.vacuum_schedule.as_deref() else {
            return every;
        };
        match cron::Schedule::from_str(expr) {
            Ok(schedule) => Self::Cron(Box::new(schedule)),
            Err(e) => {
                warn!(cron = %expr, error = %e, "invalid vacuum_schedule; using vacuum_interval_secs");
                every
            }
        }
    }

    /// Time from `now` until the next VACUUM.
    pub fn delay_from(&self, now: DateTime<Local>) -> Duration {
        match self {
            Self::Every(interval) => *interval,
            Self::Cron(schedule) => schedule
                .after(&now)
                .next()
                .and_then(|next| (next - now).to_std().ok())
                .unwrap_or(IDLE_SCHEDULE_RETRY),
        }
    }

    fn next_deadline(&self) -> Instant {
        Instant::now() + self.delay_from(Local::now())
    }
}

/// Spawns the maintenance worker. Returns a join handle.
pub fn spawn(repo: Arc<SampleRepo>, config: MaintenanceConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(repo, config).await;
    })
}

#[instrument(skip(repo), fields(interval_secs = config.cleanup_interval_secs))]
async fn run(repo: Arc<SampleRepo>, config: MaintenanceConfig) {
    let mut cleanup_interval =
        tokio::time::interval(Duration::from_secs(config.cleanup_interval_secs));
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The startup pass already ran; skip the immediate first tick.
    cleanup_interval.tick().await;

    let plan = VacuumPlan::from_config(&config);
    let mut vacuum_at = plan.next_deadline();

    loop {
        tokio::select! {
            _ = cleanup_interval.tick() => {
                if let Err(e) = run_cleanup(&repo, config.retention_days).await {
                    warn!(error = %e, "cleanup failed");
                }
            }
            _ = tokio::time::sleep_until(vacuum_at) => {
                match repo.vacuum().await {
                    Ok(()) => info!("vacuum complete"),
                    Err(e) => warn!(error = %e, "vacuum failed"),
                }
                vacuum_at = plan.next_deadline();
            }
        }
    }
}

/// Runs one retention sweep. Used by the worker loop and once at startup.
pub async fn run_cleanup(repo: &SampleRepo, retention_days: u32) -> Result<CleanupReport, StoreError> {
    let report = repo.cleanup(retention_days).await?;
    if report.samples_deleted > 0 || report.anomalies_deleted > 0 {
        info!(
            samples_deleted = report.samples_deleted,
            anomalies_deleted = report.anomalies_deleted,
            retention_days,
            "retention cleanup"
        );
    }
    Ok(report)
}
