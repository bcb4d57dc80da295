use anyhow::Result;
use guardian::*;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Opens and initializes the store. Monitoring carries on without persistence if this fails.
async fn open_store(
    app_config: &config::AppConfig,
    clock: Arc<dyn clock::Clock>,
) -> Option<Arc<sample_repo::SampleRepo>> {
    let limits = sample_repo::RepoLimits {
        recent_row_limit: app_config.monitoring.recent_row_limit,
        baseline_min_samples: app_config.monitoring.baseline_min_samples,
    };
    let repo = match sample_repo::SampleRepo::connect(&app_config.database.path, clock, limits).await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, path = %app_config.database.path, "sample store unavailable; running without persistence");
            return None;
        }
    };
    if let Err(e) = repo.init().await {
        tracing::warn!(error = %e, "sample store init failed; running without persistence");
        return None;
    }
    if let Err(e) =
        maintenance_worker::run_cleanup(&repo, app_config.database.retention_days).await
    {
        tracing::warn!(error = %e, "startup cleanup failed");
    }
    Some(Arc::new(repo))
}

/// Headless frame consumer: a terminal renderer would subscribe the same way.
fn spawn_frame_logger(mut rx: broadcast::Receiver<models::DashboardFrame>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(frame) => {
                    let s = &frame.snapshot;
                    tracing::debug!(
                        cpu = s.cpu_pct,
                        ram = s.ram_pct,
                        disk = s.disk_pct,
                        up_kbps = s.net_sent_speed_kbps,
                        down_kbps = s.net_recv_speed_kbps,
                        processes = s.process_count,
                        status = %frame.overall_severity(),
                        store_degraded = frame.store_degraded,
                        "frame"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "frame logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        db = %app_config.database.path,
        sample_interval_ms = app_config.monitoring.sample_interval_ms,
        "guardian starting"
    );

    let clock: Arc<dyn clock::Clock> = Arc::new(clock::SystemClock);
    let repo = open_store(&app_config, clock.clone()).await;

    let (tx, rx) =
        broadcast::channel::<models::DashboardFrame>(app_config.monitoring.frame_channel_capacity);
    let frame_logger = spawn_frame_logger(rx);

    let stats = Arc::new(worker::WorkerStats::default());
    let (write_tx, writer_handle, maintenance_handle) = match repo {
        Some(ref repo) => {
            let (write_tx, write_rx) =
                tokio::sync::mpsc::channel(app_config.monitoring.writer_channel_capacity);
            let writer = worker::spawn_sample_writer(write_rx, repo.clone(), stats.clone());
            let maintenance = maintenance_worker::spawn(
                repo.clone(),
                maintenance_worker::MaintenanceConfig {
                    cleanup_interval_secs: app_config.database.cleanup_interval_secs,
                    retention_days: app_config.database.retention_days,
                    vacuum_schedule: app_config.database.vacuum_schedule.clone(),
                    vacuum_interval_secs: app_config.database.vacuum_interval_secs,
                },
            );
            (Some(write_tx), Some(writer), Some(maintenance))
        }
        None => (None, None, None),
    };

    let sysinfo_repo = Arc::new(sysinfo_repo::SysinfoRepo::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            sampler: sampler::Sampler::new(sysinfo_repo, clock),
            pipeline: pipeline::Pipeline::new(&app_config),
            repo: repo.clone(),
            tx,
            write_tx,
            stats,
            shutdown_rx,
        },
        worker::WorkerConfig {
            sample_interval_ms: app_config.monitoring.sample_interval_ms,
            stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
            top_processes: app_config.monitoring.top_processes,
            summary_window_minutes: app_config.monitoring.summary_window_minutes,
        },
    );

    shutdown_signal().await;
    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(());
    // Worker finishes its current tick, then drops the writer's sender
    let _ = worker_handle.await;
    if let Some(writer) = writer_handle {
        let _ = writer.await;
    }
    if let Some(maintenance) = maintenance_handle {
        maintenance.abort();
    }
    let _ = frame_logger.await;
    if let Some(repo) = repo {
        repo.close().await;
    }
    Ok(())
}
