// Sampling loop. The worker task is the single owner of pipeline state; persistence runs
// in a dedicated writer task fed over a channel and processed strictly in order.

use crate::models::{AnomalyLogRow, Baseline, DashboardFrame, Summary};
use crate::pipeline::Pipeline;
use crate::sample_repo::SampleRepo;
use crate::sampler::{MetricsSource, Sampler};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Duration, Instant, interval};
use tracing::Instrument;

/// Rate limit for the "no receivers" message when nothing is rendering frames.
const NO_RECEIVERS_WARN_INTERVAL: Duration = Duration::from_secs(60);

/// Persistence work handed to the writer task.
#[derive(Debug, Clone)]
pub enum WriteCommand {
    Sample { timestamp: f64, cpu: f64, ram: f64 },
    Anomaly(AnomalyLogRow),
}

/// Counters and health shared between the worker, the writer and `main`.
#[derive(Debug)]
pub struct WorkerStats {
    pub ticks_total: AtomicU64,
    pub samples_saved_total: AtomicU64,
    pub alerts_surfaced_total: AtomicU64,
    /// False after the most recent write failed.
    pub store_healthy: AtomicBool,
}

impl Default for WorkerStats {
    fn default() -> Self {
        Self {
            ticks_total: AtomicU64::new(0),
            samples_saved_total: AtomicU64::new(0),
            alerts_surfaced_total: AtomicU64::new(0),
            store_healthy: AtomicBool::new(true),
        }
    }
}

/// Sampler, pipeline state, channels and shutdown for the worker.
pub struct WorkerDeps<S> {
    pub sampler: Sampler<S>,
    pub pipeline: Pipeline,
    /// Used for periodic summary/baseline reads; `None` when the store is unavailable.
    pub repo: Option<Arc<SampleRepo>>,
    pub tx: broadcast::Sender<DashboardFrame>,
    pub write_tx: Option<mpsc::Sender<WriteCommand>>,
    pub stats: Arc<WorkerStats>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

/// Worker timing config. Stats logging uses a real-time interval independent of sampling.
pub struct WorkerConfig {
    pub sample_interval_ms: u64,
    pub stats_log_interval_secs: u64,
    pub top_processes: usize,
    pub summary_window_minutes: u32,
}

/// Spawns the writer task. It exits once every sender is dropped and the channel is drained.
pub fn spawn_sample_writer(
    mut write_rx: mpsc::Receiver<WriteCommand>,
    repo: Arc<SampleRepo>,
    stats: Arc<WorkerStats>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(cmd) = write_rx.recv().await {
            let result = match cmd {
                WriteCommand::Sample {
                    timestamp,
                    cpu,
                    ram,
                } => repo.save_at(timestamp, cpu, ram).await.map(|inserted| {
                    if inserted {
                        stats.samples_saved_total.fetch_add(1, Ordering::Relaxed);
                    } else {
                        tracing::debug!(timestamp, "duplicate sample timestamp ignored");
                    }
                }),
                WriteCommand::Anomaly(row) => repo.log_anomaly(&row).await,
            };
            match result {
                Ok(()) => stats.store_healthy.store(true, Ordering::Relaxed),
                Err(e) => {
                    tracing::warn!(error = %e, operation = "write_command", "sample writer: write failed");
                    stats.store_healthy.store(false, Ordering::Relaxed);
                }
            }
        }
        tracing::debug!("Sample writer shutting down");
    })
}

async fn refresh_store_stats(repo: &SampleRepo, minutes: u32) -> (Summary, Baseline) {
    let summary = repo.summary(minutes).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, operation = "summary", "summary query failed");
        Summary::default()
    });
    let baseline = repo.baseline(minutes).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, operation = "baseline", "baseline query failed");
        Baseline::default()
    });
    (summary, baseline)
}

pub fn spawn<S>(deps: WorkerDeps<S>, config: WorkerConfig) -> tokio::task::JoinHandle<()>
where
    S: MetricsSource + 'static,
{
    let WorkerDeps {
        mut sampler,
        mut pipeline,
        repo,
        tx,
        write_tx,
        stats,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        sample_interval_ms,
        stats_log_interval_secs,
        top_processes,
        summary_window_minutes,
    } = config;

    let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", sample_interval_ms);

    tokio::spawn(
        async move {
            let mut tick = interval(Duration::from_millis(sample_interval_ms));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
            stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            let mut last_no_receivers_warn: Option<Instant> = None;

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let snapshot = sampler.sample().await;
                        let processes = sampler.top_processes(top_processes).await;
                        let store_degraded = write_tx.is_none()
                            || !stats.store_healthy.load(Ordering::Relaxed);

                        let timestamp = snapshot.timestamp;
                        let (cpu, ram) = (snapshot.cpu_pct, snapshot.ram_pct);
                        let out = pipeline.tick(snapshot, processes, store_degraded);
                        stats.ticks_total.fetch_add(1, Ordering::Relaxed);
                        stats
                            .alerts_surfaced_total
                            .fetch_add(out.frame.new_alerts.len() as u64, Ordering::Relaxed);

                        if let Some(ref write_tx) = write_tx {
                            let commands = std::iter::once(WriteCommand::Sample { timestamp, cpu, ram })
                                .chain(out.anomaly_rows.into_iter().map(WriteCommand::Anomaly));
                            for cmd in commands {
                                if write_tx.send(cmd).await.is_err() {
                                    tracing::debug!("Sample writer channel closed");
                                    break;
                                }
                            }
                        }

                        if tx.send(out.frame).is_err() {
                            let should_warn = last_no_receivers_warn
                                .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_WARN_INTERVAL);
                            if should_warn {
                                tracing::debug!(
                                    operation = "broadcast_frame",
                                    "No frame consumers; broadcast channel has no receivers"
                                );
                                last_no_receivers_warn = Some(Instant::now());
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Worker shutting down");
                        break;
                    }
                    _ = stats_log_tick.tick() => {
                        if let Some(ref repo) = repo {
                            let (summary, baseline) =
                                refresh_store_stats(repo, summary_window_minutes).await;
                            pipeline.set_store_stats(summary, baseline);
                            tracing::info!(
                                samples = summary.samples,
                                avg_cpu = summary.avg_cpu,
                                max_cpu = summary.max_cpu,
                                avg_ram = summary.avg_ram,
                                max_ram = summary.max_ram,
                                baseline_ready = baseline.ready,
                                "stored window summary"
                            );
                        }
                        tracing::info!(
                            ticks_total = stats.ticks_total.load(Ordering::Relaxed),
                            samples_saved_total = stats.samples_saved_total.load(Ordering::Relaxed),
                            alerts_surfaced_total = stats.alerts_surfaced_total.load(Ordering::Relaxed),
                            store_healthy = stats.store_healthy.load(Ordering::Relaxed),
                            "app stats"
                        );
                    }
                }
            }
        }
        .instrument(worker_span),
    )
}
