// Worker tests: sampling loop, serialized writer and clean shutdown

mod common;

use common::{ScriptedSource, process, reading};
use guardian::clock::{Clock, SystemClock};
use guardian::config::AppConfig;
use guardian::models::MetricKind;
use guardian::pipeline::Pipeline;
use guardian::sample_repo::{RepoLimits, SampleRepo};
use guardian::sampler::Sampler;
use guardian::worker::{self, WorkerConfig, WorkerDeps, WorkerStats, WriteCommand};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{broadcast, mpsc, oneshot};

fn worker_config() -> WorkerConfig {
    WorkerConfig {
        sample_interval_ms: 25,
        stats_log_interval_secs: 3600,
        top_processes: 2,
        summary_window_minutes: 60,
    }
}

#[tokio::test]
async fn worker_persists_and_broadcasts_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guardian.db");
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let repo = Arc::new(
        SampleRepo::connect(path.to_str().unwrap(), clock.clone(), RepoLimits::default())
            .await
            .unwrap(),
    );
    repo.init().await.unwrap();

    let source = Arc::new(ScriptedSource::new());
    source.push(reading(20.0, 0, 0));
    source.set_processes(vec![
        process(1, "init", 0.1),
        process(2, "busy", 40.0),
        process(3, "idle-ish", 2.0),
    ]);

    let stats = Arc::new(WorkerStats::default());
    let (write_tx, write_rx) = mpsc::channel(64);
    let writer = worker::spawn_sample_writer(write_rx, repo.clone(), stats.clone());

    let (tx, mut rx) = broadcast::channel(16);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let deps = WorkerDeps {
        sampler: Sampler::new(source, clock.clone()),
        pipeline: Pipeline::new(&AppConfig::default()),
        repo: Some(repo.clone()),
        tx,
        write_tx: Some(write_tx),
        stats: stats.clone(),
        shutdown_rx,
    };
    let handle = worker::spawn(deps, worker_config());

    let frame = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
        .await
        .expect("frame within timeout")
        .unwrap();
    assert_eq!(frame.snapshot.cpu_pct, 20.0);
    assert_eq!(frame.history[&MetricKind::Cpu].len(), 24);
    let names: Vec<&str> = frame.processes.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["busy", "idle-ish"]);
    assert!(!frame.store_degraded);

    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();
    // The worker owned the only sender; the writer drains and exits.
    writer.await.unwrap();

    assert!(stats.ticks_total.load(Ordering::Relaxed) >= 1);
    assert!(stats.store_healthy.load(Ordering::Relaxed));
    let saved = repo.count_samples().await.unwrap();
    assert!(saved >= 1);
    assert_eq!(saved, stats.samples_saved_total.load(Ordering::Relaxed));
    repo.close().await;
}

#[tokio::test]
async fn worker_without_store_reports_degraded() {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let source = Arc::new(ScriptedSource::new());
    source.push(reading(10.0, 0, 0));

    let (tx, mut rx) = broadcast::channel(16);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let deps = WorkerDeps {
        sampler: Sampler::new(source, clock),
        pipeline: Pipeline::new(&AppConfig::default()),
        repo: None,
        tx,
        write_tx: None,
        stats: Arc::new(WorkerStats::default()),
        shutdown_rx,
    };
    let handle = worker::spawn(deps, worker_config());

    let frame = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
        .await
        .expect("frame within timeout")
        .unwrap();
    assert!(frame.store_degraded);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn writer_marks_store_unhealthy_after_failed_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guardian.db");
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    // Tables never created: every write fails.
    let repo = Arc::new(
        SampleRepo::connect(path.to_str().unwrap(), clock, RepoLimits::default())
            .await
            .unwrap(),
    );

    let stats = Arc::new(WorkerStats::default());
    let (write_tx, write_rx) = mpsc::channel(4);
    let writer = worker::spawn_sample_writer(write_rx, repo.clone(), stats.clone());
    write_tx
        .send(WriteCommand::Sample {
            timestamp: 1.0,
            cpu: 1.0,
            ram: 1.0,
        })
        .await
        .unwrap();
    drop(write_tx);
    writer.await.unwrap();

    assert!(!stats.store_healthy.load(Ordering::Relaxed));
    assert_eq!(stats.samples_saved_total.load(Ordering::Relaxed), 0);
}
