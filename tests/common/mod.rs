// Shared test helpers: scripted OS source and snapshot builders

#![allow(dead_code)]

use guardian::models::{ProcessSample, Snapshot};
use guardian::sampler::{HostReading, MetricsSource, NetCounters};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued host readings in order; once drained it keeps returning the last one.
#[derive(Default)]
pub struct ScriptedSource {
    readings: Mutex<VecDeque<Result<HostReading, String>>>,
    last: Mutex<HostReading>,
    processes: Mutex<Vec<ProcessSample>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reading: HostReading) {
        self.readings.lock().unwrap().push_back(Ok(reading));
    }

    pub fn push_error(&self, msg: &str) {
        self.readings.lock().unwrap().push_back(Err(msg.to_string()));
    }

    pub fn set_processes(&self, processes: Vec<ProcessSample>) {
        *self.processes.lock().unwrap() = processes;
    }
}

impl MetricsSource for ScriptedSource {
    async fn read_host(&self) -> anyhow::Result<HostReading> {
        let next = self.readings.lock().unwrap().pop_front();
        match next {
            Some(Ok(r)) => {
                *self.last.lock().unwrap() = r.clone();
                Ok(r)
            }
            Some(Err(msg)) => Err(anyhow::anyhow!(msg)),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }

    async fn read_processes(&self) -> anyhow::Result<Vec<ProcessSample>> {
        Ok(self.processes.lock().unwrap().clone())
    }
}

pub fn reading(cpu: f64, sent: u64, recv: u64) -> HostReading {
    HostReading {
        cpu_pct: cpu,
        ram_used_bytes: 4 * 1024 * 1024 * 1024,
        ram_total_bytes: 16 * 1024 * 1024 * 1024,
        disk_free_bytes: 300 * 1024 * 1024 * 1024,
        disk_total_bytes: 500 * 1024 * 1024 * 1024,
        process_count: 321,
        net: NetCounters {
            bytes_sent: sent,
            bytes_recv: recv,
        },
    }
}

pub fn snapshot(timestamp: f64, cpu: f64) -> Snapshot {
    Snapshot {
        timestamp,
        cpu_pct: cpu,
        ram_pct: 40.0,
        disk_pct: 50.0,
        ram_used_mb: 4096.0,
        ram_total_mb: 10240.0,
        disk_free_gb: 250.0,
        disk_total_gb: 500.0,
        process_count: 200,
        ..Snapshot::default()
    }
}

pub fn process(pid: u32, name: &str, cpu: f64) -> ProcessSample {
    ProcessSample {
        pid,
        name: name.into(),
        cpu_pct: cpu,
        ram_pct: 0.5,
        uptime_secs: 10,
    }
}
