// OS metrics via sysinfo. Handles are kept across calls so CPU and process
// usage have a previous refresh to diff against.

use crate::models::ProcessSample;
use crate::sampler::{HostReading, MetricsSource, NetCounters};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use sysinfo::{Disks, Networks, ProcessesToUpdate, System};
use tracing::instrument;

pub struct SysinfoRepo {
    sys: Arc<Mutex<System>>,
    disks: Arc<Mutex<Disks>>,
    networks: Arc<Mutex<Networks>>,
    last_cpu_refresh: Arc<Mutex<Option<(Instant, f64)>>>,
    process_refreshes: Arc<AtomicU64>,
}

impl Default for SysinfoRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoRepo {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let disks = Disks::new_with_refreshed_list();
        let networks = Networks::new_with_refreshed_list();
        Self {
            sys: Arc::new(Mutex::new(sys)),
            disks: Arc::new(Mutex::new(disks)),
            networks: Arc::new(Mutex::new(networks)),
            last_cpu_refresh: Arc::new(Mutex::new(None)),
            process_refreshes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of process table refreshes so far. Per-process CPU is measured between
    /// refreshes, so a tick must do exactly one.
    pub fn process_refreshes(&self) -> u64 {
        self.process_refreshes.load(Ordering::Relaxed)
    }

    /// Global CPU usage. Refreshing faster than sysinfo's minimum interval returns the
    /// cached value instead of blocking.
    fn cpu_usage(sys: &mut System, last_cpu_refresh: &Mutex<Option<(Instant, f64)>>) -> f64 {
        let now = Instant::now();
        let Ok(mut guard) = last_cpu_refresh.lock() else {
            sys.refresh_cpu_all();
            return 0.0;
        };
        match *guard {
            Some((prev_ts, prev_usage))
                if now.duration_since(prev_ts) < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL =>
            {
                prev_usage
            }
            Some(_) => {
                sys.refresh_cpu_all();
                let usage = sys.global_cpu_usage() as f64;
                *guard = Some((now, usage));
                usage
            }
            None => {
                // First call only establishes the baseline
                sys.refresh_cpu_all();
                *guard = Some((now, 0.0));
                0.0
            }
        }
    }
}

/// Root volume: "/" when mounted, otherwise the first listed disk.
fn root_volume(disks: &Disks) -> (u64, u64) {
    let list = disks.list();
    list.iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| list.first())
        .map(|d| (d.available_space(), d.total_space()))
        .unwrap_or((0, 0))
}

impl MetricsSource for SysinfoRepo {
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "read_host"))]
    async fn read_host(&self) -> anyhow::Result<HostReading> {
        let sys = self.sys.clone();
        let disks = self.disks.clone();
        let networks = self.networks.clone();
        let last_cpu_refresh = self.last_cpu_refresh.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            let cpu_pct = Self::cpu_usage(&mut sys, &last_cpu_refresh);

            sys.refresh_memory();
            let ram_total_bytes = sys.total_memory();
            let ram_used_bytes = ram_total_bytes.saturating_sub(sys.available_memory());
            // Counted from the last process refresh; read_processes owns that refresh.
            let process_count = sys.processes().len() as u32;
            drop(sys);

            let mut disks = disks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
            disks.refresh(true);
            let (disk_free_bytes, disk_total_bytes) = root_volume(&disks);
            drop(disks);

            let mut networks = networks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
            networks.refresh(true);
            let net = networks
                .list()
                .values()
                .fold(NetCounters::default(), |acc, data| NetCounters {
                    bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
                    bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
                });

            Ok(HostReading {
                cpu_pct: cpu_pct.clamp(0.0, 100.0),
                ram_used_bytes,
                ram_total_bytes,
                disk_free_bytes,
                disk_total_bytes,
                process_count,
                net,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "read_processes"))]
    async fn read_processes(&self) -> anyhow::Result<Vec<ProcessSample>> {
        let sys = self.sys.clone();
        let refreshes = self.process_refreshes.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_processes(ProcessesToUpdate::All, true);
            refreshes.fetch_add(1, Ordering::Relaxed);
            let cores = sys.cpus().len().max(1) as f64;
            let total_memory = sys.total_memory();

            let mut processes: Vec<(u32, ProcessSample)> = sys
                .processes()
                .iter()
                .map(|(pid, p)| {
                    let ram_pct = if total_memory > 0 {
                        p.memory() as f64 / total_memory as f64 * 100.0
                    } else {
                        0.0
                    };
                    (
                        pid.as_u32(),
                        ProcessSample {
                            pid: pid.as_u32(),
                            name: p.name().to_string_lossy().into_owned(),
                            cpu_pct: round1(p.cpu_usage() as f64 / cores),
                            ram_pct: round1(ram_pct),
                            uptime_secs: p.run_time(),
                        },
                    )
                })
                .collect();
            // HashMap iteration order is arbitrary; pid order is the stable enumeration order
            processes.sort_by_key(|(pid, _)| *pid);
            Ok(processes.into_iter().map(|(_, p)| p).collect())
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn one_process_refresh_per_tick() {
        let repo = SysinfoRepo::new();
        for tick in 1..=3 {
            let host = repo.read_host().await.unwrap();
            assert!(host.process_count > 0);
            assert_eq!(repo.process_refreshes(), tick - 1);
            repo.read_processes().await.unwrap();
            assert_eq!(repo.process_refreshes(), tick);
        }
    }
}
