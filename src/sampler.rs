// Sampler: turns raw OS readings into a Snapshot and derives network throughput
// from the delta against the previous reading.

use crate::clock::Clock;
use crate::models::{ProcessSample, Snapshot};
use std::future::Future;
use std::sync::Arc;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Idle pseudo-processes that would otherwise top every CPU ranking.
const SKIP_PROCESSES: [&str; 2] = ["System Idle Process", "Idle"];

/// Cumulative interface byte counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// Instantaneous host reading as supplied by the OS collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostReading {
    pub cpu_pct: f64,
    pub ram_used_bytes: u64,
    pub ram_total_bytes: u64,
    pub disk_free_bytes: u64,
    pub disk_total_bytes: u64,
    pub process_count: u32,
    pub net: NetCounters,
}

/// OS metrics collaborator. Implementations must skip processes that vanish mid-enumeration.
pub trait MetricsSource: Send + Sync {
    fn read_host(&self) -> impl Future<Output = anyhow::Result<HostReading>> + Send;

    /// Per-process samples with CPU% already normalized by core count, in enumeration order.
    fn read_processes(&self) -> impl Future<Output = anyhow::Result<Vec<ProcessSample>>> + Send;
}

/// KB/s between two counter readings. Non-positive `elapsed_secs` is treated as one second;
/// a counter that went backwards (interface reset) yields 0.
pub fn throughput_kbps(previous: u64, current: u64, elapsed_secs: f64) -> f64 {
    let elapsed = if elapsed_secs > 0.0 { elapsed_secs } else { 1.0 };
    ((current as f64 - previous as f64) / elapsed / 1024.0).max(0.0)
}

fn percent(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

pub struct Sampler<S> {
    source: Arc<S>,
    clock: Arc<dyn Clock>,
    last_net: Option<(NetCounters, f64)>,
}

impl<S: MetricsSource> Sampler<S> {
    pub fn new(source: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            last_net: None,
        }
    }

    /// Never fails: an OS read error is logged and a zero-valued snapshot is returned.
    /// The network baseline is only advanced by successful reads.
    pub async fn sample(&mut self) -> Snapshot {
        let now = self.clock.now();
        match self.source.read_host().await {
            Ok(reading) => self.build(reading, now),
            Err(e) => {
                tracing::warn!(error = %e, operation = "read_host", "host stats failed");
                Snapshot::zeroed(now)
            }
        }
    }

    fn build(&mut self, reading: HostReading, now: f64) -> Snapshot {
        let (sent_speed, recv_speed) = match self.last_net {
            Some((prev, prev_ts)) => {
                let elapsed = now - prev_ts;
                (
                    throughput_kbps(prev.bytes_sent, reading.net.bytes_sent, elapsed),
                    throughput_kbps(prev.bytes_recv, reading.net.bytes_recv, elapsed),
                )
            }
            None => (0.0, 0.0),
        };
        self.last_net = Some((reading.net, now));

        let disk_used = reading
            .disk_total_bytes
            .saturating_sub(reading.disk_free_bytes);
        Snapshot {
            timestamp: now,
            cpu_pct: reading.cpu_pct.clamp(0.0, 100.0),
            ram_pct: percent(reading.ram_used_bytes, reading.ram_total_bytes),
            disk_pct: percent(disk_used, reading.disk_total_bytes),
            ram_used_mb: reading.ram_used_bytes as f64 / BYTES_PER_MB,
            ram_total_mb: reading.ram_total_bytes as f64 / BYTES_PER_MB,
            disk_free_gb: reading.disk_free_bytes as f64 / BYTES_PER_GB,
            disk_total_gb: reading.disk_total_bytes as f64 / BYTES_PER_GB,
            process_count: reading.process_count,
            net_sent_total_mb: reading.net.bytes_sent as f64 / BYTES_PER_MB,
            net_recv_total_mb: reading.net.bytes_recv as f64 / BYTES_PER_MB,
            net_sent_speed_kbps: sent_speed,
            net_recv_speed_kbps: recv_speed,
        }
    }

    /// Top `limit` processes by CPU, descending; ties keep enumeration order.
    /// Empty on OS error.
    pub async fn top_processes(&self, limit: usize) -> Vec<ProcessSample> {
        match self.source.read_processes().await {
            Ok(processes) => rank_processes(processes, limit),
            Err(e) => {
                tracing::warn!(error = %e, operation = "read_processes", "process stats failed");
                Vec::new()
            }
        }
    }
}

pub fn rank_processes(processes: Vec<ProcessSample>, limit: usize) -> Vec<ProcessSample> {
    let mut ranked: Vec<ProcessSample> = processes
        .into_iter()
        .filter(|p| !SKIP_PROCESSES.contains(&p.name.as_str()))
        .collect();
    // sort_by is stable, so equal CPU keeps enumeration order
    ranked.sort_by(|a, b| b.cpu_pct.total_cmp(&a.cpu_pct));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(pid: u32, name: &str, cpu: f64) -> ProcessSample {
        ProcessSample {
            pid,
            name: name.into(),
            cpu_pct: cpu,
            ram_pct: 1.0,
            uptime_secs: 0,
        }
    }

    #[test]
    fn throughput_is_kb_per_second() {
        assert_eq!(throughput_kbps(1000, 2024, 1.0), 1.0);
        assert_eq!(throughput_kbps(2000, 2000, 1.0), 0.0);
        assert_eq!(throughput_kbps(0, 4096, 2.0), 2.0);
    }

    #[test]
    fn throughput_clamps_counter_reset() {
        assert_eq!(throughput_kbps(50_000, 10, 1.0), 0.0);
    }

    #[test]
    fn throughput_guards_non_positive_elapsed() {
        assert_eq!(throughput_kbps(0, 2048, 0.0), 2.0);
        assert_eq!(throughput_kbps(0, 2048, -3.0), 2.0);
    }

    #[test]
    fn ranking_is_stable_and_bounded() {
        let procs = vec![
            proc(1, "a", 5.0),
            proc(2, "Idle", 99.0),
            proc(3, "b", 20.0),
            proc(4, "c", 5.0),
            proc(5, "d", 1.0),
        ];
        let top = rank_processes(procs, 3);
        let pids: Vec<u32> = top.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![3, 1, 4]);
    }
}
