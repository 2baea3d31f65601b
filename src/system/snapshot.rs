use std::collections::HashSet;

use chrono::{DateTime, Local};
use serde::Serialize;

pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OsInfo {
    pub name: String,
    pub kernel: String,
    pub distribution: String,
    pub architecture: String,
    pub hostname: String,
    pub uptime: String,
    pub user: String,
    pub shell: String,
}

impl Default for OsInfo {
    fn default() -> Self {
        OsInfo {
            name: UNKNOWN.to_string(),
            kernel: UNKNOWN.to_string(),
            distribution: UNKNOWN.to_string(),
            architecture: UNKNOWN.to_string(),
            hostname: UNKNOWN.to_string(),
            uptime: UNKNOWN.to_string(),
            user: UNKNOWN.to_string(),
            shell: UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuInfo {
    pub model: String,
    pub cores: u32,
    pub threads: u32,
    pub frequency: String,
    pub usage_percent: f64,
}

impl Default for CpuInfo {
    fn default() -> Self {
        CpuInfo {
            model: UNKNOWN.to_string(),
            cores: 0,
            threads: 0,
            frequency: UNKNOWN.to_string(),
            usage_percent: 0.0,
        }
    }
}

impl CpuInfo {
    pub fn set_usage(&mut self, percent: f64) {
        self.usage_percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryInfo {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub swap_total: u64,
    pub swap_used: u64,
}

impl MemoryInfo {
    /// `used` is derived from whatever the platform reports as reclaimable
    /// and never exceeds `total`.
    pub fn from_available(total: u64, available: u64, free: u64) -> Self {
        MemoryInfo {
            total,
            used: total.saturating_sub(available),
            free,
            ..MemoryInfo::default()
        }
    }

    pub fn with_swap(mut self, swap_total: u64, swap_used: u64) -> Self {
        self.swap_total = swap_total;
        self.swap_used = swap_used.min(swap_total);
        self
    }
}

/// All fields empty when detection found nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpuInfo {
    pub model: String,
    pub vendor: String,
    pub renderer: String,
    pub driver: String,
    pub gl_version: String,
    pub memory: String,
    pub utilization: String,
    /// Why detection came up empty, shown as a tooltip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl GpuInfo {
    pub fn is_empty(&self) -> bool {
        self.model.is_empty() && self.vendor.is_empty() && self.renderer.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskRow {
    pub device: String,
    pub size: String,
    pub used: String,
    pub available: String,
    pub use_percent: Option<u8>,
    pub mount_point: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessRow {
    pub pid: i64,
    pub name: String,
    pub username: String,
    pub cpu_percent: f64,
    pub memory_bytes: i64,
    pub threads: u32,
    pub state: String,
    pub start_time: String,
}

impl ProcessRow {
    pub fn new(pid: i64, name: impl Into<String>) -> Self {
        ProcessRow {
            pid,
            name: name.into(),
            username: UNKNOWN.to_string(),
            cpu_percent: 0.0,
            memory_bytes: 0,
            threads: 0,
            state: UNKNOWN.to_string(),
            start_time: String::new(),
        }
    }
}

/// Keeps the first row seen for each pid, preserving order.
pub fn dedupe_by_pid(rows: Vec<ProcessRow>) -> Vec<ProcessRow> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter().filter(|row| seen.insert(row.pid)).collect()
}

pub fn sort_by_memory_desc(rows: &mut [ProcessRow]) {
    rows.sort_by(|a, b| b.memory_bytes.cmp(&a.memory_bytes).then(a.pid.cmp(&b.pid)));
}

/// One refresh cycle's worth of samples. Built once by a worker, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub os: OsInfo,
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub gpu: GpuInfo,
    pub disks: Vec<DiskRow>,
    pub processes: Vec<ProcessRow>,
    pub taken_at: DateTime<Local>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            os: OsInfo::default(),
            cpu: CpuInfo::default(),
            memory: MemoryInfo::default(),
            gpu: GpuInfo::default(),
            disks: Vec::new(),
            processes: Vec::new(),
            taken_at: Local::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unknown_or_zero() {
        let snap = Snapshot::default();
        assert_eq!(snap.os.hostname, UNKNOWN);
        assert_eq!(snap.cpu.cores, 0);
        assert_eq!(snap.memory.total, 0);
        assert!(snap.gpu.is_empty());
        assert!(snap.processes.is_empty());
    }

    #[test]
    fn used_memory_never_underflows() {
        let mem = MemoryInfo::from_available(100, 250, 10);
        assert_eq!(mem.used, 0);
        let mem = MemoryInfo::from_available(8_388_608 * 1024, 2_097_152 * 1024, 1_048_576 * 1024);
        assert_eq!(mem.used, 6_442_450_944);
    }

    #[test]
    fn cpu_usage_is_clamped() {
        let mut cpu = CpuInfo::default();
        cpu.set_usage(140.0);
        assert_eq!(cpu.usage_percent, 100.0);
        cpu.set_usage(-2.0);
        assert_eq!(cpu.usage_percent, 0.0);
        cpu.set_usage(f64::NAN);
        assert_eq!(cpu.usage_percent, 0.0);
    }

    #[test]
    fn dedupe_keeps_first_row_per_pid() {
        let mut second = ProcessRow::new(1, "dup");
        second.memory_bytes = 99;
        let rows = vec![ProcessRow::new(1, "init"), ProcessRow::new(2, "sh"), second];
        let rows = dedupe_by_pid(rows);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "init");
    }

    #[test]
    fn memory_sort_is_descending() {
        let mut rows: Vec<ProcessRow> = [(1, 10), (2, 300), (3, 20)]
            .into_iter()
            .map(|(pid, mem)| {
                let mut row = ProcessRow::new(pid, format!("p{pid}"));
                row.memory_bytes = mem;
                row
            })
            .collect();
        sort_by_memory_desc(&mut rows);
        let pids: Vec<i64> = rows.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![2, 3, 1]);
    }
}
