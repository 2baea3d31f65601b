use crate::error::{SampleError, TerminateError};
use crate::format::format_ghz;
use crate::runtime::fanout::FanOut;
use crate::system::command;
use crate::system::kill;
use crate::system::parse::{self, field, leading_number, leading_u64, non_empty, suffixed_bytes};
use crate::system::process::{PS_COLUMNS, ProcessTable, enrich_with_ps};
use crate::system::provider::Provider;
use crate::system::snapshot::{CpuInfo, DiskRow, GpuInfo, MemoryInfo, OsInfo, ProcessRow};

const DEFAULT_PAGE_SIZE: u64 = 4096;

/// macOS sampling through `sysctl`, `vm_stat` and friends.
#[derive(Default)]
pub struct DarwinProvider {
    table: ProcessTable,
}

impl DarwinProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sysctl(key: &str) -> Option<String> {
    command::probe("sysctl", &["-n", key])
}

impl Provider for DarwinProvider {
    fn name(&self) -> &'static str {
        "darwin"
    }

    fn os_info(&self) -> OsInfo {
        let mut os = OsInfo::default();
        let product = command::probe("sw_vers", &["-productName"]);
        let version = command::probe("sw_vers", &["-productVersion"]);
        let build = command::probe("sw_vers", &["-buildVersion"]);
        if let Some(name) = &product {
            os.name = name.clone();
        }
        if let Some(distribution) = distribution(product.as_deref(), version.as_deref(), build.as_deref()) {
            os.distribution = distribution;
        }
        let sysname = command::probe("uname", &["-s"]);
        let release = command::probe("uname", &["-r"]);
        match (sysname, release) {
            (Some(s), Some(r)) => os.kernel = format!("{s} {r}"),
            (Some(s), None) => os.kernel = s,
            (None, Some(r)) => os.kernel = r,
            (None, None) => {}
        }
        if let Some(v) = command::probe("uname", &["-m"]) {
            os.architecture = v;
        }
        if let Some(v) = command::probe("hostname", &[]) {
            os.hostname = v;
        }
        if let Some(v) = command::probe("whoami", &[]) {
            os.user = v;
        }
        if let Some(v) = command::probe("uptime", &[]).and_then(|t| parse_uptime(&t)) {
            os.uptime = v;
        }
        if let Some(v) = std::env::var("SHELL").ok().and_then(|s| non_empty(&s)) {
            os.shell = v;
        }
        os
    }

    fn cpu_info(&self) -> CpuInfo {
        let mut cpu = CpuInfo::default();
        if let Some(v) = sysctl("machdep.cpu.brand_string") {
            cpu.model = v;
        }
        if let Some(v) = sysctl("hw.physicalcpu").and_then(|s| s.parse().ok()) {
            cpu.cores = v;
        }
        if let Some(v) = sysctl("hw.logicalcpu").and_then(|s| s.parse().ok()) {
            cpu.threads = v;
        }
        if let Some(hz) = sysctl("hw.cpufrequency").and_then(|s| s.parse::<f64>().ok()) {
            cpu.frequency = format_ghz(hz / 1_000_000.0);
        }
        let usage = command::probe("iostat", &["-c", "2"])
            .and_then(|t| parse_iostat_usage(&t))
            .or_else(|| command::probe("top", &["-l", "1", "-n", "0"]).and_then(|t| parse_top_usage(&t)));
        if let Some(usage) = usage {
            cpu.set_usage(usage);
        }
        cpu
    }

    fn memory_info(&self) -> MemoryInfo {
        let total = sysctl("hw.memsize").and_then(|s| s.parse().ok()).unwrap_or(0);
        let free = command::probe("vm_stat", &[])
            .map(|t| parse_vm_stat_free(&t))
            .unwrap_or(0);
        let (swap_total, swap_used) = sysctl("vm.swapusage")
            .and_then(|t| parse_swapusage(&t))
            .unwrap_or((0, 0));
        MemoryInfo::from_available(total, free, free).with_swap(swap_total, swap_used)
    }

    fn gpu_info(&self) -> GpuInfo {
        let mut gpu = command::probe("system_profiler", &["SPDisplaysDataType"])
            .map(|t| parse_displays(&t))
            .unwrap_or_default();
        if gpu.is_empty() {
            gpu.note = Some("GPU detection not available (system_profiler returned nothing)".to_string());
        }
        gpu
    }

    fn disk_rows(&self) -> Result<Vec<DiskRow>, SampleError> {
        let out = command::run("df", &["-h"]).map_err(|e| SampleError::enumeration("disks", e))?;
        Ok(parse_df(&out))
    }

    fn process_rows(&self, fan: &FanOut) -> Result<Vec<ProcessRow>, SampleError> {
        let rows = self.table.list()?;
        enrich_with_ps(rows, fan, PS_COLUMNS)
    }

    fn terminate_process(&self, pid: i64) -> Result<(), TerminateError> {
        kill::terminate(pid)
    }
}

fn distribution(product: Option<&str>, version: Option<&str>, build: Option<&str>) -> Option<String> {
    let base = match (product, version) {
        (Some(p), Some(v)) => format!("{p} {v}"),
        (Some(p), None) => p.to_string(),
        (None, Some(v)) => v.to_string(),
        (None, None) => return None,
    };
    Some(match build {
        Some(b) => format!("{base} ({b})"),
        None => base,
    })
}

/// The span between `up ` and the user count of `uptime` output.
pub fn parse_uptime(text: &str) -> Option<String> {
    let (_, rest) = text.split_once("up ")?;
    let parts: Vec<&str> = rest
        .split(',')
        .map(str::trim)
        .take_while(|part| !part.contains("user"))
        .filter(|part| !part.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// `us + sy` from the last sample row of `iostat -c 2`, with the columns
/// located through the header.
pub fn parse_iostat_usage(text: &str) -> Option<f64> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let header: Vec<&str> = lines
        .iter()
        .find(|l| {
            let tokens: Vec<&str> = l.split_whitespace().collect();
            tokens.contains(&"us") && tokens.contains(&"sy")
        })?
        .split_whitespace()
        .collect();
    let us = header.iter().position(|t| *t == "us")?;
    let sy = header.iter().position(|t| *t == "sy")?;
    let last: Vec<&str> = lines.last()?.split_whitespace().collect();
    let user: f64 = last.get(us)?.parse().ok()?;
    let sys: f64 = last.get(sy)?.parse().ok()?;
    Some(user + sys)
}

/// `CPU usage: 5.12% user, 10.25% sys, 84.61% idle` from `top -l 1 -n 0`.
pub fn parse_top_usage(text: &str) -> Option<f64> {
    let line = text.lines().find(|l| l.contains("CPU usage:"))?;
    let (_, stats) = line.split_once("CPU usage:")?;
    let mut user = None;
    let mut sys = None;
    for part in stats.split(',') {
        let part = part.trim();
        if part.ends_with("user") {
            user = leading_number(part);
        } else if part.ends_with("sys") {
            sys = leading_number(part);
        }
    }
    Some(user? + sys?)
}

/// Free + inactive + purgeable pages, in bytes. The page size comes from the
/// header when present.
pub fn parse_vm_stat_free(text: &str) -> u64 {
    let page_size = text
        .lines()
        .next()
        .and_then(|header| header.split_once("page size of "))
        .and_then(|(_, rest)| leading_u64(rest))
        .filter(|size| *size > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE);
    let pages = |key: &str| field(text, key, ':').and_then(leading_u64).unwrap_or(0);
    pages("Pages free")
        .saturating_add(pages("Pages inactive"))
        .saturating_add(pages("Pages purgeable"))
        .saturating_mul(page_size)
}

/// `total = 2048.00M  used = 1024.50M  free = 1023.50M  (encrypted)`.
pub fn parse_swapusage(text: &str) -> Option<(u64, u64)> {
    let value = |key: &str| {
        let (_, rest) = text.split_once(key)?;
        let rest = rest.trim_start().strip_prefix('=')?;
        suffixed_bytes(rest.split_whitespace().next()?)
    };
    Some((value("total")?, value("used")?))
}

/// `df -h`. Newer releases add `iused ifree %iused` before the mount point.
pub fn parse_df(text: &str) -> Vec<DiskRow> {
    let mut lines = text.lines();
    let inode_columns = lines.next().is_some_and(|header| header.contains("iused"));
    lines
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let mount_at = if inode_columns { 8 } else { 5 };
            // A row too short for its header has no mount point to show.
            if fields.len() <= mount_at {
                return None;
            }
            Some(DiskRow {
                device: fields[0].to_string(),
                size: fields[1].to_string(),
                used: fields[2].to_string(),
                available: fields[3].to_string(),
                use_percent: parse::percent(fields[4]),
                mount_point: fields.get(mount_at..).unwrap_or_default().join(" "),
            })
        })
        .collect()
}

/// First display adapter block of `system_profiler SPDisplaysDataType`.
pub fn parse_displays(text: &str) -> GpuInfo {
    let mut gpu = GpuInfo::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let Some(value) = non_empty(value) else {
            continue;
        };
        match key.trim() {
            "Chipset Model" if gpu.model.is_empty() => gpu.model = value,
            "Vendor" if gpu.vendor.is_empty() => gpu.vendor = value,
            "Metal Support" | "Metal Family" if gpu.gl_version.is_empty() => gpu.gl_version = value,
            k if k.starts_with("VRAM") && gpu.memory.is_empty() => gpu.memory = value,
            _ => {}
        }
    }
    if !gpu.model.is_empty() && gpu.renderer.is_empty() {
        gpu.renderer = gpu.model.clone();
    }
    gpu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_stops_at_user_count() {
        let text = "10:00  up 3 days,  2:11, 2 users, load averages: 1.52 1.61 1.70";
        assert_eq!(parse_uptime(text).as_deref(), Some("3 days, 2:11"));
        assert_eq!(parse_uptime("10:00  up 14 mins, 1 user, load").as_deref(), Some("14 mins"));
        assert_eq!(parse_uptime("no marker"), None);
    }

    #[test]
    fn iostat_uses_last_row() {
        let text = "\
              disk0       cpu    load average
    KB/t  tps  MB/s  us sy id   1m   5m   15m
   21.03   12  0.25   5  3 92  1.89 1.78 1.73
   10.00    5  0.05   4  2 94  1.89 1.78 1.73
";
        assert_eq!(parse_iostat_usage(text), Some(6.0));
        assert_eq!(parse_iostat_usage("nothing"), None);
    }

    #[test]
    fn top_usage_sums_user_and_sys() {
        let text = "Processes: 500 total\nCPU usage: 5.12% user, 10.25% sys, 84.61% idle\n";
        let usage = parse_top_usage(text).unwrap();
        assert!((usage - 15.37).abs() < 1e-9);
    }

    #[test]
    fn vm_stat_reads_page_size_from_header() {
        let text = "\
Mach Virtual Memory Statistics: (page size of 16384 bytes)
Pages free:                               100.
Pages active:                             900.
Pages inactive:                           50.
Pages purgeable:                          10.
";
        assert_eq!(parse_vm_stat_free(text), 160 * 16384);
    }

    #[test]
    fn vm_stat_without_header_assumes_4k_pages() {
        assert_eq!(parse_vm_stat_free("Pages free: 2.\n"), 2 * 4096);
    }

    #[test]
    fn swapusage_values() {
        let text = "total = 2048.00M  used = 1024.50M  free = 1023.50M  (encrypted)";
        assert_eq!(
            parse_swapusage(text),
            Some((2048 * 1024 * 1024, (1024.5 * 1024.0 * 1024.0) as u64))
        );
    }

    #[test]
    fn df_with_inode_columns() {
        let text = "\
Filesystem       Size   Used  Avail Capacity iused ifree %iused  Mounted on
/dev/disk3s1s1  460Gi   10Gi  300Gi     4%  404k  3.1G    0%   /
/dev/disk5s1    1.8Ti  1.7Ti  100Gi    95%  1.2M  1.0G    1%   /Volumes/Time Machine
map
";
        let rows = parse_df(text);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].mount_point, "/");
        assert_eq!(rows[1].mount_point, "/Volumes/Time Machine");
        assert_eq!(rows[1].use_percent, Some(95));
    }

    #[test]
    fn df_rows_short_for_inode_header_are_dropped() {
        let text = "\
Filesystem       Size   Used  Avail Capacity iused ifree %iused  Mounted on
/dev/disk3s1s1  460Gi   10Gi  300Gi     4%  404k  3.1G    0%   /
devfs           199Ki  199Ki    0Bi   100%   /dev
/dev/disk2      100Gi   90Gi   10Gi    90%  12k
";
        let rows = parse_df(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].device, "/dev/disk3s1s1");
        assert_eq!(rows[0].mount_point, "/");
    }

    #[test]
    fn df_without_inode_columns() {
        let text = "Filesystem Size Used Avail Capacity Mounted on\n/dev/disk1 100G 50G 50G 50% /\n";
        let rows = parse_df(text);
        assert_eq!(rows[0].mount_point, "/");
        assert_eq!(rows[0].use_percent, Some(50));
    }

    #[test]
    fn displays_block() {
        let text = "\
Graphics/Displays:

    Apple M1 Pro:

      Chipset Model: Apple M1 Pro
      Type: GPU
      Vendor: Apple (0x106b)
      Metal Support: Metal 3
";
        let gpu = parse_displays(text);
        assert_eq!(gpu.model, "Apple M1 Pro");
        assert_eq!(gpu.vendor, "Apple (0x106b)");
        assert_eq!(gpu.gl_version, "Metal 3");
        assert!(gpu.memory.is_empty());
    }

    #[test]
    fn distribution_string() {
        assert_eq!(
            distribution(Some("macOS"), Some("14.5"), Some("23F79")).as_deref(),
            Some("macOS 14.5 (23F79)")
        );
        assert_eq!(distribution(None, None, Some("x")), None);
    }
}
