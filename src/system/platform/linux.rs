use std::collections::HashSet;
use std::fs;

use crate::error::{CommandError, SampleError, TerminateError};
use crate::format::{format_ghz, format_uptime};
use crate::runtime::fanout::FanOut;
use crate::system::command;
use crate::system::kill;
use crate::system::parse::{self, field, leading_number, leading_u64, non_empty, strip_quotes};
use crate::system::process::{PS_COLUMNS_WITH_THREADS, ProcessTable, enrich_with_ps};
use crate::system::provider::Provider;
use crate::system::snapshot::{CpuInfo, DiskRow, GpuInfo, MemoryInfo, OsInfo, ProcessRow, UNKNOWN};

const DF_ARGS: &[&str] = &["-h", "--output=source,size,used,avail,pcent,target"];

/// Linux sampling through `/proc` and the usual userland tools.
#[derive(Default)]
pub struct LinuxProvider {
    table: ProcessTable,
}

impl LinuxProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Provider for LinuxProvider {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn os_info(&self) -> OsInfo {
        let mut os = OsInfo::default();
        if let Some(v) = command::probe("uname", &["-s"]) {
            os.name = v;
        }
        if let Some(v) = command::probe("uname", &["-r"]) {
            os.kernel = v;
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
        if let Some(v) = read("/etc/os-release").and_then(|t| parse_os_release(&t)) {
            os.distribution = v;
        }
        if let Some(secs) = read("/proc/uptime").and_then(|t| parse_proc_uptime(&t)) {
            os.uptime = format_uptime(secs);
        }
        if let Some(v) = std::env::var("SHELL").ok().and_then(|s| non_empty(&s)) {
            os.shell = v;
        }
        os
    }

    fn cpu_info(&self) -> CpuInfo {
        let mut cpu = read("/proc/cpuinfo")
            .map(|t| parse_cpuinfo(&t))
            .unwrap_or_default();
        if (cpu.threads == 0 || cpu.model == UNKNOWN)
            && let Some(out) = command::probe("lscpu", &[])
        {
            merge_lscpu(&mut cpu, &out);
        }
        if let Some(idle) = command::probe("top", &["-bn1"]).and_then(|t| parse_top_idle(&t)) {
            cpu.set_usage(100.0 - idle);
        }
        cpu
    }

    fn memory_info(&self) -> MemoryInfo {
        read("/proc/meminfo")
            .map(|t| parse_meminfo(&t))
            .unwrap_or_default()
    }

    fn gpu_info(&self) -> GpuInfo {
        detect_gpu()
    }

    fn disk_rows(&self) -> Result<Vec<DiskRow>, SampleError> {
        let out = command::run("df", DF_ARGS).map_err(|e| SampleError::enumeration("disks", e))?;
        Ok(parse_df(&out))
    }

    fn process_rows(&self, fan: &FanOut) -> Result<Vec<ProcessRow>, SampleError> {
        let rows = self.table.list()?;
        enrich_with_ps(rows, fan, PS_COLUMNS_WITH_THREADS)
    }

    fn terminate_process(&self, pid: i64) -> Result<(), TerminateError> {
        kill::terminate(pid)
    }
}

fn read(path: &str) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::debug!(path, %err, "read failed");
            None
        }
    }
}

pub fn parse_os_release(text: &str) -> Option<String> {
    field(text, "PRETTY_NAME", '=')
        .or_else(|| field(text, "NAME", '='))
        .map(strip_quotes)
        .and_then(non_empty)
}

/// First float of `/proc/uptime`, in seconds.
pub fn parse_proc_uptime(text: &str) -> Option<f64> {
    text.split_whitespace()
        .next()?
        .parse()
        .ok()
        .filter(|s: &f64| s.is_finite() && *s >= 0.0)
}

pub fn parse_cpuinfo(text: &str) -> CpuInfo {
    let mut cpu = CpuInfo::default();
    let mut physical_ids = HashSet::new();
    let mut cores_per_package = None;
    let mut processors = 0u32;
    let mut mhz = None;

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "processor" => processors += 1,
            "model name" if cpu.model == UNKNOWN => {
                if let Some(v) = non_empty(value) {
                    cpu.model = v;
                }
            }
            "physical id" => {
                physical_ids.insert(value.to_string());
            }
            "cpu cores" if cores_per_package.is_none() => {
                cores_per_package = value.parse::<u32>().ok();
            }
            "cpu MHz" if mhz.is_none() => mhz = leading_number(value),
            _ => {}
        }
    }

    let packages = u32::try_from(physical_ids.len()).unwrap_or(u32::MAX).max(1);
    cpu.threads = processors;
    cpu.cores = match cores_per_package {
        Some(per) => per.saturating_mul(packages),
        None if processors > 0 => packages,
        None => 0,
    };
    if let Some(mhz) = mhz {
        cpu.frequency = format_ghz(mhz);
    }
    cpu
}

/// Fills whatever `/proc/cpuinfo` left unset from `lscpu` output.
pub fn merge_lscpu(cpu: &mut CpuInfo, text: &str) {
    if cpu.model == UNKNOWN
        && let Some(v) = field(text, "Model name", ':').and_then(non_empty)
    {
        cpu.model = v;
    }
    let threads = field(text, "CPU(s)", ':').and_then(leading_u64);
    let per_core = field(text, "Thread(s) per core", ':').and_then(leading_u64);
    if cpu.threads == 0
        && let Some(t) = threads
    {
        cpu.threads = u32::try_from(t).unwrap_or(u32::MAX);
    }
    if cpu.cores == 0
        && let (Some(t), Some(p)) = (threads, per_core.filter(|p| *p > 0))
    {
        cpu.cores = u32::try_from(t / p).unwrap_or(u32::MAX);
    }
    if cpu.frequency == UNKNOWN
        && let Some(mhz) = field(text, "CPU max MHz", ':')
            .or_else(|| field(text, "CPU MHz", ':'))
            .and_then(leading_number)
    {
        cpu.frequency = format_ghz(mhz);
    }
}

/// Idle percentage from the `Cpu(s)` line of `top -bn1`.
pub fn parse_top_idle(text: &str) -> Option<f64> {
    let line = text.lines().find(|l| l.contains("Cpu(s)"))?;
    let (_, stats) = line.split_once(':')?;
    stats.split(',').find_map(|part| {
        let part = part.trim();
        let value = part.strip_suffix("id")?.trim();
        value.parse().ok()
    })
}

pub fn parse_meminfo(text: &str) -> MemoryInfo {
    let kb = |key: &str| {
        field(text, key, ':')
            .and_then(leading_u64)
            .map(|v| v.saturating_mul(1024))
    };
    let total = kb("MemTotal").unwrap_or(0);
    let free = kb("MemFree").unwrap_or(0);
    let available = kb("MemAvailable").unwrap_or(free);
    let swap_total = kb("SwapTotal").unwrap_or(0);
    let swap_free = kb("SwapFree").unwrap_or(0);
    MemoryInfo::from_available(total, available, free)
        .with_swap(swap_total, swap_total.saturating_sub(swap_free))
}

/// `df -h --output=source,size,used,avail,pcent,target`. The header is
/// skipped; short lines are dropped; the mount point keeps embedded spaces.
pub fn parse_df(text: &str) -> Vec<DiskRow> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                return None;
            }
            Some(DiskRow {
                device: fields[0].to_string(),
                size: fields[1].to_string(),
                used: fields[2].to_string(),
                available: fields[3].to_string(),
                use_percent: parse::percent(fields[4]),
                mount_point: fields[5..].join(" "),
            })
        })
        .collect()
}

fn detect_gpu() -> GpuInfo {
    let mut gpu = GpuInfo::default();
    let mut lspci_missing = false;

    if let Some(out) = command::probe("lshw", &["-C", "display"]) {
        merge_lshw(&mut gpu, &out);
    }
    if gpu.model.is_empty() {
        match command::run("lspci", &[]) {
            Ok(out) => merge_lspci(&mut gpu, &out),
            Err(CommandError::NotFound(_)) => lspci_missing = true,
            Err(err) => tracing::debug!(%err, "lspci failed"),
        }
    }
    if let Some(out) = command::probe("glxinfo", &[]) {
        merge_glxinfo(&mut gpu, &out);
    }
    if let Some(out) = command::probe(
        "nvidia-smi",
        &[
            "--query-gpu=name,driver_version,memory.total,utilization.gpu",
            "--format=csv,noheader",
        ],
    ) {
        merge_nvidia_smi(&mut gpu, &out);
    }

    if gpu.is_empty() {
        gpu.note = Some(if lspci_missing {
            "GPU detection not available (lspci not found)".to_string()
        } else {
            "No GPU detected".to_string()
        });
    }
    gpu
}

pub fn merge_lshw(gpu: &mut GpuInfo, text: &str) {
    if let Some(v) = field(text, "product", ':').and_then(non_empty) {
        gpu.model = v;
    }
    if let Some(v) = field(text, "vendor", ':').and_then(non_empty) {
        gpu.vendor = v;
    }
    if let Some(driver) = field(text, "configuration", ':').and_then(|cfg| {
        cfg.split_whitespace()
            .find_map(|kv| kv.strip_prefix("driver="))
            .and_then(non_empty)
    }) {
        gpu.driver = driver;
    }
}

/// First VGA/3D/2D controller line of `lspci`.
pub fn merge_lspci(gpu: &mut GpuInfo, text: &str) {
    let found = text.lines().find_map(|line| {
        let (class, device) = line.split_once(": ")?;
        let class = class.to_lowercase();
        (class.contains("vga") || class.contains("3d") || class.contains("2d"))
            .then(|| device.trim())
    });
    let Some(device) = found else {
        return;
    };
    let device = match device.rfind(" (rev ") {
        Some(i) => &device[..i],
        None => device,
    };
    gpu.model = device.to_string();
    if gpu.vendor.is_empty()
        && let Some(vendor) = device.split_whitespace().next()
    {
        gpu.vendor = vendor.to_string();
    }
}

pub fn merge_glxinfo(gpu: &mut GpuInfo, text: &str) {
    if let Some(v) = field(text, "OpenGL renderer string", ':').and_then(non_empty) {
        if gpu.model.is_empty() {
            gpu.model = v.clone();
        }
        gpu.renderer = v;
    }
    if gpu.vendor.is_empty()
        && let Some(v) = field(text, "OpenGL vendor string", ':').and_then(non_empty)
    {
        gpu.vendor = v;
    }
    if let Some(v) = field(text, "OpenGL version string", ':').and_then(non_empty) {
        gpu.gl_version = v;
    }
}

/// `name, driver_version, memory.total, utilization.gpu` CSV, first GPU only.
pub fn merge_nvidia_smi(gpu: &mut GpuInfo, text: &str) {
    let Some(line) = text.lines().next() else {
        return;
    };
    let cols: Vec<&str> = line.split(',').map(str::trim).collect();
    if cols.len() < 4 {
        return;
    }
    gpu.model = cols[0].to_string();
    if gpu.vendor.is_empty() {
        gpu.vendor = "NVIDIA".to_string();
    }
    gpu.driver = cols[1].to_string();
    gpu.memory = cols[2].to_string();
    gpu.utilization = cols[3].to_string();
}
