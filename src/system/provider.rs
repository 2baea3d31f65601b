use crate::error::{SampleError, TerminateError};
use crate::runtime::fanout::FanOut;
use crate::system::snapshot::{CpuInfo, DiskRow, GpuInfo, MemoryInfo, OsInfo, ProcessRow};

/// Platform sampling capabilities.
///
/// Section getters never fail: anything that cannot be probed or parsed keeps
/// its default. Only the two enumerations can fail as a whole.
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    fn os_info(&self) -> OsInfo;

    fn cpu_info(&self) -> CpuInfo;

    fn memory_info(&self) -> MemoryInfo;

    fn gpu_info(&self) -> GpuInfo;

    fn disk_rows(&self) -> Result<Vec<DiskRow>, SampleError>;

    /// Enumerates processes and enriches each one through `fan`, which bounds
    /// how many per-process probes run at once.
    fn process_rows(&self, fan: &FanOut) -> Result<Vec<ProcessRow>, SampleError>;

    /// Sends a termination signal. `pid <= 0` is rejected without touching the OS.
    fn terminate_process(&self, pid: i64) -> Result<(), TerminateError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Linux,
    Darwin,
}

impl ProviderKind {
    /// `"auto"` and anything unrecognised fall back to the build target.
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Some(ProviderKind::Linux),
            "darwin" | "macos" => Some(ProviderKind::Darwin),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProviderKind::Linux => "linux",
            ProviderKind::Darwin => "darwin",
        }
    }
}
