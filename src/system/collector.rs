use std::sync::Arc;

use chrono::Local;

use crate::error::SampleError;
use crate::runtime::pool::TaskContext;
use crate::system::provider::Provider;
use crate::system::snapshot::{Snapshot, dedupe_by_pid};

/// A provider capability sampled as one step of a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Os,
    Cpu,
    Memory,
    Gpu,
    Disks,
    Processes,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Os,
        Section::Cpu,
        Section::Memory,
        Section::Gpu,
        Section::Disks,
        Section::Processes,
    ];

    pub const MONITOR: [Section; 3] = [Section::Cpu, Section::Memory, Section::Processes];

    pub fn label(self) -> &'static str {
        match self {
            Section::Os => "os",
            Section::Cpu => "cpu",
            Section::Memory => "memory",
            Section::Gpu => "gpu",
            Section::Disks => "disks",
            Section::Processes => "processes",
        }
    }
}

/// Builds a [`Snapshot`] from the selected sections, always in
/// [`Section::ALL`] order. Runs on a pool worker.
#[derive(Clone)]
pub struct Collector {
    provider: Arc<dyn Provider>,
    sections: Vec<Section>,
}

impl Collector {
    pub fn new(provider: Arc<dyn Provider>, sections: &[Section]) -> Self {
        let mut sections = sections.to_vec();
        sections.sort_unstable();
        sections.dedup();
        Collector { provider, sections }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Samples each section in turn. Field-level failures are already
    /// defaulted by the provider; only enumeration failures and cancellation
    /// end the pass early.
    pub fn collect(&self, ctx: &TaskContext) -> Result<Snapshot, SampleError> {
        let mut snapshot = Snapshot::default();
        for &section in &self.sections {
            ctx.check_cancelled()?;
            tracing::trace!(task = ctx.id(), section = section.label(), "sampling");
            match section {
                Section::Os => snapshot.os = self.provider.os_info(),
                Section::Cpu => snapshot.cpu = self.provider.cpu_info(),
                Section::Memory => snapshot.memory = self.provider.memory_info(),
                Section::Gpu => snapshot.gpu = self.provider.gpu_info(),
                Section::Disks => snapshot.disks = self.provider.disk_rows()?,
                Section::Processes => {
                    let rows = self.provider.process_rows(&ctx.fan_out())?;
                    snapshot.processes = dedupe_by_pid(rows);
                }
            }
        }
        ctx.check_cancelled()?;
        snapshot.taken_at = Local::now();
        Ok(snapshot)
    }
}
