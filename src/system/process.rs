use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local, NaiveDateTime};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use crate::error::SampleError;
use crate::runtime::fanout::FanOut;
use crate::system::command;
use crate::system::snapshot::{ProcessRow, dedupe_by_pid};

pub const PS_COLUMNS_WITH_THREADS: &str = "user=,pcpu=,rss=,stat=,nlwp=,lstart=";
pub const PS_COLUMNS: &str = "user=,pcpu=,rss=,stat=,lstart=";

const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The OS process table, read through `sysinfo`.
pub struct ProcessTable {
    sys: Mutex<System>,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    pub fn new() -> Self {
        ProcessTable {
            sys: Mutex::new(System::new()),
        }
    }

    /// Every live process (threads excluded) with its name and the cheap fields the table already
    /// has; everything else keeps its default until enriched.
    pub fn list(&self) -> Result<Vec<ProcessRow>, SampleError> {
        let mut sys = self.sys.lock().unwrap_or_else(PoisonError::into_inner);
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );

        if sys.processes().is_empty() {
            return Err(SampleError::enumeration(
                "processes",
                "process table is empty or unreadable",
            ));
        }

        let mut rows: Vec<ProcessRow> = sys
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| {
                let mut row = ProcessRow::new(
                    i64::from(pid.as_u32()),
                    process.name().to_string_lossy().to_string(),
                );
                row.memory_bytes = i64::try_from(process.memory()).unwrap_or(i64::MAX);
                row.start_time = format_epoch(process.start_time()).unwrap_or_default();
                row
            })
            .collect();
        rows.sort_unstable_by_key(|row| row.pid);
        Ok(rows)
    }
}

fn format_epoch(secs: u64) -> Option<String> {
    let secs = i64::try_from(secs).ok().filter(|s| *s > 0)?;
    let at = DateTime::from_timestamp(secs, 0)?.with_timezone(&Local);
    Some(at.format(START_TIME_FORMAT).to_string())
}

/// Fields from one `ps -o ...=` line. `None` means the column was missing
/// or unparseable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PsFields {
    pub user: Option<String>,
    pub cpu_percent: Option<f64>,
    pub rss_kb: Option<i64>,
    pub state: Option<String>,
    pub threads: Option<u32>,
    pub start_time: Option<String>,
}

pub fn parse_ps_line(line: &str, with_threads: bool) -> PsFields {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut fields = PsFields {
        user: tokens.first().map(|s| s.to_string()),
        cpu_percent: tokens.get(1).and_then(|s| s.parse().ok()),
        rss_kb: tokens.get(2).and_then(|s| s.parse().ok()),
        state: tokens.get(3).map(|s| s.to_string()),
        ..PsFields::default()
    };

    let start_at = if with_threads {
        fields.threads = tokens.get(4).and_then(|s| s.parse().ok());
        5
    } else {
        4
    };
    if tokens.len() > start_at {
        fields.start_time = Some(format_lstart(&tokens[start_at..].join(" ")));
    }
    fields
}

/// `ps` lstart ("Mon Oct 19 10:00:01 2026") to the display format; raw text
/// if it does not parse.
pub fn format_lstart(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%a %b %e %H:%M:%S %Y")
        .map(|at| at.format(START_TIME_FORMAT).to_string())
        .unwrap_or_else(|_| raw.to_string())
}

pub fn apply_ps_fields(row: &mut ProcessRow, fields: PsFields) {
    if let Some(user) = fields.user {
        row.username = user;
    }
    if let Some(cpu) = fields.cpu_percent.filter(|c| c.is_finite() && *c >= 0.0) {
        row.cpu_percent = cpu;
    }
    if let Some(rss) = fields.rss_kb.filter(|r| *r >= 0) {
        row.memory_bytes = rss.saturating_mul(1024);
    }
    if let Some(state) = fields.state {
        row.state = state;
    }
    if let Some(threads) = fields.threads {
        row.threads = threads;
    }
    if let Some(start) = fields.start_time {
        row.start_time = start;
    }
}

/// Runs one `ps -p <pid>` probe per row through `fan` and merges whatever
/// came back. Rows whose probe fails keep their defaults. A cancelled fan-out
/// yields `Cancelled` rather than a partial list.
pub fn enrich_with_ps(
    rows: Vec<ProcessRow>,
    fan: &FanOut,
    columns: &str,
) -> Result<Vec<ProcessRow>, SampleError> {
    if fan.is_cancelled() {
        return Err(SampleError::Cancelled);
    }
    let with_threads = columns.contains("nlwp");
    let enriched = fan.map(rows, |mut row| {
        let pid = row.pid.to_string();
        if let Some(out) = command::probe("ps", &["-p", &pid, "-o", columns])
            && let Some(line) = out.lines().next()
        {
            apply_ps_fields(&mut row, parse_ps_line(line, with_threads));
        }
        row
    });
    if fan.is_cancelled() {
        return Err(SampleError::Cancelled);
    }
    Ok(dedupe_by_pid(enriched))
}
