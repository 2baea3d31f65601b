use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Where log lines go. The terminal belongs to the UI while a screen runs,
/// so interactive sessions log to a file.
#[derive(Debug, Clone)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

pub fn log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("process-gopher").join("process-gopher.log"))
}

/// `RUST_LOG` wins over the configured level.
pub fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(level: &str, target: LogTarget) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter(level));
    let installed = match target {
        LogTarget::File(path) => {
            ensure_parent_dir(&path)?;
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            registry
                .with(
                    fmt::layer()
                        .with_ansi(false)
                        .with_thread_names(true)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        LogTarget::Stderr => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };
    installed.map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
