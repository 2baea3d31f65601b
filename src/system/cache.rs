use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::error::{SampleError, TerminateError};
use crate::runtime::fanout::FanOut;
use crate::system::provider::Provider;
use crate::system::snapshot::{CpuInfo, DiskRow, GpuInfo, MemoryInfo, OsInfo, ProcessRow};

pub const DEFAULT_TTL: Duration = Duration::from_secs(1);

struct Entry {
    rows: Vec<ProcessRow>,
    taken_at: Instant,
}

/// Last process enumeration and when it was taken.
pub struct SampleCache {
    ttl: Duration,
    entry: RwLock<Option<Entry>>,
}

impl Default for SampleCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// An entry taken exactly `ttl` ago is already stale.
pub fn is_fresh(taken_at: Instant, now: Instant, ttl: Duration) -> bool {
    now.saturating_duration_since(taken_at) < ttl
}

impl SampleCache {
    pub fn new(ttl: Duration) -> Self {
        SampleCache {
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// A copy of the cached rows if they are still fresh at `now`.
    pub fn lookup_at(&self, now: Instant) -> Option<Vec<ProcessRow>> {
        let guard = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|e| is_fresh(e.taken_at, now, self.ttl))
            .map(|e| e.rows.clone())
    }

    pub fn store_at(&self, rows: Vec<ProcessRow>, taken_at: Instant) {
        let mut guard = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Entry { rows, taken_at });
    }

    /// Fresh rows from the cache, or `fill` under the write lock. Concurrent
    /// misses wait for the first filler and reuse its result. Errors are not
    /// cached.
    pub fn get_or_fill<F>(&self, fill: F) -> Result<Vec<ProcessRow>, SampleError>
    where
        F: FnOnce() -> Result<Vec<ProcessRow>, SampleError>,
    {
        if let Some(rows) = self.lookup_at(Instant::now()) {
            tracing::trace!("process cache hit");
            return Ok(rows);
        }

        let mut guard = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = guard
            .as_ref()
            .filter(|e| is_fresh(e.taken_at, Instant::now(), self.ttl))
        {
            return Ok(entry.rows.clone());
        }

        let rows = fill()?;
        *guard = Some(Entry {
            rows: rows.clone(),
            taken_at: Instant::now(),
        });
        Ok(rows)
    }

    pub fn invalidate(&self) {
        let mut guard = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }
}

/// A provider whose process enumeration goes through a [`SampleCache`].
/// Every other section is sampled fresh on each call.
pub struct CachedProvider {
    inner: Arc<dyn Provider>,
    cache: SampleCache,
}

impl CachedProvider {
    pub fn new(inner: Arc<dyn Provider>, ttl: Duration) -> Self {
        CachedProvider {
            inner,
            cache: SampleCache::new(ttl),
        }
    }

    pub fn cache(&self) -> &SampleCache {
        &self.cache
    }
}

impl Provider for CachedProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn os_info(&self) -> OsInfo {
        self.inner.os_info()
    }

    fn cpu_info(&self) -> CpuInfo {
        self.inner.cpu_info()
    }

    fn memory_info(&self) -> MemoryInfo {
        self.inner.memory_info()
    }

    fn gpu_info(&self) -> GpuInfo {
        self.inner.gpu_info()
    }

    fn disk_rows(&self) -> Result<Vec<DiskRow>, SampleError> {
        self.inner.disk_rows()
    }

    fn process_rows(&self, fan: &FanOut) -> Result<Vec<ProcessRow>, SampleError> {
        self.cache.get_or_fill(|| self.inner.process_rows(fan))
    }

    fn terminate_process(&self, pid: i64) -> Result<(), TerminateError> {
        self.inner.terminate_process(pid)?;
        self.cache.invalidate();
        Ok(())
    }
}
