use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tokio_util::sync::CancellationToken;

pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Bounded concurrent map used for per-entity probes inside one task.
#[derive(Clone)]
pub struct FanOut {
    limit: usize,
    cancel: CancellationToken,
    progress: Option<ProgressFn>,
}

impl FanOut {
    pub fn new(limit: usize, cancel: CancellationToken) -> Self {
        FanOut {
            limit: limit.max(1),
            cancel,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Applies `f` to every item with at most `limit` calls in flight and
    /// returns the results in input order. Items not started before
    /// cancellation are skipped.
    pub fn map<I, T, F>(&self, items: Vec<I>, f: F) -> Vec<T>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> T + Sync,
    {
        let total = items.len();
        if total == 0 {
            return Vec::new();
        }

        let queue = Mutex::new(items.into_iter().enumerate());
        let done = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<(usize, T)>();
        let workers = self.limit.min(total);

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                let done = &done;
                let f = &f;
                scope.spawn(move || {
                    loop {
                        if self.cancel.is_cancelled() {
                            break;
                        }
                        let next = queue
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .next();
                        let Some((index, item)) = next else {
                            break;
                        };
                        let value = f(item);
                        if tx.send((index, value)).is_err() {
                            break;
                        }
                        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                        if let Some(progress) = &self.progress {
                            progress(finished, total);
                        }
                    }
                });
            }
        });
        drop(tx);

        let mut results: Vec<(usize, T)> = rx.into_iter().collect();
        results.sort_unstable_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, value)| value).collect()
    }
}
