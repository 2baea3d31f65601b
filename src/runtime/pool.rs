//! Fixed-size pool of OS threads running sampling tasks off the UI thread.
//!
//! A task's work runs on a worker; its completion and progress callbacks are
//! posted back through the [`UiSender`] it was submitted with. A task whose
//! token is cancelled posts nothing further.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{SampleError, ShutdownError};
use crate::runtime::fanout::{FanOut, ProgressFn};
use crate::runtime::marshaller::UiSender;

pub const DEFAULT_WORKERS: usize = 2;
pub const DEFAULT_PROBE_CONCURRENCY: usize = 10;
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type Job = Box<dyn FnOnce() + Send + 'static>;
type Work<T> = Box<dyn FnOnce(&TaskContext) -> Result<T, SampleError> + Send + 'static>;
type Completion<S, T> = Box<dyn FnOnce(&mut S, Result<T, SampleError>) + Send + 'static>;
type ProgressCallback<S> = Arc<dyn Fn(&mut S, Progress) + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub workers: usize,
    pub probe_concurrency: usize,
    pub shutdown_grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            workers: DEFAULT_WORKERS,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl TaskState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskState::Queued,
            1 => TaskState::Running,
            2 => TaskState::Completed,
            3 => TaskState::Cancelled,
            _ => TaskState::Failed,
        }
    }

    pub fn is_finished(self) -> bool {
        !matches!(self, TaskState::Queued | TaskState::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.done.min(self.total) * 100) / self.total) as u8
    }
}

/// Handed to a task's work function on the worker thread.
pub struct TaskContext {
    id: String,
    cancel: CancellationToken,
    probe_limit: usize,
    progress: Option<ProgressFn>,
}

impl TaskContext {
    pub fn new(id: impl Into<String>, cancel: CancellationToken, probe_limit: usize) -> Self {
        TaskContext {
            id: id.into(),
            cancel,
            probe_limit,
            progress: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn check_cancelled(&self) -> Result<(), SampleError> {
        if self.is_cancelled() {
            Err(SampleError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// A probe fan-out bounded by the pool's per-task concurrency and wired
    /// to this task's cancellation and progress.
    pub fn fan_out(&self) -> FanOut {
        let fan = FanOut::new(self.probe_limit, self.cancel.clone());
        match &self.progress {
            Some(progress) => fan.with_progress(progress.clone()),
            None => fan,
        }
    }
}

pub struct Task<S, T> {
    id: String,
    cancel: Option<CancellationToken>,
    work: Work<T>,
    on_complete: Option<Completion<S, T>>,
    on_progress: Option<ProgressCallback<S>>,
}

impl<S: 'static, T: Send + 'static> Task<S, T> {
    pub fn new<W>(id: impl Into<String>, work: W) -> Self
    where
        W: FnOnce(&TaskContext) -> Result<T, SampleError> + Send + 'static,
    {
        Task {
            id: id.into(),
            cancel: None,
            work: Box::new(work),
            on_complete: None,
            on_progress: None,
        }
    }

    /// Tokens should descend from [`WorkerPool::cancel_token`] so pool
    /// shutdown reaches them.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut S, Result<T, SampleError>) + Send + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut S, Progress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(f));
        self
    }
}

#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: String,
    state: Arc<AtomicU8>,
}

impl TaskHandle {
    fn new(id: String) -> Self {
        TaskHandle {
            id,
            state: Arc::new(AtomicU8::new(TaskState::Queued as u8)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: TaskState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

pub struct WorkerPool {
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    done_rx: Mutex<mpsc::Receiver<()>>,
    root: CancellationToken,
    config: PoolConfig,
    next_id: AtomicU64,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> std::io::Result<Self> {
        let workers = config.workers.max(1);
        let (tx, rx) = mpsc::channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));
        let (done_tx, done_rx) = mpsc::channel::<()>();

        for index in 0..workers {
            let rx = rx.clone();
            let done_tx = done_tx.clone();
            thread::Builder::new()
                .name(format!("gopher-worker-{index}"))
                .spawn(move || {
                    loop {
                        let job = rx.lock().unwrap_or_else(PoisonError::into_inner).recv();
                        match job {
                            Ok(job) => job(),
                            Err(_) => break,
                        }
                    }
                    let _ = done_tx.send(());
                })?;
        }

        tracing::info!(workers, probe_concurrency = config.probe_concurrency, "worker pool started");

        Ok(WorkerPool {
            tx: Mutex::new(Some(tx)),
            done_rx: Mutex::new(done_rx),
            root: CancellationToken::new(),
            config: PoolConfig { workers, ..config },
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// A token cancelled when the pool shuts down.
    pub fn cancel_token(&self) -> CancellationToken {
        self.root.child_token()
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn submit<S, T>(&self, ui: &UiSender<S>, task: Task<S, T>) -> TaskHandle
    where
        S: 'static,
        T: Send + 'static,
    {
        let Task {
            id,
            cancel,
            work,
            on_complete,
            on_progress,
        } = task;
        let handle = TaskHandle::new(id.clone());
        let cancel = cancel.unwrap_or_else(|| self.root.child_token());
        let probe_limit = self.config.probe_concurrency;
        let ui = ui.clone();
        let job_handle = handle.clone();

        let job: Job = Box::new(move || {
            if cancel.is_cancelled() {
                job_handle.set(TaskState::Cancelled);
                return;
            }
            job_handle.set(TaskState::Running);

            let progress = on_progress.map(|callback| {
                let ui = ui.clone();
                let token = cancel.clone();
                Arc::new(move |done: usize, total: usize| {
                    if token.is_cancelled() {
                        return;
                    }
                    let callback = callback.clone();
                    ui.post(move |state| callback(state, Progress { done, total }));
                }) as ProgressFn
            });

            let cx = TaskContext {
                id: id.clone(),
                cancel: cancel.clone(),
                probe_limit,
                progress,
            };

            let result = panic::catch_unwind(AssertUnwindSafe(|| work(&cx)))
                .unwrap_or_else(|_| Err(SampleError::Worker(format!("task {id} panicked"))));

            if cancel.is_cancelled() || matches!(result, Err(SampleError::Cancelled)) {
                tracing::debug!(task = %id, "task cancelled, discarding result");
                job_handle.set(TaskState::Cancelled);
                return;
            }

            match &result {
                Ok(_) => job_handle.set(TaskState::Completed),
                Err(err) => {
                    tracing::warn!(task = %id, %err, "task failed");
                    job_handle.set(TaskState::Failed);
                }
            }

            if let Some(done) = on_complete {
                ui.post(move |state| done(state, result));
            }
        });

        let sent = match self.tx.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        };
        if !sent {
            tracing::warn!(task = %handle.id(), "pool is shut down, task dropped");
            handle.set(TaskState::Cancelled);
        }
        handle
    }

    /// Cancels in-flight work, stops accepting tasks and waits up to the
    /// configured grace period for workers to exit.
    pub fn shutdown(&self) -> Result<(), ShutdownError> {
        self.root.cancel();
        let sender = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        if sender.is_none() {
            return Ok(());
        }
        drop(sender);

        let grace = self.config.shutdown_grace;
        let deadline = Instant::now() + grace;
        let done_rx = self.done_rx.lock().unwrap_or_else(PoisonError::into_inner);
        let mut exited = 0;
        while exited < self.config.workers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match done_rx.recv_timeout(remaining) {
                Ok(()) => exited += 1,
                Err(_) => {
                    let pending = self.config.workers - exited;
                    tracing::warn!(pending, ?grace, "worker pool did not drain in time");
                    return Err(ShutdownError::Timeout { pending, grace });
                }
            }
        }
        tracing::info!("worker pool stopped");
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::marshaller;

    fn wait_until(handle: &TaskHandle) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.state().is_finished() {
            assert!(Instant::now() < deadline, "task {} never finished", handle.id());
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn pool(workers: usize) -> WorkerPool {
        WorkerPool::new(PoolConfig {
            workers,
            probe_concurrency: 4,
            shutdown_grace: Duration::from_secs(2),
        })
        .expect("spawn pool")
    }

    #[test]
    fn completion_is_posted_to_ui_queue() {
        let pool = pool(2);
        let (ui, mut queue) = marshaller::channel::<Vec<u32>>();
        let handle = pool.submit(
            &ui,
            Task::new("sum", |_cx| Ok(40 + 2)).on_complete(|log: &mut Vec<u32>, result| {
                log.push(result.unwrap());
            }),
        );
        wait_until(&handle);
        assert_eq!(handle.state(), TaskState::Completed);

        let mut log = Vec::new();
        assert_eq!(queue.drain(&mut log), 1);
        assert_eq!(log, vec![42]);
    }

    #[test]
    fn failed_task_reports_error() {
        let pool = pool(1);
        let (ui, mut queue) = marshaller::channel::<Option<SampleError>>();
        let handle = pool.submit(
            &ui,
            Task::<_, ()>::new("boom", |_cx| Err(SampleError::enumeration("disks", "df missing")))
                .on_complete(|slot: &mut Option<SampleError>, result| *slot = result.err()),
        );
        wait_until(&handle);
        assert_eq!(handle.state(), TaskState::Failed);
        let mut slot = None;
        queue.drain(&mut slot);
        assert!(matches!(slot, Some(SampleError::Enumeration { .. })));
    }

    #[test]
    fn panicking_task_fails_without_killing_worker() {
        let pool = pool(1);
        let (ui, _queue) = marshaller::channel::<()>();
        let bad = pool.submit(&ui, Task::<(), ()>::new("panic", |_cx| panic!("probe exploded")));
        wait_until(&bad);
        assert_eq!(bad.state(), TaskState::Failed);

        let good = pool.submit(&ui, Task::<(), u8>::new("after", |_cx| Ok(1)));
        wait_until(&good);
        assert_eq!(good.state(), TaskState::Completed);
    }

    #[test]
    fn cancelled_task_posts_nothing() {
        let pool = pool(1);
        let (ui, mut queue) = marshaller::channel::<Vec<&'static str>>();
        let token = pool.cancel_token();
        let inner = token.clone();
        let handle = pool.submit(
            &ui,
            Task::new("cancel-me", move |cx| {
                inner.cancel();
                cx.check_cancelled()?;
                Ok(())
            })
            .with_cancel(token)
            .on_complete(|log: &mut Vec<&'static str>, _| log.push("completed")),
        );
        wait_until(&handle);
        assert_eq!(handle.state(), TaskState::Cancelled);
        let mut log = Vec::new();
        assert_eq!(queue.drain(&mut log), 0);
    }

    #[test]
    fn progress_is_marshalled() {
        let pool = pool(1);
        let (ui, mut queue) = marshaller::channel::<Vec<u8>>();
        let handle = pool.submit(
            &ui,
            Task::new("probe", |cx| {
                let out = cx.fan_out().map((0..4).collect(), |n: u32| n);
                Ok(out.len())
            })
            .on_progress(|log: &mut Vec<u8>, p| log.push(p.percent())),
        );
        wait_until(&handle);
        let mut log = Vec::new();
        queue.drain(&mut log);
        assert_eq!(log.len(), 4);
        assert_eq!(log.iter().copied().max(), Some(100));
    }

    #[test]
    fn shutdown_drains_and_rejects_new_work() {
        let pool = pool(2);
        assert_eq!(pool.shutdown(), Ok(()));
        let (ui, _queue) = marshaller::channel::<()>();
        let handle = pool.submit(&ui, Task::<(), ()>::new("late", |_cx| Ok(())));
        assert_eq!(handle.state(), TaskState::Cancelled);
    }

    #[test]
    fn shutdown_times_out_on_stuck_worker() {
        let pool = WorkerPool::new(PoolConfig {
            workers: 1,
            probe_concurrency: 1,
            shutdown_grace: Duration::from_millis(50),
        })
        .unwrap();
        let (ui, _queue) = marshaller::channel::<()>();
        let handle = pool.submit(
            &ui,
            Task::<(), ()>::new("stuck", |_cx| {
                thread::sleep(Duration::from_millis(400));
                Ok(())
            }),
        );
        while handle.state() == TaskState::Queued {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(matches!(
            pool.shutdown(),
            Err(ShutdownError::Timeout { pending: 1, .. })
        ));
    }

    #[test]
    fn progress_percent_is_bounded() {
        assert_eq!(Progress { done: 0, total: 0 }.percent(), 0);
        assert_eq!(Progress { done: 2, total: 5 }.percent(), 40);
        assert_eq!(Progress { done: 9, total: 5 }.percent(), 100);
    }
}
