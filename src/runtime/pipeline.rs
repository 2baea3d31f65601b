use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::runtime::marshaller::UiSender;
use crate::runtime::pool::{Task, TaskHandle, WorkerPool};
use crate::runtime::scheduler::RefreshTicket;
use crate::system::collector::{Collector, Section};
use crate::system::snapshot::Snapshot;
use crate::view::status::{REFRESHING, StatusBar};

/// Turns a snapshot into pure view data on the worker. It must not capture
/// any UI handle.
pub type UpdateBuilder<U> = Box<dyn FnOnce(Snapshot) -> U + Send + 'static>;

/// A screen that can be refreshed by the pipeline. Everything here runs on
/// the UI thread inside marshalled closures.
pub trait RefreshView: 'static {
    type Update: Send + 'static;

    /// Applies labels and swaps row lists in one go. Row lists restore their
    /// selection by identity.
    fn apply_update(&mut self, update: Self::Update);

    fn status_mut(&mut self) -> &mut StatusBar;
}

/// What the worker hands back for one cycle.
pub struct Built<U> {
    pub update: U,
    pub taken_at: DateTime<Local>,
    pub process_count: Option<usize>,
}

pub struct RefreshPipeline<S> {
    ui: UiSender<S>,
    pool: Arc<WorkerPool>,
    collector: Collector,
}

impl<S: RefreshView> RefreshPipeline<S> {
    pub fn new(ui: UiSender<S>, pool: Arc<WorkerPool>, collector: Collector) -> Self {
        RefreshPipeline {
            ui,
            pool,
            collector,
        }
    }

    /// Runs one refresh cycle.
    ///
    /// The busy status is posted first, then the sampling task is submitted
    /// with the ticket's token. The ticket travels inside the completion
    /// closure, so the in-flight flag is released only after the UI has
    /// applied the result, or when the closure is dropped unrun because the
    /// cycle was cancelled.
    pub fn start(&self, ticket: RefreshTicket, build: UpdateBuilder<S::Update>) -> TaskHandle {
        self.ui.post(|view: &mut S| view.status_mut().set_busy(REFRESHING));

        let collector = self.collector.clone();
        let counts_processes = collector.sections().contains(&Section::Processes);
        let id = format!("refresh-{}", self.pool.next_sequence());
        tracing::debug!(task = %id, "refresh cycle started");

        let task = Task::new(id, move |cx| {
            let snapshot = collector.collect(cx)?;
            let taken_at = snapshot.taken_at;
            let process_count = counts_processes.then_some(snapshot.processes.len());
            Ok(Built {
                update: build(snapshot),
                taken_at,
                process_count,
            })
        })
        .with_cancel(ticket.cancel_token())
        .on_progress(|view: &mut S, progress| view.status_mut().set_progress(progress.percent()))
        .on_complete(move |view: &mut S, result| {
            match result {
                Ok(built) => {
                    view.apply_update(built.update);
                    let status = view.status_mut();
                    status.ready(built.taken_at, built.process_count);
                    tracing::debug!(cycles = status.completed_cycles(), "refresh applied");
                }
                Err(err) => {
                    tracing::warn!(%err, "refresh failed");
                    view.status_mut().error(format!("Error refreshing data: {err}"));
                }
            }
            drop(ticket);
        });

        self.pool.submit(&self.ui, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SampleError, TerminateError};
    use crate::runtime::fanout::FanOut;
    use crate::runtime::marshaller;
    use crate::runtime::pool::PoolConfig;
    use crate::runtime::scheduler::RefreshScheduler;
    use crate::system::provider::Provider;
    use crate::system::snapshot::{CpuInfo, DiskRow, GpuInfo, MemoryInfo, OsInfo, ProcessRow};
    use std::time::{Duration, Instant};
    use tokio_util::sync::CancellationToken;

    struct Fixed {
        fail: bool,
    }

    impl Provider for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn os_info(&self) -> OsInfo {
            OsInfo::default()
        }
        fn cpu_info(&self) -> CpuInfo {
            CpuInfo::default()
        }
        fn memory_info(&self) -> MemoryInfo {
            MemoryInfo::default()
        }
        fn gpu_info(&self) -> GpuInfo {
            GpuInfo::default()
        }
        fn disk_rows(&self) -> Result<Vec<DiskRow>, SampleError> {
            Ok(Vec::new())
        }
        fn process_rows(&self, _fan: &FanOut) -> Result<Vec<ProcessRow>, SampleError> {
            if self.fail {
                return Err(SampleError::enumeration("processes", "permission denied"));
            }
            Ok(vec![ProcessRow::new(1, "init"), ProcessRow::new(2, "sh")])
        }
        fn terminate_process(&self, pid: i64) -> Result<(), TerminateError> {
            Err(TerminateError::NotFound(pid))
        }
    }

    #[derive(Default)]
    struct View {
        names: Vec<String>,
        status: StatusBar,
    }

    impl RefreshView for View {
        type Update = Vec<String>;

        fn apply_update(&mut self, update: Vec<String>) {
            self.names = update;
        }

        fn status_mut(&mut self) -> &mut StatusBar {
            &mut self.status
        }
    }

    fn names() -> UpdateBuilder<Vec<String>> {
        Box::new(|snap: Snapshot| snap.processes.into_iter().map(|p| p.name).collect())
    }

    fn drain_until_idle(
        queue: &mut marshaller::UiQueue<View>,
        view: &mut View,
        scheduler: &RefreshScheduler,
    ) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            queue.drain(view);
            if !scheduler.is_in_flight() {
                break;
            }
            assert!(Instant::now() < deadline, "refresh never completed");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn setup(fail: bool) -> (RefreshPipeline<View>, marshaller::UiQueue<View>, RefreshScheduler) {
        let pool = Arc::new(
            WorkerPool::new(PoolConfig {
                workers: 2,
                probe_concurrency: 4,
                shutdown_grace: Duration::from_secs(1),
            })
            .unwrap(),
        );
        let (ui, queue) = marshaller::channel::<View>();
        let collector = Collector::new(Arc::new(Fixed { fail }), &Section::MONITOR);
        let scheduler = RefreshScheduler::new(
            Duration::from_secs(60),
            false,
            pool.cancel_token(),
            Arc::new(|| {}),
        );
        (RefreshPipeline::new(ui, pool, collector), queue, scheduler)
    }

    #[test]
    fn cycle_applies_rows_and_reports_ready() {
        let (pipeline, mut queue, mut scheduler) = setup(false);
        let mut view = View::default();

        let ticket = scheduler.trigger().unwrap();
        pipeline.start(ticket, names());
        drain_until_idle(&mut queue, &mut view, &scheduler);

        assert_eq!(view.names, vec!["init", "sh"]);
        assert!(view.status.is_ready());
        assert_eq!(view.status.completed_cycles(), 1);
        assert_eq!(view.status.process_count_text().as_deref(), Some("2 processes"));
    }

    #[test]
    fn enumeration_failure_keeps_previous_rows() {
        let (pipeline, mut queue, mut scheduler) = setup(true);
        let mut view = View {
            names: vec!["old".into()],
            ..View::default()
        };

        let ticket = scheduler.trigger().unwrap();
        pipeline.start(ticket, names());
        drain_until_idle(&mut queue, &mut view, &scheduler);

        assert_eq!(view.names, vec!["old"]);
        assert_eq!(
            view.status.message(),
            "Error refreshing data: could not enumerate processes: permission denied"
        );
        assert!(scheduler.trigger().is_ok());
    }

    #[test]
    fn cancelled_cycle_posts_nothing_but_releases_flag() {
        let (pipeline, mut queue, mut scheduler) = setup(false);
        let mut view = View::default();

        let ticket = scheduler.trigger().unwrap();
        let token: CancellationToken = ticket.cancel_token();
        token.cancel();
        pipeline.start(ticket, names());
        drain_until_idle(&mut queue, &mut view, &scheduler);

        assert!(view.names.is_empty());
        assert_eq!(view.status.message(), REFRESHING);
    }
}
