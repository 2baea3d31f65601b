//! Periodic and manual refresh triggering with at-most-one cycle in flight.
//!
//! The in-flight flag is a compare-and-swap, not a lock: a trigger that finds
//! a cycle running is dropped rather than queued. Winning a trigger yields a
//! [`RefreshTicket`]; the flag clears when the ticket drops, wherever that
//! happens (completion closure, cancelled task, closed UI).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub type FireFn = Arc<dyn Fn() + Send + Sync + 'static>;

#[derive(Debug)]
pub struct RefreshTicket {
    flag: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl RefreshTicket {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for RefreshTicket {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Why a tick or trigger did not produce a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    Disabled,
    InFlight,
    Closed,
}

pub struct RefreshScheduler {
    enabled: bool,
    interval: Duration,
    in_flight: Arc<AtomicBool>,
    timer: Option<JoinHandle<()>>,
    on_fire: FireFn,
    parent: CancellationToken,
    cycle: Option<CancellationToken>,
    closed: bool,
}

impl RefreshScheduler {
    /// `on_fire` runs on the timer task when an armed interval elapses; it is
    /// expected to post a tick to the UI thread. `parent` should come from the
    /// worker pool so pool shutdown cancels running cycles.
    pub fn new(interval: Duration, enabled: bool, parent: CancellationToken, on_fire: FireFn) -> Self {
        RefreshScheduler {
            enabled,
            interval,
            in_flight: Arc::new(AtomicBool::new(false)),
            timer: None,
            on_fire,
            parent,
            cycle: None,
            closed: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_armed(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Arms the first tick if auto-refresh is on.
    pub fn start(&mut self) {
        if self.enabled {
            self.arm();
        }
    }

    fn try_begin(&mut self) -> Result<RefreshTicket, Skip> {
        if self.closed {
            return Err(Skip::Closed);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Skip::InFlight);
        }
        let cancel = self.parent.child_token();
        self.cycle = Some(cancel.clone());
        Ok(RefreshTicket {
            flag: self.in_flight.clone(),
            cancel,
        })
    }

    /// Manual refresh. Contended triggers are dropped.
    pub fn trigger(&mut self) -> Result<RefreshTicket, Skip> {
        let result = self.try_begin();
        if result.is_err() {
            tracing::debug!(?result, "manual refresh dropped");
        }
        result
    }

    /// Called on the UI thread when the armed timer fires. Re-arms exactly
    /// once whether or not a cycle starts.
    pub fn on_tick(&mut self) -> Result<RefreshTicket, Skip> {
        self.timer = None;
        if self.closed {
            return Err(Skip::Closed);
        }
        let result = if self.enabled {
            self.try_begin()
        } else {
            Err(Skip::Disabled)
        };
        if self.enabled {
            self.arm();
        }
        result
    }

    /// Flips auto-refresh and returns the new state.
    pub fn toggle(&mut self) -> bool {
        let enabled = !self.enabled;
        self.set_enabled(enabled);
        enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.closed {
            return;
        }
        self.enabled = enabled;
        if enabled {
            self.arm();
        } else {
            self.disarm();
            if let Some(cycle) = self.cycle.take() {
                cycle.cancel();
            }
        }
    }

    /// Stops the timer, cancels any running cycle and releases the flag.
    pub fn close(&mut self) {
        self.closed = true;
        self.disarm();
        if let Some(cycle) = self.cycle.take() {
            cycle.cancel();
        }
        self.in_flight.store(false, Ordering::Release);
    }

    fn arm(&mut self) {
        self.disarm();
        if self.interval.is_zero() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime, auto-refresh timer not armed");
            return;
        };
        let interval = self.interval;
        let fire = self.on_fire.clone();
        self.timer = Some(handle.spawn(async move {
            tokio::time::sleep(interval).await;
            fire();
        }));
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.disarm();
    }
}
