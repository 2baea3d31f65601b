//! Screens and the action layer that binds them to the refresh runtime.

pub mod info;
pub mod monitor;

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;

use crate::action::{Action, Direction};
use crate::config::{KeybindsConfig, parse_key};
use crate::runtime::marshaller::UiSender;
use crate::runtime::pipeline::{RefreshPipeline, RefreshView, UpdateBuilder};
use crate::runtime::pool::{Task, TaskHandle, WorkerPool};
use crate::runtime::scheduler::{FireFn, RefreshScheduler};
use crate::system::collector::{Collector, Section};
use crate::system::provider::Provider;
use crate::view::status::StatusKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Filter,
    Confirm,
}

#[derive(Debug, Clone)]
pub struct ResolvedKeybinds {
    pub quit: KeyCode,
    pub refresh: KeyCode,
    pub toggle_auto_refresh: KeyCode,
    pub end_process: KeyCode,
    pub filter: KeyCode,
    pub cycle_sort: KeyCode,
    pub next_tab: KeyCode,
}

impl ResolvedKeybinds {
    pub fn from_config(kb: &KeybindsConfig) -> Self {
        Self {
            quit: parse_key(&kb.quit).unwrap_or(KeyCode::Char('q')),
            refresh: parse_key(&kb.refresh).unwrap_or(KeyCode::Char('r')),
            toggle_auto_refresh: parse_key(&kb.toggle_auto_refresh).unwrap_or(KeyCode::Char('a')),
            end_process: parse_key(&kb.end_process).unwrap_or(KeyCode::Char('k')),
            filter: parse_key(&kb.filter).unwrap_or(KeyCode::Char('/')),
            cycle_sort: parse_key(&kb.cycle_sort).unwrap_or(KeyCode::Char('s')),
            next_tab: parse_key(&kb.next_tab).unwrap_or(KeyCode::Tab),
        }
    }
}

impl Default for ResolvedKeybinds {
    fn default() -> Self {
        Self::from_config(&KeybindsConfig::default())
    }
}

pub fn key_label(code: KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "S-Tab".to_string(),
        KeyCode::Backspace => "Bksp".to_string(),
        KeyCode::Delete => "Del".to_string(),
        KeyCode::F(n) => format!("F{n}"),
        _ => "?".to_string(),
    }
}

pub fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Hardwired navigation keys shared by both screens.
pub fn navigation(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up => Some(Direction::Up),
        KeyCode::Down => Some(Direction::Down),
        KeyCode::Left => Some(Direction::Left),
        KeyCode::Right => Some(Direction::Right),
        KeyCode::PageUp => Some(Direction::PageUp),
        KeyCode::PageDown => Some(Direction::PageDown),
        KeyCode::Home => Some(Direction::Home),
        KeyCode::End => Some(Direction::End),
        _ => None,
    }
}

/// Rows moved by PageUp/PageDown.
pub const PAGE: isize = 10;

/// Everything one screen needs to reach the runtime. Built once at startup
/// and owned by the screen, so completion closures find it through the
/// `&mut S` the marshaller hands them.
pub struct AppContext<S> {
    pub ui: UiSender<S>,
    pub pool: Arc<WorkerPool>,
    pub provider: Arc<dyn Provider>,
    pub pipeline: RefreshPipeline<S>,
    pub scheduler: RefreshScheduler,
}

impl<S: Screen> AppContext<S> {
    pub fn new(
        ui: UiSender<S>,
        pool: Arc<WorkerPool>,
        provider: Arc<dyn Provider>,
        sections: &[Section],
        interval: Duration,
        auto_refresh: bool,
    ) -> Self {
        let collector = Collector::new(provider.clone(), sections);
        let pipeline = RefreshPipeline::new(ui.clone(), pool.clone(), collector);

        let timer_ui = ui.clone();
        let on_fire: FireFn = Arc::new(move || {
            timer_ui.post(|screen: &mut S| on_timer(screen));
        });
        let scheduler = RefreshScheduler::new(interval, auto_refresh, pool.cancel_token(), on_fire);

        AppContext {
            ui,
            pool,
            provider,
            pipeline,
            scheduler,
        }
    }
}

/// A top-level screen. All methods run on the UI thread.
pub trait Screen: RefreshView + Sized {
    fn context(&mut self) -> &mut AppContext<Self>;

    /// Worker-side conversion from a snapshot to this screen's update.
    fn update_builder(&self) -> UpdateBuilder<Self::Update>;

    fn map_key(&self, key: KeyEvent) -> Action;

    fn dispatch(&mut self, action: Action);

    fn is_running(&self) -> bool;

    fn render(&mut self, frame: &mut Frame);
}

/// Manual refresh. Dropped when a cycle is already running.
pub fn request_refresh<S: Screen>(screen: &mut S) -> Option<TaskHandle> {
    let build = screen.update_builder();
    let ctx = screen.context();
    match ctx.scheduler.trigger() {
        Ok(ticket) => Some(ctx.pipeline.start(ticket, build)),
        Err(_) => None,
    }
}

/// The auto-refresh timer fired. The scheduler re-arms itself either way.
pub fn on_timer<S: Screen>(screen: &mut S) {
    let build = screen.update_builder();
    let ctx = screen.context();
    match ctx.scheduler.on_tick() {
        Ok(ticket) => {
            ctx.pipeline.start(ticket, build);
        }
        Err(skip) => tracing::trace!(?skip, "auto-refresh tick skipped"),
    }
}

pub fn toggle_auto_refresh<S: Screen>(screen: &mut S) {
    let enabled = screen.context().scheduler.toggle();
    tracing::info!(enabled, "auto-refresh toggled");
    let status = screen.status_mut();
    if !enabled {
        status.cancel_busy();
    }
    let text = if enabled {
        "Auto-refresh enabled"
    } else {
        "Auto-refresh disabled"
    };
    status.notify(text, StatusKind::Idle);
}

/// Terminates `pid` on a worker, reports the outcome in the status bar and
/// then asks for a refresh so the list reflects what actually happened.
pub fn end_process<S: Screen>(screen: &mut S, pid: i64) -> TaskHandle {
    let ctx = screen.context();
    let provider = ctx.provider.clone();
    let task = Task::new(format!("terminate-{pid}"), move |_cx| {
        Ok(provider.terminate_process(pid))
    })
    .on_complete(move |screen: &mut S, result| {
        let outcome = result.map_err(|e| e.to_string()).and_then(|r| r.map_err(|e| e.to_string()));
        match outcome {
            Ok(()) => {
                tracing::info!(pid, "process terminated");
                screen.status_mut().notify(
                    format!("Process {pid} terminated successfully"),
                    StatusKind::Success,
                );
            }
            Err(err) => {
                tracing::warn!(pid, %err, "termination failed");
                screen.status_mut().notify(
                    format!("Failed to terminate process {pid}: {err}"),
                    StatusKind::Error,
                );
            }
        }
        request_refresh(screen);
    });
    ctx.pool.submit(&ctx.ui, task)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keybinds_resolve() {
        let kb = ResolvedKeybinds::default();
        assert_eq!(kb.quit, KeyCode::Char('q'));
        assert_eq!(kb.end_process, KeyCode::Char('k'));
        assert_eq!(kb.next_tab, KeyCode::Tab);
    }

    #[test]
    fn unparseable_keybind_falls_back() {
        let config = KeybindsConfig {
            refresh: "not-a-key".to_string(),
            quit: "x".to_string(),
            ..KeybindsConfig::default()
        };
        let kb = ResolvedKeybinds::from_config(&config);
        assert_eq!(kb.refresh, KeyCode::Char('r'));
        assert_eq!(kb.quit, KeyCode::Char('x'));
    }

    #[test]
    fn key_labels() {
        assert_eq!(key_label(KeyCode::Char('/')), "/");
        assert_eq!(key_label(KeyCode::Tab), "Tab");
        assert_eq!(key_label(KeyCode::F(5)), "F5");
    }

    #[test]
    fn ctrl_c_is_detected() {
        assert!(is_ctrl_c(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_ctrl_c(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
    }
}
