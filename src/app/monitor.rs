//! Process Gopher: a filterable process table with End Process, plus a
//! Performance tab.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;

use crate::action::{Action, Direction};
use crate::app::{
    AppContext, InputMode, PAGE, ResolvedKeybinds, Screen, end_process, is_ctrl_c, navigation,
    request_refresh, toggle_auto_refresh,
};
use crate::config::MonitorConfig;
use crate::format::{format_bytes, format_percent, usage_percent};
use crate::runtime::pipeline::{RefreshView, UpdateBuilder};
use crate::system::snapshot::{MemoryInfo, ProcessRow, Snapshot, UNKNOWN};
use crate::view::status::StatusKind;
use crate::view::{ConfirmDialog, DialogOutcome, LabelHandle, LabelMap, LabelUpdate, RowList, StatusBar};

pub const PERF_FIELDS: &[(&str, &str)] = &[
    ("perf.cpu_model", "Processor"),
    ("perf.cpu_usage", "CPU Usage"),
    ("perf.mem_used", "Memory Used"),
    ("perf.mem_total", "Memory Total"),
    ("perf.swap", "Swap"),
    ("perf.processes", "Processes"),
    ("perf.threads", "Threads"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorTab {
    Processes,
    Performance,
}

impl MonitorTab {
    pub const ALL: [MonitorTab; 2] = [MonitorTab::Processes, MonitorTab::Performance];

    pub fn title(self) -> &'static str {
        match self {
            MonitorTab::Processes => "Processes",
            MonitorTab::Performance => "Performance",
        }
    }

    fn next(self) -> Self {
        match self {
            MonitorTab::Processes => MonitorTab::Performance,
            MonitorTab::Performance => MonitorTab::Processes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Enumeration order.
    #[default]
    None,
    Pid,
    Name,
    Cpu,
    Memory,
}

impl SortMode {
    pub fn next(self) -> Self {
        match self {
            SortMode::None => SortMode::Pid,
            SortMode::Pid => SortMode::Name,
            SortMode::Name => SortMode::Cpu,
            SortMode::Cpu => SortMode::Memory,
            SortMode::Memory => SortMode::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::None => "None",
            SortMode::Pid => "PID",
            SortMode::Name => "Name",
            SortMode::Cpu => "CPU",
            SortMode::Memory => "Memory",
        }
    }

    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pid" => SortMode::Pid,
            "name" => SortMode::Name,
            "cpu" => SortMode::Cpu,
            "memory" | "mem" => SortMode::Memory,
            _ => SortMode::None,
        }
    }
}

/// Case-insensitive match on name, user or pid. `needle` must already be
/// lowercase.
fn matches(row: &ProcessRow, needle: &str) -> bool {
    needle.is_empty()
        || row.name.to_lowercase().contains(needle)
        || row.username.to_lowercase().contains(needle)
        || row.pid.to_string().contains(needle)
}

pub fn filter_and_sort(rows: &[ProcessRow], filter: &str, sort: SortMode) -> Vec<ProcessRow> {
    let needle = filter.trim().to_lowercase();
    let mut view: Vec<ProcessRow> = rows.iter().filter(|r| matches(r, &needle)).cloned().collect();
    match sort {
        SortMode::None => {}
        SortMode::Pid => view.sort_by_key(|r| r.pid),
        SortMode::Name => view.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.pid.cmp(&b.pid))
        }),
        SortMode::Cpu => view.sort_by(|a, b| {
            b.cpu_percent
                .total_cmp(&a.cpu_percent)
                .then(a.pid.cmp(&b.pid))
        }),
        SortMode::Memory => view.sort_by(|a, b| {
            b.memory_bytes
                .cmp(&a.memory_bytes)
                .then(a.pid.cmp(&b.pid))
        }),
    }
    view
}

/// Pure data for one monitor refresh, built on the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorUpdate {
    pub processes: Vec<ProcessRow>,
    pub cpu_usage: f64,
    pub memory: MemoryInfo,
    pub labels: Vec<LabelUpdate>,
}

pub fn build_monitor_update(snapshot: Snapshot) -> MonitorUpdate {
    let Snapshot {
        cpu,
        memory,
        processes,
        ..
    } = snapshot;
    let threads: u64 = processes.iter().map(|p| u64::from(p.threads)).sum();
    let mem_percent = usage_percent(memory.used, memory.total);
    let swap = if memory.swap_total == 0 {
        "None".to_string()
    } else {
        format!(
            "{} / {} ({})",
            format_bytes(memory.swap_used),
            format_bytes(memory.swap_total),
            format_percent(usage_percent(memory.swap_used, memory.swap_total))
        )
    };
    let labels = vec![
        LabelUpdate::new("perf.cpu_model", cpu.model),
        LabelUpdate::new("perf.cpu_usage", format_percent(cpu.usage_percent))
            .with_usage(cpu.usage_percent),
        LabelUpdate::new(
            "perf.mem_used",
            format!("{} ({})", format_bytes(memory.used), format_percent(mem_percent)),
        )
        .with_usage(mem_percent),
        LabelUpdate::new("perf.mem_total", format_bytes(memory.total)),
        LabelUpdate::new("perf.swap", swap),
        LabelUpdate::new("perf.processes", processes.len().to_string()),
        LabelUpdate::new("perf.threads", threads.to_string()),
    ];
    MonitorUpdate {
        processes,
        cpu_usage: cpu.usage_percent,
        memory,
        labels,
    }
}

pub struct MonitorApp {
    ctx: AppContext<MonitorApp>,
    pub keybinds: ResolvedKeybinds,
    pub running: bool,
    pub tab: MonitorTab,
    pub input_mode: InputMode,
    pub filter_text: String,
    pub sort_mode: SortMode,
    /// Last full enumeration; `rows` is the filtered and sorted view of it.
    pub all: Vec<ProcessRow>,
    pub rows: RowList<ProcessRow>,
    pub dialog: Option<ConfirmDialog>,
    pub labels: LabelMap,
    pub cpu_usage: f64,
    pub memory: MemoryInfo,
    pub status: StatusBar,
}

impl MonitorApp {
    pub fn new(
        config: &MonitorConfig,
        keybinds: ResolvedKeybinds,
        ctx: AppContext<MonitorApp>,
    ) -> Self {
        let mut labels = LabelMap::new();
        for (key, _) in PERF_FIELDS {
            labels.add(*key, LabelHandle::new(UNKNOWN));
        }
        MonitorApp {
            ctx,
            keybinds,
            running: true,
            tab: MonitorTab::Processes,
            input_mode: InputMode::Normal,
            filter_text: String::new(),
            sort_mode: SortMode::from_str_config(&config.default_sort),
            all: Vec::new(),
            rows: RowList::new(),
            dialog: None,
            labels,
            cpu_usage: 0.0,
            memory: MemoryInfo::default(),
            status: StatusBar::new(),
        }
    }

    pub fn auto_refresh(&self) -> bool {
        self.ctx.scheduler.is_enabled()
    }

    pub fn selected_pid(&self) -> Option<i64> {
        self.rows.selected().map(|r| r.pid)
    }

    fn rebuild_view(&mut self) {
        let view = filter_and_sort(&self.all, &self.filter_text, self.sort_mode);
        self.rows.rebuild(view);
    }

    fn open_dialog(&mut self) {
        match self.rows.selected() {
            Some(row) if row.pid > 0 => {
                self.dialog = Some(ConfirmDialog::terminate(row.pid, &row.name));
                self.input_mode = InputMode::Confirm;
            }
            _ => self
                .status
                .notify("Select a process to end", StatusKind::Error),
        }
    }

    fn close_dialog(&mut self, outcome: DialogOutcome) {
        self.dialog = None;
        self.input_mode = InputMode::Normal;
        if let DialogOutcome::Confirmed(pid) = outcome {
            end_process(self, pid);
        }
    }

    fn navigate(&mut self, direction: Direction) {
        if self.tab != MonitorTab::Processes {
            return;
        }
        match direction {
            Direction::Up => self.rows.select_previous(),
            Direction::Down => self.rows.select_next(),
            Direction::PageUp => self.rows.move_selection(-PAGE),
            Direction::PageDown => self.rows.move_selection(PAGE),
            Direction::Home => self.rows.select_first(),
            Direction::End => self.rows.select_last(),
            Direction::Left | Direction::Right => {}
        }
    }

    fn map_key_normal(&self, key: KeyEvent) -> Action {
        if let Some(direction) = navigation(key.code) {
            return Action::Navigate(direction);
        }

        let code = key.code;
        let kb = &self.keybinds;
        if code == kb.quit {
            return Action::Quit;
        }
        if code == kb.refresh {
            return Action::Refresh;
        }
        if code == kb.toggle_auto_refresh {
            return Action::ToggleAutoRefresh;
        }
        if code == kb.next_tab {
            return Action::NextTab;
        }
        match code {
            KeyCode::Char('1') => return Action::SelectTab(0),
            KeyCode::Char('2') => return Action::SelectTab(1),
            _ => {}
        }
        if self.tab != MonitorTab::Processes {
            return Action::None;
        }
        if code == kb.end_process || code == KeyCode::Delete {
            return Action::EndProcess;
        }
        if code == kb.filter {
            return Action::EnterFilterMode;
        }
        if code == kb.cycle_sort {
            return Action::CycleSortMode;
        }
        if code == KeyCode::Esc && !self.filter_text.is_empty() {
            return Action::ClearFilter;
        }
        Action::None
    }

    fn map_key_filter(&self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => Action::ClearFilter,
            KeyCode::Enter => Action::ExitFilterMode,
            KeyCode::Backspace => {
                let mut text = self.filter_text.clone();
                text.pop();
                Action::UpdateFilter(text)
            }
            KeyCode::Char(c) => {
                let mut text = self.filter_text.clone();
                text.push(c);
                Action::UpdateFilter(text)
            }
            KeyCode::Up => Action::Navigate(Direction::Up),
            KeyCode::Down => Action::Navigate(Direction::Down),
            _ => Action::None,
        }
    }

    fn map_key_confirm(&self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab => {
                Action::DialogToggle
            }
            KeyCode::Enter | KeyCode::Char(' ') => Action::DialogActivate,
            KeyCode::Char('y') | KeyCode::Char('Y') => Action::DialogConfirm,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Action::DialogCancel,
            _ => Action::None,
        }
    }
}

impl RefreshView for MonitorApp {
    type Update = MonitorUpdate;

    fn apply_update(&mut self, update: MonitorUpdate) {
        self.labels.apply_all(&update.labels);
        self.cpu_usage = update.cpu_usage;
        self.memory = update.memory;
        self.all = update.processes;
        self.rebuild_view();
    }

    fn status_mut(&mut self) -> &mut StatusBar {
        &mut self.status
    }
}

impl Screen for MonitorApp {
    fn context(&mut self) -> &mut AppContext<Self> {
        &mut self.ctx
    }

    fn update_builder(&self) -> UpdateBuilder<MonitorUpdate> {
        Box::new(build_monitor_update)
    }

    fn map_key(&self, key: KeyEvent) -> Action {
        if is_ctrl_c(&key) {
            return Action::Quit;
        }
        match self.input_mode {
            InputMode::Normal => self.map_key_normal(key),
            InputMode::Filter => self.map_key_filter(key),
            InputMode::Confirm => self.map_key_confirm(key),
        }
    }

    fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::Refresh => {
                request_refresh(self);
            }
            Action::ToggleAutoRefresh => toggle_auto_refresh(self),
            Action::Navigate(direction) => self.navigate(direction),
            Action::NextTab => self.tab = self.tab.next(),
            Action::SelectTab(index) => {
                if let Some(&tab) = MonitorTab::ALL.get(index) {
                    self.tab = tab;
                }
            }
            Action::EndProcess => self.open_dialog(),
            Action::DialogToggle => {
                if let Some(dialog) = self.dialog.as_mut() {
                    dialog.toggle();
                }
            }
            Action::DialogActivate => {
                if let Some(outcome) = self.dialog.as_ref().map(ConfirmDialog::activate) {
                    self.close_dialog(outcome);
                }
            }
            Action::DialogConfirm => {
                if let Some(pid) = self.dialog.as_ref().map(|d| d.pid) {
                    self.close_dialog(DialogOutcome::Confirmed(pid));
                }
            }
            Action::DialogCancel => self.close_dialog(DialogOutcome::Cancelled),
            Action::EnterFilterMode => self.input_mode = InputMode::Filter,
            Action::ExitFilterMode => self.input_mode = InputMode::Normal,
            Action::ClearFilter => {
                self.filter_text.clear();
                self.input_mode = InputMode::Normal;
                self.rebuild_view();
            }
            Action::UpdateFilter(text) => {
                self.filter_text = text;
                self.rebuild_view();
            }
            Action::CycleSortMode => {
                self.sort_mode = self.sort_mode.next();
                self.rebuild_view();
            }
            Action::None => {}
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn render(&mut self, frame: &mut Frame) {
        crate::ui::monitor::render(frame, self);
    }
}
