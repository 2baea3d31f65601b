//! System-information viewer: System and Hardware tabs, each with a sidebar
//! of sections and a content pane.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;

use crate::action::{Action, Direction};
use crate::app::{AppContext, PAGE, ResolvedKeybinds, Screen, is_ctrl_c, navigation};
use crate::config::InfoConfig;
use crate::format::{format_bytes, format_percent, truncate_with_tooltip, usage_percent};
use crate::runtime::pipeline::{RefreshView, UpdateBuilder};
use crate::system::collector::Section;
use crate::system::snapshot::{
    DiskRow, GpuInfo, ProcessRow, Snapshot, UNKNOWN, sort_by_memory_desc,
};
use crate::view::{LabelHandle, LabelMap, LabelUpdate, RowList, StatusBar};

/// Widest value a label column shows before truncating.
pub const LABEL_WIDTH: usize = 35;
pub const DEVICE_WIDTH: usize = 13;
pub const PROCESS_NAME_WIDTH: usize = 24;

pub const OS_FIELDS: &[(&str, &str)] = &[
    ("os.name", "Operating System"),
    ("os.kernel", "Kernel"),
    ("os.distribution", "Distribution"),
    ("os.architecture", "Architecture"),
    ("os.hostname", "Hostname"),
    ("os.uptime", "Uptime"),
    ("os.user", "User"),
    ("os.shell", "Shell"),
];

pub const MEMORY_FIELDS: &[(&str, &str)] = &[
    ("mem.total", "Total"),
    ("mem.used", "Used"),
    ("mem.free", "Free"),
    ("mem.usage", "Usage"),
    ("mem.swap_total", "Swap Total"),
    ("mem.swap_used", "Swap Used"),
];

pub const CPU_FIELDS: &[(&str, &str)] = &[
    ("cpu.model", "Model"),
    ("cpu.cores", "Cores"),
    ("cpu.threads", "Threads"),
    ("cpu.frequency", "Frequency"),
    ("cpu.usage", "Usage"),
];

pub const GPU_FIELDS: &[(&str, &str)] = &[
    ("gpu.model", "Model"),
    ("gpu.vendor", "Vendor"),
    ("gpu.renderer", "Renderer"),
    ("gpu.driver", "Driver"),
    ("gpu.gl_version", "OpenGL"),
    ("gpu.memory", "Memory"),
    ("gpu.utilization", "Utilization"),
];

/// Labelled fields shown for a section; empty for the row-based ones.
pub fn fields(section: Section) -> &'static [(&'static str, &'static str)] {
    match section {
        Section::Os => OS_FIELDS,
        Section::Memory => MEMORY_FIELDS,
        Section::Cpu => CPU_FIELDS,
        Section::Gpu => GPU_FIELDS,
        Section::Disks | Section::Processes => &[],
    }
}

pub fn section_title(section: Section) -> &'static str {
    match section {
        Section::Os => "Operating System",
        Section::Memory => "Memory",
        Section::Disks => "Disks",
        Section::Cpu => "Processor",
        Section::Gpu => "Graphics",
        Section::Processes => "Top Processes",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoTab {
    System,
    Hardware,
}

impl InfoTab {
    pub const ALL: [InfoTab; 2] = [InfoTab::System, InfoTab::Hardware];

    pub fn title(self) -> &'static str {
        match self {
            InfoTab::System => "System",
            InfoTab::Hardware => "Hardware",
        }
    }

    pub fn sections(self) -> &'static [Section] {
        match self {
            InfoTab::System => &[Section::Os, Section::Memory, Section::Disks],
            InfoTab::Hardware => &[Section::Cpu, Section::Gpu, Section::Processes],
        }
    }

    fn next(self) -> Self {
        match self {
            InfoTab::System => InfoTab::Hardware,
            InfoTab::Hardware => InfoTab::System,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Content,
}

/// Pure data for one info refresh, built on the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoUpdate {
    pub labels: Vec<LabelUpdate>,
    pub disks: Vec<DiskRow>,
    pub processes: Vec<ProcessRow>,
}

fn count_text(n: u32) -> String {
    if n == 0 {
        UNKNOWN.to_string()
    } else {
        n.to_string()
    }
}

fn gpu_labels(gpu: GpuInfo) -> Vec<LabelUpdate> {
    if gpu.is_empty() {
        let note = gpu.note.unwrap_or_else(|| "No GPU detected".to_string());
        let mut labels = vec![LabelUpdate::new("gpu.model", "").with_tooltip(Some(note))];
        labels.extend(GPU_FIELDS[1..].iter().map(|(key, _)| LabelUpdate::new(*key, "")));
        return labels;
    }
    vec![
        LabelUpdate::new("gpu.model", gpu.model),
        LabelUpdate::new("gpu.vendor", gpu.vendor),
        LabelUpdate::new("gpu.renderer", gpu.renderer),
        LabelUpdate::new("gpu.driver", gpu.driver),
        LabelUpdate::new("gpu.gl_version", gpu.gl_version),
        LabelUpdate::new("gpu.memory", gpu.memory),
        LabelUpdate::new("gpu.utilization", gpu.utilization),
    ]
}

/// Converts a full snapshot into label values, disk rows and the top
/// processes by memory.
pub fn build_info_update(snapshot: Snapshot, top_n: usize) -> InfoUpdate {
    let Snapshot {
        os,
        cpu,
        memory,
        gpu,
        disks,
        mut processes,
        ..
    } = snapshot;

    let mem_percent = usage_percent(memory.used, memory.total);
    let mut labels = vec![
        LabelUpdate::new("os.name", os.name),
        LabelUpdate::new("os.kernel", os.kernel),
        LabelUpdate::new("os.distribution", os.distribution),
        LabelUpdate::new("os.architecture", os.architecture),
        LabelUpdate::new("os.hostname", os.hostname),
        LabelUpdate::new("os.uptime", os.uptime),
        LabelUpdate::new("os.user", os.user),
        LabelUpdate::new("os.shell", os.shell),
        LabelUpdate::new("mem.total", format_bytes(memory.total)),
        LabelUpdate::new("mem.used", format_bytes(memory.used)),
        LabelUpdate::new("mem.free", format_bytes(memory.free)),
        LabelUpdate::new("mem.usage", format_percent(mem_percent)).with_usage(mem_percent),
        LabelUpdate::new("mem.swap_total", format_bytes(memory.swap_total)),
        LabelUpdate::new("mem.swap_used", format_bytes(memory.swap_used)),
        LabelUpdate::new("cpu.model", cpu.model),
        LabelUpdate::new("cpu.cores", count_text(cpu.cores)),
        LabelUpdate::new("cpu.threads", count_text(cpu.threads)),
        LabelUpdate::new("cpu.frequency", cpu.frequency),
        LabelUpdate::new("cpu.usage", format_percent(cpu.usage_percent))
            .with_usage(cpu.usage_percent),
    ];
    labels.extend(gpu_labels(gpu));

    sort_by_memory_desc(&mut processes);
    processes.truncate(top_n);

    InfoUpdate {
        labels,
        disks,
        processes,
    }
}

pub struct InfoApp {
    ctx: AppContext<InfoApp>,
    pub keybinds: ResolvedKeybinds,
    pub running: bool,
    pub tab: InfoTab,
    pub focus: Focus,
    pub section_index: usize,
    pub label_cursor: usize,
    pub labels: LabelMap,
    pub disks: RowList<DiskRow>,
    pub processes: RowList<ProcessRow>,
    pub status: StatusBar,
    top_n: usize,
}

impl InfoApp {
    pub fn new(config: &InfoConfig, keybinds: ResolvedKeybinds, ctx: AppContext<InfoApp>) -> Self {
        let mut labels = LabelMap::new();
        for section in Section::ALL {
            for (key, _) in fields(section) {
                labels.add(*key, LabelHandle::with_max_width(UNKNOWN, LABEL_WIDTH));
            }
        }
        InfoApp {
            ctx,
            keybinds,
            running: true,
            tab: InfoTab::System,
            focus: Focus::Sidebar,
            section_index: 0,
            label_cursor: 0,
            labels,
            disks: RowList::new(),
            processes: RowList::new(),
            status: StatusBar::new(),
            top_n: config.top_processes.max(1),
        }
    }

    pub fn section(&self) -> Section {
        let sections = self.tab.sections();
        sections[self.section_index.min(sections.len() - 1)]
    }

    pub fn auto_refresh(&self) -> bool {
        self.ctx.scheduler.is_enabled()
    }

    /// Full text behind whatever is focused, when it was truncated.
    pub fn hint(&self) -> Option<String> {
        if self.focus != Focus::Content {
            return None;
        }
        match self.section() {
            Section::Disks => self
                .disks
                .selected()
                .and_then(|d| truncate_with_tooltip(&d.device, DEVICE_WIDTH).1),
            Section::Processes => self
                .processes
                .selected()
                .and_then(|p| truncate_with_tooltip(&p.name, PROCESS_NAME_WIDTH).1),
            section => fields(section)
                .get(self.label_cursor)
                .and_then(|(key, _)| self.labels.get(key))
                .and_then(LabelHandle::tooltip),
        }
    }

    fn select_tab(&mut self, tab: InfoTab) {
        if self.tab != tab {
            self.tab = tab;
            self.section_index = 0;
            self.label_cursor = 0;
            self.focus = Focus::Sidebar;
        }
    }

    fn navigate(&mut self, direction: Direction) {
        match (self.focus, direction) {
            (Focus::Sidebar, Direction::Right) => self.focus = Focus::Content,
            (Focus::Content, Direction::Left) => self.focus = Focus::Sidebar,
            (Focus::Sidebar, dir) => {
                let last = self.tab.sections().len() - 1;
                self.section_index = step(self.section_index, last, dir);
                self.label_cursor = 0;
            }
            (Focus::Content, dir) => match self.section() {
                Section::Disks => move_rows(&mut self.disks, dir),
                Section::Processes => move_rows(&mut self.processes, dir),
                section => {
                    let last = fields(section).len().saturating_sub(1);
                    self.label_cursor = step(self.label_cursor, last, dir);
                }
            },
        }
    }
}

fn step(current: usize, last: usize, direction: Direction) -> usize {
    let next = match direction {
        Direction::Up => current as isize - 1,
        Direction::Down => current as isize + 1,
        Direction::PageUp => current as isize - PAGE,
        Direction::PageDown => current as isize + PAGE,
        Direction::Home => 0,
        Direction::End => last as isize,
        Direction::Left | Direction::Right => current as isize,
    };
    next.clamp(0, last as isize) as usize
}

fn move_rows<R: crate::view::RowIdentity>(rows: &mut RowList<R>, direction: Direction) {
    match direction {
        Direction::Up => rows.select_previous(),
        Direction::Down => rows.select_next(),
        Direction::PageUp => rows.move_selection(-PAGE),
        Direction::PageDown => rows.move_selection(PAGE),
        Direction::Home => rows.select_first(),
        Direction::End => rows.select_last(),
        Direction::Left | Direction::Right => {}
    }
}

impl RefreshView for InfoApp {
    type Update = InfoUpdate;

    fn apply_update(&mut self, update: InfoUpdate) {
        self.labels.apply_all(&update.labels);
        self.disks.rebuild(update.disks);
        self.processes.rebuild(update.processes);
    }

    fn status_mut(&mut self) -> &mut StatusBar {
        &mut self.status
    }
}

impl Screen for InfoApp {
    fn context(&mut self) -> &mut AppContext<Self> {
        &mut self.ctx
    }

    fn update_builder(&self) -> UpdateBuilder<InfoUpdate> {
        let top_n = self.top_n;
        Box::new(move |snapshot| build_info_update(snapshot, top_n))
    }

    fn map_key(&self, key: KeyEvent) -> Action {
        if is_ctrl_c(&key) {
            return Action::Quit;
        }
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
            KeyCode::Char('1') => Action::SelectTab(0),
            KeyCode::Char('2') => Action::SelectTab(1),
            KeyCode::Enter if self.focus == Focus::Sidebar => Action::Navigate(Direction::Right),
            KeyCode::Esc if self.focus == Focus::Content => Action::Navigate(Direction::Left),
            _ => Action::None,
        }
    }

    fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::Refresh => {
                crate::app::request_refresh(self);
            }
            Action::ToggleAutoRefresh => crate::app::toggle_auto_refresh(self),
            Action::Navigate(direction) => self.navigate(direction),
            Action::NextTab => self.select_tab(self.tab.next()),
            Action::SelectTab(index) => {
                if let Some(&tab) = InfoTab::ALL.get(index) {
                    self.select_tab(tab);
                }
            }
            _ => {}
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn render(&mut self, frame: &mut Frame) {
        crate::ui::info::render(frame, self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{FakeProvider, drain_until, pool};
    use crate::format::Severity;
    use crate::runtime::marshaller::{self, UiQueue};
    use crate::system::snapshot::{MemoryInfo, OsInfo};
    use crossterm::event::KeyModifiers;
    use std::sync::Arc;
    use std::time::Duration;

    fn app(provider: FakeProvider) -> (InfoApp, UiQueue<InfoApp>) {
        let (ui, queue) = marshaller::channel::<InfoApp>();
        let ctx = AppContext::new(
            ui,
            pool(),
            Arc::new(provider),
            &Section::ALL,
            Duration::from_secs(30),
            false,
        );
        let app = InfoApp::new(&InfoConfig::default(), ResolvedKeybinds::default(), ctx);
        (app, queue)
    }

    fn text(app: &InfoApp, key: &str) -> String {
        app.labels.get(key).unwrap().text()
    }

    #[test]
    fn memory_labels_follow_meminfo_example() {
        let snapshot = Snapshot {
            memory: MemoryInfo::from_available(8_388_608 * 1024, 2_097_152 * 1024, 1_048_576 * 1024),
            ..Snapshot::default()
        };
        let update = build_info_update(snapshot, 15);
        let value = |key: &str| {
            update
                .labels
                .iter()
                .find(|l| l.key == key)
                .map(|l| l.text.clone())
                .unwrap()
        };
        assert_eq!(value("mem.total"), "8.00 GB");
        assert_eq!(value("mem.used"), "6.00 GB");
        assert_eq!(value("mem.free"), "1.00 GB");
        assert_eq!(value("mem.usage"), "75.0%");
        let usage = update.labels.iter().find(|l| l.key == "mem.usage").unwrap();
        assert_eq!(usage.severity, Some(Severity::Warning));
        let total = update.labels.iter().find(|l| l.key == "mem.total").unwrap();
        assert_eq!(total.severity, None);
    }

    #[test]
    fn top_processes_are_sorted_by_memory_and_capped() {
        let processes = (1..=5)
            .map(|pid| {
                let mut row = ProcessRow::new(pid, format!("p{pid}"));
                row.memory_bytes = pid * 100;
                row
            })
            .collect();
        let snapshot = Snapshot {
            processes,
            ..Snapshot::default()
        };
        let update = build_info_update(snapshot, 3);
        let pids: Vec<i64> = update.processes.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![5, 4, 3]);
    }

    #[test]
    fn missing_gpu_leaves_model_empty_with_reason() {
        let update = build_info_update(Snapshot::default(), 1);
        let model = update.labels.iter().find(|l| l.key == "gpu.model").unwrap();
        assert_eq!(model.text, "");
        assert_eq!(model.tooltip.as_deref(), Some("No GPU detected"));
    }

    #[test]
    fn refresh_fills_labels_and_rows() {
        let provider = FakeProvider {
            memory: MemoryInfo::from_available(1024, 512, 256),
            disks: vec![DiskRow {
                device: "/dev/disk/by-uuid/abcdef1234567890".into(),
                use_percent: Some(92),
                ..DiskRow::default()
            }],
            ..FakeProvider::with_processes(vec![ProcessRow::new(7, "init")])
        };
        let (mut app, mut queue) = app(provider);
        app.dispatch(Action::Refresh);
        drain_until(&mut queue, &mut app, |a| a.status.last_updated().is_some());

        assert_eq!(text(&app, "mem.usage"), "50.0%");
        assert_eq!(text(&app, "os.name"), OsInfo::default().name);
        assert_eq!(text(&app, "gpu.model"), "");
        assert_eq!(
            app.labels.get("gpu.model").unwrap().tooltip().as_deref(),
            Some("GPU detection not available (lspci not found)")
        );
        assert_eq!(app.disks.len(), 1);
        assert_eq!(app.processes.len(), 1);
        assert_eq!(app.status.process_count_text().as_deref(), Some("1 processes"));
    }

    #[test]
    fn disk_hint_carries_full_device() {
        let provider = FakeProvider {
            disks: vec![DiskRow {
                device: "/dev/disk/by-uuid/abcdef1234567890".into(),
                ..DiskRow::default()
            }],
            ..FakeProvider::default()
        };
        let (mut app, mut queue) = app(provider);
        app.dispatch(Action::Refresh);
        drain_until(&mut queue, &mut app, |a| a.status.last_updated().is_some());

        app.dispatch(Action::Navigate(Direction::Down));
        app.dispatch(Action::Navigate(Direction::Down));
        assert_eq!(app.section(), Section::Disks);
        app.dispatch(Action::Navigate(Direction::Right));
        app.dispatch(Action::Navigate(Direction::Down));
        assert_eq!(
            app.hint().as_deref(),
            Some("/dev/disk/by-uuid/abcdef1234567890")
        );
    }

    #[test]
    fn tabs_switch_sections() {
        let (mut app, _queue) = app(FakeProvider::default());
        assert_eq!(app.section(), Section::Os);
        let tab = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(app.map_key(tab), Action::NextTab);
        app.dispatch(Action::NextTab);
        assert_eq!(app.tab, InfoTab::Hardware);
        assert_eq!(app.section(), Section::Cpu);
        app.dispatch(Action::Navigate(Direction::End));
        assert_eq!(app.section(), Section::Processes);
        app.dispatch(Action::SelectTab(0));
        assert_eq!(app.section(), Section::Os);
        app.dispatch(Action::SelectTab(9));
        assert_eq!(app.tab, InfoTab::System);
    }

    #[test]
    fn keys_map_to_actions() {
        let (app, _queue) = app(FakeProvider::default());
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(app.map_key(key(KeyCode::Char('q'))), Action::Quit);
        assert_eq!(app.map_key(key(KeyCode::Char('r'))), Action::Refresh);
        assert_eq!(app.map_key(key(KeyCode::Char('a'))), Action::ToggleAutoRefresh);
        assert_eq!(app.map_key(key(KeyCode::Char('2'))), Action::SelectTab(1));
        assert_eq!(
            app.map_key(key(KeyCode::Enter)),
            Action::Navigate(Direction::Right)
        );
        assert_eq!(
            app.map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
    }

    #[test]
    fn toggling_twice_restores_auto_refresh() {
        let (mut app, _queue) = app(FakeProvider::default());
        assert!(!app.auto_refresh());
        app.dispatch(Action::ToggleAutoRefresh);
        assert!(app.auto_refresh());
        app.dispatch(Action::ToggleAutoRefresh);
        assert!(!app.auto_refresh());
        assert_eq!(app.status.notice().unwrap().text, "Auto-refresh disabled");
    }
}
