use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use ratatui::Terminal;
use ratatui::backend::TestBackend;

use crate::action::{Action, Direction};
use crate::app::info::{InfoApp, build_info_update};
use crate::app::monitor::{MonitorApp, MonitorTab, build_monitor_update};
use crate::app::testing::{FakeProvider, pool};
use crate::app::{AppContext, ResolvedKeybinds, Screen};
use crate::config::{InfoConfig, MonitorConfig};
use crate::runtime::marshaller::{self, UiQueue};
use crate::runtime::pipeline::RefreshView;
use crate::system::collector::Section;
use crate::system::snapshot::{DiskRow, MemoryInfo, ProcessRow, Snapshot};
use crate::ui::theme::Theme;
use crate::ui::{dialog, statusbar};
use crate::view::status::StatusKind;
use crate::view::{ConfirmDialog, StatusBar};

fn buffer_to_string(buf: &ratatui::buffer::Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in 0..area.height {
        for x in 0..area.width {
            let cell = buf.cell((x, y)).unwrap();
            out.push_str(cell.symbol());
        }
        if y + 1 < area.height {
            out.push('\n');
        }
    }
    out
}

fn render_to_string<F>(width: u16, height: u16, draw: F) -> String
where
    F: FnOnce(&mut ratatui::Frame),
{
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(draw).unwrap();
    buffer_to_string(terminal.backend().buffer())
}

fn process(pid: i64, name: &str, memory: i64) -> ProcessRow {
    let mut row = ProcessRow::new(pid, name);
    row.memory_bytes = memory;
    row.username = "root".to_string();
    row
}

fn sample_snapshot() -> Snapshot {
    Snapshot {
        memory: MemoryInfo::from_available(8 << 30, 2 << 30, 1 << 30),
        disks: vec![DiskRow {
            device: "/dev/mapper/vg0-root".to_string(),
            size: "100G".to_string(),
            used: "92G".to_string(),
            available: "8G".to_string(),
            use_percent: Some(92),
            mount_point: "/".to_string(),
        }],
        processes: vec![process(1, "init", 4096), process(42, "postgres", 1 << 20)],
        ..Snapshot::default()
    }
}

fn info_app() -> (InfoApp, UiQueue<InfoApp>) {
    let (ui, queue) = marshaller::channel::<InfoApp>();
    let ctx = AppContext::new(
        ui,
        pool(),
        Arc::new(FakeProvider::default()),
        &Section::ALL,
        Duration::from_secs(30),
        true,
    );
    let app = InfoApp::new(&InfoConfig::default(), ResolvedKeybinds::default(), ctx);
    (app, queue)
}

fn monitor_app() -> (MonitorApp, UiQueue<MonitorApp>) {
    let (ui, queue) = marshaller::channel::<MonitorApp>();
    let ctx = AppContext::new(
        ui,
        pool(),
        Arc::new(FakeProvider::default()),
        &Section::MONITOR,
        Duration::from_secs(2),
        false,
    );
    let app = MonitorApp::new(&MonitorConfig::default(), ResolvedKeybinds::default(), ctx);
    (app, queue)
}

#[test]
fn statusbar_shows_message_count_and_toggle() {
    let mut status = StatusBar::new();
    status.ready(Local::now(), Some(3));
    let out = render_to_string(100, 1, |f| {
        let area = f.area();
        statusbar::render(f, area, &status, true, &Theme::default());
    });
    assert!(out.contains("Ready - Last updated:"), "{out}");
    assert!(out.contains("3 processes"), "{out}");
    assert!(out.contains("[Auto-refresh: ON]"), "{out}");
}

#[test]
fn statusbar_shows_notice_next_to_cycle_message() {
    let mut status = StatusBar::new();
    status.set_busy("Refreshing data\u{2026}");
    status.notify("Process 9 terminated successfully", StatusKind::Success);
    let out = render_to_string(120, 1, |f| {
        let area = f.area();
        statusbar::render(f, area, &status, false, &Theme::default());
    });
    assert!(out.contains("Refreshing data"), "{out}");
    assert!(out.contains("Process 9 terminated successfully"), "{out}");
    assert!(out.contains("[Auto-refresh: OFF]"), "{out}");
}

#[test]
fn dialog_shows_question_and_buttons() {
    let confirm = ConfirmDialog::terminate(1234, "sleep");
    let out = render_to_string(80, 20, |f| {
        let area = f.area();
        dialog::render(f, area, &confirm, &Theme::default());
    });
    assert!(out.contains("End Process: sleep"), "{out}");
    assert!(out.contains("terminate process 1234?"), "{out}");
    assert!(out.contains("[ OK ]"), "{out}");
    assert!(out.contains("[ Cancel ]"), "{out}");
}

#[test]
fn info_screen_renders_memory_section() {
    let (mut app, _queue) = info_app();
    app.apply_update(build_info_update(sample_snapshot(), 15));
    app.dispatch(Action::Navigate(Direction::Down));
    let out = render_to_string(100, 20, |f| app.render(f));
    assert!(out.contains("System"), "{out}");
    assert!(out.contains("Hardware"), "{out}");
    assert!(out.contains("8.00 GB"), "{out}");
    assert!(out.contains("75.0%"), "{out}");
    assert!(out.contains("[Auto-refresh: ON]"), "{out}");
}

#[test]
fn info_disk_table_truncates_device() {
    let (mut app, _queue) = info_app();
    app.apply_update(build_info_update(sample_snapshot(), 15));
    app.dispatch(Action::Navigate(Direction::End));
    let out = render_to_string(110, 20, |f| app.render(f));
    assert!(out.contains("/dev/mapper/\u{2026}"), "{out}");
    assert!(!out.contains("/dev/mapper/vg0-root"), "{out}");
    assert!(out.contains("92%"), "{out}");

    app.dispatch(Action::Navigate(Direction::Right));
    app.dispatch(Action::Navigate(Direction::Down));
    let out = render_to_string(110, 20, |f| app.render(f));
    assert!(out.contains("/dev/mapper/vg0-root"), "{out}");
}

#[test]
fn monitor_table_lists_processes_with_sort_label() {
    let (mut app, _queue) = monitor_app();
    app.apply_update(build_monitor_update(sample_snapshot()));
    app.dispatch(Action::CycleSortMode);
    let out = render_to_string(120, 12, |f| app.render(f));
    assert!(out.contains("Processes (2)"), "{out}");
    assert!(out.contains("Sort: PID"), "{out}");
    assert!(out.contains("postgres"), "{out}");
    assert!(out.contains("1.00 MB"), "{out}");
}

#[test]
fn monitor_filter_line_and_counts() {
    let (mut app, _queue) = monitor_app();
    app.apply_update(build_monitor_update(sample_snapshot()));
    app.dispatch(Action::EnterFilterMode);
    app.dispatch(Action::UpdateFilter("post".to_string()));
    let out = render_to_string(120, 12, |f| app.render(f));
    assert!(out.contains("Processes (1 of 2)"), "{out}");
    assert!(out.contains(" post"), "{out}");
    assert!(!out.contains("init"), "{out}");
}

#[test]
fn monitor_dialog_overlays_table() {
    let (mut app, _queue) = monitor_app();
    app.apply_update(build_monitor_update(sample_snapshot()));
    app.dispatch(Action::Navigate(Direction::Home));
    app.dispatch(Action::EndProcess);
    assert!(app.dialog.is_some());
    let out = render_to_string(120, 16, |f| app.render(f));
    assert!(out.contains("Are you sure"), "{out}");
}

#[test]
fn performance_tab_shows_gauges() {
    let (mut app, _queue) = monitor_app();
    app.apply_update(build_monitor_update(sample_snapshot()));
    app.dispatch(Action::SelectTab(1));
    assert_eq!(app.tab, MonitorTab::Performance);
    let out = render_to_string(100, 24, |f| app.render(f));
    assert!(out.contains("CPU"), "{out}");
    assert!(out.contains("6.00 GB / 8.00 GB (75.0%)"), "{out}");
    assert!(out.contains("Swap"), "{out}");
    assert!(out.contains("None"), "{out}");
}

#[test]
fn usage_labels_are_colored_by_severity() {
    use crate::format::Severity;
    use crate::view::{LabelHandle, LabelMap, LabelUpdate};

    let theme = Theme::default();
    let mut labels = LabelMap::new();
    labels.add("mem.usage", LabelHandle::new(""));
    labels.add("mem.total", LabelHandle::new(""));
    labels.apply(&LabelUpdate::new("mem.usage", "93.0%").with_usage(93.0));
    labels.apply(&LabelUpdate::new("mem.total", "8.00 GB"));

    let lines = super::label_lines(
        &labels,
        &[("mem.usage", "Usage"), ("mem.total", "Total")],
        None,
        &theme,
    );
    assert_eq!(lines[0].spans[1].content, "93.0%");
    assert_eq!(lines[0].spans[1].style, theme.severity(Severity::Critical));
    assert_eq!(lines[1].spans[1].style.fg, Some(theme.text_primary));
}

#[test]
fn info_disk_table_shows_device_prefix_with_ellipsis() {
    let (mut app, _queue) = info_app();
    let mut snapshot = sample_snapshot();
    snapshot.disks[0].device = "/dev/disk/by-uuid/abcdef1234567890".to_string();
    app.apply_update(build_info_update(snapshot, 15));
    app.dispatch(Action::Navigate(Direction::End));
    let out = render_to_string(110, 20, |f| app.render(f));
    assert!(out.contains("/dev/disk/by\u{2026} "), "{out}");
    assert!(!out.contains("/dev/disk/by-"), "{out}");
}
