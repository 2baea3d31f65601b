use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, BorderType, Borders, Cell, Gauge, Paragraph, Row, Table};

use crate::app::InputMode;
use crate::app::key_label;
use crate::app::monitor::{MonitorApp, MonitorTab, PERF_FIELDS};
use crate::format::{Severity, format_bytes, format_percent, format_signed_bytes, truncate_unicode, usage_percent};
use crate::ui::theme::Theme;
use crate::ui::{dialog, label_lines, statusbar, tabs};

const NAME_WIDTH: usize = 28;
const USER_WIDTH: usize = 12;

pub fn render(frame: &mut Frame, app: &mut MonitorApp) {
    let theme = Theme::default();
    let [tabs_area, body, hint_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let selected = MonitorTab::ALL.iter().position(|t| *t == app.tab).unwrap_or(0);
    frame.render_widget(
        tabs(MonitorTab::ALL.iter().map(|t| t.title()), selected, &theme),
        tabs_area,
    );

    match app.tab {
        MonitorTab::Processes => render_processes(frame, body, app, &theme),
        MonitorTab::Performance => render_performance(frame, body, app, &theme),
    }

    if app.input_mode == InputMode::Filter || !app.filter_text.is_empty() {
        statusbar::render_filter(
            frame,
            hint_area,
            &app.filter_text,
            app.input_mode == InputMode::Filter,
            &theme,
        );
    } else {
        let kb = &app.keybinds;
        let pills = if app.tab == MonitorTab::Processes {
            vec![
                (key_label(kb.quit), "Quit"),
                (key_label(kb.refresh), "Refresh"),
                (key_label(kb.end_process), "End"),
                (key_label(kb.filter), "Filter"),
                (key_label(kb.cycle_sort), "Sort"),
                (key_label(kb.toggle_auto_refresh), "Auto"),
            ]
        } else {
            vec![
                (key_label(kb.quit), "Quit"),
                (key_label(kb.refresh), "Refresh"),
                (key_label(kb.next_tab), "Tab"),
            ]
        };
        statusbar::render_hints(frame, hint_area, None, &pills, &theme);
    }
    statusbar::render(frame, status_area, &app.status, app.auto_refresh(), &theme);

    if let Some(confirm) = &app.dialog {
        let area = frame.area();
        dialog::render(frame, area, confirm, &theme);
    }
}

fn render_processes(frame: &mut Frame, area: Rect, app: &mut MonitorApp, theme: &Theme) {
    let header = Row::new([
        "PID", "Name", "User", "CPU%", "Memory", "Threads", "State", "Started",
    ])
    .style(
        Style::default()
            .fg(theme.text_secondary)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = app
        .rows
        .rows()
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(p.pid.to_string()),
                Cell::from(truncate_unicode(&p.name, NAME_WIDTH)),
                Cell::from(truncate_unicode(&p.username, USER_WIDTH)),
                Cell::from(format_percent(p.cpu_percent)),
                Cell::from(format_signed_bytes(p.memory_bytes)),
                Cell::from(p.threads.to_string()),
                Cell::from(p.state.clone()),
                Cell::from(p.start_time.clone()),
            ])
        })
        .collect();

    let title = if app.filter_text.is_empty() {
        format!(" Processes ({}) | Sort: {} ", app.rows.len(), app.sort_mode.label())
    } else {
        format!(
            " Processes ({} of {}) | Sort: {} ",
            app.rows.len(),
            app.all.len(),
            app.sort_mode.label()
        )
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(NAME_WIDTH as u16 + 1),
            Constraint::Length(USER_WIDTH as u16 + 1),
            Constraint::Length(7),
            Constraint::Length(11),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme.border(app.dialog.is_none()))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(theme.text_primary)
                    .add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(theme.highlight());

    frame.render_stateful_widget(table, area, app.rows.table_state());
}

fn render_performance(frame: &mut Frame, area: Rect, app: &MonitorApp, theme: &Theme) {
    let [cpu_area, mem_area, swap_area, details] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(3),
    ])
    .areas(area);

    let cpu = app.cpu_usage.clamp(0.0, 100.0);
    render_gauge(frame, cpu_area, "CPU", cpu, format_percent(cpu), theme);

    let memory = &app.memory;
    let mem_pct = usage_percent(memory.used, memory.total);
    render_gauge(
        frame,
        mem_area,
        "Memory",
        mem_pct,
        format!(
            "{} / {} ({})",
            format_bytes(memory.used),
            format_bytes(memory.total),
            format_percent(mem_pct)
        ),
        theme,
    );

    if memory.swap_total == 0 {
        render_gauge(frame, swap_area, "Swap", 0.0, "None".to_string(), theme);
    } else {
        let swap_pct = usage_percent(memory.swap_used, memory.swap_total);
        render_gauge(
            frame,
            swap_area,
            "Swap",
            swap_pct,
            format!(
                "{} / {} ({})",
                format_bytes(memory.swap_used),
                format_bytes(memory.swap_total),
                format_percent(swap_pct)
            ),
            theme,
        );
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme.border(false))
        .title(" Details ");
    frame.render_widget(
        Paragraph::new(label_lines(&app.labels, PERF_FIELDS, None, theme)).block(block),
        details,
    );
}

fn render_gauge(frame: &mut Frame, area: Rect, title: &str, percent: f64, label: String, theme: &Theme) {
    let severity = Severity::from_usage(percent);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(theme.border(false))
                .title(format!(" {title} ")),
        )
        .gauge_style(
            Style::default()
                .fg(theme.severity_color(severity))
                .bg(theme.gauge_unfilled),
        )
        .ratio((percent / 100.0).clamp(0.0, 1.0))
        .label(label);
    frame.render_widget(gauge, area);
}
