use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table};

use crate::app::info::{
    DEVICE_WIDTH, Focus, InfoApp, InfoTab, PROCESS_NAME_WIDTH, fields, section_title,
};
use crate::app::key_label;
use crate::format::{Severity, format_percent, format_signed_bytes, truncate_unicode};
use crate::system::collector::Section;
use crate::ui::theme::Theme;
use crate::ui::{label_lines, statusbar, tabs};

const SIDEBAR_WIDTH: u16 = 22;

pub fn render(frame: &mut Frame, app: &mut InfoApp) {
    let theme = Theme::default();
    let [tabs_area, body, hint_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let selected = InfoTab::ALL.iter().position(|t| *t == app.tab).unwrap_or(0);
    frame.render_widget(
        tabs(InfoTab::ALL.iter().map(|t| t.title()), selected, &theme),
        tabs_area,
    );

    let [sidebar, content] =
        Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)]).areas(body);
    render_sidebar(frame, sidebar, app, &theme);

    let focused = app.focus == Focus::Content;
    match app.section() {
        Section::Disks => render_disks(frame, content, app, focused, &theme),
        Section::Processes => render_processes(frame, content, app, focused, &theme),
        section => {
            let cursor = focused.then_some(app.label_cursor);
            let block = content_block(section_title(section), focused, &theme);
            let lines = label_lines(&app.labels, fields(section), cursor, &theme);
            frame.render_widget(Paragraph::new(lines).block(block), content);
        }
    }

    let kb = &app.keybinds;
    let pills = [
        (key_label(kb.quit), "Quit"),
        (key_label(kb.refresh), "Refresh"),
        (key_label(kb.toggle_auto_refresh), "Auto"),
        (key_label(kb.next_tab), "Tab"),
    ];
    let hint = app.hint();
    statusbar::render_hints(frame, hint_area, hint.as_deref(), &pills, &theme);
    statusbar::render(frame, status_area, &app.status, app.auto_refresh(), &theme);
}

fn content_block<'a>(title: &'a str, focused: bool, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme.border(focused))
        .title(Span::styled(
            format!(" {title} "),
            Style::default()
                .fg(theme.text_primary)
                .add_modifier(Modifier::BOLD),
        ))
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &InfoApp, theme: &Theme) {
    let items: Vec<ListItem> = app
        .tab
        .sections()
        .iter()
        .map(|s| ListItem::new(format!(" {}", section_title(*s))))
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(theme.border(app.focus == Focus::Sidebar)),
        )
        .highlight_style(theme.highlight())
        .highlight_symbol("\u{25b8}");
    let mut state = ListState::default().with_selected(Some(app.section_index));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_disks(frame: &mut Frame, area: Rect, app: &mut InfoApp, focused: bool, theme: &Theme) {
    let header = Row::new(["Device", "Size", "Used", "Avail", "Use%", "Mounted on"])
        .style(Style::default().fg(theme.text_secondary).add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = app
        .disks
        .rows()
        .iter()
        .map(|d| {
            let use_cell = match d.use_percent {
                Some(p) => Cell::from(format!("{p}%")).style(theme.severity(Severity::from_percent(p))),
                None => Cell::from("-"),
            };
            Row::new(vec![
                Cell::from(truncate_unicode(&d.device, DEVICE_WIDTH)),
                Cell::from(d.size.clone()),
                Cell::from(d.used.clone()),
                Cell::from(d.available.clone()),
                use_cell,
                Cell::from(d.mount_point.clone()),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(DEVICE_WIDTH as u16 + 1),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(5),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(content_block(section_title(Section::Disks), focused, theme))
    .row_highlight_style(theme.highlight());
    frame.render_stateful_widget(table, area, app.disks.table_state());
}

fn render_processes(frame: &mut Frame, area: Rect, app: &mut InfoApp, focused: bool, theme: &Theme) {
    let header = Row::new(["PID", "Name", "Memory", "CPU%"])
        .style(Style::default().fg(theme.text_secondary).add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = app
        .processes
        .rows()
        .iter()
        .map(|p| {
            Row::new(vec![
                p.pid.to_string(),
                truncate_unicode(&p.name, PROCESS_NAME_WIDTH),
                format_signed_bytes(p.memory_bytes),
                format_percent(p.cpu_percent),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(PROCESS_NAME_WIDTH as u16 + 1),
            Constraint::Length(11),
            Constraint::Length(7),
        ],
    )
    .header(header)
    .block(content_block("Top Processes by Memory", focused, theme))
    .row_highlight_style(theme.highlight());
    frame.render_stateful_widget(table, area, app.processes.table_state());

    if app.processes.is_empty() {
        let inner = Rect {
            x: area.x + 2,
            y: area.y + 2,
            width: area.width.saturating_sub(4),
            height: 1.min(area.height.saturating_sub(3)),
        };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "No processes",
                Style::default().fg(theme.text_secondary),
            ))),
            inner,
        );
    }
}
