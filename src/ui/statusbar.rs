use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

use crate::ui::theme::Theme;
use crate::view::StatusBar;

/// Status line: cycle message (with progress) and the latest action notice
/// on the left, process count and the auto-refresh toggle on the right.
pub fn render(frame: &mut Frame, area: Rect, status: &StatusBar, auto_refresh: bool, theme: &Theme) {
    let bg_style = Style::default().bg(theme.statusbar_bg);

    let mut left = vec![Span::styled(
        format!(" {}", status.text()),
        theme.status(status.kind()),
    )];
    if let Some(notice) = status.notice() {
        left.push(Span::styled("  |  ", Style::default().fg(theme.text_secondary)));
        left.push(Span::styled(
            notice.text.clone(),
            theme.status(notice.kind).add_modifier(Modifier::BOLD),
        ));
    }

    let toggle = if auto_refresh { "ON" } else { "OFF" };
    let right = match status.process_count_text() {
        Some(count) => format!("{count}  [Auto-refresh: {toggle}] "),
        None => format!("[Auto-refresh: {toggle}] "),
    };

    let [left_area, right_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(right.width() as u16)])
            .areas(area);

    frame.render_widget(Paragraph::new(Line::from(left)).style(bg_style), left_area);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            right,
            Style::default().fg(theme.text_secondary),
        )))
        .style(bg_style),
        right_area,
    );
}

/// Key hint pills, or the full text of a truncated value when one is focused.
pub fn render_hints(
    frame: &mut Frame,
    area: Rect,
    hint: Option<&str>,
    pills: &[(String, &str)],
    theme: &Theme,
) {
    let line = match hint {
        Some(text) => Line::from(vec![
            Span::styled(
                " i ",
                Style::default()
                    .fg(theme.pill_key_fg)
                    .bg(theme.pill_key_bg)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" {text}"), Style::default().fg(theme.text_primary)),
        ]),
        None => Line::from(
            pills
                .iter()
                .flat_map(|(key, desc)| pill_spans(key, desc, theme))
                .collect::<Vec<_>>(),
        ),
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// Filter input line shown while the process filter is being edited.
pub fn render_filter(frame: &mut Frame, area: Rect, filter_text: &str, editing: bool, theme: &Theme) {
    let mut spans = vec![
        Span::styled(
            " / ",
            Style::default()
                .fg(theme.pill_key_fg)
                .bg(theme.pill_key_bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {filter_text}"),
            Style::default().fg(theme.pill_desc_fg),
        ),
    ];
    if editing {
        spans.push(Span::styled("\u{2588}", Style::default().fg(theme.pill_key_bg)));
        spans.extend(pill_spans("Esc", "Cancel", theme));
        spans.extend(pill_spans("Enter", "Apply", theme));
    } else {
        spans.extend(pill_spans("Esc", "Clear", theme));
        spans.extend(pill_spans("/", "Edit", theme));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

pub fn pill_spans<'a>(key: &'a str, desc: &'a str, theme: &Theme) -> Vec<Span<'a>> {
    vec![
        Span::raw(" "),
        Span::styled(
            format!(" {key} "),
            Style::default()
                .fg(theme.pill_key_fg)
                .bg(theme.pill_key_bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {desc}"),
            Style::default().fg(theme.pill_desc_fg).bg(theme.surface_bg),
        ),
    ]
}
