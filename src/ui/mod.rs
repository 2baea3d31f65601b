pub mod dialog;
pub mod info;
pub mod monitor;
pub mod statusbar;
pub mod theme;

#[cfg(test)]
mod tests;

use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Tabs;

use crate::view::LabelMap;
use theme::Theme;

/// Title column width for label sections.
const TITLE_WIDTH: usize = 18;

pub fn tabs<'a>(titles: impl IntoIterator<Item = &'a str>, selected: usize, theme: &Theme) -> Tabs<'a> {
    Tabs::new(titles.into_iter().map(|t| format!(" {t} ")))
        .select(selected)
        .style(Style::default().fg(theme.text_secondary))
        .highlight_style(
            Style::default()
                .fg(theme.header_accent_fg)
                .bg(theme.header_accent_bg)
                .add_modifier(Modifier::BOLD),
        )
        .divider("|")
}

/// One "Title: value" line per field, the value colored by its severity when
/// it has one. `cursor` highlights a line.
pub fn label_lines(
    labels: &LabelMap,
    fields: &[(&str, &str)],
    cursor: Option<usize>,
    theme: &Theme,
) -> Vec<Line<'static>> {
    fields
        .iter()
        .enumerate()
        .map(|(i, (key, title))| {
            let cell = labels.get(key).map(|h| h.snapshot()).unwrap_or_default();
            let value_style = cell
                .severity
                .map(|s| theme.severity(s))
                .unwrap_or_else(|| Style::default().fg(theme.text_primary));
            let line = Line::from(vec![
                Span::styled(
                    format!(" {title:<TITLE_WIDTH$}"),
                    Style::default().fg(theme.text_secondary),
                ),
                Span::styled(cell.text, value_style),
            ]);
            if cursor == Some(i) {
                line.style(theme.highlight())
            } else {
                line
            }
        })
        .collect()
}

pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let [vert] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [horiz] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(vert);
    horiz
}
