use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};

use crate::ui::centered_rect;
use crate::ui::theme::Theme;
use crate::view::dialog::{ConfirmDialog, DialogButton};

pub fn render(frame: &mut Frame, area: Rect, dialog: &ConfirmDialog, theme: &Theme) {
    let width = 56u16.min(area.width.saturating_sub(4));
    let height = 7u16.min(area.height.saturating_sub(2));
    let overlay = centered_rect(width, height, area);

    frame.render_widget(Clear, overlay);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.status_err))
        .title(Span::styled(
            format!(" {} ", dialog.title),
            Style::default()
                .fg(theme.text_primary)
                .add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let button = |label: &'static str, which: DialogButton| {
        let style = if dialog.focused == which {
            Style::default()
                .fg(theme.pill_key_fg)
                .bg(theme.pill_key_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text_secondary)
        };
        Span::styled(label, style)
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            dialog.message.clone(),
            Style::default().fg(theme.text_primary),
        )),
        Line::from(""),
        Line::from(vec![
            button("[ OK ]", DialogButton::Ok),
            Span::raw("    "),
            button("[ Cancel ]", DialogButton::Cancel),
        ]),
    ];

    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(theme.surface_bg)),
        inner,
    );
}
