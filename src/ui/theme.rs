use ratatui::style::{Color, Modifier, Style};

use crate::format::Severity;
use crate::view::status::StatusKind;

#[derive(Debug, Clone)]
pub struct Theme {
    pub header_accent_bg: Color,
    pub header_accent_fg: Color,
    pub status_ok: Color,
    pub status_err: Color,
    pub status_busy: Color,
    pub statusbar_bg: Color,
    pub overlay_border: Color,
    pub focus_border: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub pill_key_bg: Color,
    pub pill_key_fg: Color,
    pub pill_desc_fg: Color,
    pub surface_bg: Color,
    pub selection_bg: Color,
    pub gauge_unfilled: Color,
    /// Normal, warning and critical, in that order.
    pub severity_colors: [Color; 3],
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Theme {
            header_accent_bg: Color::Green,
            header_accent_fg: Color::Black,
            status_ok: Color::Green,
            status_err: Color::Red,
            status_busy: Color::Yellow,
            statusbar_bg: Color::DarkGray,
            overlay_border: Color::DarkGray,
            focus_border: Color::Rgb(103, 232, 249),
            text_primary: Color::White,
            text_secondary: Color::Gray,
            pill_key_bg: Color::Yellow,
            pill_key_fg: Color::Black,
            pill_desc_fg: Color::White,
            surface_bg: Color::DarkGray,
            selection_bg: Color::Rgb(51, 65, 85),
            gauge_unfilled: Color::DarkGray,
            severity_colors: [
                Color::Rgb(16, 185, 129),
                Color::Rgb(249, 115, 22),
                Color::Rgb(239, 68, 68),
            ],
        }
    }

    pub fn severity_color(&self, severity: Severity) -> Color {
        match severity {
            Severity::Normal => self.severity_colors[0],
            Severity::Warning => self.severity_colors[1],
            Severity::Critical => self.severity_colors[2],
        }
    }

    pub fn severity(&self, severity: Severity) -> Style {
        let style = Style::default().fg(self.severity_color(severity));
        if severity == Severity::Critical {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    pub fn status(&self, kind: StatusKind) -> Style {
        let fg = match kind {
            StatusKind::Idle => self.text_primary,
            StatusKind::Busy => self.status_busy,
            StatusKind::Success => self.status_ok,
            StatusKind::Error => self.status_err,
        };
        Style::default().fg(fg)
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.focus_border)
        } else {
            Style::default().fg(self.overlay_border)
        }
    }

    pub fn highlight(&self) -> Style {
        Style::default()
            .bg(self.selection_bg)
            .fg(self.text_primary)
            .add_modifier(Modifier::BOLD)
    }
}
