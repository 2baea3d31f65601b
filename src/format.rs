use serde::Serialize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const ELLIPSIS: char = '\u{2026}';

/// Truncates `s` to at most `max_width` display columns, ending in an ellipsis
/// when anything was cut.
pub fn truncate_unicode(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            result.push(ELLIPSIS);
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

/// Display text plus the full value as a tooltip when truncation happened.
pub fn truncate_with_tooltip(s: &str, max_width: usize) -> (String, Option<String>) {
    let shown = truncate_unicode(s, max_width);
    if shown == s {
        (shown, None)
    } else {
        (shown, Some(s.to_string()))
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;
    const TB: u64 = 1024 * 1024 * 1024 * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Signed variant used for process memory columns; negative values render as zero.
pub fn format_signed_bytes(bytes: i64) -> String {
    format_bytes(u64::try_from(bytes).unwrap_or(0))
}

pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

pub fn usage_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// "2 days, 0 hours, 0 minutes" style uptime.
pub fn format_uptime(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    format!(
        "{}, {}, {}",
        plural(days, "day"),
        plural(hours, "hour"),
        plural(minutes, "minute")
    )
}

pub fn format_ghz(mhz: f64) -> String {
    format!("{:.2} GHz", mhz / 1000.0)
}

/// Display class for disk usage percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl Severity {
    pub fn from_percent(percent: u8) -> Self {
        match percent {
            90.. => Severity::Critical,
            75..=89 => Severity::Warning,
            _ => Severity::Normal,
        }
    }

    /// Same thresholds for a fractional usage percentage.
    pub fn from_usage(percent: f64) -> Self {
        Severity::from_percent(percent.round().clamp(0.0, 100.0) as u8)
    }
}
