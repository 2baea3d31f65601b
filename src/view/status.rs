use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

/// How long an action result stays beside the status message.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

pub const REFRESHING: &str = "Refreshing data\u{2026}";
pub const READY: &str = "Ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    #[default]
    Idle,
    Busy,
    Success,
    Error,
}

/// Result of a user action, shown next to the cycle status until it expires.
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub kind: StatusKind,
    at: Instant,
}

/// Status line state. Only the refresh pipeline's completion closure and the
/// action layer write to it, always on the UI thread.
#[derive(Debug, Clone, Default)]
pub struct StatusBar {
    message: String,
    kind: StatusKind,
    last_updated: Option<String>,
    process_count: Option<usize>,
    progress: Option<u8>,
    notice: Option<Notice>,
    completed: u64,
}

impl StatusBar {
    pub fn new() -> Self {
        StatusBar {
            message: READY.to_string(),
            ..StatusBar::default()
        }
    }

    pub fn set_busy(&mut self, message: &str) {
        self.message = message.to_string();
        self.kind = StatusKind::Busy;
        self.progress = None;
    }

    pub fn set_progress(&mut self, percent: u8) {
        if self.kind == StatusKind::Busy {
            self.progress = Some(percent.min(100));
        }
    }

    pub fn ready(&mut self, at: DateTime<Local>, process_count: Option<usize>) {
        let stamp = at.format("%H:%M:%S").to_string();
        self.message = format!("{READY} - Last updated: {stamp}");
        self.kind = StatusKind::Idle;
        self.last_updated = Some(stamp);
        self.progress = None;
        self.completed += 1;
        if process_count.is_some() {
            self.process_count = process_count;
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.kind = StatusKind::Error;
        self.progress = None;
    }

    /// Leaves the busy state of a cycle that was abandoned, falling back to
    /// the last ready message.
    pub fn cancel_busy(&mut self) {
        if self.kind != StatusKind::Busy {
            return;
        }
        self.message = match &self.last_updated {
            Some(stamp) => format!("{READY} - Last updated: {stamp}"),
            None => READY.to_string(),
        };
        self.kind = StatusKind::Idle;
        self.progress = None;
    }

    pub fn notify(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.notice = Some(Notice {
            text: text.into(),
            kind,
            at: Instant::now(),
        });
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice_at(Instant::now())
    }

    pub fn notice_at(&self, now: Instant) -> Option<&Notice> {
        self.notice
            .as_ref()
            .filter(|n| now.saturating_duration_since(n.at) < NOTICE_TTL)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> StatusKind {
        self.kind
    }

    /// Message with the progress suffix while a cycle is running.
    pub fn text(&self) -> String {
        match self.progress {
            Some(p) => format!("{} {p}%", self.message),
            None => self.message.clone(),
        }
    }

    /// Refresh cycles that reached the ready state.
    pub fn completed_cycles(&self) -> u64 {
        self.completed
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }

    pub fn process_count_text(&self) -> Option<String> {
        self.process_count.map(|n| format!("{n} processes"))
    }

    pub fn is_ready(&self) -> bool {
        self.kind == StatusKind::Idle && self.message.starts_with(READY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ready_message_carries_timestamp_and_count() {
        let mut status = StatusBar::new();
        status.set_busy(REFRESHING);
        status.set_progress(40);
        assert_eq!(status.text(), "Refreshing data\u{2026} 40%");

        let at = Local.with_ymd_and_hms(2026, 10, 19, 9, 5, 7).unwrap();
        status.ready(at, Some(212));
        assert_eq!(status.text(), "Ready - Last updated: 09:05:07");
        assert_eq!(status.last_updated(), Some("09:05:07"));
        assert_eq!(status.process_count_text().as_deref(), Some("212 processes"));
        assert!(status.is_ready());
        assert_eq!(status.completed_cycles(), 1);
    }

    #[test]
    fn progress_only_shows_while_busy() {
        let mut status = StatusBar::new();
        status.set_progress(50);
        assert_eq!(status.text(), "Ready");
    }

    #[test]
    fn notice_survives_refresh_until_expiry() {
        let mut status = StatusBar::new();
        status.notify("Process 1234 terminated successfully", StatusKind::Success);
        status.set_busy(REFRESHING);
        status.ready(Local::now(), Some(1));
        let notice = status.notice().unwrap();
        assert_eq!(notice.text, "Process 1234 terminated successfully");
        assert_eq!(notice.kind, StatusKind::Success);
        assert!(status.notice_at(Instant::now() + NOTICE_TTL).is_none());
    }

    #[test]
    fn cancelled_cycle_restores_last_ready_message() {
        let mut status = StatusBar::new();
        let at = Local.with_ymd_and_hms(2026, 10, 19, 9, 5, 7).unwrap();
        status.ready(at, None);
        status.set_busy(REFRESHING);
        status.cancel_busy();
        assert_eq!(status.text(), "Ready - Last updated: 09:05:07");
        status.error("boom");
        status.cancel_busy();
        assert_eq!(status.text(), "boom");
    }

    #[test]
    fn error_keeps_previous_count() {
        let mut status = StatusBar::new();
        status.ready(Local::now(), Some(3));
        status.error("Error refreshing data: could not enumerate processes: boom");
        assert_eq!(status.kind(), StatusKind::Error);
        assert_eq!(status.process_count_text().as_deref(), Some("3 processes"));
    }
}
