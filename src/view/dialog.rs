/// Button focused in a confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogButton {
    Ok,
    Cancel,
}

/// What the user answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Confirmed(i64),
    Cancelled,
}

/// Modal asking whether to terminate one process. Cancel is focused first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDialog {
    pub pid: i64,
    pub title: String,
    pub message: String,
    pub focused: DialogButton,
}

impl ConfirmDialog {
    pub fn terminate(pid: i64, name: &str) -> Self {
        ConfirmDialog {
            pid,
            title: format!("End Process: {name}"),
            message: format!("Are you sure you want to terminate process {pid}?"),
            focused: DialogButton::Cancel,
        }
    }

    pub fn toggle(&mut self) {
        self.focused = match self.focused {
            DialogButton::Ok => DialogButton::Cancel,
            DialogButton::Cancel => DialogButton::Ok,
        };
    }

    pub fn activate(&self) -> DialogOutcome {
        match self.focused {
            DialogButton::Ok => DialogOutcome::Confirmed(self.pid),
            DialogButton::Cancel => DialogOutcome::Cancelled,
        }
    }
}
