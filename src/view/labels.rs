use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::format::{Severity, truncate_with_tooltip};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelCell {
    pub text: String,
    pub tooltip: Option<String>,
    pub severity: Option<Severity>,
    max_width: Option<usize>,
}

/// A label owned by the UI thread. `Rc` keeps it off worker threads.
#[derive(Debug, Clone, Default)]
pub struct LabelHandle(Rc<RefCell<LabelCell>>);

impl LabelHandle {
    pub fn new(initial: &str) -> Self {
        let handle = LabelHandle::default();
        handle.set_text(initial);
        handle
    }

    /// Column-width label: longer values are cut with an ellipsis and the
    /// full text moves to the tooltip.
    pub fn with_max_width(initial: &str, max_width: usize) -> Self {
        let handle = LabelHandle(Rc::new(RefCell::new(LabelCell {
            max_width: Some(max_width),
            ..LabelCell::default()
        })));
        handle.set_text(initial);
        handle
    }

    pub fn set_text(&self, value: &str) {
        let mut cell = self.0.borrow_mut();
        match cell.max_width {
            Some(width) => {
                let (text, tooltip) = truncate_with_tooltip(value, width);
                cell.text = text;
                cell.tooltip = tooltip;
            }
            None => cell.text = value.to_string(),
        }
    }

    pub fn set_tooltip(&self, tooltip: Option<String>) {
        self.0.borrow_mut().tooltip = tooltip;
    }

    pub fn set_severity(&self, severity: Option<Severity>) {
        self.0.borrow_mut().severity = severity;
    }

    pub fn text(&self) -> String {
        self.0.borrow().text.clone()
    }

    pub fn tooltip(&self) -> Option<String> {
        self.0.borrow().tooltip.clone()
    }

    pub fn snapshot(&self) -> LabelCell {
        self.0.borrow().clone()
    }
}

/// One labelled value produced off the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelUpdate {
    pub key: &'static str,
    pub text: String,
    pub tooltip: Option<String>,
    pub severity: Option<Severity>,
}

impl LabelUpdate {
    pub fn new(key: &'static str, text: impl Into<String>) -> Self {
        LabelUpdate {
            key,
            text: text.into(),
            tooltip: None,
            severity: None,
        }
    }

    pub fn with_tooltip(mut self, tooltip: Option<String>) -> Self {
        self.tooltip = tooltip;
        self
    }

    /// Colors the value by how loaded the resource is.
    pub fn with_usage(mut self, percent: f64) -> Self {
        self.severity = Some(Severity::from_usage(percent));
        self
    }
}

/// Stable key → label handle. Keys are fixed when the screen is built.
#[derive(Debug, Default)]
pub struct LabelMap {
    labels: HashMap<&'static str, LabelHandle>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle` under `key`. Re-registering a key is ignored.
    pub fn add(&mut self, key: &'static str, handle: LabelHandle) -> LabelHandle {
        self.labels.entry(key).or_insert(handle).clone()
    }

    pub fn get(&self, key: &str) -> Option<&LabelHandle> {
        self.labels.get(key)
    }

    /// Unknown keys are ignored. Returns whether a label was updated.
    pub fn update(&self, key: &str, value: &str) -> bool {
        match self.labels.get(key) {
            Some(label) => {
                label.set_text(value);
                true
            }
            None => {
                tracing::trace!(key, "update for unknown label ignored");
                false
            }
        }
    }

    pub fn apply(&self, update: &LabelUpdate) {
        if let Some(label) = self.labels.get(update.key) {
            label.set_text(&update.text);
            if update.tooltip.is_some() {
                label.set_tooltip(update.tooltip.clone());
            }
            label.set_severity(update.severity);
        }
    }

    pub fn apply_all<'a>(&self, updates: impl IntoIterator<Item = &'a LabelUpdate>) {
        for update in updates {
            self.apply(update);
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
