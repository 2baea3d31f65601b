use std::collections::HashMap;
use std::hash::Hash;

use ratatui::widgets::TableState;

use crate::system::snapshot::{DiskRow, ProcessRow};

/// What stays stable about a row across rebuilds.
pub trait RowIdentity {
    type Id: Clone + Eq + Hash;

    fn identity(&self) -> Self::Id;
}

impl RowIdentity for ProcessRow {
    type Id = i64;

    fn identity(&self) -> i64 {
        self.pid
    }
}

/// `df` repeats pseudo devices such as `tmpfs` once per mount, so the mount
/// point is part of the key.
impl RowIdentity for DiskRow {
    type Id = (String, String);

    fn identity(&self) -> (String, String) {
        (self.device.clone(), self.mount_point.clone())
    }
}

/// Ordered rows plus an identity index, used to keep the selection on the
/// same entity when the whole list is replaced.
pub struct RowList<R: RowIdentity> {
    rows: Vec<R>,
    index: HashMap<R::Id, usize>,
    state: TableState,
}

impl<R: RowIdentity> Default for RowList<R> {
    fn default() -> Self {
        RowList {
            rows: Vec::new(),
            index: HashMap::new(),
            state: TableState::default(),
        }
    }
}

impl<R: RowIdentity> RowList<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every row. The previous selection survives iff its identity
    /// is still present.
    pub fn rebuild(&mut self, rows: Vec<R>) {
        let selected = self.selected_identity();
        self.index = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.identity(), i))
            .collect();
        self.rows = rows;
        match selected {
            Some(id) => {
                if !self.select_identity(&id) {
                    self.state.select(None);
                }
            }
            None => self.state.select(None),
        }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn selected(&self) -> Option<&R> {
        self.state.selected().and_then(|i| self.rows.get(i))
    }

    pub fn selected_identity(&self) -> Option<R::Id> {
        self.selected().map(RowIdentity::identity)
    }

    pub fn select_identity(&mut self, id: &R::Id) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.state.select(Some(i));
                true
            }
            None => false,
        }
    }

    pub fn select_next(&mut self) {
        self.move_selection(1);
    }

    pub fn select_previous(&mut self) {
        self.move_selection(-1);
    }

    pub fn select_first(&mut self) {
        if !self.rows.is_empty() {
            self.state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.rows.is_empty() {
            self.state.select(Some(self.rows.len() - 1));
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.rows.is_empty() {
            self.state.select(None);
            return;
        }
        let last = self.rows.len() as isize - 1;
        let next = match self.state.selected() {
            Some(i) => (i as isize + delta).clamp(0, last),
            None if delta < 0 => last,
            None => 0,
        };
        self.state.select(Some(next as usize));
    }

    pub fn table_state(&mut self) -> &mut TableState {
        &mut self.state
    }
}
