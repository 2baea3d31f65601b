pub mod dialog;
pub mod labels;
pub mod rows;
pub mod status;

pub use dialog::{ConfirmDialog, DialogOutcome};
pub use labels::{LabelHandle, LabelMap, LabelUpdate};
pub use rows::{RowIdentity, RowList};
pub use status::StatusBar;
