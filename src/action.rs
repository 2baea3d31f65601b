#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    Refresh,
    ToggleAutoRefresh,
    Navigate(Direction),
    NextTab,
    SelectTab(usize),
    /// Ask to end the selected process. Opens the confirmation dialog.
    EndProcess,
    DialogToggle,
    DialogActivate,
    DialogConfirm,
    DialogCancel,
    EnterFilterMode,
    ExitFilterMode,
    ClearFilter,
    UpdateFilter(String),
    CycleSortMode,
    None,
}
