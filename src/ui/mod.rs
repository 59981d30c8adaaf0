// UI module: the view interface the controller drives, plus the types shared
// between the controller and concrete views. Keeping rendering behind this
// trait lets the controller run headless in tests.

use anyhow::Result;

use crate::frame::Page;
use crate::monitor::ConnectionState;

pub mod term;

/// Which top-level view the shell is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Loading,
    Viewing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    History,
    Favorites,
}

/// A sidebar panel projected into displayable rows.
pub struct PanelView {
    pub kind: PanelKind,
    pub rows: Vec<String>,
    pub selected: usize,
}

/// Everything a view needs to draw one frame of the shell.
pub struct ViewModel<'a> {
    pub screen: Screen,
    pub address: &'a str,
    pub address_focused: bool,
    pub connection: ConnectionState,
    pub backend_origin: &'a str,
    pub status: &'a str,
    pub page: Option<&'a Page>,
    pub loading_url: Option<&'a str>,
    pub starred: bool,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub can_refresh: bool,
    pub panel: Option<PanelView>,
    pub alert: Option<&'a str>,
}

/// Input focus, decided by the controller, used by views to map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// A modal alert is showing; any key dismisses it.
    Alert,
    /// A sidebar panel is open and owns the arrow keys.
    Panel,
    /// The address field has focus and captures typed characters.
    Address,
    /// Plain browsing keys.
    Browse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Quit,
    InputChar(char),
    Backspace,
    ClearInput,
    Submit,
    CancelInput,
    EditAddress,
    GoBack,
    GoForward,
    Refresh,
    GoHome,
    ToggleFavorite,
    ToggleHistoryPanel,
    ToggleFavoritesPanel,
    ClosePanel,
    PanelPrev,
    PanelNext,
    PanelActivate,
    PanelDelete,
    ScrollUp,
    ScrollDown,
    DismissAlert,
}

/// Interface between the shell controller and a concrete view. The
/// controller only ever shows/hides panes, updates text and reads actions;
/// it never touches the terminal itself.
pub trait View {
    fn render(&mut self, model: &ViewModel<'_>) -> Result<()>;

    /// Polls for the next user action, returning `None` when no input is
    /// pending. Must not block longer than a tick.
    fn poll_action(&mut self, mode: InputMode) -> Result<Option<UserAction>>;

    fn scroll_up(&mut self);
    fn scroll_down(&mut self);
    fn reset_scroll(&mut self);

    fn cleanup(&mut self) -> Result<()>;
}
