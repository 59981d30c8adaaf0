use std::time::Instant;

use anyhow::Result;

use crate::backend::{normalize_url, BackendClient};
use crate::favorites::Favorites;
use crate::frame::{ContentFrame, FrameSignal, Page};
use crate::guard::{LoadGuard, LOAD_DEADLINE};
use crate::history::History;
use crate::monitor::{ConnectionMonitor, ConnectionState};
use crate::ui::{InputMode, PanelKind, PanelView, Screen, UserAction, View, ViewModel};

/// An open sidebar panel and its selection cursor.
struct Panel {
    kind: PanelKind,
    selected: usize,
}

/// The shell controller: owns all mutable state and drives the view. Every
/// transition between the Home, Loading and Viewing screens goes through
/// `transition`, and all state is mutated from the single `run` loop.
pub struct Shell<V: View> {
    view: V,
    backend: BackendClient,
    history: History,
    favorites: Favorites,
    monitor: ConnectionMonitor,
    frame: ContentFrame,
    guard: LoadGuard,
    screen: Screen,
    page: Option<Page>,
    address: String,
    address_focused: bool,
    panel: Option<Panel>,
    alert: Option<String>,
    status: String,
    pending_navigation: Option<String>,
    should_quit: bool,
}

impl<V: View> Shell<V> {
    pub fn new(view: V, backend: BackendClient, favorites: Favorites) -> Self {
        Self {
            view,
            backend,
            history: History::new(),
            favorites,
            monitor: ConnectionMonitor::new(),
            frame: ContentFrame::new(),
            guard: LoadGuard::new(),
            screen: Screen::Home,
            page: None,
            address: String::new(),
            address_focused: true,
            panel: None,
            alert: None,
            status: "Connecting to backend…".to_string(),
            pending_navigation: None,
            should_quit: false,
        }
    }

    /// Queues a navigation to run as soon as the backend reports healthy.
    /// Used for the URL given on the command line.
    pub fn queue_navigation(&mut self, url: &str) {
        self.pending_navigation = Some(url.to_string());
    }

    pub async fn run(&mut self) -> Result<()> {
        let result = self.event_loop().await;
        self.view.cleanup()?;
        result
    }

    async fn event_loop(&mut self) -> Result<()> {
        let mut dirty = true;
        loop {
            if self.tick() {
                dirty = true;
            }
            if dirty {
                self.render()?;
                dirty = false;
            }
            if let Some(action) = self.view.poll_action(self.input_mode())? {
                self.dispatch(action);
                dirty = true;
            }
            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let model = ViewModel {
            screen: self.screen,
            address: &self.address,
            address_focused: self.address_focused,
            connection: self.monitor.state(),
            backend_origin: self.backend.origin(),
            status: &self.status,
            page: self.page.as_ref(),
            loading_url: self.history.current(),
            starred: self.history.current().is_some_and(|u| self.favorites.contains(u)),
            can_go_back: self.history.can_go_back(),
            can_go_forward: self.history.can_go_forward(),
            can_refresh: self.history.current().is_some(),
            panel: self.panel.as_ref().map(|p| PanelView {
                kind: p.kind,
                rows: self.panel_rows(p.kind),
                selected: p.selected,
            }),
            alert: self.alert.as_deref(),
        };
        self.view.render(&model)
    }

    /// One pass over the asynchronous inputs: probe results, frame signals
    /// and the loading deadline. Returns true when anything changed.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        let mut changed = false;

        if let Some(state) = self.monitor.tick(&self.backend, now) {
            self.status = match state {
                ConnectionState::Connected => "✓ Connected and ready".to_string(),
                ConnectionState::Disconnected => "Backend unreachable".to_string(),
                ConnectionState::Unknown => "Connecting to backend…".to_string(),
            };
            if state == ConnectionState::Connected {
                if let Some(url) = self.pending_navigation.take() {
                    self.navigate(&url);
                }
            }
            changed = true;
        }

        while let Some(signal) = self.frame.poll() {
            changed = true;
            match signal {
                FrameSignal::Loaded(page) => {
                    self.guard.disarm();
                    self.status = format!("Loaded {}", page.url);
                    self.page = Some(page);
                    if self.screen == Screen::Loading {
                        self.transition(Screen::Viewing);
                    }
                }
                FrameSignal::Failed { url, reason } => {
                    self.guard.disarm();
                    self.alert = Some(format!(
                        "Could not load {}: {}. The site may be down, the page may not be \
                         proxyable, or the backend may be overloaded.",
                        url, reason
                    ));
                    self.status = "Load failed".to_string();
                    self.transition(Screen::Home);
                }
            }
        }

        // Safety valve: an embedded load that never signals completion gets
        // its content view revealed anyway once the deadline passes.
        if self.guard.fire_if_due(now) && self.screen == Screen::Loading {
            log::warn!("load deadline passed without a completion signal; revealing content");
            self.transition(Screen::Viewing);
            changed = true;
        }

        changed
    }

    fn input_mode(&self) -> InputMode {
        if self.alert.is_some() {
            InputMode::Alert
        } else if self.panel.is_some() {
            InputMode::Panel
        } else if self.address_focused {
            InputMode::Address
        } else {
            InputMode::Browse
        }
    }

    fn dispatch(&mut self, action: UserAction) {
        match action {
            UserAction::Quit => self.should_quit = true,
            UserAction::InputChar(c) => self.address.push(c),
            UserAction::Backspace => {
                self.address.pop();
            }
            UserAction::ClearInput => self.address.clear(),
            UserAction::Submit => {
                let input = self.address.clone();
                self.navigate(&input);
            }
            UserAction::CancelInput => {
                self.address_focused = false;
                if let Some(current) = self.history.current() {
                    self.address = current.to_string();
                }
            }
            UserAction::EditAddress => self.address_focused = true,
            UserAction::GoBack => self.go_back(),
            UserAction::GoForward => self.go_forward(),
            UserAction::Refresh => self.refresh(),
            UserAction::GoHome => self.go_home(),
            UserAction::ToggleFavorite => self.toggle_favorite(),
            UserAction::ToggleHistoryPanel => self.toggle_panel(PanelKind::History),
            UserAction::ToggleFavoritesPanel => self.toggle_panel(PanelKind::Favorites),
            UserAction::ClosePanel => self.panel = None,
            UserAction::PanelPrev => self.move_panel_selection(-1),
            UserAction::PanelNext => self.move_panel_selection(1),
            UserAction::PanelActivate => self.activate_panel_row(),
            UserAction::PanelDelete => self.delete_panel_row(),
            UserAction::ScrollUp => self.view.scroll_up(),
            UserAction::ScrollDown => self.view.scroll_down(),
            UserAction::DismissAlert => self.alert = None,
        }
    }

    /// New navigation: normalize, gate on connection, truncate-and-append
    /// history, then hand the URL to the frame.
    pub fn navigate(&mut self, raw: &str) {
        let raw = raw.trim();
        if raw.is_empty() {
            return;
        }
        if !self.monitor.allows_navigation() {
            self.status = "Waiting for the backend connection…".to_string();
            return;
        }
        let url = match normalize_url(raw) {
            Ok(url) => url,
            Err(e) => {
                self.alert = Some(format!("Could not open \"{}\": {}", raw, e));
                return;
            }
        };

        // A late probe failure must not land after the user navigated.
        self.monitor.abort_inflight();
        self.history.push(url.clone());
        log::info!(
            "navigate to {} (history index {:?})",
            url,
            self.history.current_index()
        );
        self.start_load(url);
    }

    fn go_back(&mut self) {
        if let Some(url) = self.history.go_back().map(str::to_string) {
            self.start_load(url);
        }
    }

    fn go_forward(&mut self) {
        if let Some(url) = self.history.go_forward().map(str::to_string) {
            self.start_load(url);
        }
    }

    fn refresh(&mut self) {
        if let Some(url) = self.history.current().map(str::to_string) {
            self.start_load(url);
        }
    }

    /// Common tail of navigate/back/forward/refresh: reset the page, show
    /// the loading screen, start the frame load, arm the guard.
    fn start_load(&mut self, url: String) {
        self.page = None;
        self.address = url.clone();
        self.address_focused = false;
        self.panel = None;
        self.view.reset_scroll();
        self.transition(Screen::Loading);
        self.frame.load(&self.backend, &url);
        self.guard.arm(LOAD_DEADLINE);
        self.status = format!("Loading {}…", url);
    }

    pub fn go_home(&mut self) {
        self.frame.clear();
        if self.guard.is_armed() {
            log::debug!("cancelling the pending load deadline");
        }
        self.guard.disarm();
        self.page = None;
        self.address.clear();
        self.address_focused = true;
        self.view.reset_scroll();
        self.transition(Screen::Home);
    }

    fn toggle_favorite(&mut self) {
        let Some(url) = self.history.current().map(str::to_string) else {
            return;
        };
        match self.favorites.toggle(&url) {
            Ok(true) => self.status = format!("Added {} to favorites", url),
            Ok(false) => self.status = format!("Removed {} from favorites", url),
            Err(e) => {
                log::warn!("could not persist favorites: {}", e);
                self.status = "Could not save favorites".to_string();
            }
        }
    }

    fn toggle_panel(&mut self, kind: PanelKind) {
        self.panel = match &self.panel {
            Some(panel) if panel.kind == kind => None,
            _ => Some(Panel { kind, selected: 0 }),
        };
    }

    fn panel_rows(&self, kind: PanelKind) -> Vec<String> {
        match kind {
            // History reads newest-first.
            PanelKind::History => self.history.entries().iter().rev().cloned().collect(),
            PanelKind::Favorites => self.favorites.urls().to_vec(),
        }
    }

    fn move_panel_selection(&mut self, delta: i64) {
        let Some(panel) = &mut self.panel else { return };
        let len = match panel.kind {
            PanelKind::History => self.history.entries().len(),
            PanelKind::Favorites => self.favorites.urls().len(),
        };
        if len == 0 {
            return;
        }
        let selected = panel.selected as i64 + delta;
        panel.selected = selected.clamp(0, len as i64 - 1) as usize;
    }

    fn selected_panel_row(&self) -> Option<(PanelKind, String)> {
        let panel = self.panel.as_ref()?;
        let url = self.panel_rows(panel.kind).get(panel.selected)?.clone();
        Some((panel.kind, url))
    }

    fn activate_panel_row(&mut self) {
        if let Some((_, url)) = self.selected_panel_row() {
            self.panel = None;
            self.navigate(&url);
        }
    }

    /// Delete is a favorites-only affordance and must not navigate.
    fn delete_panel_row(&mut self) {
        let Some((PanelKind::Favorites, url)) = self.selected_panel_row() else {
            return;
        };
        if let Err(e) = self.favorites.remove(&url) {
            log::warn!("could not persist favorites: {}", e);
            self.status = "Could not save favorites".to_string();
            return;
        }
        if let Some(panel) = &mut self.panel {
            let len = self.favorites.urls().len();
            panel.selected = panel.selected.min(len.saturating_sub(1));
        }
    }

    fn transition(&mut self, to: Screen) {
        if self.screen != to {
            log::debug!("screen {:?} -> {:?}", self.screen, to);
            self.screen = to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Headless view: records nothing, returns no input.
    struct StubView;

    impl View for StubView {
        fn render(&mut self, _model: &ViewModel<'_>) -> Result<()> {
            Ok(())
        }
        fn poll_action(&mut self, _mode: InputMode) -> Result<Option<UserAction>> {
            Ok(None)
        }
        fn scroll_up(&mut self) {}
        fn scroll_down(&mut self) {}
        fn reset_scroll(&mut self) {}
        fn cleanup(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn connected_shell() -> (Shell<StubView>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let backend = BackendClient::new("http://127.0.0.1:9").unwrap();
        let favorites = Favorites::load(dir.path().join("favorites.json"));
        let mut shell = Shell::new(StubView, backend, favorites);
        shell.monitor.force_state(ConnectionState::Connected);
        (shell, dir)
    }

    fn page(url: &str) -> Page {
        Page {
            url: url.to_string(),
            title: "Title".to_string(),
            body: "Body".to_string(),
        }
    }

    #[tokio::test]
    async fn navigate_normalizes_and_pushes_history() {
        let (mut shell, _dir) = connected_shell();
        shell.navigate("example.com");

        assert_eq!(shell.history.entries(), &["https://example.com"]);
        assert_eq!(shell.screen, Screen::Loading);
        assert_eq!(shell.address, "https://example.com");
        assert!(shell.guard.is_armed());
    }

    #[tokio::test]
    async fn navigate_is_blocked_until_connected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = BackendClient::new("http://127.0.0.1:9").unwrap();
        let favorites = Favorites::load(dir.path().join("favorites.json"));
        let mut shell = Shell::new(StubView, backend, favorites);

        shell.navigate("example.com");
        assert!(shell.history.entries().is_empty());
        assert_eq!(shell.screen, Screen::Home);

        shell.monitor.force_state(ConnectionState::Connected);
        shell.navigate("example.com");
        assert_eq!(shell.history.entries(), &["https://example.com"]);
    }

    #[tokio::test]
    async fn empty_input_is_a_noop() {
        let (mut shell, _dir) = connected_shell();
        shell.navigate("   ");
        assert!(shell.history.entries().is_empty());
        assert_eq!(shell.screen, Screen::Home);
    }

    #[tokio::test]
    async fn navigation_sequence_leaves_cursor_at_the_end() {
        let (mut shell, _dir) = connected_shell();
        for url in ["a.com", "b.com", "c.com"] {
            shell.navigate(url);
        }
        assert_eq!(
            shell.history.entries(),
            &["https://a.com", "https://b.com", "https://c.com"]
        );
        assert_eq!(shell.history.current_index(), Some(2));
    }

    #[tokio::test]
    async fn navigating_after_back_truncates_forward_entries() {
        let (mut shell, _dir) = connected_shell();
        for url in ["a.com", "b.com", "c.com"] {
            shell.navigate(url);
        }
        shell.go_back();
        shell.go_back();
        shell.navigate("d.com");

        assert_eq!(shell.history.entries(), &["https://a.com", "https://d.com"]);
        assert_eq!(shell.history.current_index(), Some(1));
    }

    #[tokio::test]
    async fn back_and_forward_are_noops_at_the_bounds() {
        let (mut shell, _dir) = connected_shell();
        shell.go_back();
        shell.go_forward();
        assert_eq!(shell.screen, Screen::Home);

        shell.navigate("a.com");
        shell.go_back();
        assert_eq!(shell.history.current_index(), Some(0));
        shell.go_forward();
        shell.go_forward();
        assert_eq!(shell.history.current_index(), Some(0));
    }

    #[tokio::test]
    async fn loaded_signal_reveals_the_page_and_disarms_the_guard() {
        let (mut shell, _dir) = connected_shell();
        shell.navigate("example.com");
        shell
            .frame
            .inject(FrameSignal::Loaded(page("https://example.com")));

        assert!(shell.tick());
        assert_eq!(shell.screen, Screen::Viewing);
        assert_eq!(shell.page.as_ref().unwrap().url, "https://example.com");
        assert!(!shell.guard.is_armed());
    }

    #[tokio::test]
    async fn failed_signal_alerts_and_returns_home() {
        let (mut shell, _dir) = connected_shell();
        shell.navigate("example.com");
        shell.frame.inject(FrameSignal::Failed {
            url: "https://example.com".to_string(),
            reason: "backend returned HTTP 502".to_string(),
        });

        assert!(shell.tick());
        assert_eq!(shell.screen, Screen::Home);
        assert!(shell.alert.is_some());
        assert!(!shell.guard.is_armed());
        // History survives the failure.
        assert_eq!(shell.history.entries(), &["https://example.com"]);
    }

    #[tokio::test]
    async fn stalled_load_is_force_revealed_by_the_guard() {
        let (mut shell, _dir) = connected_shell();
        shell.navigate("example.com");
        shell.guard.arm(Duration::ZERO);

        assert!(shell.tick());
        assert_eq!(shell.screen, Screen::Viewing);
        assert!(shell.page.is_none());
    }

    #[tokio::test]
    async fn late_loaded_signal_fills_in_a_force_revealed_page() {
        let (mut shell, _dir) = connected_shell();
        shell.navigate("example.com");
        shell.guard.arm(Duration::ZERO);
        shell.tick();

        shell
            .frame
            .inject(FrameSignal::Loaded(page("https://example.com")));
        shell.tick();
        assert_eq!(shell.screen, Screen::Viewing);
        assert!(shell.page.is_some());
    }

    #[tokio::test]
    async fn go_home_cancels_the_guard_and_keeps_state() {
        let (mut shell, _dir) = connected_shell();
        shell.navigate("example.com");
        shell.toggle_favorite();
        shell.go_home();

        assert_eq!(shell.screen, Screen::Home);
        assert!(!shell.guard.is_armed());
        assert!(shell.address.is_empty());
        assert_eq!(shell.history.entries(), &["https://example.com"]);
        assert!(shell.favorites.contains("https://example.com"));

        // Signals from the abandoned load are stale and must be ignored.
        shell
            .frame
            .inject(FrameSignal::Loaded(page("https://example.com")));
        shell.tick();
        assert_eq!(shell.screen, Screen::Home);
    }

    #[tokio::test]
    async fn toggle_favorite_twice_is_idempotent() {
        let (mut shell, _dir) = connected_shell();
        shell.navigate("example.com");

        shell.toggle_favorite();
        assert!(shell.favorites.contains("https://example.com"));
        shell.toggle_favorite();
        assert!(!shell.favorites.contains("https://example.com"));
    }

    #[tokio::test]
    async fn toggle_favorite_without_history_is_a_noop() {
        let (mut shell, _dir) = connected_shell();
        shell.toggle_favorite();
        assert!(shell.favorites.urls().is_empty());
    }

    #[tokio::test]
    async fn history_panel_lists_newest_first() {
        let (mut shell, _dir) = connected_shell();
        shell.navigate("a.com");
        shell.navigate("b.com");
        shell.toggle_panel(PanelKind::History);

        assert_eq!(
            shell.panel_rows(PanelKind::History),
            vec!["https://b.com", "https://a.com"]
        );
    }

    #[tokio::test]
    async fn panel_activation_navigates_and_closes() {
        let (mut shell, _dir) = connected_shell();
        shell.navigate("a.com");
        shell.navigate("b.com");
        shell.toggle_panel(PanelKind::History);
        shell.move_panel_selection(1); // oldest entry, https://a.com

        shell.activate_panel_row();
        assert!(shell.panel.is_none());
        // Activation is a fresh navigation, so the entry is appended.
        assert_eq!(
            shell.history.entries(),
            &["https://a.com", "https://b.com", "https://a.com"]
        );
    }

    #[tokio::test]
    async fn favorites_delete_removes_without_navigating() {
        let (mut shell, _dir) = connected_shell();
        shell.navigate("a.com");
        shell.toggle_favorite();
        shell.navigate("b.com");
        shell.toggle_favorite();
        let history_len = shell.history.entries().len();

        shell.toggle_panel(PanelKind::Favorites);
        shell.delete_panel_row();

        assert_eq!(shell.favorites.urls(), &["https://b.com"]);
        assert_eq!(shell.history.entries().len(), history_len);
        assert!(shell.panel.is_some());
    }

    #[tokio::test]
    async fn pending_navigation_fires_on_first_connect() {
        let dir = tempfile::tempdir().unwrap();
        let backend = BackendClient::new("http://127.0.0.1:9").unwrap();
        let favorites = Favorites::load(dir.path().join("favorites.json"));
        let mut shell = Shell::new(StubView, backend, favorites);
        shell.queue_navigation("example.com");

        shell.monitor.inject_probe_result(true);
        shell.tick();

        assert_eq!(shell.history.entries(), &["https://example.com"]);
        assert_eq!(shell.screen, Screen::Loading);
    }

    #[tokio::test]
    async fn refresh_without_history_is_a_noop() {
        let (mut shell, _dir) = connected_shell();
        shell.refresh();
        assert_eq!(shell.screen, Screen::Home);
    }
}
