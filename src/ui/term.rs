use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
    Frame, Terminal,
};
use textwrap::fill;

use super::{InputMode, PanelKind, Screen, UserAction, View, ViewModel};
use crate::monitor::ConnectionState;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// ratatui implementation of the shell view: address bar on top, content in
/// the middle, status and key help at the bottom, panels and alerts as
/// overlays.
pub struct TerminalUi {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    scroll_position: u16,
    max_scroll: u16,
}

impl TerminalUi {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            scroll_position: 0,
            max_scroll: 0,
        })
    }

    fn render_address_bar(f: &mut Frame, area: Rect, model: &ViewModel<'_>) {
        let star = if model.starred { " ★" } else { "" };
        let cursor = if model.address_focused { "▏" } else { "" };
        let text = format!("🔗 {}{}{}", model.address, cursor, star);
        let style = if model.address_focused {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Blue)
        };

        f.render_widget(
            Paragraph::new(text)
                .style(style)
                .block(Block::default().borders(Borders::ALL).title("veil")),
            area,
        );
    }

    fn render_banner(f: &mut Frame, area: Rect, origin: &str) {
        let text = format!(
            "✖ Cannot reach the proxy backend at {}. Check that it is running; retrying automatically.",
            origin
        );
        f.render_widget(
            Paragraph::new(text)
                .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("Connection")),
            area,
        );
    }

    fn render_home(f: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "veil — a window onto the proxy backend",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Type an address and press Enter to browse."),
            Line::from(""),
            Line::from("Ctrl+C quit   g address   h history   v favorites"),
        ];
        f.render_widget(
            Paragraph::new(lines)
                .alignment(ratatui::layout::Alignment::Center)
                .block(Block::default().borders(Borders::ALL)),
            area,
        );
    }

    fn render_loading(f: &mut Frame, area: Rect, url: &str) {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "🌐 Loading…",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                url.to_string(),
                Style::default().fg(Color::Blue),
            )),
        ];
        f.render_widget(
            Paragraph::new(lines)
                .alignment(ratatui::layout::Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL)),
            area,
        );
    }

    fn page_lines(body: &str, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for block in body.lines() {
            let (text, style) = match block.strip_prefix("# ") {
                Some(heading) => (
                    heading,
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                None => (block, Style::default()),
            };
            for wrapped in fill(text, width.max(1)).lines() {
                lines.push(Line::from(Span::styled(wrapped.to_string(), style)));
            }
            lines.push(Line::from(""));
        }
        lines
    }

    fn render_status(f: &mut Frame, area: Rect, model: &ViewModel<'_>) {
        let connection = match model.connection {
            ConnectionState::Connected => Span::styled("●", Style::default().fg(Color::Green)),
            ConnectionState::Disconnected => Span::styled("●", Style::default().fg(Color::Red)),
            ConnectionState::Unknown => Span::styled("●", Style::default().fg(Color::Yellow)),
        };
        let nav = format!(
            "  {} back  {} forward  {} refresh",
            if model.can_go_back { "b" } else { "·" },
            if model.can_go_forward { "f" } else { "·" },
            if model.can_refresh { "r" } else { "·" },
        );
        let lines = vec![
            Line::from(vec![connection, Span::raw(format!(" {}", model.status))]),
            Line::from(vec![
                Span::styled(nav, Style::default().fg(Color::Cyan)),
                Span::raw("  g address  h history  v favorites  s star  Esc home  q quit"),
            ]),
        ];
        f.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status")),
            area,
        );
    }

    fn render_panel(f: &mut Frame, model: &ViewModel<'_>) {
        let Some(panel) = &model.panel else { return };
        let area = f.size();
        let panel_area = Rect {
            x: area.width.saturating_sub(area.width * 2 / 5),
            y: 0,
            width: area.width * 2 / 5,
            height: area.height,
        };
        f.render_widget(Clear, panel_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(panel_area);

        let (title, empty_message, help) = match panel.kind {
            PanelKind::History => ("📚 History", "No history yet", "Enter open · Esc close"),
            PanelKind::Favorites => (
                "⭐ Favorites",
                "No favorites yet",
                "Enter open · d delete · Esc close",
            ),
        };

        if panel.rows.is_empty() {
            f.render_widget(
                Paragraph::new(empty_message)
                    .style(Style::default().fg(Color::Gray))
                    .block(Block::default().borders(Borders::ALL).title(title)),
                chunks[0],
            );
        } else {
            let items: Vec<ListItem> = panel
                .rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    let style = if i == panel.selected {
                        Style::default()
                            .fg(Color::Black)
                            .bg(Color::Cyan)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::White)
                    };
                    ListItem::new(row.clone()).style(style)
                })
                .collect();
            f.render_widget(
                List::new(items).block(Block::default().borders(Borders::ALL).title(title)),
                chunks[0],
            );
        }

        f.render_widget(
            Paragraph::new(help)
                .style(Style::default().fg(Color::Gray))
                .block(Block::default().borders(Borders::ALL)),
            chunks[1],
        );
    }

    fn render_alert(f: &mut Frame, message: &str) {
        let area = f.size();
        let popup = Rect {
            x: area.width / 8,
            y: (area.height / 2).saturating_sub(4),
            width: area.width * 3 / 4,
            height: 8,
        };
        f.render_widget(Clear, popup);
        f.render_widget(
            Paragraph::new(format!("{}\n\nPress any key to dismiss", message))
                .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("❌ Load failed")),
            popup,
        );
    }

    fn map_key(mode: InputMode, code: KeyCode, modifiers: KeyModifiers) -> Option<UserAction> {
        // Raw mode swallows SIGINT, and on the home screen every plain key
        // belongs to the address field, so Ctrl+C must always quit.
        if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            return Some(UserAction::Quit);
        }
        match mode {
            InputMode::Alert => Some(UserAction::DismissAlert),
            InputMode::Panel => match code {
                KeyCode::Esc => Some(UserAction::ClosePanel),
                KeyCode::Up => Some(UserAction::PanelPrev),
                KeyCode::Down => Some(UserAction::PanelNext),
                KeyCode::Enter => Some(UserAction::PanelActivate),
                KeyCode::Char('d') | KeyCode::Delete => Some(UserAction::PanelDelete),
                KeyCode::Char('h') => Some(UserAction::ToggleHistoryPanel),
                KeyCode::Char('v') => Some(UserAction::ToggleFavoritesPanel),
                KeyCode::Char('q') => Some(UserAction::Quit),
                _ => None,
            },
            InputMode::Address => match code {
                KeyCode::Esc => Some(UserAction::CancelInput),
                KeyCode::Enter => Some(UserAction::Submit),
                KeyCode::Backspace => Some(UserAction::Backspace),
                KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(UserAction::ClearInput)
                }
                KeyCode::Char(c) => Some(UserAction::InputChar(c)),
                _ => None,
            },
            InputMode::Browse => match code {
                KeyCode::Char('q') => Some(UserAction::Quit),
                KeyCode::Char('g') => Some(UserAction::EditAddress),
                KeyCode::Char('b') | KeyCode::Left => Some(UserAction::GoBack),
                KeyCode::Char('f') | KeyCode::Right => Some(UserAction::GoForward),
                KeyCode::Char('r') => Some(UserAction::Refresh),
                KeyCode::Char('s') => Some(UserAction::ToggleFavorite),
                KeyCode::Char('h') => Some(UserAction::ToggleHistoryPanel),
                KeyCode::Char('v') => Some(UserAction::ToggleFavoritesPanel),
                KeyCode::Esc => Some(UserAction::GoHome),
                KeyCode::Up => Some(UserAction::ScrollUp),
                KeyCode::Down => Some(UserAction::ScrollDown),
                _ => None,
            },
        }
    }
}

impl View for TerminalUi {
    fn render(&mut self, model: &ViewModel<'_>) -> Result<()> {
        // Rect math (scroll clamping, panel geometry) needs &mut self, so the
        // frame is composed with plain functions and state updated up front.
        let size = self.terminal.size()?;
        let banner = model.connection == ConnectionState::Disconnected;
        let mut constraints = vec![Constraint::Length(3)];
        if banner {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Min(5));
        constraints.push(Constraint::Length(4));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(size);
        let content_area = chunks[if banner { 2 } else { 1 }];

        // Pre-compute content before borrowing the terminal for draw.
        let mut content_snapshot: Option<(Rect, Vec<Line<'static>>, usize, usize)> = None;
        if model.screen == Screen::Viewing {
            if let Some(page) = model.page {
                let width = content_area.width.saturating_sub(2) as usize;
                let lines = Self::page_lines(&page.body, width);
                let visible_height = content_area.height.saturating_sub(2) as usize;
                self.max_scroll = lines.len().saturating_sub(visible_height) as u16;
                self.scroll_position = self.scroll_position.min(self.max_scroll);
                let start = self.scroll_position as usize;
                let end = (start + visible_height).min(lines.len());
                content_snapshot = Some((content_area, lines, start, end));
            }
        }

        self.terminal.draw(|f| {
            Self::render_address_bar(f, chunks[0], model);
            if banner {
                Self::render_banner(f, chunks[1], model.backend_origin);
            }
            match model.screen {
                Screen::Home => Self::render_home(f, content_area),
                Screen::Loading => {
                    Self::render_loading(f, content_area, model.loading_url.unwrap_or(""))
                }
                Screen::Viewing => match (&content_snapshot, model.page) {
                    (Some((area, lines, start, end)), Some(page)) => {
                        f.render_widget(
                            Paragraph::new(lines[*start..*end].to_vec()).block(
                                Block::default()
                                    .borders(Borders::ALL)
                                    .title(format!("📄 {}", page.title)),
                            ),
                            *area,
                        );
                        if lines.len() > end - start {
                            let scrollbar = Scrollbar::default()
                                .orientation(ScrollbarOrientation::VerticalRight)
                                .begin_symbol(None)
                                .end_symbol(None);
                            let mut state = ScrollbarState::default()
                                .content_length(lines.len())
                                .position(*start);
                            f.render_stateful_widget(scrollbar, *area, &mut state);
                        }
                    }
                    _ => {
                        f.render_widget(
                            Paragraph::new("Content is still arriving from the backend…")
                                .style(Style::default().fg(Color::Gray))
                                .block(Block::default().borders(Borders::ALL).title("📄 Page")),
                            content_area,
                        );
                    }
                },
            }
            Self::render_status(f, chunks[chunks.len() - 1], model);
            Self::render_panel(f, model);
            if let Some(alert) = model.alert {
                Self::render_alert(f, alert);
            }
        })?;
        Ok(())
    }

    fn poll_action(&mut self, mode: InputMode) -> Result<Option<UserAction>> {
        if !event::poll(POLL_INTERVAL)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(Self::map_key(mode, key.code, key.modifiers)),
            _ => Ok(None),
        }
    }

    fn scroll_up(&mut self) {
        self.scroll_position = self.scroll_position.saturating_sub(1);
    }

    fn scroll_down(&mut self) {
        if self.scroll_position < self.max_scroll {
            self.scroll_position += 1;
        }
    }

    fn reset_scroll(&mut self) {
        self.scroll_position = 0;
        self.max_scroll = 0;
    }

    fn cleanup(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}
