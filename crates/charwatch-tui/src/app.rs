//! Main application state and logic for the charwatch TUI.
//!
//! `App` owns everything the dashboard shows: the registry mirror, the
//! selection, the display slots and the link that feeds them. All of it is
//! touched only from the UI thread. Each frame drains the link, runs at most
//! one reconciliation pass, and redraws if anything changed.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use charwatch_core::reconcile::SlotView;
use charwatch_core::{
    CharwatchError, ConnectionPhase, DashboardConfig, PrefKey, PreferenceStore, ReconcileInput, ReconcileReport,
    Reconciler, SelectionModel, StatusRegistry, ThemePreference, ToggleOutcome,
};
use charwatch_link::{StatusLink, Transport, WsTransport};
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use tracing::{debug, info};

use crate::event::{AppEvent, InputHandler};
use crate::roster::{RosterPanel, roster_rows};
use crate::theme::ThemeManager;
use crate::widget::{CharacterCard, HotkeyHints};

/// Result type for app operations.
pub type AppResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Target frame rate (60 FPS = ~16.67ms per frame).
const TARGET_FPS: u64 = 60;
const FRAME_DURATION: Duration = Duration::from_millis(1000 / TARGET_FPS);

/// Header timestamp cache duration (update every second).
const TIMESTAMP_CACHE_DURATION: Duration = Duration::from_secs(1);

/// How long quitting waits for the close handshake.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

const ROSTER_WIDTH: u16 = 34;
const MIN_CARD_WIDTH: u16 = 44;
const MAX_CARD_COLUMNS: u16 = 4;
const DETAIL_SCROLL_STEP: u16 = 5;

/// Main application state.
pub struct App<T: Transport = WsTransport> {
    config: DashboardConfig,
    registry: StatusRegistry,
    selection: SelectionModel,
    prefs: PreferenceStore,
    reconciler: Reconciler,
    link: StatusLink<T>,
    theme_manager: ThemeManager,
    input_handler: InputHandler,
    should_quit: bool,
    show_help: bool,
    roster_collapsed: bool,
    /// Roster row under the cursor
    cursor: usize,
    /// Detail scroll offset per slot
    detail_scroll: Vec<u16>,
    /// Slot whose detail the scroll keys move
    focused_slot: Option<usize>,
    status_message: Option<String>,
    /// Dirty flag - whether UI needs redraw
    dirty: bool,
    cached_timestamp: Option<String>,
    last_timestamp_update: Instant,
}

impl App<WsTransport> {
    /// App talking to the configured server over WebSocket.
    pub fn from_config(config: DashboardConfig, prefs: PreferenceStore) -> AppResult<Self> {
        let link = StatusLink::from_config(&config)?;
        Ok(Self::new(config, prefs, link))
    }

    /// Close the link with a normal closure and stop its runtime.
    pub fn shutdown(self) {
        info!("shutting down link");
        self.link.shutdown(SHUTDOWN_GRACE);
    }
}

impl<T: Transport> App<T> {
    /// Build the app, restoring selection, theme, roster state and info-bar
    /// keys from `prefs`. Nothing connects until [`App::start`].
    pub fn new(config: DashboardConfig, mut prefs: PreferenceStore, link: StatusLink<T>) -> Self {
        let selection = SelectionModel::load(config.max_slots, &mut prefs);
        let theme = prefs.load_theme();
        let roster_collapsed = prefs.load_panel_collapsed();
        let info_bar_items = prefs.load_info_bar_items(config.info_bar_items.clone());
        let reconciler = Reconciler::new(&config, info_bar_items);
        let slot_count = reconciler.slots().len();

        debug!(
            restored = selection.len(),
            theme = theme.as_str(),
            roster_collapsed,
            "restored preferences"
        );

        Self {
            config,
            registry: StatusRegistry::new(),
            selection,
            prefs,
            reconciler,
            link,
            theme_manager: ThemeManager::new(theme),
            input_handler: InputHandler::new(),
            should_quit: false,
            show_help: false,
            roster_collapsed,
            cursor: 0,
            detail_scroll: vec![0; slot_count],
            focused_slot: None,
            status_message: None,
            dirty: true,
            cached_timestamp: None,
            last_timestamp_update: Instant::now(),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn registry(&self) -> &StatusRegistry {
        &self.registry
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn link(&self) -> &StatusLink<T> {
        &self.link
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.link.phase()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn roster_collapsed(&self) -> bool {
        self.roster_collapsed
    }

    pub fn theme_name(&self) -> ThemePreference {
        self.theme_manager.theme_name()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn detail_scroll(&self, slot: usize) -> u16 {
        self.detail_scroll.get(slot).copied().unwrap_or(0)
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Replace the info-bar keys and persist them.
    pub fn set_info_bar_items(&mut self, items: Vec<String>) {
        self.prefs.save(PrefKey::InfoBarItems, &items);
        self.reconciler.set_info_bar_items(items);
        self.reconcile(false);
    }

    /// Open the first connection and lay out the slots.
    pub fn start(&mut self) {
        info!(url = %self.link.url(), "starting dashboard");
        self.link.connect();
        self.reconcile(false);
    }

    /// Mark the UI as dirty (needs redraw).
    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Check if UI needs redraw and clear the dirty flag.
    fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Get cached timestamp or update if expired.
    fn get_cached_timestamp(&mut self) -> String {
        if self.cached_timestamp.is_none()
            || self.last_timestamp_update.elapsed() >= TIMESTAMP_CACHE_DURATION
        {
            self.cached_timestamp = Some(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
            self.last_timestamp_update = Instant::now();
        }
        self.cached_timestamp.clone().unwrap_or_default()
    }

    /// One frame's worth of link work: drain every queued event, fire the
    /// reconnect deadline, then reconcile once if the registry or the phase
    /// moved. Returns the report of the pass, if one ran.
    pub fn tick(&mut self, now: Instant) -> Option<ReconcileReport> {
        let update = self.link.pump(&mut self.registry, now);
        if update.phase_changed {
            self.mark_dirty();
        }
        if update.registry_touched() || update.phase_changed {
            Some(self.reconcile(update.registry_touched()))
        } else {
            None
        }
    }

    /// Full reconciliation pass against the current phase.
    fn reconcile(&mut self, registry_mutated: bool) -> ReconcileReport {
        let report = self.reconciler.reconcile(ReconcileInput {
            phase: self.link.phase(),
            registry: &self.registry,
            registry_mutated,
            selection: &mut self.selection,
            prefs: &mut self.prefs,
        });

        if !report.deselected.is_empty() {
            self.status_message = Some(format!("No longer reported: {}", report.deselected.join(", ")));
        }
        for (index, slot) in self.reconciler.slots().iter().enumerate() {
            if !slot.is_expanded() {
                self.detail_scroll[index] = 0;
            }
        }
        if let Some(focused) = self.focused_slot {
            if !self.reconciler.slots()[focused].is_expanded() {
                self.focused_slot = None;
            }
        }
        self.clamp_cursor();
        self.mark_dirty();
        report
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.registry.len().saturating_sub(1));
    }

    fn name_at_cursor(&self) -> Option<String> {
        self.registry
            .names()
            .get(self.cursor)
            .map(|name| name.to_string())
    }

    /// Select or deselect the name under the roster cursor.
    pub fn toggle_selection(&mut self) {
        let Some(name) = self.name_at_cursor() else {
            return;
        };
        let outcome = self.selection.toggle(&name, &self.registry, &mut self.prefs);
        self.status_message = match &outcome {
            ToggleOutcome::Added => Some(format!("Showing {name}")),
            ToggleOutcome::AddedWithEviction { evicted } => {
                Some(format!("Showing {name} (replaced {evicted})"))
            }
            ToggleOutcome::Removed => Some(format!("Hid {name}")),
            ToggleOutcome::Rejected => None,
        };
        if outcome.changed() {
            self.reconcile(false);
        }
    }

    /// Expand or collapse one card. Only live cards respond.
    pub fn toggle_expand(&mut self, slot: usize) {
        if !self
            .reconciler
            .toggle_expand(slot, self.link.phase(), &self.registry)
        {
            return;
        }
        // Opening (or closing) always starts from the top.
        self.detail_scroll[slot] = 0;
        let expanded = self.reconciler.slots()[slot].is_expanded();
        self.focused_slot = if expanded {
            Some(slot)
        } else {
            self.focused_slot.filter(|&f| f != slot)
        };
        self.mark_dirty();
    }

    fn scroll_detail(&mut self, down: bool) {
        let Some(slot) = self.focused_slot else {
            return;
        };
        let offset = &mut self.detail_scroll[slot];
        *offset = if down {
            offset.saturating_add(DETAIL_SCROLL_STEP)
        } else {
            offset.saturating_sub(DETAIL_SCROLL_STEP)
        };
        self.mark_dirty();
    }

    /// Reconnect now, dropping any pending retry.
    pub fn reconnect(&mut self) {
        info!(url = %self.link.url(), "manual reconnect");
        self.link.connect();
        self.status_message = Some(format!("Reconnecting to {}", self.link.url()));
        self.reconcile(false);
    }

    pub fn toggle_theme(&mut self) {
        let theme = self.theme_manager.toggle();
        self.prefs.save(PrefKey::Theme, &theme);
        self.mark_dirty();
    }

    pub fn toggle_roster(&mut self) {
        self.roster_collapsed = !self.roster_collapsed;
        self.prefs.save(PrefKey::PanelCollapsed, &self.roster_collapsed);
        self.mark_dirty();
    }

    /// Handle a key event.
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        let event = self.input_handler.handle_key(key);
        self.handle_app_event(event);
    }

    /// Handle an application event.
    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ShowHelp => {
                self.show_help = true;
                self.mark_dirty();
            }
            AppEvent::HideHelp => {
                self.show_help = false;
                self.mark_dirty();
            }
            AppEvent::Quit | AppEvent::ForceQuit => self.should_quit = true,
            AppEvent::Cancel => {
                self.show_help = false;
                self.input_handler.set_help_mode(false);
                self.status_message = None;
                self.mark_dirty();
            }
            AppEvent::NavigateUp => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.mark_dirty();
                }
            }
            AppEvent::NavigateDown => {
                if self.cursor + 1 < self.registry.len() {
                    self.cursor += 1;
                    self.mark_dirty();
                }
            }
            AppEvent::GoToTop => {
                self.cursor = 0;
                self.mark_dirty();
            }
            AppEvent::GoToBottom => {
                self.cursor = self.registry.len().saturating_sub(1);
                self.mark_dirty();
            }
            AppEvent::ToggleSelection => self.toggle_selection(),
            AppEvent::ToggleExpand(slot) => self.toggle_expand(slot),
            AppEvent::ScrollDetailUp => self.scroll_detail(false),
            AppEvent::ScrollDetailDown => self.scroll_detail(true),
            AppEvent::Reconnect => self.reconnect(),
            AppEvent::ToggleTheme => self.toggle_theme(),
            AppEvent::TogglePanel => self.toggle_roster(),
            AppEvent::None => {}
        }
    }

    /// Run without a terminal until `stop` is set, logging every slot change.
    pub fn run_headless(&mut self, stop: &AtomicBool) {
        self.start();
        self.log_slots(&(0..self.reconciler.slots().len()).collect::<Vec<_>>());
        while !stop.load(Ordering::Relaxed) {
            if let Some(report) = self.tick(Instant::now()) {
                for name in &report.deselected {
                    info!(character = %name, "deselected, no longer reported");
                }
                self.log_slots(&report.changed_slots);
            }
            std::thread::sleep(FRAME_DURATION);
        }
        info!("headless run stopped");
    }

    fn log_slots(&self, indices: &[usize]) {
        for &index in indices {
            let Some(slot) = self.reconciler.slot(index) else {
                continue;
            };
            match slot.view() {
                SlotView::Cleared => info!(slot = index + 1, "slot cleared"),
                SlotView::Offline(card) => info!(slot = index + 1, title = %card.title, "slot offline"),
                SlotView::Live(card) => info!(
                    slot = index + 1,
                    character = %card.name,
                    hp = %card.hp.text,
                    resource = %card.resource.text,
                    lag = card.lag.as_ref().map(|l| l.title.as_str()).unwrap_or("-"),
                    affects = card.affects.entries.len(),
                    "slot updated"
                ),
            }
        }
    }

    /// Run the main application loop.
    pub fn run(&mut self) -> AppResult<()> {
        // Setup terminal
        let init_error = |e: io::Error| CharwatchError::TerminalInit {
            message: e.to_string(),
        };
        crossterm::terminal::enable_raw_mode().map_err(init_error)?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen).map_err(init_error)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(init_error)?;

        self.start();
        let result = self.run_loop(&mut terminal);

        // Restore terminal
        let restore_error = |e: io::Error| CharwatchError::TerminalRestore {
            message: e.to_string(),
        };
        crossterm::terminal::disable_raw_mode().map_err(restore_error)?;
        crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen)
            .map_err(restore_error)?;
        terminal.show_cursor().map_err(restore_error)?;

        result
    }

    /// The inner event loop with frame-rate limiting.
    fn run_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> AppResult<()> {
        while !self.should_quit {
            let frame_start = Instant::now();

            // Everything that arrived since the last frame, one pass at most.
            self.tick(frame_start);

            let needs_redraw = self.take_dirty()
                || self.last_timestamp_update.elapsed() >= TIMESTAMP_CACHE_DURATION;
            if needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
            }

            // Remaining frame budget goes to waiting for input.
            let elapsed = frame_start.elapsed();
            let event_timeout = if elapsed < FRAME_DURATION {
                FRAME_DURATION - elapsed
            } else {
                Duration::from_millis(1)
            };

            if event::poll(event_timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key_event(key),
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Draw the UI.
    pub fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();

        // Main layout: header, content, footer
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(6),    // Content
                Constraint::Length(2), // Footer
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        self.draw_content(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);

        if self.show_help {
            self.draw_help_overlay(frame, area);
        }
    }

    /// Header: app title and server, clock, link status.
    fn draw_header(&mut self, frame: &mut Frame, area: Rect) {
        let now = self.get_cached_timestamp();
        let theme = self.theme_manager.current();
        let phase = self.link.phase();
        let status_text = format!("[{}]", phase.status_label(self.link.reconnect_pending()));
        let title = format!(" charwatch - {} ", self.link.url());

        let right_len = now.chars().count() + 2 + status_text.chars().count();
        let spacing = area
            .width
            .saturating_sub(title.chars().count() as u16 + right_len as u16 + 2) as usize;

        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                title,
                Style::default().fg(theme.colors.header).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" ".repeat(spacing)),
            Span::styled(now, Style::default().fg(theme.colors.text_dim)),
            Span::raw("  "),
            Span::styled(status_text, Style::default().fg(theme.phase_color(phase))),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.colors.border_dim)),
        );

        frame.render_widget(header, area);
    }

    fn draw_content(&self, frame: &mut Frame, area: Rect) {
        let cards_area = if self.roster_collapsed {
            area
        } else {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(ROSTER_WIDTH), Constraint::Min(0)])
                .split(area);
            self.draw_roster(frame, columns[0]);
            columns[1]
        };
        self.draw_cards(frame, cards_area);
    }

    fn draw_roster(&self, frame: &mut Frame, area: Rect) {
        let rows = roster_rows(&self.registry, &self.selection, self.link.phase());
        let panel = RosterPanel::new(&rows, self.theme_manager.current())
            .cursor(self.cursor)
            .selection(self.selection.len(), self.selection.capacity());
        frame.render_widget(panel, area);
    }

    /// Slots in a grid; rows holding an expanded card get more height.
    fn draw_cards(&self, frame: &mut Frame, area: Rect) {
        let slots = self.reconciler.slots();
        let columns = (area.width / MIN_CARD_WIDTH).clamp(1, MAX_CARD_COLUMNS) as usize;
        let columns = columns.min(slots.len()).max(1);
        let row_count = slots.len().div_ceil(columns);

        let row_weights: Vec<Constraint> = slots
            .chunks(columns)
            .map(|row| {
                if row.iter().any(|slot| slot.is_expanded()) {
                    Constraint::Fill(3)
                } else {
                    Constraint::Fill(1)
                }
            })
            .collect();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(row_weights)
            .split(area);

        let theme = self.theme_manager.current();
        for row in 0..row_count {
            let cells = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
                .split(rows[row]);
            for col in 0..columns {
                let index = row * columns + col;
                let Some(slot) = slots.get(index) else {
                    break;
                };
                let card = CharacterCard::new(index, slot, theme).detail_scroll(self.detail_scroll(index));
                frame.render_widget(card, cells[col]);
            }
        }
    }

    /// Footer: hotkey hints, plus the latest status message.
    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let theme = self.theme_manager.current();
        let hints = HotkeyHints::new(theme.colors.hotkey)
            .hint("↑↓", "Move")
            .hint("Space", "Show/Hide")
            .hint("1-9", "Details")
            .hint("r", "Reconnect")
            .hint("[", "Roster")
            .hint("t", "Theme")
            .hint("?", "Help")
            .hint("q", "Quit");

        let mut block = Block::default().borders(Borders::TOP);
        if let Some(message) = &self.status_message {
            block = block
                .title(Span::styled(
                    format!(" {message} "),
                    Style::default().fg(theme.colors.text),
                ))
                .title_alignment(Alignment::Right);
        }

        let footer = Paragraph::new(hints.as_line())
            .style(Style::default().fg(theme.colors.text_dim))
            .block(block);
        frame.render_widget(footer, area);
    }

    fn draw_help_overlay(&self, frame: &mut Frame, area: Rect) {
        let theme = self.theme_manager.current();
        let overlay_width = 60.min(area.width.saturating_sub(4));
        let overlay_height = 22.min(area.height.saturating_sub(4));
        let overlay_x = (area.width - overlay_width) / 2;
        let overlay_y = (area.height - overlay_height) / 2;
        let overlay_area = Rect::new(overlay_x, overlay_y, overlay_width, overlay_height);

        frame.render_widget(Clear, overlay_area);

        let help_text = format!(
            "\
charwatch Hotkey Reference

Roster:
  ↑ k / ↓ j   Move cursor
  g / G       First / last character
  Space Enter Show or hide the character (max {})

Cards:
  1-9         Expand or collapse details
  PgUp PgDn   Scroll the open details

General:
  r           Reconnect now
  [           Collapse or expand the roster
  t           Toggle light / dark theme
  ?  h        Show this help
  Esc         Close overlays
  q           Quit
  Ctrl+C      Force quit

Press any key to close this help.",
            self.selection.capacity()
        );

        let help = Paragraph::new(help_text)
            .style(Style::default().fg(theme.colors.text))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(theme.colors.header))
                    .title(Span::styled(
                        " Help ",
                        Style::default().fg(theme.colors.header).add_modifier(Modifier::BOLD),
                    ))
                    .style(Style::default().bg(theme.colors.overlay_bg)),
            )
            .wrap(Wrap { trim: false });

        frame.render_widget(help, overlay_area);
    }
}
