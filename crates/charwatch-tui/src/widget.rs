//! Widgets for the character cards.

use charwatch_core::LinkIndicator;
use charwatch_core::display::{BarView, InfoItem, LagView};
use charwatch_core::reconcile::{DisplaySlot, LiveCard, OfflineCard, SlotView};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget, Wrap},
};

use crate::theme::Theme;

/// Width reserved for the bar label column ("Blood").
const LABEL_WIDTH: usize = 6;

/// Horizontal gauge: label, fill and a trailing text.
#[derive(Debug, Clone)]
pub struct GaugeBar {
    label: String,
    /// 0..=100
    percent: f64,
    text: String,
    fill_color: Color,
    empty_color: Color,
    text_color: Color,
}

impl GaugeBar {
    pub fn new(label: impl Into<String>, percent: f64, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            percent: percent.clamp(0.0, 100.0),
            text: text.into(),
            fill_color: Color::Green,
            empty_color: Color::DarkGray,
            text_color: Color::White,
        }
    }

    /// HP, mana or blood bar.
    pub fn from_bar(bar: &BarView, theme: &Theme) -> Self {
        Self::new(bar.kind.label(), bar.percent, bar.text.clone())
            .fill_color(theme.bar_color(bar.kind))
            .empty_color(theme.colors.bar_empty)
            .text_color(theme.colors.text)
    }

    /// Lag gauge; the text is the lag title.
    pub fn from_lag(lag: &LagView, theme: &Theme) -> Self {
        Self::new("Lag", f64::from(lag.percent), lag.title.clone())
            .fill_color(theme.lag_color(lag.severity))
            .empty_color(theme.colors.bar_empty)
            .text_color(theme.colors.text_dim)
    }

    pub fn fill_color(mut self, color: Color) -> Self {
        self.fill_color = color;
        self
    }

    pub fn empty_color(mut self, color: Color) -> Self {
        self.empty_color = color;
        self
    }

    pub fn text_color(mut self, color: Color) -> Self {
        self.text_color = color;
        self
    }

    /// Cells of fill and empty for a bar `width` cells wide.
    fn split(&self, width: usize) -> (usize, usize) {
        let filled = ((self.percent / 100.0) * width as f64).round() as usize;
        let filled = filled.min(width);
        (filled, width - filled)
    }

    fn bar_width(&self, total: usize) -> usize {
        total.saturating_sub(LABEL_WIDTH + 1 + self.text.chars().count())
    }

    /// Plain-text rendering, `width` cells wide.
    pub fn render_string(&self, width: usize) -> String {
        let (filled, empty) = self.split(self.bar_width(width));
        format!(
            "{:<LABEL_WIDTH$}{}{} {}",
            self.label,
            "▓".repeat(filled),
            "░".repeat(empty),
            self.text
        )
    }

    /// The gauge as one styled line, `width` cells wide.
    pub fn as_line(&self, width: usize) -> Line<'static> {
        let (filled, empty) = self.split(self.bar_width(width));
        Line::from(vec![
            Span::styled(
                format!("{:<LABEL_WIDTH$}", self.label),
                Style::default().fg(self.text_color).add_modifier(Modifier::BOLD),
            ),
            Span::styled("▓".repeat(filled), Style::default().fg(self.fill_color)),
            Span::styled("░".repeat(empty), Style::default().fg(self.empty_color)),
            Span::styled(format!(" {}", self.text), Style::default().fg(self.text_color)),
        ])
    }
}

impl Widget for GaugeBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 2 || area.height == 0 {
            return;
        }
        let line = self.as_line(area.width as usize);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

/// A connection dot with its title.
#[derive(Debug, Clone)]
pub struct StatusIndicator {
    status: String,
    color: Color,
}

impl StatusIndicator {
    pub fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            status: text.into(),
            color,
        }
    }

    pub fn from_link(indicator: &LinkIndicator, theme: &Theme) -> Self {
        Self::new(indicator.title, theme.indicator_color(indicator.connected))
    }

    /// Render as a span.
    pub fn as_span(&self) -> Span<'static> {
        Span::styled(format!("● {}", self.status), Style::default().fg(self.color))
    }
}

/// A hotkey hint line for the footer.
#[derive(Debug)]
pub struct HotkeyHints {
    hints: Vec<(&'static str, &'static str)>,
    key_color: Color,
}

impl HotkeyHints {
    pub fn new(key_color: Color) -> Self {
        Self {
            hints: Vec::new(),
            key_color,
        }
    }

    pub fn hint(mut self, key: &'static str, description: &'static str) -> Self {
        self.hints.push((key, description));
        self
    }

    /// Render as a line of spans.
    pub fn as_line(&self) -> Line<'_> {
        let mut spans = Vec::with_capacity(self.hints.len() * 2);
        for (key, desc) in &self.hints {
            spans.push(Span::styled(format!("[{key}]"), Style::default().fg(self.key_color)));
            spans.push(Span::raw(format!("{desc} ")));
        }
        Line::from(spans)
    }
}

/// One display slot drawn as a bordered card.
#[derive(Debug)]
pub struct CharacterCard<'a> {
    /// Zero-based slot index
    index: usize,
    slot: &'a DisplaySlot,
    theme: &'a Theme,
    detail_scroll: u16,
}

impl<'a> CharacterCard<'a> {
    pub fn new(index: usize, slot: &'a DisplaySlot, theme: &'a Theme) -> Self {
        Self {
            index,
            slot,
            theme,
            detail_scroll: 0,
        }
    }

    pub fn detail_scroll(mut self, scroll: u16) -> Self {
        self.detail_scroll = scroll;
        self
    }

    fn title(&self) -> String {
        let number = self.index + 1;
        match self.slot.view() {
            SlotView::Cleared => format!(" [{number}] "),
            SlotView::Offline(card) => format!(" [{number}] {} ", card.title),
            SlotView::Live(card) => {
                let marker = if self.slot.is_expanded() { "▾" } else { "▸" };
                format!(" [{number}] {marker} {} ", card.name)
            }
        }
    }

    /// Everything above the detail panel, for an inner width of `width`.
    pub fn summary_lines(&self, width: usize) -> Vec<Line<'static>> {
        match self.slot.view() {
            SlotView::Cleared => vec![Line::styled(
                "Empty slot",
                Style::default().fg(self.theme.colors.text_dim),
            )],
            SlotView::Offline(card) => self.offline_lines(card, width),
            SlotView::Live(card) => self.live_lines(card, width),
        }
    }

    fn offline_lines(&self, card: &OfflineCard, width: usize) -> Vec<Line<'static>> {
        let dim = Style::default().fg(self.theme.colors.text_dim);
        let mut lines = vec![
            Line::styled(card.class.clone(), dim),
            GaugeBar::from_bar(&card.hp, self.theme)
                .fill_color(self.theme.colors.text_dim)
                .as_line(width),
            GaugeBar::from_bar(&card.resource, self.theme)
                .fill_color(self.theme.colors.text_dim)
                .as_line(width),
        ];
        if let Some(lag) = &card.lag {
            lines.push(GaugeBar::from_lag(lag, self.theme).as_line(width));
        }
        lines
    }

    fn live_lines(&self, card: &LiveCard, width: usize) -> Vec<Line<'static>> {
        let colors = &self.theme.colors;
        let warning = Style::default()
            .fg(colors.status_warning)
            .add_modifier(Modifier::BOLD);

        let mut lines = vec![
            Line::styled(card.class.clone(), Style::default().fg(colors.text_dim)),
            GaugeBar::from_bar(&card.hp, self.theme).as_line(width),
            GaugeBar::from_bar(&card.resource, self.theme).as_line(width),
        ];
        if let Some(lag) = &card.lag {
            lines.push(GaugeBar::from_lag(lag, self.theme).as_line(width));
        }
        if let Some(opponent) = &card.opponent {
            lines.push(Line::from(vec![
                Span::styled("vs ", Style::default().fg(colors.text_dim)),
                Span::styled(opponent.name.clone(), Style::default().fg(colors.status_error)),
                Span::styled(format!(" ({})", opponent.health), Style::default().fg(colors.text)),
            ]));
        }
        if card.blind {
            lines.push(Line::styled("BLIND: cannot see opponent", warning));
        }
        if !card.info_items.is_empty() {
            lines.push(self.info_line(&card.info_items));
        }
        if card.no_sanctuary {
            lines.push(Line::styled("NO SANCTUARY", warning));
        }
        lines.extend(
            card.affects
                .text
                .lines()
                .map(|affect| Line::styled(affect.to_string(), Style::default().fg(colors.text))),
        );
        lines
    }

    fn info_line(&self, items: &[InfoItem]) -> Line<'static> {
        let colors = &self.theme.colors;
        let mut spans = Vec::with_capacity(items.len() * 2);
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" | ", Style::default().fg(colors.border_dim)));
            }
            let text = match item {
                InfoItem::Text { text, .. } => text.clone(),
                InfoItem::Checkbox { label, checked, .. } => {
                    format!("[{}] {label}", if *checked { "x" } else { " " })
                }
            };
            spans.push(Span::styled(text, Style::default().fg(colors.text)));
        }
        Line::from(spans)
    }

    fn block(&self) -> Block<'static> {
        let colors = &self.theme.colors;
        let (border_style, border_type) = match self.slot.view() {
            SlotView::Cleared => (Style::default().fg(colors.border_dim), BorderType::Plain),
            SlotView::Offline(_) => (Style::default().fg(colors.text_dim), BorderType::Plain),
            SlotView::Live(_) if self.slot.is_expanded() => (
                Style::default().fg(colors.focus_highlight),
                BorderType::Double,
            ),
            SlotView::Live(_) => (Style::default().fg(colors.header), BorderType::Rounded),
        };

        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_type(border_type)
            .border_style(border_style)
            .title(Span::styled(
                self.title(),
                Style::default().fg(colors.header).add_modifier(Modifier::BOLD),
            ));

        let indicator = match self.slot.view() {
            SlotView::Cleared => None,
            SlotView::Offline(card) => Some(card.indicator),
            SlotView::Live(card) => Some(card.indicator),
        };
        if let Some(indicator) = indicator {
            let status = StatusIndicator::from_link(&indicator, self.theme);
            block = block.title(
                Line::from(vec![Span::raw(" "), status.as_span(), Span::raw(" ")]).right_aligned(),
            );
        }
        block
    }
}

impl Widget for CharacterCard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = self.block();
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let summary = self.summary_lines(inner.width as usize);
        let detail = match self.slot.view() {
            SlotView::Live(card) => card.detail.as_deref(),
            _ => None,
        };

        let Some(detail) = detail else {
            Paragraph::new(summary).render(inner, buf);
            return;
        };

        let summary_height = (summary.len() as u16).min(inner.height);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(summary_height), Constraint::Min(0)])
            .split(inner);
        Paragraph::new(summary).render(chunks[0], buf);

        Paragraph::new(detail.to_string())
            .style(Style::default().fg(self.theme.colors.text))
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(self.theme.colors.border_dim))
                    .title(" Details "),
            )
            .wrap(Wrap { trim: false })
            .scroll((self.detail_scroll, 0))
            .render(chunks[1], buf);
    }
}
