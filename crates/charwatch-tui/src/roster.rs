//! Roster panel: every known character, sorted, with selection markers.

use charwatch_core::{ConnectionPhase, LinkIndicator, SelectionModel, StatusRegistry};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::theme::Theme;
use crate::widget::StatusIndicator;

/// One roster line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub name: String,
    /// Display slot when selected
    pub slot: Option<usize>,
    pub indicator: LinkIndicator,
}

/// Rows for every registry name in lexicographic order.
pub fn roster_rows(
    registry: &StatusRegistry,
    selection: &SelectionModel,
    phase: ConnectionPhase,
) -> Vec<RosterRow> {
    registry
        .names()
        .into_iter()
        .map(|name| RosterRow {
            name: name.to_string(),
            slot: selection.position(name),
            indicator: LinkIndicator::for_character(phase, registry.get(name)),
        })
        .collect()
}

#[derive(Debug)]
pub struct RosterPanel<'a> {
    rows: &'a [RosterRow],
    cursor: usize,
    selected: usize,
    capacity: usize,
    theme: &'a Theme,
}

impl<'a> RosterPanel<'a> {
    pub fn new(rows: &'a [RosterRow], theme: &'a Theme) -> Self {
        Self {
            rows,
            cursor: 0,
            selected: 0,
            capacity: 0,
            theme,
        }
    }

    pub fn cursor(mut self, cursor: usize) -> Self {
        self.cursor = cursor;
        self
    }

    /// Selected count and capacity for the title.
    pub fn selection(mut self, selected: usize, capacity: usize) -> Self {
        self.selected = selected;
        self.capacity = capacity;
        self
    }

    fn row_line(&self, index: usize, row: &RosterRow) -> Line<'static> {
        let colors = &self.theme.colors;
        let at_cursor = index == self.cursor;
        let pointer = if at_cursor { "▶ " } else { "  " };
        let marker = match row.slot {
            Some(slot) => format!("[{}] ", slot + 1),
            None => "[ ] ".to_string(),
        };
        let mut name_style = Style::default().fg(colors.text);
        if row.slot.is_some() {
            name_style = name_style.add_modifier(Modifier::BOLD);
        }
        if at_cursor {
            name_style = name_style.fg(colors.focus_highlight);
        }
        let dot = StatusIndicator::from_link(&row.indicator, self.theme).as_span();
        Line::from(vec![
            Span::styled(pointer, Style::default().fg(colors.focus_highlight)),
            Span::styled(marker, Style::default().fg(colors.hotkey)),
            Span::styled(format!("{} ", row.name), name_style),
            // Dot only; the title is in the help text and on the cards.
            Span::styled("●", dot.style),
        ])
    }
}

impl Widget for RosterPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.border_dim))
            .title(Span::styled(
                format!(" Characters ({}/{}) ", self.selected, self.capacity),
                Style::default().fg(colors.header).add_modifier(Modifier::BOLD),
            ));
        let inner_height = block.inner(area).height as usize;

        let lines: Vec<Line> = if self.rows.is_empty() {
            vec![Line::styled(
                "No characters",
                Style::default().fg(colors.text_dim),
            )]
        } else {
            // Keep the cursor on screen.
            let offset = self.cursor.saturating_sub(inner_height.saturating_sub(1));
            self.rows
                .iter()
                .enumerate()
                .skip(offset)
                .take(inner_height)
                .map(|(i, row)| self.row_line(i, row))
                .collect()
        };

        Paragraph::new(lines).block(block).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charwatch_core::{CharacterRecord, PreferenceStore};
    use std::collections::HashMap;

    fn registry(entries: &[(&str, &str)]) -> StatusRegistry {
        let mut registry = StatusRegistry::new();
        let data: HashMap<String, CharacterRecord> = entries
            .iter()
            .map(|(name, connected)| {
                (
                    name.to_string(),
                    CharacterRecord::new().with("CONNECTED", *connected),
                )
            })
            .collect();
        registry.apply_snapshot(data);
        registry
    }

    #[test]
    fn test_rows_are_sorted_with_slots() {
        let registry = registry(&[("Corwin", "YES"), ("Aldric", "NO"), ("Brenna", "YES")]);
        let mut prefs = PreferenceStore::in_memory();
        let mut selection = SelectionModel::new(4);
        selection.toggle("Corwin", &registry, &mut prefs);
        selection.toggle("Aldric", &registry, &mut prefs);

        let rows = roster_rows(&registry, &selection, ConnectionPhase::Connected);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Aldric", "Brenna", "Corwin"]);
        assert_eq!(rows[0].slot, Some(1));
        assert_eq!(rows[1].slot, None);
        assert_eq!(rows[2].slot, Some(0));
    }

    #[test]
    fn test_indicators_follow_phase() {
        let registry = registry(&[("Aldric", "NO"), ("Brenna", "YES")]);
        let selection = SelectionModel::new(2);

        let live = roster_rows(&registry, &selection, ConnectionPhase::Connected);
        assert_eq!(live[0].indicator.title, "Disconnected (Character)");
        assert_eq!(live[1].indicator.title, "Connected");

        let down = roster_rows(&registry, &selection, ConnectionPhase::Disconnected);
        assert!(down.iter().all(|r| r.indicator.title == "Disconnected (Main)"));

        let connecting = roster_rows(&registry, &selection, ConnectionPhase::Connecting);
        assert!(connecting.iter().all(|r| r.indicator.title == "Connecting..."));
    }
}
