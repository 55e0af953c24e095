//! Keyboard handling for the charwatch TUI.
//!
//! Maps key presses onto [`AppEvent`]s; the app decides what they mean.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Application-level events that can trigger state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Show help overlay
    ShowHelp,
    /// Hide help overlay
    HideHelp,
    /// Request application quit
    Quit,
    /// Force quit (Ctrl+C)
    ForceQuit,
    /// Close overlays
    Cancel,
    /// Move the roster cursor up
    NavigateUp,
    /// Move the roster cursor down
    NavigateDown,
    /// Roster cursor to the first name
    GoToTop,
    /// Roster cursor to the last name
    GoToBottom,
    /// Select or deselect the name under the cursor
    ToggleSelection,
    /// Expand or collapse one card's detail (zero-based slot)
    ToggleExpand(usize),
    /// Scroll the open detail panel
    ScrollDetailUp,
    ScrollDetailDown,
    /// Reconnect now
    Reconnect,
    /// Switch light/dark
    ToggleTheme,
    /// Collapse or expand the roster panel
    TogglePanel,
    /// No action needed
    None,
}

/// Input handler for converting key events to app events.
#[derive(Debug, Default)]
pub struct InputHandler {
    /// While the help overlay is up, any key closes it
    help_mode: bool,
}

impl InputHandler {
    pub fn new() -> Self {
        Self { help_mode: false }
    }

    pub fn set_help_mode(&mut self, active: bool) {
        self.help_mode = active;
    }

    pub fn is_help_mode(&self) -> bool {
        self.help_mode
    }

    /// Handle a key event and return the corresponding app event.
    pub fn handle_key(&mut self, key: KeyEvent) -> AppEvent {
        // Ctrl+C always force quits
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return AppEvent::ForceQuit;
        }

        if self.help_mode {
            self.help_mode = false;
            return AppEvent::HideHelp;
        }

        if key.code == KeyCode::Esc {
            return AppEvent::Cancel;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => AppEvent::Quit,

            KeyCode::Char('?') | KeyCode::Char('h') => {
                self.help_mode = true;
                AppEvent::ShowHelp
            }

            KeyCode::Up | KeyCode::Char('k') => AppEvent::NavigateUp,
            KeyCode::Down | KeyCode::Char('j') => AppEvent::NavigateDown,
            KeyCode::Home | KeyCode::Char('g') => AppEvent::GoToTop,
            KeyCode::End | KeyCode::Char('G') => AppEvent::GoToBottom,

            KeyCode::Enter | KeyCode::Char(' ') => AppEvent::ToggleSelection,

            // 1-9 address slots 0-8
            KeyCode::Char(c @ '1'..='9') => AppEvent::ToggleExpand(c as usize - '1' as usize),
            KeyCode::PageUp => AppEvent::ScrollDetailUp,
            KeyCode::PageDown => AppEvent::ScrollDetailDown,

            KeyCode::Char('r') | KeyCode::Char('R') => AppEvent::Reconnect,
            KeyCode::Char('t') | KeyCode::Char('T') => AppEvent::ToggleTheme,
            KeyCode::Char('[') => AppEvent::TogglePanel,

            _ => AppEvent::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn key_event_with_mods(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, mods)
    }

    #[test]
    fn test_navigation_keys() {
        let mut handler = InputHandler::new();

        assert_eq!(handler.handle_key(key_event(KeyCode::Up)), AppEvent::NavigateUp);
        assert_eq!(handler.handle_key(key_event(KeyCode::Down)), AppEvent::NavigateDown);
        assert_eq!(handler.handle_key(key_event(KeyCode::Char('j'))), AppEvent::NavigateDown);
        assert_eq!(handler.handle_key(key_event(KeyCode::Char('k'))), AppEvent::NavigateUp);
        assert_eq!(handler.handle_key(key_event(KeyCode::Home)), AppEvent::GoToTop);
        assert_eq!(handler.handle_key(key_event(KeyCode::Char('G'))), AppEvent::GoToBottom);
    }

    #[test]
    fn test_selection_keys() {
        let mut handler = InputHandler::new();

        assert_eq!(handler.handle_key(key_event(KeyCode::Char(' '))), AppEvent::ToggleSelection);
        assert_eq!(handler.handle_key(key_event(KeyCode::Enter)), AppEvent::ToggleSelection);
    }

    #[test]
    fn test_digit_keys_expand_slots() {
        let mut handler = InputHandler::new();

        assert_eq!(handler.handle_key(key_event(KeyCode::Char('1'))), AppEvent::ToggleExpand(0));
        assert_eq!(handler.handle_key(key_event(KeyCode::Char('9'))), AppEvent::ToggleExpand(8));
        assert_eq!(handler.handle_key(key_event(KeyCode::Char('0'))), AppEvent::None);
    }

    #[test]
    fn test_ctrl_c_force_quit() {
        let mut handler = InputHandler::new();

        assert_eq!(
            handler.handle_key(key_event_with_mods(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            AppEvent::ForceQuit
        );

        // Also works while help is open
        handler.set_help_mode(true);
        assert_eq!(
            handler.handle_key(key_event_with_mods(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            AppEvent::ForceQuit
        );
    }

    #[test]
    fn test_any_key_closes_help() {
        let mut handler = InputHandler::new();

        assert_eq!(handler.handle_key(key_event(KeyCode::Char('?'))), AppEvent::ShowHelp);
        assert!(handler.is_help_mode());

        // 'q' closes help rather than quitting
        assert_eq!(handler.handle_key(key_event(KeyCode::Char('q'))), AppEvent::HideHelp);
        assert!(!handler.is_help_mode());
        assert_eq!(handler.handle_key(key_event(KeyCode::Char('q'))), AppEvent::Quit);
    }

    #[test]
    fn test_chrome_keys() {
        let mut handler = InputHandler::new();

        assert_eq!(handler.handle_key(key_event(KeyCode::Char('r'))), AppEvent::Reconnect);
        assert_eq!(handler.handle_key(key_event(KeyCode::Char('t'))), AppEvent::ToggleTheme);
        assert_eq!(handler.handle_key(key_event(KeyCode::Char('['))), AppEvent::TogglePanel);
        assert_eq!(handler.handle_key(key_event(KeyCode::Esc)), AppEvent::Cancel);
        assert_eq!(handler.handle_key(key_event(KeyCode::PageDown)), AppEvent::ScrollDetailDown);
    }
}
