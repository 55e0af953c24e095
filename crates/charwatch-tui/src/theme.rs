//! Light and dark color themes.
//!
//! The active theme comes from the persisted theme preference; toggling
//! returns the new preference so the app can save it.

use charwatch_core::ConnectionPhase;
use charwatch_core::ThemePreference;
use charwatch_core::display::{BarKind, LagSeverity};
use ratatui::style::Color;

/// Color palette for a theme.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    /// Primary headers and focused borders
    pub header: Color,
    /// Hotkey hints
    pub hotkey: Color,
    /// Normal text
    pub text: Color,
    /// Secondary text (timestamps, dim info)
    pub text_dim: Color,
    /// Unfocused borders
    pub border_dim: Color,
    /// Roster cursor and focused card borders
    pub focus_highlight: Color,
    /// Overlay background
    pub overlay_bg: Color,
    pub status_healthy: Color,
    pub status_warning: Color,
    pub status_error: Color,
    pub bar_hp: Color,
    pub bar_mana: Color,
    pub bar_blood: Color,
    /// Unfilled part of every bar
    pub bar_empty: Color,
}

/// Complete theme definition.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemePreference,
    pub colors: ThemeColors,
}

impl Theme {
    pub fn light_theme() -> Self {
        Self {
            name: ThemePreference::Light,
            colors: ThemeColors {
                header: Color::Blue,
                hotkey: Color::DarkGray,
                text: Color::Black,
                text_dim: Color::DarkGray,
                border_dim: Color::Gray,
                focus_highlight: Color::Rgb(0, 100, 255),
                overlay_bg: Color::White,
                status_healthy: Color::Green,
                status_warning: Color::Rgb(190, 130, 0),
                status_error: Color::Red,
                bar_hp: Color::Rgb(200, 30, 30),
                bar_mana: Color::Rgb(30, 80, 220),
                bar_blood: Color::Rgb(130, 0, 30),
                bar_empty: Color::Gray,
            },
        }
    }

    pub fn dark_theme() -> Self {
        Self {
            name: ThemePreference::Dark,
            colors: ThemeColors {
                header: Color::LightBlue,
                hotkey: Color::LightYellow,
                text: Color::White,
                text_dim: Color::Gray,
                border_dim: Color::DarkGray,
                focus_highlight: Color::LightYellow,
                overlay_bg: Color::Black,
                status_healthy: Color::LightGreen,
                status_warning: Color::LightYellow,
                status_error: Color::LightRed,
                bar_hp: Color::LightRed,
                bar_mana: Color::LightBlue,
                bar_blood: Color::Rgb(200, 40, 70),
                bar_empty: Color::DarkGray,
            },
        }
    }

    pub fn by_name(name: ThemePreference) -> Self {
        match name {
            ThemePreference::Light => Self::light_theme(),
            ThemePreference::Dark => Self::dark_theme(),
        }
    }

    pub fn bar_color(&self, kind: BarKind) -> Color {
        match kind {
            BarKind::Hp => self.colors.bar_hp,
            BarKind::Mana => self.colors.bar_mana,
            BarKind::Blood => self.colors.bar_blood,
        }
    }

    /// Unknown and offline lag carry no severity color.
    pub fn lag_color(&self, severity: LagSeverity) -> Color {
        match severity {
            LagSeverity::Ok => self.colors.status_healthy,
            LagSeverity::High => self.colors.status_warning,
            LagSeverity::Critical => self.colors.status_error,
            LagSeverity::Unknown | LagSeverity::Offline => self.colors.text_dim,
        }
    }

    pub fn phase_color(&self, phase: ConnectionPhase) -> Color {
        match phase {
            ConnectionPhase::Connected => self.colors.status_healthy,
            ConnectionPhase::Connecting => self.colors.status_warning,
            ConnectionPhase::Disconnected => self.colors.status_error,
        }
    }

    pub fn indicator_color(&self, connected: bool) -> Color {
        if connected {
            self.colors.status_healthy
        } else {
            self.colors.status_error
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::by_name(ThemePreference::default())
    }
}

/// Holds the active theme.
#[derive(Debug, Clone, Default)]
pub struct ThemeManager {
    current: Theme,
}

impl ThemeManager {
    pub fn new(name: ThemePreference) -> Self {
        Self {
            current: Theme::by_name(name),
        }
    }

    pub fn current(&self) -> &Theme {
        &self.current
    }

    pub fn theme_name(&self) -> ThemePreference {
        self.current.name
    }

    /// Switch light/dark and return the new preference.
    pub fn toggle(&mut self) -> ThemePreference {
        let next = self.current.name.toggled();
        self.current = Theme::by_name(next);
        tracing::info!(theme = next.as_str(), "theme changed");
        next
    }
}
