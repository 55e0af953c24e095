//! Derived display fields.
//!
//! Pure functions from a [`CharacterRecord`] to the values a card shows:
//! health/resource bars, the lag gauge, the opponent line and the info bar.
//! Missing or malformed fields degrade to placeholders, never to errors.

use serde_json::Value;

use crate::config::DashboardConfig;
use crate::record::{CharacterRecord, KnownField, display_value};

/// Opponent name the game reports while the character is blind.
pub const BLINDNESS_SENTINEL: &str = "You cannot see your opponent.";

/// Lag value meaning "fully lagged".
pub const LAG_CRITICAL_MARKER: &str = "!!!!!";

/// Bar maxima above this render as "lots".
const MAX_DISPLAYABLE: i64 = 999_999;

// ============================================================================
// Bars
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarKind {
    Hp,
    Mana,
    Blood,
}

impl BarKind {
    pub fn label(self) -> &'static str {
        match self {
            BarKind::Hp => "HP",
            BarKind::Mana => "Mana",
            BarKind::Blood => "Blood",
        }
    }
}

/// One rendered bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarView {
    pub kind: BarKind,
    pub current: i64,
    pub max: i64,
    /// Fill, clamped to 0..=100
    pub percent: f64,
    /// "current / max", or "current / lots"
    pub text: String,
}

impl BarView {
    /// Build a bar. A missing current is 0; a missing or non-positive max is 1.
    pub fn new(kind: BarKind, current: Option<i64>, max: Option<i64>) -> Self {
        let current = current.unwrap_or(0);
        let max = match max {
            Some(m) if m > 0 => m,
            _ => 1,
        };
        let percent = (current as f64 * 100.0 / max as f64).clamp(0.0, 100.0);
        let max_text = if max > MAX_DISPLAYABLE {
            "lots".to_string()
        } else {
            max.to_string()
        };
        Self {
            kind,
            current,
            max,
            percent,
            text: format!("{current} / {max_text}"),
        }
    }

    /// Fill as a 0.0..=1.0 ratio.
    pub fn ratio(&self) -> f64 {
        self.percent / 100.0
    }
}

/// Health bar.
pub fn hp_bar(record: &CharacterRecord) -> BarView {
    BarView::new(
        BarKind::Hp,
        record.int(KnownField::Health),
        record.int(KnownField::HealthMax),
    )
}

/// Blood bar for special-resource classes (exact class match), else mana.
pub fn resource_bar(record: &CharacterRecord, config: &DashboardConfig) -> BarView {
    let special = record
        .class()
        .is_some_and(|class| config.special_resource_classes.iter().any(|c| c == class));
    if special {
        BarView::new(
            BarKind::Blood,
            record.int(KnownField::Blood),
            Some(config.blood_max),
        )
    } else {
        BarView::new(
            BarKind::Mana,
            record.int(KnownField::Mana),
            record.int(KnownField::ManaMax),
        )
    }
}

// ============================================================================
// Lag
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LagSeverity {
    Ok,
    High,
    Critical,
    /// Field missing or not a string
    Unknown,
    /// Link down; no live value
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LagView {
    pub percent: u8,
    pub severity: LagSeverity,
    pub title: String,
}

impl LagView {
    pub fn offline() -> Self {
        Self {
            percent: 0,
            severity: LagSeverity::Offline,
            title: "Lag: Offline".to_string(),
        }
    }

    /// Map a WAIT_TIME string onto the gauge.
    pub fn from_wait_time(value: &str) -> Self {
        if value == LAG_CRITICAL_MARKER {
            return Self {
                percent: 100,
                severity: LagSeverity::Critical,
                title: format!("Lag: Critical ({LAG_CRITICAL_MARKER})"),
            };
        }

        let pipes = value.chars().filter(|&c| c == '|').count();
        let (percent, severity, title) = match pipes {
            0..=3 => (pipes as u8 * 20, LagSeverity::Ok, format!("Lag: OK ({pipes})")),
            4 => (80, LagSeverity::High, "Lag: High (4)".to_string()),
            _ => (100, LagSeverity::High, format!("Lag: High ({pipes}+)")),
        };
        Self {
            percent,
            severity,
            title,
        }
    }
}

pub fn lag(record: &CharacterRecord) -> LagView {
    match record.field(KnownField::WaitTime).and_then(Value::as_str) {
        Some(value) => LagView::from_wait_time(value),
        None => LagView {
            percent: 0,
            severity: LagSeverity::Unknown,
            title: "Lag: Unknown".to_string(),
        },
    }
}

// ============================================================================
// Opponent
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpponentView {
    /// Possibly truncated name
    pub name: String,
    /// Untruncated name (tooltip)
    pub full_name: String,
    /// "NN%" or "N/A"
    pub health: String,
}

/// Opponent line, when OPPONENT_NAME is a non-empty string.
pub fn opponent(record: &CharacterRecord, max_name_len: usize) -> Option<OpponentView> {
    let full_name = record.opponent_name()?;
    let name = if full_name.chars().count() > max_name_len {
        let head: String = full_name.chars().take(max_name_len).collect();
        format!("{head}...")
    } else {
        full_name.to_string()
    };
    let health = match record.value(KnownField::OpponentHealth) {
        Some(Value::String(s)) if s == "N/A" => "N/A".to_string(),
        Some(v) => format!("{}%", display_value(v)),
        None => "N/A".to_string(),
    };
    Some(OpponentView {
        name,
        full_name: full_name.to_string(),
        health,
    })
}

/// The game reports the opponent as unseeable.
pub fn is_blind(record: &CharacterRecord) -> bool {
    record.opponent_name() == Some(BLINDNESS_SENTINEL)
}

// ============================================================================
// Info bar
// ============================================================================

/// One entry of the info strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoItem {
    Text { key: String, text: String },
    Checkbox { key: String, label: String, checked: bool },
}

impl InfoItem {
    fn text(key: &str, text: String) -> Self {
        InfoItem::Text {
            key: key.to_string(),
            text,
        }
    }
}

/// Build the info strip for `keys`, in order. Empty means "hide the strip".
pub fn info_bar(record: &CharacterRecord, keys: &[String]) -> Vec<InfoItem> {
    keys.iter()
        .filter_map(|key| info_item(record, key))
        .collect()
}

fn info_item(record: &CharacterRecord, key: &str) -> Option<InfoItem> {
    match key.to_ascii_uppercase().as_str() {
        "STYLE" => {
            let value = record
                .value(KnownField::Style)
                .or_else(|| record.value(KnownField::CombatStyle))?;
            non_empty(value).map(|v| InfoItem::text(key, format!("Style: {v}")))
        }
        "EQHITS" | "EQUIP_HITS" => record
            .value(KnownField::EquipHits)
            .and_then(non_empty)
            .map(|v| InfoItem::text(key, format!("EQHits: {v}"))),
        "FLYING" => record.field(KnownField::Flying).map(|v| InfoItem::Checkbox {
            key: key.to_string(),
            label: "Fly".to_string(),
            checked: v.as_str() == Some("Y"),
        }),
        "VIS" => record.field(KnownField::Vis).map(|v| {
            let shown = if v.is_null() {
                "(None)".to_string()
            } else {
                display_value(v)
            };
            InfoItem::text(key, format!("Vis: {shown}"))
        }),
        "ALIGNMENT" => record
            .value(KnownField::Alignment)
            .and_then(non_empty)
            .map(|v| InfoItem::text(key, format!("Align: {v}"))),
        "FAVOR" => match record.value(KnownField::Favor)? {
            Value::String(s) if s == "N/A" => None,
            v => Some(InfoItem::text(key, format!("Favor: {}", display_value(v)))),
        },
        _ => {
            let value = record.get(key).filter(|v| !v.is_null())?;
            Some(InfoItem::text(
                key,
                format!("{}: {}", title_case_label(key), display_value(value)),
            ))
        }
    }
}

fn non_empty(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        v => Some(display_value(v)),
    }
}

/// `LAST_COMMAND` -> `Last Command`.
pub fn title_case_label(key: &str) -> String {
    key.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bar_math() {
        let bar = BarView::new(BarKind::Hp, Some(30), Some(50));
        assert_eq!(bar.percent, 60.0);
        assert_eq!(bar.text, "30 / 50");

        let bar = BarView::new(BarKind::Hp, Some(5), Some(0));
        assert_eq!(bar.max, 1);
        assert_eq!(bar.text, "5 / 1");
        assert_eq!(bar.percent, 100.0);

        let bar = BarView::new(BarKind::Mana, Some(10), Some(2_000_000));
        assert_eq!(bar.text, "10 / lots");
    }

    #[test]
    fn test_bar_defaults_and_clamping() {
        let bar = BarView::new(BarKind::Hp, None, None);
        assert_eq!(bar.text, "0 / 1");
        assert_eq!(bar.percent, 0.0);

        let bar = BarView::new(BarKind::Hp, Some(-10), Some(50));
        assert_eq!(bar.percent, 0.0);

        let bar = BarView::new(BarKind::Hp, Some(5), Some(-3));
        assert_eq!(bar.max, 1);
    }

    #[test]
    fn test_hp_bar_from_strings() {
        let rec = CharacterRecord::new()
            .with("HEALTH", "45")
            .with("HEALTH_MAX", "not a number");
        let bar = hp_bar(&rec);
        assert_eq!(bar.text, "45 / 1");
        assert_eq!(bar.percent, 100.0);
    }

    #[test]
    fn test_hp_bar_huge_string_max_is_lots() {
        let rec = CharacterRecord::new()
            .with("HEALTH", 10)
            .with("HEALTH_MAX", "99999999999999999999");
        let bar = hp_bar(&rec);
        assert_eq!(bar.max, i64::MAX);
        assert_eq!(bar.text, "10 / lots");
    }

    #[test]
    fn test_resource_bar_blood_for_special_class() {
        let config = DashboardConfig::default();
        let rec = CharacterRecord::new()
            .with("CLASS", "Vampire")
            .with("BLOOD", 30)
            .with("MANA", 100)
            .with("MANA_MAX", 200);
        let bar = resource_bar(&rec, &config);
        assert_eq!(bar.kind, BarKind::Blood);
        assert_eq!(bar.text, "30 / 60");
        assert_eq!(bar.percent, 50.0);

        // Exact match only.
        let rec = rec.with("CLASS", "vampire");
        let bar = resource_bar(&rec, &config);
        assert_eq!(bar.kind, BarKind::Mana);
        assert_eq!(bar.text, "100 / 200");
    }

    #[test]
    fn test_lag_thresholds() {
        let cases = [
            ("", 0, LagSeverity::Ok, "Lag: OK (0)"),
            ("||", 40, LagSeverity::Ok, "Lag: OK (2)"),
            ("|||", 60, LagSeverity::Ok, "Lag: OK (3)"),
            ("||||", 80, LagSeverity::High, "Lag: High (4)"),
            ("|||||", 100, LagSeverity::High, "Lag: High (5+)"),
            ("|||||||", 100, LagSeverity::High, "Lag: High (7+)"),
            ("!!!!!", 100, LagSeverity::Critical, "Lag: Critical (!!!!!)"),
        ];
        for (input, percent, severity, title) in cases {
            let view = LagView::from_wait_time(input);
            assert_eq!(view.percent, percent, "input {input:?}");
            assert_eq!(view.severity, severity, "input {input:?}");
            assert_eq!(view.title, title);
        }
    }

    #[test]
    fn test_lag_missing_is_unknown() {
        let view = lag(&CharacterRecord::new());
        assert_eq!(view.severity, LagSeverity::Unknown);
        assert_eq!(view.percent, 0);
        assert_eq!(view.title, "Lag: Unknown");

        let view = lag(&CharacterRecord::new().with("WAIT_TIME", 3));
        assert_eq!(view.severity, LagSeverity::Unknown);
    }

    #[test]
    fn test_opponent_truncation() {
        let rec = CharacterRecord::new()
            .with("OPPONENT_NAME", "a very large and angry dragon")
            .with("OPPONENT_HEALTH", 42);
        let view = opponent(&rec, 16).unwrap();
        assert_eq!(view.name, "a very large and...");
        assert_eq!(view.full_name, "a very large and angry dragon");
        assert_eq!(view.health, "42%");
    }

    #[test]
    fn test_opponent_health_na() {
        let rec = CharacterRecord::new()
            .with("OPPONENT_NAME", "orc")
            .with("OPPONENT_HEALTH", "N/A");
        assert_eq!(opponent(&rec, 16).unwrap().health, "N/A");

        let rec = CharacterRecord::new().with("OPPONENT_NAME", "orc");
        assert_eq!(opponent(&rec, 16).unwrap().health, "N/A");
    }

    #[test]
    fn test_no_opponent() {
        assert!(opponent(&CharacterRecord::new().with("OPPONENT_NAME", ""), 16).is_none());
        assert!(opponent(&CharacterRecord::new().with("OPPONENT_NAME", 7), 16).is_none());
    }

    #[test]
    fn test_blindness() {
        let rec = CharacterRecord::new().with("OPPONENT_NAME", BLINDNESS_SENTINEL);
        assert!(is_blind(&rec));
        assert!(!is_blind(&CharacterRecord::new().with("OPPONENT_NAME", "orc")));
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_info_bar_predefined_items() {
        let rec = CharacterRecord::new()
            .with("COMBAT_STYLE", "Aggressive")
            .with("EQUIP_HITS", 12)
            .with("FLYING", "N")
            .with("VIS", Value::Null)
            .with("ALIGNMENT", -350)
            .with("FAVOR", "N/A");
        let items = info_bar(
            &rec,
            &keys(&["STYLE", "EQUIP_HITS", "FLYING", "VIS", "ALIGNMENT", "FAVOR"]),
        );

        assert_eq!(
            items,
            vec![
                InfoItem::text("STYLE", "Style: Aggressive".into()),
                InfoItem::text("EQUIP_HITS", "EQHits: 12".into()),
                InfoItem::Checkbox {
                    key: "FLYING".into(),
                    label: "Fly".into(),
                    checked: false
                },
                InfoItem::text("VIS", "Vis: (None)".into()),
                InfoItem::text("ALIGNMENT", "Align: -350".into()),
            ]
        );
    }

    #[test]
    fn test_info_bar_flying_checked() {
        let rec = CharacterRecord::new().with("FLYING", "Y");
        let items = info_bar(&rec, &keys(&["FLYING"]));
        assert!(matches!(items[0], InfoItem::Checkbox { checked: true, .. }));
    }

    #[test]
    fn test_info_bar_generic_items() {
        let rec = CharacterRecord::new()
            .with("LAST_COMMAND", "kill orc")
            .with("ROOM_VNUM", 3001)
            .with("EMPTY_ONE", "")
            .with("NULL_ONE", Value::Null);
        let items = info_bar(
            &rec,
            &keys(&["LAST_COMMAND", "ROOM_VNUM", "EMPTY_ONE", "NULL_ONE", "ABSENT"]),
        );
        assert_eq!(
            items,
            vec![
                InfoItem::text("LAST_COMMAND", "Last Command: kill orc".into()),
                InfoItem::text("ROOM_VNUM", "Room Vnum: 3001".into()),
                InfoItem::text("EMPTY_ONE", "Empty One: ".into()),
            ]
        );
    }

    #[test]
    fn test_info_bar_empty_when_nothing_valid() {
        let rec = CharacterRecord::new().with("FAVOR", "N/A").with("STYLE", "");
        assert!(info_bar(&rec, &keys(&["FAVOR", "STYLE", "VIS"])).is_empty());
    }

    #[test]
    fn test_title_case_label() {
        assert_eq!(title_case_label("LAST_COMMAND"), "Last Command");
        assert_eq!(title_case_label("gold"), "Gold");
        assert_eq!(title_case_label("x"), "X");
        assert_eq!(display_value(&json!("x")), "x");
    }
}
