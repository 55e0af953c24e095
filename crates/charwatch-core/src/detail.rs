//! Full-record dump for the expanded card.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::error;

use crate::affects::parse_affects;
use crate::record::{CharacterRecord, display_value};

const PREFERRED_HEAD: &[&str] = &[
    "CHARACTER_NAME",
    "CLASS",
    "RACE",
    "LEVEL",
    "ALIGNMENT",
    "HEALTH",
    "HEALTH_MAX",
    "MANA",
    "MANA_MAX",
    "BLOOD",
];

const PREFERRED_TAIL: &[&str] = &[
    "OPPONENT_NAME",
    "OPPONENT_HEALTH",
    "AFFECTS",
    "WAIT_TIME",
    "ROOM_NAME",
    "ROOM_EXITS",
    "ROOM_VNUM",
    "CONNECTED",
    "LAST_UPDATE",
];

static EXITS_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?:\s*").expect("valid regex"));
static DIRECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]+").expect("valid regex"));

/// Formats records as `KEY: value` lines.
#[derive(Debug, Clone)]
pub struct DetailFormatter {
    order: Vec<String>,
    sanctuary: Vec<String>,
}

impl DetailFormatter {
    /// `info_bar_items` are spliced in after the resource fields when not
    /// already part of the fixed order.
    pub fn new(info_bar_items: &[String], sanctuary: &[String]) -> Self {
        let mut order: Vec<String> = PREFERRED_HEAD.iter().map(|s| s.to_string()).collect();
        for item in info_bar_items {
            let key = canonical_key(item);
            let covered = PREFERRED_HEAD.contains(&key.as_str())
                || PREFERRED_TAIL.contains(&key.as_str())
                || order.contains(&key);
            if !covered {
                order.push(key);
            }
        }
        order.extend(PREFERRED_TAIL.iter().map(|s| s.to_string()));
        Self {
            order,
            sanctuary: sanctuary.to_vec(),
        }
    }

    /// Render a record. Never fails: falls back to a pretty JSON dump, then
    /// to a fixed message.
    pub fn format(&self, record: Option<&CharacterRecord>) -> String {
        let Some(record) = record else {
            return "No data available.".to_string();
        };
        match self.try_format(record) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "failed to format record detail");
                serde_json::to_string_pretty(record)
                    .unwrap_or_else(|_| "Error displaying data (failed to stringify).".to_string())
            }
        }
    }

    fn try_format(&self, record: &CharacterRecord) -> Result<String, serde_json::Error> {
        let mut lines = Vec::with_capacity(record.len());
        let mut handled: HashSet<&str> = HashSet::new();

        for preferred in &self.order {
            let preferred = preferred.as_str();
            let found = record
                .get(preferred)
                .map(|v| (preferred, v))
                .or_else(|| {
                    let alt = alternate_key(preferred)?;
                    record.get(alt).map(|v| (alt, v))
                });
            let Some((data_key, value)) = found else {
                continue;
            };
            if handled.contains(data_key) || handled.contains(preferred) {
                continue;
            }
            lines.push(format!("{preferred}: {}", self.render_value(data_key, value)?));
            handled.insert(data_key);
            handled.insert(preferred);
        }

        let mut rest: Vec<(&String, &Value)> = record
            .iter()
            .filter(|(k, _)| !handled.contains(k.as_str()))
            .collect();
        rest.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in rest {
            lines.push(format!("{key}: {}", self.render_value(key, value)?));
        }

        if lines.is_empty() {
            return Ok("No data fields available.".to_string());
        }
        Ok(lines.join("\n").trim().to_string())
    }

    fn render_value(&self, key: &str, value: &Value) -> Result<String, serde_json::Error> {
        match (key, value) {
            ("ROOM_EXITS", Value::String(s)) => return Ok(exits_from_string(s)),
            ("ROOM_EXITS", Value::Object(map)) => {
                let dirs: Vec<&str> = map
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, _)| k.as_str())
                    .collect();
                return Ok(if dirs.is_empty() {
                    "(None)".to_string()
                } else {
                    dirs.join(", ")
                });
            }
            ("AFFECTS", Value::Object(_)) | ("AFFECTS", Value::String(_)) if !is_empty_str(value) => {
                let summary = parse_affects(Some(value), &self.sanctuary);
                return Ok(if summary.text.is_empty() {
                    "(None)".to_string()
                } else {
                    summary.text
                });
            }
            _ => {}
        }

        Ok(match value {
            Value::Null => "(Not Set)".to_string(),
            Value::String(s) if s.is_empty() => "(Empty)".to_string(),
            Value::Object(_) | Value::Array(_) => serde_json::to_string(value)?,
            other => display_value(other),
        })
    }
}

fn is_empty_str(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}

/// Legacy info-bar spellings.
fn canonical_key(item: &str) -> String {
    let upper = item.to_ascii_uppercase();
    match upper.as_str() {
        "EQHITS" => "EQUIP_HITS".to_string(),
        "STYLE" | "EQUIP_HITS" | "FLYING" | "VIS" | "ALIGNMENT" | "FAVOR" => upper,
        _ => item.to_string(),
    }
}

fn alternate_key(key: &str) -> Option<&'static str> {
    match key {
        "STYLE" => Some("COMBAT_STYLE"),
        "WAIT_TIME" => Some("LAG"),
        _ => None,
    }
}

/// "Obvious exits: north east" -> "north, east".
fn exits_from_string(s: &str) -> String {
    let stripped = EXITS_PREFIX_RE.replace(s, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        return "(None)".to_string();
    }
    let dirs: Vec<&str> = DIRECTION_RE.find_iter(stripped).map(|m| m.as_str()).collect();
    if dirs.is_empty() {
        "(None)".to_string()
    } else {
        dirs.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use serde_json::json;

    fn formatter() -> DetailFormatter {
        let config = DashboardConfig::default();
        DetailFormatter::new(&config.info_bar_items, &config.sanctuary_affects)
    }

    fn record(value: Value) -> CharacterRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_preferred_order_then_alphabetical() {
        let rec = record(json!({
            "ZETA": 1,
            "HEALTH": 10,
            "CHARACTER_NAME": "Aldric",
            "alpha": "x",
            "LAST_UPDATE": "12:00",
            "FAVOR": 300,
            "OPPONENT_NAME": "orc",
        }));
        let text = formatter().format(Some(&rec));
        let keys: Vec<&str> = text.lines().map(|l| l.split(':').next().unwrap()).collect();
        assert_eq!(
            keys,
            vec!["CHARACTER_NAME", "HEALTH", "FAVOR", "OPPONENT_NAME", "LAST_UPDATE", "ZETA", "alpha"]
        );
    }

    #[test]
    fn test_alternate_keys_display_under_preferred_name() {
        let rec = record(json!({"COMBAT_STYLE": "Defensive", "LAG": "||"}));
        let text = formatter().format(Some(&rec));
        assert_eq!(text, "STYLE: Defensive\nWAIT_TIME: ||");
    }

    #[test]
    fn test_primary_key_wins_over_alternate() {
        let rec = record(json!({"STYLE": "Aggressive", "COMBAT_STYLE": "Defensive"}));
        let text = formatter().format(Some(&rec));
        assert_eq!(text, "STYLE: Aggressive\nCOMBAT_STYLE: Defensive");
    }

    #[test]
    fn test_special_values() {
        let rec = record(json!({
            "RACE": null,
            "LEVEL": "",
            "EXTRA": {"a": 1},
        }));
        let text = formatter().format(Some(&rec));
        assert_eq!(text, "RACE: (Not Set)\nLEVEL: (Empty)\nEXTRA: {\"a\":1}");
    }

    #[test]
    fn test_room_exits() {
        let rec = record(json!({"ROOM_EXITS": "Obvious exits: north east [down]"}));
        assert_eq!(formatter().format(Some(&rec)), "ROOM_EXITS: north, east, down");

        let rec = record(json!({"ROOM_EXITS": "Exits: "}));
        assert_eq!(formatter().format(Some(&rec)), "ROOM_EXITS: (None)");

        let rec = record(json!({"ROOM_EXITS": {"north": 3001, "south": null, "up": 3005}}));
        assert_eq!(formatter().format(Some(&rec)), "ROOM_EXITS: north, up");

        let rec = record(json!({"ROOM_EXITS": {"south": null}}));
        assert_eq!(formatter().format(Some(&rec)), "ROOM_EXITS: (None)");
    }

    #[test]
    fn test_affects_through_parser() {
        let rec = record(json!({"AFFECTS": {"haste": "3", "sanctuary": "0"}}));
        assert_eq!(
            formatter().format(Some(&rec)),
            "AFFECTS: sanctuary\nhaste: 3"
        );

        let rec = record(json!({"AFFECTS": {}}));
        assert_eq!(formatter().format(Some(&rec)), "AFFECTS: (None)");
    }

    #[test]
    fn test_info_bar_extension_spliced_after_resources() {
        let items = vec!["LAST_COMMAND".to_string(), "EQHITS".to_string()];
        let f = DetailFormatter::new(&items, &[]);
        let rec = record(json!({
            "AFFECTS": "x",
            "BLOOD": 4,
            "LAST_COMMAND": "flee",
            "EQUIP_HITS": 7,
            "AAA": 1,
        }));
        let text = f.format(Some(&rec));
        let keys: Vec<&str> = text.lines().map(|l| l.split(':').next().unwrap()).collect();
        assert_eq!(keys, vec!["BLOOD", "LAST_COMMAND", "EQUIP_HITS", "AFFECTS", "AAA"]);
    }

    #[test]
    fn test_empty_and_missing_records() {
        assert_eq!(formatter().format(None), "No data available.");
        assert_eq!(
            formatter().format(Some(&CharacterRecord::new())),
            "No data fields available."
        );
    }
}
