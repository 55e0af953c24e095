//! Character status records.
//!
//! A record is whatever the server last reported for one character. A small
//! set of well-known fields ([`KnownField`]) has display semantics and typed
//! accessors; every other key is an opaque extension field that is passed
//! through untouched (it still shows up in the detail view and can be put on
//! the info bar). Null and absent are distinct: `VIS: null` is "present".

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw field map as received on the wire.
pub type FieldMap = Map<String, Value>;

/// Well-known record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownField {
    CharacterName,
    Class,
    Race,
    Level,
    Alignment,
    Health,
    HealthMax,
    Mana,
    ManaMax,
    Blood,
    Connected,
    OpponentName,
    OpponentHealth,
    WaitTime,
    Lag,
    Affects,
    Favor,
    Style,
    CombatStyle,
    EquipHits,
    Flying,
    Vis,
    RoomName,
    RoomExits,
    RoomVnum,
    LastUpdate,
}

impl KnownField {
    /// Wire key of this field.
    pub const fn key(self) -> &'static str {
        match self {
            KnownField::CharacterName => "CHARACTER_NAME",
            KnownField::Class => "CLASS",
            KnownField::Race => "RACE",
            KnownField::Level => "LEVEL",
            KnownField::Alignment => "ALIGNMENT",
            KnownField::Health => "HEALTH",
            KnownField::HealthMax => "HEALTH_MAX",
            KnownField::Mana => "MANA",
            KnownField::ManaMax => "MANA_MAX",
            KnownField::Blood => "BLOOD",
            KnownField::Connected => "CONNECTED",
            KnownField::OpponentName => "OPPONENT_NAME",
            KnownField::OpponentHealth => "OPPONENT_HEALTH",
            KnownField::WaitTime => "WAIT_TIME",
            KnownField::Lag => "LAG",
            KnownField::Affects => "AFFECTS",
            KnownField::Favor => "FAVOR",
            KnownField::Style => "STYLE",
            KnownField::CombatStyle => "COMBAT_STYLE",
            KnownField::EquipHits => "EQUIP_HITS",
            KnownField::Flying => "FLYING",
            KnownField::Vis => "VIS",
            KnownField::RoomName => "ROOM_NAME",
            KnownField::RoomExits => "ROOM_EXITS",
            KnownField::RoomVnum => "ROOM_VNUM",
            KnownField::LastUpdate => "LAST_UPDATE",
        }
    }
}

/// One character's last-known status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterRecord {
    fields: FieldMap,
}

impl From<FieldMap> for CharacterRecord {
    fn from(fields: FieldMap) -> Self {
        Self { fields }
    }
}

impl CharacterRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and fixtures.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Raw value for a key, if the key is present (null counts as present).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Raw value of a well-known field.
    pub fn field(&self, field: KnownField) -> Option<&Value> {
        self.fields.get(field.key())
    }

    /// Present and not null.
    pub fn value(&self, field: KnownField) -> Option<&Value> {
        self.field(field).filter(|v| !v.is_null())
    }

    /// Whether the key exists at all.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// All fields in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Integer value of a field with `parseInt`-style leniency.
    pub fn int(&self, field: KnownField) -> Option<i64> {
        self.field(field).and_then(coerce_int)
    }

    /// Display name: `CHARACTER_NAME` when it is set, else the registry key.
    pub fn display_name(&self, fallback: &str) -> String {
        match self.field(KnownField::CharacterName) {
            Some(v) if is_truthy(v) => display_value(v),
            _ => fallback.to_string(),
        }
    }

    /// Class as displayed (`N/A` when unset).
    pub fn class_label(&self) -> String {
        match self.field(KnownField::Class) {
            Some(v) if is_truthy(v) => display_value(v),
            _ => "N/A".to_string(),
        }
    }

    /// Raw class string for exact-match class checks.
    pub fn class(&self) -> Option<&str> {
        self.field(KnownField::Class).and_then(Value::as_str)
    }

    /// The character's own link to the game (`CONNECTED == "YES"`).
    pub fn is_character_connected(&self) -> bool {
        self.field(KnownField::Connected).and_then(Value::as_str) == Some("YES")
    }

    /// Non-empty string opponent name.
    pub fn opponent_name(&self) -> Option<&str> {
        self.field(KnownField::OpponentName)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Integer coercion with `parseInt` semantics: numbers truncate, strings
/// parse their leading optional sign and digits, anything else is `None`.
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            }
        }
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    // Too many digits for i64: saturate.
    let magnitude: i64 = rest[..digits_len].parse().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// JavaScript-style truthiness, used where the dashboard falls back on
/// "unset" values (`null`, `""`, `0`, `false`).
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Plain text rendering of a value: strings verbatim, integral numbers
/// without a fraction, containers as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_int() {
        assert_eq!(coerce_int(&json!(42)), Some(42));
        assert_eq!(coerce_int(&json!(3.9)), Some(3));
        assert_eq!(coerce_int(&json!("  17 hp")), Some(17));
        assert_eq!(coerce_int(&json!("-5")), Some(-5));
        assert_eq!(coerce_int(&json!("1,234")), Some(1));
        assert_eq!(coerce_int(&json!("99999999999999999999")), Some(i64::MAX));
        assert_eq!(coerce_int(&json!("-99999999999999999999")), Some(-i64::MAX));
        assert_eq!(coerce_int(&json!("abc")), None);
        assert_eq!(coerce_int(&json!("")), None);
        assert_eq!(coerce_int(&json!(true)), None);
        assert_eq!(coerce_int(&Value::Null), None);
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("Aggressive")), "Aggressive");
        assert_eq!(display_value(&json!(12)), "12");
        assert_eq!(display_value(&json!(12.0)), "12");
        assert_eq!(display_value(&json!(0.5)), "0.5");
        assert_eq!(display_value(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(display_value(&Value::Null), "null");
    }

    #[test]
    fn test_display_name_falls_back_to_key() {
        let rec = CharacterRecord::new().with("CHARACTER_NAME", "");
        assert_eq!(rec.display_name("aldric"), "aldric");

        let rec = CharacterRecord::new().with("CHARACTER_NAME", "Aldric");
        assert_eq!(rec.display_name("aldric"), "Aldric");
    }

    #[test]
    fn test_null_is_present_but_has_no_value() {
        let rec = CharacterRecord::new().with("VIS", Value::Null);
        assert!(rec.contains("VIS"));
        assert!(rec.field(KnownField::Vis).is_some());
        assert!(rec.value(KnownField::Vis).is_none());
    }

    #[test]
    fn test_character_connected_flag() {
        assert!(CharacterRecord::new().with("CONNECTED", "YES").is_character_connected());
        assert!(!CharacterRecord::new().with("CONNECTED", "NO").is_character_connected());
        assert!(!CharacterRecord::new().is_character_connected());
    }

    #[test]
    fn test_record_deserializes_transparently() {
        let rec: CharacterRecord =
            serde_json::from_value(json!({"HEALTH": 5, "CLASS": "Mage"})).unwrap();
        assert_eq!(rec.int(KnownField::Health), Some(5));
        assert_eq!(rec.class(), Some("Mage"));
        assert_eq!(rec.class_label(), "Mage");
    }
}
