//! Affect list parsing.
//!
//! AFFECTS arrives either as a mapping (`{"haste": "3"}`) or as a string of
//! bracket pairs (`{haste}{3}{sanctuary}{0}`). Anything else that is a
//! non-empty string is kept as one opaque line.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::record::display_value;

static PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+?)\}\{([^}]*?)\}").expect("valid regex"));

/// One named affect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affect {
    pub name: String,
    pub value: String,
}

impl Affect {
    /// `name`, or `name: value` when the value is set and not "0".
    pub fn line(&self) -> String {
        if self.value.is_empty() || self.value == "0" {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.value)
        }
    }
}

/// Parsed affects of one character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffectSummary {
    /// Structured entries; empty for the opaque fallback
    pub entries: Vec<Affect>,
    /// One affect per line, or the opaque string
    pub text: String,
    pub has_sanctuary: bool,
}

impl AffectSummary {
    /// Warning condition: something is listed but no sanctuary is among it.
    pub fn missing_sanctuary(&self) -> bool {
        !self.text.is_empty() && !self.has_sanctuary
    }
}

/// Parse an AFFECTS value. `sanctuary` is the ordered list of sanctuary-type
/// affect names, matched case-insensitively.
pub fn parse_affects(value: Option<&Value>, sanctuary: &[String]) -> AffectSummary {
    let mut entries = match value {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, value)| Affect {
                name: name.clone(),
                value: display_value(value),
            })
            .collect(),
        Some(Value::String(s)) if s.starts_with('{') && s.contains("}{") => parse_pairs(s),
        _ => Vec::new(),
    };

    let text = if entries.is_empty() {
        match value {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            _ => String::new(),
        }
    } else {
        entries.sort_by(|a, b| compare_affects(a, b, sanctuary));
        entries
            .iter()
            .map(Affect::line)
            .collect::<Vec<_>>()
            .join("\n")
    };

    let lowered = text.to_lowercase();
    let has_sanctuary = sanctuary.iter().any(|sanc| {
        let sanc = sanc.to_lowercase();
        lowered.contains(&sanc) || entries.iter().any(|e| e.name.to_lowercase() == sanc)
    });

    AffectSummary {
        entries,
        text,
        has_sanctuary,
    }
}

fn parse_pairs(s: &str) -> Vec<Affect> {
    PAIR_RE
        .captures_iter(s)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().trim();
            if name.is_empty() {
                return None;
            }
            let value = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            Some(Affect {
                name: name.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

fn sanctuary_rank(name: &str, sanctuary: &[String]) -> Option<usize> {
    let name = name.to_lowercase();
    sanctuary.iter().position(|s| s.to_lowercase() == name)
}

/// Sanctuary-type affects first in list order, then the rest by name.
fn compare_affects(a: &Affect, b: &Affect, sanctuary: &[String]) -> Ordering {
    match (sanctuary_rank(&a.name, sanctuary), sanctuary_rank(&b.name, sanctuary)) {
        (Some(ra), Some(rb)) => ra.cmp(&rb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}
