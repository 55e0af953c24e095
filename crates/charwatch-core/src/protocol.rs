//! Inbound frame decoding.
//!
//! The server sends two JSON shapes over the socket:
//!
//! - a delta: `{"updates": {name: record, ...}, "deletions": [name, ...]}`
//!   (recognised by both keys being present),
//! - a snapshot: any other JSON object, mapping every known name to its record.
//!
//! Everything else is rejected with a [`FrameError`], which callers log and
//! drop. The registry is never touched by a bad frame.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::record::CharacterRecord;
use crate::registry::StatusRegistry;

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Delta {
        updates: Vec<(String, CharacterRecord)>,
        deletions: Vec<String>,
    },
    Snapshot(HashMap<String, CharacterRecord>),
}

/// Why a frame was rejected.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected frame shape: {0}")]
    UnexpectedShape(&'static str),
}

/// Parse one text frame.
pub fn parse_frame(text: &str) -> Result<InboundFrame, FrameError> {
    let value: Value = serde_json::from_str(text)?;
    let mut object = match value {
        Value::Object(object) => object,
        Value::Null => return Err(FrameError::UnexpectedShape("null")),
        Value::Array(_) => return Err(FrameError::UnexpectedShape("array")),
        _ => return Err(FrameError::UnexpectedShape("scalar")),
    };

    if object.contains_key("updates") && object.contains_key("deletions") {
        // A null or non-object update means the character is gone.
        let mut updates = Vec::new();
        let mut absent = Vec::new();
        match object.remove("updates") {
            Some(Value::Object(map)) => {
                for (name, value) in map {
                    match value {
                        Value::Object(fields) => updates.push((name, CharacterRecord::from(fields))),
                        other => {
                            debug!(character = %name, value = %other, "non-object update removes record");
                            absent.push(name);
                        }
                    }
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => warn!("delta 'updates' is not an object, ignoring it"),
        }
        let mut deletions: Vec<String> = match object.remove("deletions") {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name),
                    other => {
                        warn!(value = %other, "skipping non-string deletion");
                        None
                    }
                })
                .collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                warn!("delta 'deletions' is not an array, ignoring it");
                Vec::new()
            }
        };
        deletions.extend(absent);
        return Ok(InboundFrame::Delta { updates, deletions });
    }

    Ok(InboundFrame::Snapshot(snapshot_records(object)))
}

fn snapshot_records(map: serde_json::Map<String, Value>) -> HashMap<String, CharacterRecord> {
    map.into_iter()
        .filter_map(|(name, value)| match value {
            Value::Object(fields) => Some((name, CharacterRecord::from(fields))),
            other => {
                warn!(character = %name, value = %other, "skipping non-object record");
                None
            }
        })
        .collect()
}

impl InboundFrame {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundFrame::Delta { .. } => "delta",
            InboundFrame::Snapshot(_) => "snapshot",
        }
    }

    /// Apply this frame to the registry. Returns true if it changed.
    pub fn apply(self, registry: &mut StatusRegistry) -> bool {
        match self {
            InboundFrame::Delta { updates, deletions } => {
                let (n_updates, n_deletions) = (updates.len(), deletions.len());
                let changed = registry.apply_delta(updates, deletions);
                crate::log_frame_event!("delta", updates = n_updates, deletions = n_deletions, changed);
                changed
            }
            InboundFrame::Snapshot(data) => {
                let characters = data.len();
                let changed = registry.apply_snapshot(data);
                crate::log_frame_event!("snapshot", characters, changed);
                changed
            }
        }
    }
}
