//! # charwatch-core
//!
//! State mirror and render logic for the charwatch dashboard.
//!
//! This crate provides:
//! - [`CharwatchError`] - Error types for all charwatch operations
//! - [`logging`] - Tracing setup and log macros
//! - [`config`] - Dashboard configuration (`~/.charwatch/config.yaml`)
//! - [`registry`] - Client-side mirror of the server's character dataset
//! - [`protocol`] - Snapshot/delta frame decoding
//! - [`selection`] - Fixed-capacity selection with FIFO eviction
//! - [`prefs`] - Persisted user preferences
//! - [`display`], [`affects`], [`detail`] - Derived per-character display values
//! - [`reconcile`] - Slot binding and per-slot view computation
//!
//! ## Example
//!
//! ```
//! use charwatch_core::{
//!     ConnectionPhase, DashboardConfig, PreferenceStore, ReconcileInput, Reconciler,
//!     SelectionModel, StatusRegistry, protocol,
//! };
//!
//! let config = DashboardConfig::default();
//! let mut registry = StatusRegistry::new();
//! let mut prefs = PreferenceStore::in_memory();
//! let mut selection = SelectionModel::new(config.max_slots);
//! let mut reconciler = Reconciler::new(&config, config.info_bar_items.clone());
//!
//! let frame = protocol::parse_frame(r#"{"Aldric": {"HEALTH": 30, "HEALTH_MAX": 50}}"#).unwrap();
//! frame.apply(&mut registry);
//! selection.toggle("Aldric", &registry, &mut prefs);
//!
//! reconciler.reconcile(ReconcileInput {
//!     phase: ConnectionPhase::Connected,
//!     registry: &registry,
//!     registry_mutated: true,
//!     selection: &mut selection,
//!     prefs: &mut prefs,
//! });
//! assert_eq!(reconciler.slot(0).unwrap().bound(), Some("Aldric"));
//! ```

pub mod affects;
pub mod config;
pub mod detail;
pub mod display;
pub mod error;
pub mod logging;
pub mod phase;
pub mod prefs;
pub mod protocol;
pub mod reconcile;
pub mod record;
pub mod registry;
pub mod selection;

// Re-export main types for convenience
pub use config::DashboardConfig;
pub use error::{CharwatchError, Result};
pub use logging::{LogGuard, LogOutput, init_logging};
pub use phase::{ConnectionPhase, LinkIndicator};
pub use prefs::{PrefKey, PreferenceStore, ThemePreference};
pub use protocol::{FrameError, InboundFrame, parse_frame};
pub use reconcile::{DisplaySlot, ReconcileInput, ReconcileReport, Reconciler, SlotView};
pub use record::{CharacterRecord, KnownField};
pub use registry::StatusRegistry;
pub use selection::{SelectionModel, ToggleOutcome};
