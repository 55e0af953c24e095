//! Render reconciliation.
//!
//! Binds the selection onto a fixed row of display slots and computes what
//! each slot shows. Slot `i` always shows `selection[i]`. The computed
//! [`SlotView`] is plain data; the terminal UI (or the headless logger) maps
//! it onto whatever it draws.

use tracing::{debug, trace};

use crate::affects::{AffectSummary, parse_affects};
use crate::config::DashboardConfig;
use crate::detail::DetailFormatter;
use crate::display::{self, BarView, InfoItem, LagView, OpponentView, hp_bar, resource_bar};
use crate::phase::{ConnectionPhase, LinkIndicator};
use crate::prefs::PreferenceStore;
use crate::record::{CharacterRecord, KnownField};
use crate::registry::StatusRegistry;
use crate::selection::SelectionModel;

/// Card contents while the main link is down (last-known values).
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineCard {
    /// "Name (Offline)"
    pub title: String,
    pub class: String,
    pub hp: BarView,
    pub resource: BarView,
    /// `None` when the lag gauge is disabled
    pub lag: Option<LagView>,
    pub indicator: LinkIndicator,
}

/// Card contents for a live record.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveCard {
    pub name: String,
    pub class: String,
    pub hp: BarView,
    pub resource: BarView,
    pub lag: Option<LagView>,
    pub opponent: Option<OpponentView>,
    /// Blindness warning (already gated by configuration)
    pub blind: bool,
    /// Empty means the strip is hidden
    pub info_items: Vec<InfoItem>,
    pub affects: AffectSummary,
    /// No-sanctuary warning (already gated by configuration)
    pub no_sanctuary: bool,
    pub indicator: LinkIndicator,
    /// Full dump, present only while expanded
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotView {
    /// Nothing bound; expand disabled
    Cleared,
    Offline(OfflineCard),
    Live(Box<LiveCard>),
}

impl SlotView {
    pub fn can_expand(&self) -> bool {
        matches!(self, SlotView::Live(_))
    }
}

/// One display slot.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySlot {
    bound: Option<String>,
    expanded: bool,
    view: SlotView,
}

impl Default for DisplaySlot {
    fn default() -> Self {
        Self {
            bound: None,
            expanded: false,
            view: SlotView::Cleared,
        }
    }
}

impl DisplaySlot {
    pub fn bound(&self) -> Option<&str> {
        self.bound.as_deref()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn view(&self) -> &SlotView {
        &self.view
    }
}

/// What a reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Names removed from the selection because they vanished
    pub deselected: Vec<String>,
    /// Slots whose view changed
    pub changed_slots: Vec<usize>,
}

/// Everything a pass reads besides the slots themselves.
pub struct ReconcileInput<'a> {
    pub phase: ConnectionPhase,
    pub registry: &'a StatusRegistry,
    /// A frame was merged since the previous pass
    pub registry_mutated: bool,
    pub selection: &'a mut SelectionModel,
    pub prefs: &'a mut PreferenceStore,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    config: DashboardConfig,
    info_bar_items: Vec<String>,
    detail: DetailFormatter,
    slots: Vec<DisplaySlot>,
}

impl Reconciler {
    /// One slot per selection position (`max_slots`, at least 1).
    pub fn new(config: &DashboardConfig, info_bar_items: Vec<String>) -> Self {
        let detail = DetailFormatter::new(&info_bar_items, &config.sanctuary_affects);
        Self {
            config: config.clone(),
            info_bar_items,
            detail,
            slots: vec![DisplaySlot::default(); config.max_slots.max(1)],
        }
    }

    pub fn slots(&self) -> &[DisplaySlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&DisplaySlot> {
        self.slots.get(index)
    }

    pub fn info_bar_items(&self) -> &[String] {
        &self.info_bar_items
    }

    /// Replace the info-bar keys. Takes effect on the next pass.
    pub fn set_info_bar_items(&mut self, items: Vec<String>) {
        self.detail = DetailFormatter::new(&items, &self.config.sanctuary_affects);
        self.info_bar_items = items;
    }

    /// Full pass over every slot.
    ///
    /// When a frame was merged while connected, names the registry no longer
    /// knows are first dropped from the selection (and that correction
    /// persisted), so the remaining names shift down into contiguous slots.
    /// Any other pass leaves the selection alone: right after the socket
    /// opens the registry is still empty.
    pub fn reconcile(&mut self, input: ReconcileInput<'_>) -> ReconcileReport {
        let ReconcileInput {
            phase,
            registry,
            registry_mutated,
            selection,
            prefs,
        } = input;

        let deselected = if registry_mutated && phase.is_connected() {
            selection.reconcile_against_registry(registry, prefs)
        } else {
            Vec::new()
        };

        let mut changed_slots = Vec::new();
        for index in 0..self.slots.len() {
            let name = selection.get(index).map(str::to_string);
            let slot = &mut self.slots[index];
            if slot.bound != name || !phase.is_connected() {
                slot.expanded = false;
            }
            slot.bound = name;
            let view = self.compute_view(index, phase, registry);
            let slot = &mut self.slots[index];
            if slot.view != view {
                trace!(slot = index, character = ?slot.bound, "slot view changed");
                slot.view = view;
                changed_slots.push(index);
            }
        }

        debug!(
            %phase,
            selected = selection.len(),
            changed = changed_slots.len(),
            "reconciled display slots"
        );
        ReconcileReport {
            deselected,
            changed_slots,
        }
    }

    /// Flip one slot's expanded flag. Only live cards expand; returns
    /// whether anything changed.
    pub fn toggle_expand(
        &mut self,
        index: usize,
        phase: ConnectionPhase,
        registry: &StatusRegistry,
    ) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if !slot.view.can_expand() {
            return false;
        }
        slot.expanded = !slot.expanded;
        debug!(slot = index, expanded = slot.expanded, "toggled detail");
        let view = self.compute_view(index, phase, registry);
        self.slots[index].view = view;
        true
    }

    fn compute_view(&self, index: usize, phase: ConnectionPhase, registry: &StatusRegistry) -> SlotView {
        let slot = &self.slots[index];
        let Some(name) = slot.bound.as_deref() else {
            return SlotView::Cleared;
        };
        let record = registry.get(name);
        match (phase.is_connected(), record) {
            (true, None) => SlotView::Cleared,
            (true, Some(record)) => SlotView::Live(Box::new(self.live_card(name, record, phase, slot.expanded))),
            (false, record) => SlotView::Offline(self.offline_card(name, record, phase)),
        }
    }

    fn offline_card(
        &self,
        name: &str,
        record: Option<&CharacterRecord>,
        phase: ConnectionPhase,
    ) -> OfflineCard {
        let empty = CharacterRecord::new();
        let data = record.unwrap_or(&empty);
        OfflineCard {
            title: format!("{} (Offline)", data.display_name(name)),
            class: data.class_label(),
            hp: hp_bar(data),
            resource: resource_bar(data, &self.config),
            lag: self.config.show_lag.then(LagView::offline),
            indicator: LinkIndicator::for_character(phase, record),
        }
    }

    fn live_card(
        &self,
        name: &str,
        record: &CharacterRecord,
        phase: ConnectionPhase,
        expanded: bool,
    ) -> LiveCard {
        let affects = parse_affects(
            record.field(KnownField::Affects),
            &self.config.sanctuary_affects,
        );
        let no_sanctuary = self.config.show_no_sanctuary_warning && affects.missing_sanctuary();
        LiveCard {
            name: record.display_name(name),
            class: record.class_label(),
            hp: hp_bar(record),
            resource: resource_bar(record, &self.config),
            lag: self.config.show_lag.then(|| display::lag(record)),
            opponent: display::opponent(record, self.config.max_opponent_name_length),
            blind: self.config.show_blindness_warning && display::is_blind(record),
            info_items: display::info_bar(record, &self.info_bar_items),
            affects,
            no_sanctuary,
            indicator: LinkIndicator::for_character(phase, Some(record)),
            detail: expanded.then(|| self.detail.format(Some(record))),
        }
    }
}
