//! Panels that switch other nodes on and off.
//!
//! A mode panel keeps a list of collected nodes, each with an enabled
//! switch. While the panel is inactive its switches decide whether each
//! collected node runs or is set to the panel's disabled mode. Activating
//! a panel claims its family's single slot (the previous holder falls
//! back to inactive), freezes the switches and lets the host add nodes to
//! it.

use std::time::Instant;

use egui::{Align2, Pos2, Rect, Stroke, Vec2};
use serde::{Deserialize, Serialize};

use crate::app::theme;
use crate::gesture::{Gesture, GestureClassifier, GestureConfig};
use crate::host::node::TITLE_HEIGHT;
use crate::host::{
    DrawContext, EventResponse, NodeContext, NodeExtension, NodeGraph, NodeId, NodeMode, PanelFamily,
    PointerInput, PointerPhase, SharedPanelRegistry,
};
use crate::persistence::{state, StateMap};

pub const MODE_COLLECTOR: &str = "A1r Mode Collector";
pub const MODE_CONSOLE: &str = "A1r Mode Console";

/// State key for the collected entries.
pub const KEY_ENTRIES: &str = "collectedNodes";
/// State key for the mode disabled entries are switched to.
pub const KEY_DISABLED_MODE: &str = "disabledMode";

const HEADER_HEIGHT: f32 = 26.0;
const ROW_HEIGHT: f32 = 22.0;
const ROW_GAP: f32 = 3.0;
const SIDE_INSET: f32 = 8.0;

/// One collected node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelEntry {
    pub id: NodeId,
    pub label: String,
    pub enabled: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PanelTarget {
    Header,
    Entry(usize),
}

pub struct ModePanel {
    family: PanelFamily,
    registry: SharedPanelRegistry,
    owner: NodeId,
    entries: Vec<PanelEntry>,
    capacity: Option<usize>,
    disabled_mode: NodeMode,
    gestures: GestureClassifier<PanelTarget>,
}

impl ModePanel {
    fn new(family: PanelFamily, registry: SharedPanelRegistry, capacity: Option<usize>) -> Self {
        Self {
            family,
            registry,
            owner: 0,
            entries: Vec::new(),
            capacity,
            disabled_mode: NodeMode::Bypass,
            gestures: GestureClassifier::new(GestureConfig::widget()),
        }
    }

    /// A panel collecting any number of nodes.
    pub fn collector(registry: SharedPanelRegistry) -> Self {
        Self::new(PanelFamily::ModeCollector, registry, None)
    }

    /// A panel driving a single node.
    pub fn console(registry: SharedPanelRegistry) -> Self {
        Self::new(PanelFamily::ModeConsole, registry, Some(1))
    }

    /// Mode disabled entries switch their node to.
    pub fn with_disabled_mode(mut self, mode: NodeMode) -> Self {
        self.disabled_mode = mode;
        self
    }

    pub fn family(&self) -> PanelFamily {
        self.family
    }

    pub fn entries(&self) -> &[PanelEntry] {
        &self.entries
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn is_active(&self) -> bool {
        self.registry.borrow().is_active(self.family, self.owner)
    }

    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.entries.len() >= cap)
    }

    pub fn activate(&mut self, node: &mut NodeContext) {
        let previous = self.registry.borrow_mut().activate(self.family, self.owner);
        if let Some(previous) = previous {
            log::debug!("{:?}: node {} took over from {}", self.family, self.owner, previous);
        }
        node.request_redraw();
    }

    pub fn deactivate(&mut self, node: &mut NodeContext) {
        if self.registry.borrow_mut().deactivate(self.family, self.owner) {
            node.request_redraw();
        }
    }

    pub fn toggle_active(&mut self, node: &mut NodeContext) {
        if self.is_active() {
            self.deactivate(node);
        } else {
            self.activate(node);
        }
    }

    /// Adds a node to the panel. Only an active panel collects.
    ///
    /// Returns false for the panel itself, a node already collected, a
    /// full console or an inactive panel.
    pub fn collect(&mut self, node: &mut NodeContext, id: NodeId, label: &str) -> bool {
        if !self.is_active() || id == self.owner || self.contains(id) || self.is_full() {
            return false;
        }
        self.entries.push(PanelEntry {
            id,
            label: label.to_string(),
            enabled: true,
        });
        log::debug!("{:?} {}: collected node {}", self.family, self.owner, id);
        node.request_redraw();
        true
    }

    pub fn remove_entry(&mut self, node: &mut NodeContext, id: NodeId) -> Option<PanelEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        node.request_redraw();
        Some(self.entries.remove(index))
    }

    /// Flips an entry's switch. Switches are read-only while the panel is
    /// active.
    pub fn set_enabled(&mut self, node: &mut NodeContext, id: NodeId, enabled: bool) -> bool {
        if self.is_active() {
            log::debug!("{:?} {}: entries are read-only while active", self.family, self.owner);
            return false;
        }
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        if entry.enabled != enabled {
            entry.enabled = enabled;
            node.request_redraw();
        }
        true
    }

    fn header_rect(node: &NodeContext) -> Rect {
        Rect::from_min_size(
            Pos2::new(SIDE_INSET, TITLE_HEIGHT),
            Vec2::new((node.size.x - SIDE_INSET * 2.0).max(0.0), HEADER_HEIGHT),
        )
    }

    fn entry_rects(&self, node: &NodeContext) -> Vec<Rect> {
        let top = TITLE_HEIGHT + HEADER_HEIGHT + ROW_GAP * 2.0;
        let width = (node.size.x - SIDE_INSET * 2.0).max(0.0);
        (0..self.entries.len())
            .map(|i| {
                Rect::from_min_size(
                    Pos2::new(SIDE_INSET, top + i as f32 * (ROW_HEIGHT + ROW_GAP)),
                    Vec2::new(width, ROW_HEIGHT),
                )
            })
            .collect()
    }

    fn hit_test(&self, node: &NodeContext, pos: Pos2) -> Option<PanelTarget> {
        if Self::header_rect(node).contains(pos) {
            return Some(PanelTarget::Header);
        }
        self.entry_rects(node)
            .iter()
            .position(|r| r.contains(pos))
            .map(PanelTarget::Entry)
    }

    fn click(&mut self, node: &mut NodeContext, target: PanelTarget) {
        match target {
            PanelTarget::Header => self.toggle_active(node),
            PanelTarget::Entry(index) => {
                if let Some(entry) = self.entries.get(index) {
                    let (id, enabled) = (entry.id, entry.enabled);
                    self.set_enabled(node, id, !enabled);
                }
            }
        }
    }

    fn heading(&self) -> &'static str {
        match (self.family, self.is_active()) {
            (PanelFamily::ModeCollector, true) => "Collecting nodes (click to stop)",
            (PanelFamily::ModeCollector, false) => "Mode Collector (click to collect)",
            (PanelFamily::ModeConsole, true) => "Choosing node (click to stop)",
            (PanelFamily::ModeConsole, false) => "Mode Console (click to choose)",
        }
    }
}

/// Adds `target` to whichever panel of `family` is active.
///
/// Returns false if no panel is active or it refused the node.
pub fn collect_into_active(graph: &mut NodeGraph, family: PanelFamily, target: NodeId) -> bool {
    let Some(panel_id) = graph.panels().borrow().active(family) else {
        return false;
    };
    let Some(label) = graph.node(target).map(|n| n.context.title.clone()) else {
        return false;
    };
    graph
        .node_mut(panel_id)
        .and_then(|node| node.with_extension(|panel: &mut ModePanel, ctx| panel.collect(ctx, target, &label)))
        .unwrap_or(false)
}

impl NodeExtension for ModePanel {
    fn name(&self) -> &str {
        "mode_panel"
    }

    fn on_create(&mut self, node: &mut NodeContext) {
        self.owner = node.id;
    }

    fn on_configure(&mut self, node: &mut NodeContext, saved: &StateMap) {
        match state::read_value::<Vec<PanelEntry>>(saved, KEY_ENTRIES) {
            Ok(Some(entries)) => {
                self.entries.clear();
                for entry in entries {
                    if entry.id == self.owner || self.contains(entry.id) || self.is_full() {
                        log::warn!("{:?} {}: dropping saved entry {}", self.family, self.owner, entry.id);
                        continue;
                    }
                    self.entries.push(entry);
                }
            }
            Ok(None) => {}
            Err(err) => log::warn!("{:?} {}: ignoring saved entries: {}", self.family, self.owner, err),
        }
        match state::read_value::<NodeMode>(saved, KEY_DISABLED_MODE) {
            Ok(Some(mode)) => self.disabled_mode = mode,
            Ok(None) => {}
            Err(err) => log::warn!("{:?} {}: {}", self.family, self.owner, err),
        }
        node.request_redraw();
    }

    fn on_serialize(&self, _node: &NodeContext, saved: &mut StateMap) {
        if let Err(err) = state::write_value(saved, KEY_ENTRIES, &self.entries) {
            log::error!("{:?} {}: could not save entries: {}", self.family, self.owner, err);
        }
        if let Err(err) = state::write_value(saved, KEY_DISABLED_MODE, &self.disabled_mode) {
            log::error!("{:?} {}: could not save mode: {}", self.family, self.owner, err);
        }
    }

    fn on_draw(&self, node: &NodeContext, canvas: &mut dyn DrawContext, _now: Instant) {
        let active = self.is_active();
        let header = Self::header_rect(node);
        let (fill, border) = if active {
            (theme::item::EDITING_FILL, theme::accent::PRIMARY)
        } else {
            (theme::item::FILL, theme::item::BORDER)
        };
        canvas.fill_rect(header, 4.0, fill);
        canvas.stroke_rect(header, 4.0, Stroke::new(1.0, border));
        canvas.text(header.center(), Align2::CENTER_CENTER, self.heading(), 12.0, theme::text::HEADING);

        for (entry, row) in self.entries.iter().zip(self.entry_rects(node)) {
            canvas.fill_rect(row, 3.0, theme::item::TAG_FILL);
            let label_color = if active { theme::text::DISABLED } else { theme::text::PRIMARY };
            canvas.text(
                Pos2::new(row.min.x + 6.0, row.center().y),
                Align2::LEFT_CENTER,
                &entry.label,
                12.0,
                label_color,
            );
            let dot = match (active, entry.enabled) {
                (true, _) => theme::toggle::LOCKED,
                (false, true) => theme::toggle::ON,
                (false, false) => theme::toggle::OFF,
            };
            canvas.fill_rect(
                Rect::from_center_size(Pos2::new(row.max.x - 12.0, row.center().y), Vec2::splat(10.0)),
                5.0,
                dot,
            );
        }
    }

    fn on_pointer(&mut self, node: &mut NodeContext, input: &PointerInput, now: Instant) -> EventResponse {
        match input.phase {
            PointerPhase::Down => {
                let target = self.hit_test(node, input.pos);
                if target.is_none() {
                    return EventResponse::Ignored;
                }
                // A fast second click flips the target again.
                if let Some(Gesture::DoubleClick(target)) = self.gestures.pointer_down(input.pos, target, now) {
                    self.click(node, target);
                }
                EventResponse::Consumed
            }
            PointerPhase::Move if self.gestures.wants_pointer() => {
                self.gestures.pointer_move(input.pos, now);
                EventResponse::Consumed
            }
            PointerPhase::Move => EventResponse::Ignored,
            PointerPhase::Up => match self.gestures.pointer_up(input.pos) {
                Some(Gesture::Click(target)) => {
                    self.click(node, target);
                    EventResponse::Consumed
                }
                Some(_) => EventResponse::Consumed,
                None => EventResponse::Ignored,
            },
            PointerPhase::Leave => {
                self.gestures.pointer_leave();
                EventResponse::Ignored
            }
        }
    }

    fn on_node_renamed(&mut self, node: &mut NodeContext, renamed: NodeId, title: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == renamed) {
            entry.label = title.to_string();
            node.request_redraw();
        }
    }

    fn on_node_removed(&mut self, node: &mut NodeContext, removed: NodeId) {
        self.remove_entry(node, removed);
    }

    fn mode_requests(&self, _node: &NodeContext) -> Vec<(NodeId, NodeMode)> {
        if self.is_active() {
            return Vec::new();
        }
        self.entries
            .iter()
            .map(|e| {
                let mode = if e.enabled { NodeMode::Always } else { self.disabled_mode };
                (e.id, mode)
            })
            .collect()
    }

    fn min_size(&self, _node: &NodeContext) -> Option<Vec2> {
        let rows = self.entries.len() as f32;
        Some(Vec2::new(
            220.0,
            TITLE_HEIGHT + HEADER_HEIGHT + ROW_GAP * 2.0 + rows * (ROW_HEIGHT + ROW_GAP) + SIDE_INSET,
        ))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ExtensionRegistry, PanelRegistry};
    use std::time::Duration;

    fn panel_node(id: NodeId, registry: &SharedPanelRegistry) -> (NodeContext, ModePanel) {
        let mut node = NodeContext::new(id, MODE_COLLECTOR, Vec2::new(240.0, 160.0));
        let mut panel = ModePanel::collector(registry.clone());
        panel.on_create(&mut node);
        (node, panel)
    }

    #[test]
    fn test_activation_hands_over() {
        let registry = PanelRegistry::shared();
        let (mut node_a, mut a) = panel_node(1, &registry);
        let (mut node_b, mut b) = panel_node(2, &registry);

        a.activate(&mut node_a);
        assert!(a.is_active());
        b.activate(&mut node_b);
        assert!(b.is_active());
        assert!(!a.is_active());

        // Deactivating a non-holder leaves the slot alone.
        a.deactivate(&mut node_a);
        assert!(b.is_active());
    }

    #[test]
    fn test_collect_requires_active_and_skips_duplicates() {
        let registry = PanelRegistry::shared();
        let (mut node, mut panel) = panel_node(1, &registry);
        assert!(!panel.collect(&mut node, 5, "Sampler"));

        panel.activate(&mut node);
        assert!(panel.collect(&mut node, 5, "Sampler"));
        assert!(!panel.collect(&mut node, 5, "Sampler"));
        assert!(!panel.collect(&mut node, 1, "Itself"));
        assert_eq!(panel.entries().len(), 1);
    }

    #[test]
    fn test_console_holds_one_node() {
        let registry = PanelRegistry::shared();
        let mut node = NodeContext::new(1, MODE_CONSOLE, Vec2::new(240.0, 120.0));
        let mut console = ModePanel::console(registry);
        console.on_create(&mut node);
        console.activate(&mut node);
        assert!(console.collect(&mut node, 4, "Upscale"));
        assert!(!console.collect(&mut node, 5, "Detailer"));
    }

    #[test]
    fn test_entries_read_only_while_active() {
        let registry = PanelRegistry::shared();
        let (mut node, mut panel) = panel_node(1, &registry);
        panel.activate(&mut node);
        panel.collect(&mut node, 5, "Sampler");
        assert!(!panel.set_enabled(&mut node, 5, false));
        assert!(panel.entries()[0].enabled);

        panel.deactivate(&mut node);
        assert!(panel.set_enabled(&mut node, 5, false));
        assert_eq!(panel.mode_requests(&node), vec![(5, NodeMode::Bypass)]);
    }

    #[test]
    fn test_header_click_toggles_activation() {
        let registry = PanelRegistry::shared();
        let (mut node, mut panel) = panel_node(1, &registry);
        let t0 = Instant::now();
        let header = Pos2::new(100.0, TITLE_HEIGHT + 10.0);
        panel.on_pointer(&mut node, &PointerInput::down(header), t0);
        panel.on_pointer(&mut node, &PointerInput::up(header), t0 + Duration::from_millis(30));
        assert!(panel.is_active());
        assert_eq!(registry.borrow().active(PanelFamily::ModeCollector), Some(1));
    }

    #[test]
    fn test_fast_second_click_flips_entry_back() {
        let registry = PanelRegistry::shared();
        let (mut node, mut panel) = panel_node(1, &registry);
        panel.activate(&mut node);
        panel.collect(&mut node, 5, "Sampler");
        panel.deactivate(&mut node);

        let entry = Pos2::new(100.0, TITLE_HEIGHT + HEADER_HEIGHT + ROW_GAP * 2.0 + ROW_HEIGHT / 2.0);
        let t0 = Instant::now();
        panel.on_pointer(&mut node, &PointerInput::down(entry), t0);
        panel.on_pointer(&mut node, &PointerInput::up(entry), t0 + Duration::from_millis(30));
        assert!(!panel.entries()[0].enabled);

        panel.on_pointer(&mut node, &PointerInput::down(entry), t0 + Duration::from_millis(150));
        let response = panel.on_pointer(&mut node, &PointerInput::up(entry), t0 + Duration::from_millis(180));
        assert_eq!(response, EventResponse::Ignored);
        assert!(panel.entries()[0].enabled);
        assert!(panel.mode_requests(&node).iter().all(|(_, mode)| *mode == NodeMode::Always));
    }

    #[test]
    fn test_fast_second_click_on_header_deactivates() {
        let registry = PanelRegistry::shared();
        let (mut node, mut panel) = panel_node(1, &registry);
        let t0 = Instant::now();
        let header = Pos2::new(100.0, TITLE_HEIGHT + 10.0);
        panel.on_pointer(&mut node, &PointerInput::down(header), t0);
        panel.on_pointer(&mut node, &PointerInput::up(header), t0 + Duration::from_millis(30));
        panel.on_pointer(&mut node, &PointerInput::down(header), t0 + Duration::from_millis(150));
        panel.on_pointer(&mut node, &PointerInput::up(header), t0 + Duration::from_millis(180));
        assert!(!panel.is_active());
        assert_eq!(registry.borrow().active(PanelFamily::ModeCollector), None);
    }

    #[test]
    fn test_rename_and_remove_notifications() {
        let registry = PanelRegistry::shared();
        let (mut node, mut panel) = panel_node(1, &registry);
        panel.activate(&mut node);
        panel.collect(&mut node, 5, "Sampler");
        panel.collect(&mut node, 6, "Decoder");

        panel.on_node_renamed(&mut node, 5, "Main Sampler");
        assert_eq!(panel.entries()[0].label, "Main Sampler");
        panel.on_node_removed(&mut node, 6);
        assert_eq!(panel.entries().len(), 1);
    }

    #[test]
    fn test_entries_round_trip() {
        let registry = PanelRegistry::shared();
        let (mut node, mut panel) = panel_node(1, &registry);
        panel.activate(&mut node);
        panel.collect(&mut node, 5, "Sampler");
        panel.deactivate(&mut node);
        panel.set_enabled(&mut node, 5, false);

        let mut saved = StateMap::new();
        panel.on_serialize(&node, &mut saved);
        assert_eq!(saved[KEY_DISABLED_MODE], serde_json::json!("bypass"));

        let (mut fresh_node, mut fresh) = panel_node(2, &registry);
        fresh.on_configure(&mut fresh_node, &saved);
        assert_eq!(
            fresh.entries(),
            &[PanelEntry {
                id: 5,
                label: "Sampler".to_string(),
                enabled: false
            }]
        );
    }

    #[test]
    fn test_graph_applies_modes_and_relabels() {
        let panels = PanelRegistry::shared();
        let mut registry = ExtensionRegistry::new();
        let shared = panels.clone();
        registry.register(MODE_COLLECTOR, move |_| Some(Box::new(ModePanel::collector(shared.clone()))));
        let mut graph = NodeGraph::new(registry, panels);

        let panel_id = graph.add(MODE_COLLECTOR, Vec2::new(240.0, 160.0), |n| n);
        let target = graph.add("KSampler", Vec2::new(200.0, 100.0), |n| n.with_title("Sampler"));

        assert!(!collect_into_active(&mut graph, PanelFamily::ModeCollector, target));
        graph
            .node_mut(panel_id)
            .and_then(|n| n.with_extension(|p: &mut ModePanel, ctx| p.activate(ctx)));
        assert!(collect_into_active(&mut graph, PanelFamily::ModeCollector, target));

        graph
            .node_mut(panel_id)
            .and_then(|n| n.with_extension(|p: &mut ModePanel, ctx| {
                p.deactivate(ctx);
                p.set_enabled(ctx, target, false)
            }));
        graph.tick(Instant::now());
        assert_eq!(graph.node(target).unwrap().context.mode, NodeMode::Bypass);

        graph.rename(target, "Refiner");
        let label = graph
            .node(panel_id)
            .and_then(|n| n.extension::<ModePanel>())
            .map(|p| p.entries()[0].label.clone());
        assert_eq!(label.as_deref(), Some("Refiner"));

        graph.remove(panel_id);
        assert_eq!(graph.node(target).unwrap().context.mode, NodeMode::Always);
        assert!(graph.panels().borrow().active(PanelFamily::ModeCollector).is_none());
    }
}
