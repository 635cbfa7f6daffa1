//! Folding a node down to its first input and output.
//!
//! While collapsed, every slot after the first on each side is hidden,
//! slot labels are blanked and connections to hidden slots are drawn to
//! slot 0. Expanding puts the saved labels back and returns the node to
//! the height it had before collapsing. Attached globally, so any node
//! type not on the blacklist gets the behaviour.

use std::time::Instant;

use egui::Vec2;
use serde_json::Value;

use crate::host::node::SLOT_ROW_HEIGHT;
use crate::host::{NodeContext, NodeExtension, SlotDirection};
use crate::persistence::state::{self, KEY_COLLAPSED, KEY_EXPANDED_HEIGHT};
use crate::persistence::StateMap;

/// Collapsed nodes never shrink below this height.
pub const MIN_COLLAPSED_HEIGHT: f32 = 40.0;

#[derive(Debug, Default)]
pub struct CollapseSlots {
    collapsed: bool,
    input_labels: Option<Vec<String>>,
    output_labels: Option<Vec<String>>,
    /// Height before collapsing and the height collapsing produced.
    heights: Option<(f32, f32)>,
}

impl CollapseSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// Context-menu text for the toggle.
    pub fn menu_label(&self) -> &'static str {
        if self.collapsed {
            "Expand slots"
        } else {
            "Collapse slots"
        }
    }

    pub fn toggle(&mut self, node: &mut NodeContext) {
        self.set_collapsed(node, !self.collapsed);
    }

    /// Collapses or expands the node. The width is left alone.
    ///
    /// Collapsing shrinks the node by the hidden slot rows, down to
    /// [`MIN_COLLAPSED_HEIGHT`]. Expanding restores the pre-collapse height,
    /// plus whatever the node was resized by while collapsed.
    pub fn set_collapsed(&mut self, node: &mut NodeContext, collapsed: bool) {
        if self.collapsed == collapsed {
            self.apply(node);
            return;
        }
        let rows_before = node.visible_slot_rows() as f32;
        self.collapsed = collapsed;
        self.apply(node);
        let rows_after = node.visible_slot_rows() as f32;

        let by_rows = node.size.y + (rows_after - rows_before) * SLOT_ROW_HEIGHT;
        if collapsed {
            let height = by_rows.max(MIN_COLLAPSED_HEIGHT);
            self.heights = Some((node.size.y, height));
            node.size.y = height;
        } else {
            node.size.y = match self.heights.take() {
                Some((expanded, collapsed_to)) => (expanded + node.size.y - collapsed_to).max(0.0),
                None => by_rows,
            };
        }
        log::debug!("node {}: slots {}", node.id, if collapsed { "collapsed" } else { "expanded" });
        node.request_redraw();
    }

    /// Reasserts slot visibility and labels for the current flag.
    ///
    /// Labels are saved on the way in and handed back on the way out, so
    /// the saved copy only exists while the node is collapsed.
    fn apply(&mut self, node: &mut NodeContext) {
        for direction in [SlotDirection::Input, SlotDirection::Output] {
            let saved = match direction {
                SlotDirection::Input => &mut self.input_labels,
                SlotDirection::Output => &mut self.output_labels,
            };
            let slots = node.slots_mut(direction);
            if slots.len() < 2 {
                continue;
            }

            if self.collapsed {
                if saved.is_none() {
                    *saved = Some(slots.iter().map(|s| s.label.clone()).collect());
                }
                for (i, slot) in slots.iter_mut().enumerate() {
                    slot.hidden = i > 0;
                    slot.label.clear();
                }
            } else {
                let labels = saved.take();
                for (i, slot) in slots.iter_mut().enumerate() {
                    slot.hidden = false;
                    if let Some(labels) = &labels {
                        slot.label = labels.get(i).cloned().unwrap_or_else(|| slot.name.clone());
                    }
                }
            }
        }
    }
}

impl NodeExtension for CollapseSlots {
    fn name(&self) -> &str {
        "collapse_slots"
    }

    fn on_create(&mut self, node: &mut NodeContext) {
        self.apply(node);
    }

    /// The saved node size already reflects the stored flag, so only the
    /// flag and the pre-collapse height are restored here.
    fn on_configure(&mut self, node: &mut NodeContext, saved: &StateMap) {
        let collapsed = match state::read_bool(saved, KEY_COLLAPSED) {
            Ok(Some(collapsed)) => collapsed,
            Ok(None) => return,
            Err(err) => {
                log::warn!("node {}: {}", node.id, err);
                return;
            }
        };
        let expanded = state::read_f32(saved, KEY_EXPANDED_HEIGHT).unwrap_or_else(|err| {
            log::warn!("node {}: {}", node.id, err);
            None
        });
        self.collapsed = collapsed;
        self.apply(node);
        self.heights = if collapsed {
            expanded.map(|height| (height, node.size.y))
        } else {
            None
        };
        node.request_redraw();
    }

    fn on_serialize(&self, _node: &NodeContext, saved: &mut StateMap) {
        saved.insert(KEY_COLLAPSED.to_string(), Value::Bool(self.collapsed));
        if let Some((expanded, _)) = self.heights {
            saved.insert(KEY_EXPANDED_HEIGHT.to_string(), Value::from(expanded));
        }
    }

    fn on_tick(&mut self, node: &mut NodeContext, _now: Instant) {
        if self.collapsed {
            self.apply(node);
        }
    }

    fn min_size(&self, _node: &NodeContext) -> Option<Vec2> {
        self.collapsed.then(|| Vec2::new(0.0, MIN_COLLAPSED_HEIGHT))
    }

    fn remap_slot(&self, _direction: SlotDirection, slot: usize) -> usize {
        if self.collapsed {
            0
        } else {
            slot
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
