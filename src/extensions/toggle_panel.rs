//! Switch rows backed by a constraint set.
//!
//! Each flag of the node's constraint table is mirrored into a boolean
//! widget of the same name. Clicking a row toggles the flag through the
//! resolution pass; every flag the pass moved is written back to its
//! widget, and controls the pass locked or unlocked have their widgets
//! disabled or re-enabled.

use std::time::Instant;

use egui::{Align2, Pos2, Rect, Stroke, Vec2};

use crate::app::theme;
use crate::constraints::{presets, ConstraintSet, Resolution, SharedConstraintSet, ToggleNode};
use crate::gesture::{Gesture, GestureClassifier, GestureConfig};
use crate::host::node::{SLOT_ROW_HEIGHT, TITLE_HEIGHT};
use crate::host::{
    DrawContext, EventResponse, NodeContext, NodeExtension, PointerInput, PointerPhase, WidgetValue,
};
use crate::persistence::{state, StateMap};

const ROW_HEIGHT: f32 = 24.0;
const ROW_GAP: f32 = 4.0;
const SIDE_INSET: f32 = 10.0;
const SWITCH_SIZE: Vec2 = Vec2::new(34.0, 16.0);

pub struct TogglePanel {
    constraints: SharedConstraintSet,
    gestures: GestureClassifier<usize>,
}

impl TogglePanel {
    pub fn new(set: ConstraintSet) -> Self {
        Self {
            constraints: SharedConstraintSet::new(set),
            gestures: GestureClassifier::new(GestureConfig::widget()),
        }
    }

    /// Panel for one of the preset node types.
    pub fn for_node_type(node_type: &str) -> Option<Self> {
        presets::for_node_type(node_type).map(Self::new)
    }

    /// Handle to the constraint set, for hosts that toggle flags directly.
    pub fn constraints(&self) -> &SharedConstraintSet {
        &self.constraints
    }

    pub fn value(&self, name: &str) -> Option<bool> {
        self.constraints.value(name)
    }

    fn flags(&self) -> Vec<ToggleNode> {
        self.constraints
            .with(|set| set.flags().to_vec())
            .unwrap_or_default()
    }

    fn rows_top(node: &NodeContext) -> f32 {
        TITLE_HEIGHT + node.visible_slot_rows() as f32 * SLOT_ROW_HEIGHT + ROW_GAP
    }

    fn row_rects(&self, node: &NodeContext) -> Vec<Rect> {
        let top = Self::rows_top(node);
        let width = (node.size.x - SIDE_INSET * 2.0).max(0.0);
        (0..self.flags().len())
            .map(|i| {
                Rect::from_min_size(
                    Pos2::new(SIDE_INSET, top + i as f32 * (ROW_HEIGHT + ROW_GAP)),
                    Vec2::new(width, ROW_HEIGHT),
                )
            })
            .collect()
    }

    /// Flips the flag `name` on behalf of the user.
    ///
    /// Returns what the resolution pass changed; an empty resolution means
    /// the toggle was refused or changed nothing.
    pub fn toggle(&mut self, node: &mut NodeContext, name: &str) -> Resolution {
        let Some(current) = self.constraints.value(name) else {
            log::warn!("{}: no flag named '{}'", node.node_type, name);
            return Resolution::default();
        };
        let resolution = self
            .constraints
            .toggle(name, !current, |flag, value| {
                node.set_widget_value(flag, WidgetValue::Bool(value));
            })
            .unwrap_or_default();
        Self::apply_locks(node, &resolution);
        resolution
    }

    /// Sets the flag `name` on behalf of the host. Locks do not apply; the
    /// rest of the pass runs as for a click.
    pub fn force(&mut self, node: &mut NodeContext, name: &str, value: bool) -> Resolution {
        let resolution = self
            .constraints
            .force(name, value, |flag, resolved| {
                node.set_widget_value(flag, WidgetValue::Bool(resolved));
            })
            .unwrap_or_default();
        Self::apply_locks(node, &resolution);
        resolution
    }

    fn apply_locks(node: &mut NodeContext, resolution: &Resolution) {
        for change in &resolution.lock_changes {
            node.set_widget_disabled(&change.control, change.locked);
        }
        if !resolution.is_empty() {
            node.request_redraw();
        }
    }

    /// Writes every flag value and lock state into the node's widgets.
    fn sync_widgets(&self, node: &mut NodeContext) {
        for flag in self.flags() {
            node.set_widget_value(&flag.name, WidgetValue::Bool(flag.value));
        }
        let locks = self
            .constraints
            .with(|set| {
                set.lockable_controls()
                    .into_iter()
                    .map(|control| (control.to_string(), set.is_locked(control)))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        for (control, locked) in locks {
            node.set_widget_disabled(&control, locked);
        }
    }

    /// Picks up flag widgets the host changed behind the panel's back.
    ///
    /// Such a change is forced through the resolution pass, so locks do
    /// not apply; if the rules still refuse it, the widget is put back.
    fn sync_from_widgets(&mut self, node: &mut NodeContext) {
        for flag in self.flags() {
            // An earlier pass in this loop may already have moved the flag.
            let Some(current) = self.constraints.value(&flag.name) else {
                continue;
            };
            let widget_value = node.widget(&flag.name).and_then(|w| w.value.as_bool());
            if let Some(value) = widget_value.filter(|&v| v != current) {
                let resolution = self.force(node, &flag.name, value);
                if resolution.change_of(&flag.name).is_none() {
                    log::debug!("{}: host change of '{}' refused", node.node_type, flag.name);
                    node.set_widget_value(&flag.name, WidgetValue::Bool(current));
                }
            }
        }
    }
}

impl NodeExtension for TogglePanel {
    fn name(&self) -> &str {
        "toggle_panel"
    }

    fn on_create(&mut self, node: &mut NodeContext) {
        for flag in self.flags() {
            node.add_widget(flag.name.clone(), WidgetValue::Bool(flag.value));
            if let Some(widget) = node.widget_mut(&flag.name) {
                widget.hidden = true;
            }
        }
        self.sync_widgets(node);
    }

    fn on_configure(&mut self, node: &mut NodeContext, saved: &StateMap) {
        match state::read_flags(saved) {
            Ok(stored) if !stored.is_empty() => {
                let restored = self
                    .constraints
                    .with_mut(|set| set.restore(stored.iter().map(|(n, v)| (n.as_str(), *v))));
                if let Some(Err(err)) = restored {
                    log::warn!("{}: stored flags rejected, keeping defaults: {}", node.node_type, err);
                }
            }
            Ok(_) => {}
            Err(err) => log::warn!("{}: ignoring stored flags: {}", node.node_type, err),
        }
        self.gestures.reset();
        self.sync_widgets(node);
    }

    fn on_serialize(&self, _node: &NodeContext, saved: &mut StateMap) {
        let flags = self.flags();
        state::write_flags(saved, flags.iter().map(|f| (f.name.as_str(), f.value)));
    }

    fn on_tick(&mut self, node: &mut NodeContext, _now: Instant) {
        self.sync_from_widgets(node);
    }

    fn on_draw(&self, node: &NodeContext, canvas: &mut dyn DrawContext, _now: Instant) {
        for (flag, row) in self.flags().iter().zip(self.row_rects(node)) {
            let locked = self.constraints.is_locked(&flag.name);
            canvas.fill_rect(row, 4.0, theme::item::FILL);
            canvas.stroke_rect(row, 4.0, Stroke::new(1.0, theme::item::BORDER));

            let label_color = if locked { theme::text::DISABLED } else { theme::text::PRIMARY };
            canvas.text(
                Pos2::new(row.min.x + 8.0, row.center().y),
                Align2::LEFT_CENTER,
                &flag.name,
                12.0,
                label_color,
            );

            let switch = Rect::from_center_size(
                Pos2::new(row.max.x - 8.0 - SWITCH_SIZE.x / 2.0, row.center().y),
                SWITCH_SIZE,
            );
            let fill = match (locked, flag.value) {
                (true, _) => theme::toggle::LOCKED,
                (false, true) => theme::toggle::ON,
                (false, false) => theme::toggle::OFF,
            };
            canvas.fill_rect(switch, SWITCH_SIZE.y / 2.0, fill);
            let knob_x = if flag.value {
                switch.max.x - SWITCH_SIZE.y / 2.0
            } else {
                switch.min.x + SWITCH_SIZE.y / 2.0
            };
            canvas.fill_rect(
                Rect::from_center_size(Pos2::new(knob_x, switch.center().y), Vec2::splat(SWITCH_SIZE.y - 4.0)),
                (SWITCH_SIZE.y - 4.0) / 2.0,
                theme::text::PRIMARY,
            );
        }
    }

    fn on_pointer(&mut self, node: &mut NodeContext, input: &PointerInput, now: Instant) -> EventResponse {
        match input.phase {
            PointerPhase::Down => {
                let row = self.row_rects(node).iter().position(|r| r.contains(input.pos));
                if row.is_none() {
                    return EventResponse::Ignored;
                }
                // A fast second click is still a toggle.
                if let Some(Gesture::DoubleClick(row)) = self.gestures.pointer_down(input.pos, row, now) {
                    if let Some(flag) = self.flags().get(row) {
                        self.toggle(node, &flag.name);
                    }
                }
                EventResponse::Consumed
            }
            PointerPhase::Move => {
                if self.gestures.wants_pointer() {
                    self.gestures.pointer_move(input.pos, now);
                    EventResponse::Consumed
                } else {
                    EventResponse::Ignored
                }
            }
            PointerPhase::Up => match self.gestures.pointer_up(input.pos) {
                Some(Gesture::Click(row)) => {
                    if let Some(flag) = self.flags().get(row) {
                        self.toggle(node, &flag.name);
                    }
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

    fn min_size(&self, node: &NodeContext) -> Option<Vec2> {
        let rows = self.flags().len() as f32;
        Some(Vec2::new(
            200.0,
            Self::rows_top(node) + rows * (ROW_HEIGHT + ROW_GAP) + SIDE_INSET,
        ))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
