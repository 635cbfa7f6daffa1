//! The hook interface node extensions implement.
//!
//! A host node owns an ordered chain of extensions. Each lifecycle event is
//! delivered to every extension in registration order; pointer and key
//! events stop at the first extension that consumes them.

use std::any::Any;
use std::time::Instant;

use egui::{Key, Modifiers, Pos2, Vec2};

use super::canvas::DrawContext;
use super::node::{NodeContext, NodeId, NodeMode, SlotDirection};
use crate::persistence::StateMap;

/// Phase of a pointer event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    /// The pointer left the node or the canvas.
    Leave,
}

/// A pointer event in node-local coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerInput {
    pub phase: PointerPhase,
    pub pos: Pos2,
    pub modifiers: Modifiers,
}

impl PointerInput {
    pub fn new(phase: PointerPhase, pos: Pos2) -> Self {
        Self {
            phase,
            pos,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn down(pos: Pos2) -> Self {
        Self::new(PointerPhase::Down, pos)
    }

    pub fn moved(pos: Pos2) -> Self {
        Self::new(PointerPhase::Move, pos)
    }

    pub fn up(pos: Pos2) -> Self {
        Self::new(PointerPhase::Up, pos)
    }

    pub fn leave() -> Self {
        Self::new(PointerPhase::Leave, Pos2::ZERO)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// A keyboard event delivered to the focused node.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyInput {
    /// Typed text.
    Text(String),
    /// A non-text key press.
    Key { key: Key, modifiers: Modifiers },
}

/// Whether an extension handled an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventResponse {
    Ignored,
    Consumed,
}

impl EventResponse {
    pub fn consumed(self) -> bool {
        self == EventResponse::Consumed
    }
}

/// Behaviour attached to a host node.
///
/// Every hook has a no-op default so an extension only implements the
/// events it cares about.
///
/// # Example
///
/// ```ignore
/// struct Highlight;
///
/// impl NodeExtension for Highlight {
///     fn name(&self) -> &str { "highlight" }
///
///     fn on_draw(&self, node: &NodeContext, canvas: &mut dyn DrawContext, _now: Instant) {
///         canvas.stroke_rect(Rect::from_min_size(Pos2::ZERO, node.size), 4.0, Stroke::new(2.0, Color32::YELLOW));
///     }
///
///     fn as_any(&self) -> &dyn Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn Any { self }
/// }
/// ```
pub trait NodeExtension: Any {
    /// Short identifier, used in logs.
    fn name(&self) -> &str;

    /// Called once after the node is built, before any saved state is applied.
    fn on_create(&mut self, _node: &mut NodeContext) {}

    /// Applies saved state.
    ///
    /// The host only calls this with state whose version this build can
    /// read. Malformed values must fall back to defaults; nothing here may
    /// fail the load.
    fn on_configure(&mut self, _node: &mut NodeContext, _state: &StateMap) {}

    /// Writes this extension's keys into the node's save blob.
    fn on_serialize(&self, _node: &NodeContext, _state: &mut StateMap) {}

    /// Called once per frame before drawing. Drives animations and timers.
    fn on_tick(&mut self, _node: &mut NodeContext, _now: Instant) {}

    /// Draws on top of the node body.
    fn on_draw(&self, _node: &NodeContext, _canvas: &mut dyn DrawContext, _now: Instant) {}

    /// Handles a pointer event.
    fn on_pointer(
        &mut self,
        _node: &mut NodeContext,
        _input: &PointerInput,
        _now: Instant,
    ) -> EventResponse {
        EventResponse::Ignored
    }

    /// Handles a keyboard event.
    fn on_key(&mut self, _node: &mut NodeContext, _input: &KeyInput) -> EventResponse {
        EventResponse::Ignored
    }

    /// Another node (or this one) was renamed.
    fn on_node_renamed(&mut self, _node: &mut NodeContext, _renamed: NodeId, _title: &str) {}

    /// Another node was removed from the graph.
    fn on_node_removed(&mut self, _node: &mut NodeContext, _removed: NodeId) {}

    /// Smallest size this extension can draw into, if it has one.
    fn min_size(&self, _node: &NodeContext) -> Option<Vec2> {
        None
    }

    /// Slot a connection at `slot` should visually attach to.
    fn remap_slot(&self, _direction: SlotDirection, slot: usize) -> usize {
        slot
    }

    /// Modes this extension wants other nodes to run in.
    ///
    /// Collected by the graph after every tick and applied to the named
    /// nodes. Later requests for the same node win.
    fn mode_requests(&self, _node: &NodeContext) -> Vec<(NodeId, NodeMode)> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
