//! The host-side view of a node that extensions operate on.

use egui::{Pos2, Vec2};

/// Identifier the host assigns to a node.
pub type NodeId = u64;

/// Height of one slot row below the title bar.
pub const SLOT_ROW_HEIGHT: f32 = 20.0;

/// Height of the node title bar.
pub const TITLE_HEIGHT: f32 = 30.0;

/// Side of a node a slot sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotDirection {
    Input,
    Output,
}

/// An input or output connection point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    /// Stable name used by connections.
    pub name: String,
    /// Text drawn next to the slot.
    pub label: String,
    /// Hidden slots take no row and draw nothing.
    pub hidden: bool,
}

impl Slot {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            hidden: false,
        }
    }
}

/// Execution mode of a node, as the host's scheduler sees it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMode {
    /// Runs normally.
    #[default]
    Always,
    /// Skipped, outputs left empty.
    Mute,
    /// Skipped, inputs passed through.
    Bypass,
}

/// Value held by a host widget.
#[derive(Clone, Debug, PartialEq)]
pub enum WidgetValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl WidgetValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            WidgetValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            WidgetValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            WidgetValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// A host widget. Extensions read and write values and the editable state;
/// rendering stays with the host.
#[derive(Clone, Debug, PartialEq)]
pub struct Widget {
    pub name: String,
    pub value: WidgetValue,
    /// Read-only widgets ignore user edits.
    pub disabled: bool,
    /// Hidden widgets are not drawn but still serialized by the host.
    pub hidden: bool,
}

/// Node state shared between the host and every extension on the node.
#[derive(Clone, Debug)]
pub struct NodeContext {
    pub id: NodeId,
    pub node_type: String,
    pub title: String,
    pub size: Vec2,
    pub mode: NodeMode,
    pub inputs: Vec<Slot>,
    pub outputs: Vec<Slot>,
    pub widgets: Vec<Widget>,
    redraw: bool,
}

impl NodeContext {
    pub fn new(id: NodeId, node_type: impl Into<String>, size: Vec2) -> Self {
        let node_type = node_type.into();
        Self {
            id,
            title: node_type.clone(),
            node_type,
            size,
            mode: NodeMode::Always,
            inputs: Vec::new(),
            outputs: Vec::new(),
            widgets: Vec::new(),
            redraw: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_input(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(Slot::new(name));
        self
    }

    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(Slot::new(name));
        self
    }

    pub fn with_widget(mut self, name: impl Into<String>, value: WidgetValue) -> Self {
        self.add_widget(name, value);
        self
    }

    /// Appends a widget unless one with the same name exists.
    pub fn add_widget(&mut self, name: impl Into<String>, value: WidgetValue) {
        let name = name.into();
        if self.widget(&name).is_none() {
            self.widgets.push(Widget {
                name,
                value,
                disabled: false,
                hidden: false,
            });
        }
    }

    pub fn slots(&self, direction: SlotDirection) -> &[Slot] {
        match direction {
            SlotDirection::Input => &self.inputs,
            SlotDirection::Output => &self.outputs,
        }
    }

    pub fn slots_mut(&mut self, direction: SlotDirection) -> &mut Vec<Slot> {
        match direction {
            SlotDirection::Input => &mut self.inputs,
            SlotDirection::Output => &mut self.outputs,
        }
    }

    /// Number of slot rows currently drawn.
    pub fn visible_slot_rows(&self) -> usize {
        let visible = |slots: &[Slot]| slots.iter().filter(|s| !s.hidden).count();
        visible(&self.inputs).max(visible(&self.outputs))
    }

    /// Node-local position of a slot's connection point.
    pub fn slot_position(&self, direction: SlotDirection, index: usize) -> Pos2 {
        let x = match direction {
            SlotDirection::Input => 0.0,
            SlotDirection::Output => self.size.x,
        };
        Pos2::new(x, TITLE_HEIGHT + (index as f32 + 0.5) * SLOT_ROW_HEIGHT)
    }

    pub fn widget(&self, name: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.name == name)
    }

    pub fn widget_mut(&mut self, name: &str) -> Option<&mut Widget> {
        self.widgets.iter_mut().find(|w| w.name == name)
    }

    /// Writes a widget value. Returns false if there is no such widget.
    pub fn set_widget_value(&mut self, name: &str, value: WidgetValue) -> bool {
        match self.widget_mut(name) {
            Some(widget) => {
                if widget.value != value {
                    widget.value = value;
                    self.redraw = true;
                }
                true
            }
            None => false,
        }
    }

    /// Marks a widget read-only or editable.
    pub fn set_widget_disabled(&mut self, name: &str, disabled: bool) -> bool {
        match self.widget_mut(name) {
            Some(widget) => {
                widget.disabled = disabled;
                self.redraw = true;
                true
            }
            None => false,
        }
    }

    /// Asks the host to repaint the node.
    pub fn request_redraw(&mut self) {
        self.redraw = true;
    }

    /// Returns and clears the pending redraw request.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_writes_request_redraw() {
        let mut node = NodeContext::new(1, "Test", Vec2::new(200.0, 100.0))
            .with_widget("enable", WidgetValue::Bool(false));
        assert!(!node.take_redraw());
        assert!(node.set_widget_value("enable", WidgetValue::Bool(true)));
        assert!(node.take_redraw());
        assert!(!node.take_redraw());
        assert!(!node.set_widget_value("missing", WidgetValue::Bool(true)));
    }

    #[test]
    fn test_slot_rows() {
        let mut node = NodeContext::new(1, "Test", Vec2::new(200.0, 100.0))
            .with_input("a")
            .with_output("x")
            .with_output("y")
            .with_output("z");
        assert_eq!(node.visible_slot_rows(), 3);
        node.outputs[2].hidden = true;
        assert_eq!(node.visible_slot_rows(), 2);
        assert_eq!(
            node.slot_position(SlotDirection::Output, 1),
            Pos2::new(200.0, TITLE_HEIGHT + 1.5 * SLOT_ROW_HEIGHT)
        );
    }
}
