//! Host module
//!
//! The contract between the node-graph host and the extensions attached to
//! its nodes: the node view, lifecycle hooks, drawing primitives, the
//! registry that composes extension chains per node type, and the
//! single-holder panel registry.

pub mod canvas;
pub mod graph;
pub mod hooks;
pub mod node;
pub mod panels;
pub mod registry;

pub use canvas::{DrawContext, DrawOp, EguiMeasure, PainterCanvas, RecordingCanvas};
pub use graph::{ExtendedNode, NodeGraph};
pub use hooks::{EventResponse, KeyInput, NodeExtension, PointerInput, PointerPhase};
pub use node::{NodeContext, NodeId, NodeMode, Slot, SlotDirection, Widget, WidgetValue};
pub use panels::{PanelFamily, PanelRegistry, SharedPanelRegistry};
pub use registry::{ExtensionFactory, ExtensionRegistry};
