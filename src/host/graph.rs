//! Nodes with their extension chains, and the canvas that holds them.

use std::time::Instant;

use egui::Vec2;

use super::canvas::DrawContext;
use super::hooks::{EventResponse, KeyInput, NodeExtension, PointerInput};
use super::node::{NodeContext, NodeId, NodeMode, SlotDirection};
use super::panels::SharedPanelRegistry;
use super::registry::ExtensionRegistry;
use crate::persistence::{self, GraphDocument, NodeRecord, StateMap};

/// A host node and the ordered chain of extensions decorating it.
pub struct ExtendedNode {
    pub context: NodeContext,
    extensions: Vec<Box<dyn NodeExtension>>,
}

impl ExtendedNode {
    /// Attaches `extensions` and runs their `on_create` hooks in order.
    pub fn new(mut context: NodeContext, mut extensions: Vec<Box<dyn NodeExtension>>) -> Self {
        for extension in &mut extensions {
            extension.on_create(&mut context);
        }
        log::debug!(
            "node {} ({}): {} extension(s)",
            context.id,
            context.node_type,
            extensions.len()
        );
        Self { context, extensions }
    }

    pub fn id(&self) -> NodeId {
        self.context.id
    }

    /// Names of the attached extensions, in chain order.
    pub fn extension_names(&self) -> Vec<&str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    /// The first attached extension of type `E`.
    pub fn extension<E: NodeExtension>(&self) -> Option<&E> {
        self.extensions
            .iter()
            .find_map(|e| e.as_any().downcast_ref::<E>())
    }

    pub fn extension_mut<E: NodeExtension>(&mut self) -> Option<&mut E> {
        self.extensions
            .iter_mut()
            .find_map(|e| e.as_any_mut().downcast_mut::<E>())
    }

    /// Runs `f` on the first extension of type `E` together with the node
    /// it decorates.
    pub fn with_extension<E, R>(&mut self, f: impl FnOnce(&mut E, &mut NodeContext) -> R) -> Option<R>
    where
        E: NodeExtension,
    {
        let extension = self
            .extensions
            .iter_mut()
            .find_map(|e| e.as_any_mut().downcast_mut::<E>())?;
        Some(f(extension, &mut self.context))
    }

    /// Applies a saved blob. Blobs from a newer layout are ignored and
    /// every extension keeps its defaults.
    pub fn configure(&mut self, state: &StateMap) {
        let owner = format!("node {}", self.context.id);
        if !persistence::is_readable(state, &owner) {
            return;
        }
        for extension in &mut self.extensions {
            extension.on_configure(&mut self.context, state);
        }
        self.context.request_redraw();
    }

    /// Collects every extension's keys into one versioned blob.
    pub fn serialize(&self) -> StateMap {
        let mut state = StateMap::new();
        for extension in &self.extensions {
            extension.on_serialize(&self.context, &mut state);
        }
        persistence::write_version(&mut state);
        state
    }

    pub fn tick(&mut self, now: Instant) {
        for extension in &mut self.extensions {
            extension.on_tick(&mut self.context, now);
        }
    }

    pub fn draw(&self, canvas: &mut dyn DrawContext, now: Instant) {
        for extension in &self.extensions {
            extension.on_draw(&self.context, canvas, now);
        }
    }

    /// Delivers a pointer event down the chain until one extension
    /// consumes it.
    pub fn pointer(&mut self, input: &PointerInput, now: Instant) -> EventResponse {
        for extension in &mut self.extensions {
            if extension.on_pointer(&mut self.context, input, now).consumed() {
                return EventResponse::Consumed;
            }
        }
        EventResponse::Ignored
    }

    pub fn key(&mut self, input: &KeyInput) -> EventResponse {
        for extension in &mut self.extensions {
            if extension.on_key(&mut self.context, input).consumed() {
                return EventResponse::Consumed;
            }
        }
        EventResponse::Ignored
    }

    fn node_renamed(&mut self, renamed: NodeId, title: &str) {
        for extension in &mut self.extensions {
            extension.on_node_renamed(&mut self.context, renamed, title);
        }
    }

    fn node_removed(&mut self, removed: NodeId) {
        for extension in &mut self.extensions {
            extension.on_node_removed(&mut self.context, removed);
        }
    }

    fn mode_requests(&self) -> Vec<(NodeId, NodeMode)> {
        self.extensions
            .iter()
            .flat_map(|e| e.mode_requests(&self.context))
            .collect()
    }

    /// Largest minimum size requested by any extension.
    pub fn min_size(&self) -> Option<Vec2> {
        self.extensions
            .iter()
            .filter_map(|e| e.min_size(&self.context))
            .reduce(|a, b| a.max(b))
    }

    /// Slot a connection on `slot` should be drawn to, after every
    /// extension has had a say.
    pub fn remap_slot(&self, direction: SlotDirection, slot: usize) -> usize {
        self.extensions
            .iter()
            .fold(slot, |slot, e| e.remap_slot(direction, slot))
    }

    /// Builds the saved form of this node.
    pub fn to_record(&self) -> NodeRecord {
        NodeRecord {
            id: self.context.id,
            node_type: self.context.node_type.clone(),
            title: self.context.title.clone(),
            size: (self.context.size.x, self.context.size.y),
            mode: self.context.mode,
            state: self.serialize(),
        }
    }
}

/// The set of nodes on one canvas.
///
/// Renames and removals go through the graph so every node hears about
/// them through its extensions' notification hooks.
pub struct NodeGraph {
    registry: ExtensionRegistry,
    panels: SharedPanelRegistry,
    nodes: Vec<ExtendedNode>,
    next_id: NodeId,
}

impl NodeGraph {
    pub fn new(registry: ExtensionRegistry, panels: SharedPanelRegistry) -> Self {
        Self {
            registry,
            panels,
            nodes: Vec::new(),
            next_id: 1,
        }
    }

    pub fn panels(&self) -> &SharedPanelRegistry {
        &self.panels
    }

    /// Creates a node of `node_type` with the given slots and widgets.
    ///
    /// `build` fills in the host-side shape of the node before extensions
    /// see it.
    pub fn add(
        &mut self,
        node_type: &str,
        size: Vec2,
        build: impl FnOnce(NodeContext) -> NodeContext,
    ) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        let context = build(NodeContext::new(id, node_type, size));
        let node = self.registry.create_node(context);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&ExtendedNode> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ExtendedNode> {
        self.nodes.iter_mut().find(|n| n.id() == id)
    }

    pub fn nodes(&self) -> &[ExtendedNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [ExtendedNode] {
        &mut self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Renames a node and notifies every node of the change.
    pub fn rename(&mut self, id: NodeId, title: &str) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        if node.context.title == title {
            return true;
        }
        node.context.title = title.to_string();
        log::debug!("node {} renamed to '{}'", id, title);
        for node in &mut self.nodes {
            node.node_renamed(id, title);
        }
        true
    }

    /// Removes a node, releasing any panel slot it held and notifying the
    /// remaining nodes.
    pub fn remove(&mut self, id: NodeId) -> Option<ExtendedNode> {
        let index = self.nodes.iter().position(|n| n.id() == id)?;
        let removed = self.nodes.remove(index);
        // Nodes the removed one was switching off run again.
        for (target, _) in removed.mode_requests() {
            if let Some(node) = self.node_mut(target) {
                node.context.mode = NodeMode::Always;
            }
        }
        let released = self.panels.borrow_mut().release(id);
        if !released.is_empty() {
            log::debug!("node {} released panel slots {:?}", id, released);
        }
        for node in &mut self.nodes {
            node.node_removed(id);
        }
        Some(removed)
    }

    /// Advances every node one frame, then applies the node modes the
    /// extensions asked for.
    pub fn tick(&mut self, now: Instant) {
        for node in &mut self.nodes {
            node.tick(now);
        }
        let requests: Vec<(NodeId, NodeMode)> =
            self.nodes.iter().flat_map(ExtendedNode::mode_requests).collect();
        for (target, mode) in requests {
            if let Some(node) = self.node_mut(target) {
                if node.context.mode != mode {
                    log::debug!("node {} now runs as {:?}", target, mode);
                    node.context.mode = mode;
                    node.context.request_redraw();
                }
            }
        }
    }

    /// Saves every node.
    pub fn to_document(&self) -> GraphDocument {
        let mut document = GraphDocument::new();
        document.nodes = self.nodes.iter().map(ExtendedNode::to_record).collect();
        document
    }

    /// Applies saved state to nodes with matching ids and types.
    ///
    /// Records for nodes that no longer exist are skipped.
    pub fn apply_document(&mut self, document: &GraphDocument) {
        for record in &document.nodes {
            match self.node_mut(record.id) {
                Some(node) if node.context.node_type == record.node_type => {
                    node.context.title = record.title.clone();
                    node.context.size = Vec2::new(record.size.0, record.size.1);
                    node.context.mode = record.mode;
                    node.configure(&record.state);
                }
                _ => log::warn!(
                    "skipping saved node {} ({}): no matching node",
                    record.id,
                    record.node_type
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::hooks::PointerPhase;
    use crate::host::panels::{PanelFamily, PanelRegistry};
    use egui::Pos2;
    use serde_json::Value;
    use std::any::Any;

    /// Records every hook call it receives.
    #[derive(Default)]
    struct Recorder {
        tag: &'static str,
        consume: bool,
        calls: Vec<String>,
    }

    impl NodeExtension for Recorder {
        fn name(&self) -> &str {
            self.tag
        }
        fn on_configure(&mut self, _node: &mut NodeContext, state: &StateMap) {
            self.calls.push(format!("configure:{}", state.len()));
        }
        fn on_serialize(&self, _node: &NodeContext, state: &mut StateMap) {
            state.insert(self.tag.to_string(), Value::Bool(true));
        }
        fn on_pointer(&mut self, _node: &mut NodeContext, input: &PointerInput, _now: Instant) -> EventResponse {
            self.calls.push(format!("{:?}", input.phase));
            if self.consume {
                EventResponse::Consumed
            } else {
                EventResponse::Ignored
            }
        }
        fn on_node_renamed(&mut self, _node: &mut NodeContext, renamed: NodeId, title: &str) {
            self.calls.push(format!("renamed:{}:{}", renamed, title));
        }
        fn on_node_removed(&mut self, _node: &mut NodeContext, removed: NodeId) {
            self.calls.push(format!("removed:{}", removed));
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn graph() -> NodeGraph {
        let mut registry = ExtensionRegistry::new();
        registry.register("Recorder", |_| {
            Some(Box::new(Recorder {
                tag: "first",
                consume: true,
                ..Default::default()
            }))
        });
        registry.register("Recorder", |_| {
            Some(Box::new(Recorder {
                tag: "second",
                ..Default::default()
            }))
        });
        NodeGraph::new(registry, PanelRegistry::shared())
    }

    fn calls(node: &ExtendedNode, tag: &str) -> Vec<String> {
        node.extensions
            .iter()
            .filter_map(|e| e.as_any().downcast_ref::<Recorder>())
            .find(|p| p.tag == tag)
            .map(|p| p.calls.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_pointer_stops_at_consumer() {
        let mut graph = graph();
        let id = graph.add("Recorder", Vec2::new(100.0, 100.0), |c| c);
        let node = graph.node_mut(id).unwrap();
        let response = node.pointer(&PointerInput::down(Pos2::ZERO), Instant::now());
        assert_eq!(response, EventResponse::Consumed);
        assert_eq!(calls(node, "first"), vec![format!("{:?}", PointerPhase::Down)]);
        assert!(calls(node, "second").is_empty());
    }

    #[test]
    fn test_serialize_is_versioned() {
        let mut graph = graph();
        let id = graph.add("Recorder", Vec2::new(100.0, 100.0), |c| c);
        let state = graph.node(id).unwrap().serialize();
        assert_eq!(state.get("stateVersion"), Some(&Value::from(persistence::STATE_VERSION)));
        assert_eq!(state.get("first"), Some(&Value::Bool(true)));
        assert_eq!(state.get("second"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_future_state_is_ignored() {
        let mut graph = graph();
        let id = graph.add("Recorder", Vec2::new(100.0, 100.0), |c| c);
        let node = graph.node_mut(id).unwrap();

        let mut future = StateMap::new();
        future.insert("stateVersion".to_string(), Value::from(99));
        node.configure(&future);
        assert!(calls(node, "first").is_empty());

        let mut legacy = StateMap::new();
        legacy.insert("itemOrder".to_string(), Value::from("0,1"));
        node.configure(&legacy);
        assert_eq!(calls(node, "first"), vec!["configure:1"]);
    }

    #[test]
    fn test_rename_and_remove_broadcast() {
        let mut graph = graph();
        let a = graph.add("Recorder", Vec2::new(100.0, 100.0), |c| c);
        let b = graph.add("Recorder", Vec2::new(100.0, 100.0), |c| c);
        graph.panels().borrow_mut().activate(PanelFamily::ModeConsole, b);

        assert!(graph.rename(b, "Renamed"));
        assert!(!graph.rename(99, "Nope"));
        assert_eq!(calls(graph.node(a).unwrap(), "second"), vec![format!("renamed:{}:Renamed", b)]);

        assert!(graph.remove(b).is_some());
        assert!(graph.remove(b).is_none());
        assert_eq!(graph.panels().borrow().active(PanelFamily::ModeConsole), None);
        assert_eq!(calls(graph.node(a).unwrap(), "second").last().unwrap(), &format!("removed:{}", b));
    }

    #[test]
    fn test_document_round_trip_restores_titles() {
        let mut graph = graph();
        let id = graph.add("Recorder", Vec2::new(100.0, 100.0), |c| c.with_title("Original"));
        let document = graph.to_document();
        graph.rename(id, "Changed");
        graph.apply_document(&document);
        assert_eq!(graph.node(id).unwrap().context.title, "Original");
    }
}
