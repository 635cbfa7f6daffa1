//! Extension registry.
//!
//! Maps node types to the extensions that should be attached to them,
//! so the host can build the extension chain for any node it creates.

use std::collections::{HashMap, HashSet};

use super::graph::ExtendedNode;
use super::hooks::NodeExtension;
use super::node::NodeContext;

/// Builds an extension for a node, or declines with `None`.
pub type ExtensionFactory = Box<dyn Fn(&NodeContext) -> Option<Box<dyn NodeExtension>>>;

struct GlobalEntry {
    factory: ExtensionFactory,
    blacklist: HashSet<String>,
}

/// Catalog of extension factories keyed by node type.
///
/// Type-specific factories run first, in registration order, followed by
/// global factories that apply to every node type not on their blacklist.
///
/// # Example
///
/// ```ignore
/// let mut registry = ExtensionRegistry::new();
/// registry.register("A1r Draggable List", |_| Some(Box::new(DraggableList::default())));
/// registry.register_global(|_| Some(Box::new(CollapseSlots::new())), ["A1r Preview"]);
///
/// let node = registry.create_node(NodeContext::new(1, "A1r Draggable List", size));
/// ```
#[derive(Default)]
pub struct ExtensionRegistry {
    by_type: HashMap<String, Vec<ExtensionFactory>>,
    global: Vec<GlobalEntry>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for one node type.
    pub fn register<F>(&mut self, node_type: impl Into<String>, factory: F)
    where
        F: Fn(&NodeContext) -> Option<Box<dyn NodeExtension>> + 'static,
    {
        self.by_type
            .entry(node_type.into())
            .or_default()
            .push(Box::new(factory));
    }

    /// Registers a factory for every node type except those in `blacklist`.
    pub fn register_global<F, I, S>(&mut self, factory: F, blacklist: I)
    where
        F: Fn(&NodeContext) -> Option<Box<dyn NodeExtension>> + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global.push(GlobalEntry {
            factory: Box::new(factory),
            blacklist: blacklist.into_iter().map(Into::into).collect(),
        });
    }

    /// Builds the extension chain for `node`.
    pub fn extensions_for(&self, node: &NodeContext) -> Vec<Box<dyn NodeExtension>> {
        let specific = self
            .by_type
            .get(&node.node_type)
            .into_iter()
            .flatten()
            .filter_map(|factory| factory(node));
        let global = self
            .global
            .iter()
            .filter(|entry| !entry.blacklist.contains(&node.node_type))
            .filter_map(|entry| (entry.factory)(node));
        specific.chain(global).collect()
    }

    /// Builds a node with its extension chain attached and created.
    pub fn create_node(&self, context: NodeContext) -> ExtendedNode {
        let extensions = self.extensions_for(&context);
        ExtendedNode::new(context, extensions)
    }

    /// Node types with type-specific factories.
    pub fn node_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.by_type.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Checks if any type-specific factory is registered for `node_type`.
    pub fn contains(&self, node_type: &str) -> bool {
        self.by_type.contains_key(node_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::hooks::NodeExtension;
    use egui::Vec2;
    use std::any::Any;

    struct Named(&'static str);

    impl NodeExtension for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn names(registry: &ExtensionRegistry, node_type: &str) -> Vec<String> {
        let node = NodeContext::new(1, node_type, Vec2::new(100.0, 100.0));
        registry
            .extensions_for(&node)
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    #[test]
    fn test_specific_before_global() {
        let mut registry = ExtensionRegistry::new();
        registry.register_global(|_| Some(Box::new(Named("global"))), ["Skip"]);
        registry.register("List", |_| Some(Box::new(Named("first"))));
        registry.register("List", |_| Some(Box::new(Named("second"))));

        assert_eq!(names(&registry, "List"), vec!["first", "second", "global"]);
        assert_eq!(names(&registry, "Other"), vec!["global"]);
        assert!(names(&registry, "Skip").is_empty());
    }

    #[test]
    fn test_declining_factory() {
        let mut registry = ExtensionRegistry::new();
        registry.register("List", |_| None);
        assert!(names(&registry, "List").is_empty());
        assert!(registry.contains("List"));
        assert_eq!(registry.node_types(), vec!["List"]);
    }
}
