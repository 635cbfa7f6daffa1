//! Single-holder registry for families of panel nodes.
//!
//! At most one node per [`PanelFamily`] is active at a time. Activating a
//! node hands the slot over from the previous holder.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::node::NodeId;

/// A family of panels that share one active slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PanelFamily {
    ModeCollector,
    ModeConsole,
}

#[derive(Debug, Default)]
pub struct PanelRegistry {
    active: HashMap<PanelFamily, NodeId>,
}

/// The registry as shared by every panel node on a canvas.
pub type SharedPanelRegistry = Rc<RefCell<PanelRegistry>>;

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedPanelRegistry {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Makes `node` the active panel of `family`.
    ///
    /// Returns the node that held the slot before, if it was a different one.
    pub fn activate(&mut self, family: PanelFamily, node: NodeId) -> Option<NodeId> {
        let previous = self.active.insert(family, node).filter(|&p| p != node);
        match previous {
            Some(previous) => log::debug!("{:?}: {} replaces {}", family, node, previous),
            None => log::debug!("{:?}: {} activated", family, node),
        }
        previous
    }

    /// Clears the slot if `node` holds it. Returns whether it did.
    pub fn deactivate(&mut self, family: PanelFamily, node: NodeId) -> bool {
        if self.is_active(family, node) {
            self.active.remove(&family);
            log::debug!("{:?}: {} deactivated", family, node);
            true
        } else {
            false
        }
    }

    pub fn active(&self, family: PanelFamily) -> Option<NodeId> {
        self.active.get(&family).copied()
    }

    pub fn is_active(&self, family: PanelFamily, node: NodeId) -> bool {
        self.active(family) == Some(node)
    }

    /// Releases every slot `node` holds, e.g. when it is removed.
    pub fn release(&mut self, node: NodeId) -> Vec<PanelFamily> {
        let released: Vec<PanelFamily> = self
            .active
            .iter()
            .filter(|&(_, &holder)| holder == node)
            .map(|(&family, _)| family)
            .collect();
        for family in &released {
            self.active.remove(family);
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_transfers_slot() {
        let mut registry = PanelRegistry::new();
        assert_eq!(registry.activate(PanelFamily::ModeCollector, 1), None);
        assert_eq!(registry.activate(PanelFamily::ModeCollector, 1), None);
        assert_eq!(registry.activate(PanelFamily::ModeCollector, 2), Some(1));
        assert!(!registry.is_active(PanelFamily::ModeCollector, 1));
        assert!(registry.is_active(PanelFamily::ModeCollector, 2));
    }

    #[test]
    fn test_families_are_independent() {
        let mut registry = PanelRegistry::new();
        registry.activate(PanelFamily::ModeCollector, 1);
        registry.activate(PanelFamily::ModeConsole, 2);
        assert_eq!(registry.active(PanelFamily::ModeCollector), Some(1));
        assert_eq!(registry.active(PanelFamily::ModeConsole), Some(2));
    }

    #[test]
    fn test_deactivate_only_by_holder() {
        let mut registry = PanelRegistry::new();
        registry.activate(PanelFamily::ModeConsole, 3);
        assert!(!registry.deactivate(PanelFamily::ModeConsole, 4));
        assert!(registry.deactivate(PanelFamily::ModeConsole, 3));
        assert_eq!(registry.active(PanelFamily::ModeConsole), None);
    }

    #[test]
    fn test_release_clears_all_families() {
        let mut registry = PanelRegistry::new();
        registry.activate(PanelFamily::ModeCollector, 5);
        registry.activate(PanelFamily::ModeConsole, 5);
        let mut released = registry.release(5);
        released.sort_by_key(|f| *f as u8);
        assert_eq!(released, vec![PanelFamily::ModeCollector, PanelFamily::ModeConsole]);
        assert!(registry.release(5).is_empty());
    }
}
