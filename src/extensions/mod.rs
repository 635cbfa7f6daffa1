//! Extensions module
//!
//! The node behaviours shipped with the crate: the draggable tag list,
//! constraint toggle panels, mode collector/console panels, the custom
//! slider, the image crop box and the global slot-collapse toggle.

pub mod collapse_slots;
pub mod crop_box;
pub mod draggable_list;
pub mod edit;
pub mod mode_panel;
pub mod slider;
pub mod toggle_panel;

pub use collapse_slots::CollapseSlots;
pub use crop_box::{AspectRatio, CropBox, CropModel, CropRect};
pub use draggable_list::{DraggableList, ListTarget};
pub use edit::{EditOutcome, EditSession};
pub use mode_panel::{collect_into_active, ModePanel, PanelEntry};
pub use slider::{SliderConfig, SliderTrack};
pub use toggle_panel::TogglePanel;

use crate::constraints::presets;
use crate::host::{ExtensionRegistry, NodeExtension, SharedPanelRegistry};

/// Node types that keep all their slots visible.
pub const COLLAPSE_BLACKLIST: [&str; 4] = [
    draggable_list::NODE_TYPE,
    mode_panel::MODE_COLLECTOR,
    mode_panel::MODE_CONSOLE,
    slider::NODE_TYPE,
];

/// Registry with every built-in extension attached to its node types.
///
/// Mode panels share `panels`, so at most one collector and one console
/// are active across the whole canvas.
pub fn builtin_registry(panels: SharedPanelRegistry) -> ExtensionRegistry {
    let mut registry = ExtensionRegistry::new();

    registry.register(draggable_list::NODE_TYPE, |_| {
        Some(Box::new(DraggableList::default()))
    });

    for node_type in presets::NODE_TYPES {
        registry.register(node_type, |node| {
            TogglePanel::for_node_type(&node.node_type).map(|panel| Box::new(panel) as Box<dyn NodeExtension>)
        });
    }

    let collector_panels = panels.clone();
    registry.register(mode_panel::MODE_COLLECTOR, move |_| {
        Some(Box::new(ModePanel::collector(collector_panels.clone())))
    });
    registry.register(mode_panel::MODE_CONSOLE, move |_| {
        Some(Box::new(ModePanel::console(panels.clone())))
    });

    registry.register(slider::NODE_TYPE, |_| {
        Some(Box::new(SliderTrack::default()))
    });

    registry.register(crop_box::NODE_TYPE, |_| {
        Some(Box::new(CropBox::default()))
    });

    registry.register_global(
        |_| Some(Box::new(CollapseSlots::new())),
        COLLAPSE_BLACKLIST,
    );

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{NodeContext, PanelRegistry};
    use egui::Vec2;

    fn chain(registry: &ExtensionRegistry, node_type: &str) -> Vec<String> {
        let node = NodeContext::new(1, node_type, Vec2::new(300.0, 200.0));
        registry
            .extensions_for(&node)
            .iter()
            .map(|ext| ext.name().to_string())
            .collect()
    }

    #[test]
    fn test_builtin_chains() {
        let registry = builtin_registry(PanelRegistry::shared());
        assert_eq!(chain(&registry, draggable_list::NODE_TYPE), vec!["draggable_list"]);
        assert_eq!(chain(&registry, slider::NODE_TYPE), vec!["slider"]);
        assert_eq!(
            chain(&registry, presets::LORA_CONTROLPAD),
            vec!["toggle_panel", "collapse_slots"]
        );
        assert_eq!(chain(&registry, crop_box::NODE_TYPE), vec!["crop_box", "collapse_slots"]);
        assert_eq!(chain(&registry, "KSampler"), vec!["collapse_slots"]);
    }

    #[test]
    fn test_mode_panels_share_registry() {
        let panels = PanelRegistry::shared();
        let registry = builtin_registry(panels.clone());
        assert_eq!(chain(&registry, mode_panel::MODE_COLLECTOR), vec!["mode_panel"]);
        assert_eq!(chain(&registry, mode_panel::MODE_CONSOLE), vec!["mode_panel"]);
    }
}
