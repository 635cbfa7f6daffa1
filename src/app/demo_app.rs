//! Demo canvas for the node extensions
//!
//! Hosts a [`NodeGraph`] with one node of each built-in type, routes egui
//! pointer and keyboard input to the nodes in node-local coordinates, and
//! saves or loads the whole canvas as JSON.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui::{self, Align, Align2, FontId, Layout, Pos2, Rect, RichText, Stroke, Vec2};

use super::theme;
use crate::constraints::presets;
use crate::extensions::{self, crop_box, draggable_list, mode_panel, slider, CollapseSlots, CropBox};
use crate::host::node::TITLE_HEIGHT;
use crate::host::{
    ExtendedNode, KeyInput, NodeContext, NodeGraph, NodeId, NodeMode, PanelFamily, PanelRegistry, PainterCanvas,
    PointerInput, PointerPhase, SlotDirection, WidgetValue,
};
use crate::persistence;

/// Generic node type used to show slot collapsing.
const SAMPLER_NODE: &str = "KSampler";

/// A connection drawn between two nodes.
#[derive(Clone, Copy, Debug)]
struct Link {
    from: NodeId,
    from_slot: usize,
    to: NodeId,
    to_slot: usize,
}

/// Main application state for the demo canvas
pub struct DemoApp {
    graph: NodeGraph,
    /// Canvas position of each node's top-left corner
    positions: HashMap<NodeId, Pos2>,
    links: Vec<Link>,

    /// Node under the pointer
    hovered: Option<NodeId>,
    /// Node that received the last press and gets every event until release
    captured: Option<NodeId>,
    /// Node that receives keyboard input
    focused: Option<NodeId>,

    save_path: PathBuf,
    status: Option<String>,
    theme_applied: bool,
}

impl Default for DemoApp {
    fn default() -> Self {
        Self::new(PathBuf::from("nodegraph_canvas.json"))
    }
}

impl DemoApp {
    /// Create the demo canvas, saving to and loading from `save_path`
    pub fn new(save_path: PathBuf) -> Self {
        let panels = PanelRegistry::shared();
        let graph = NodeGraph::new(extensions::builtin_registry(panels.clone()), panels);

        let mut app = Self {
            graph,
            positions: HashMap::new(),
            links: Vec::new(),
            hovered: None,
            captured: None,
            focused: None,
            save_path,
            status: None,
            theme_applied: false,
        };
        app.populate();
        app
    }

    fn populate(&mut self) {
        let list = self.spawn(draggable_list::NODE_TYPE, Vec2::new(400.0, 280.0), Pos2::new(40.0, 40.0), |n| {
            n.with_widget("text1", WidgetValue::Text("masterpiece, best quality".into()))
                .with_widget("text2", WidgetValue::Text("portrait, soft light".into()))
                .with_output("STRING")
        });
        let lora = self.spawn(presets::LORA_CONTROLPAD, Vec2::new(260.0, 260.0), Pos2::new(480.0, 40.0), |n| {
            n.with_input("model").with_output("MODEL").with_output("CLIP")
        });
        let sampler = self.spawn(SAMPLER_NODE, Vec2::new(220.0, 140.0), Pos2::new(780.0, 40.0), |n| {
            n.with_input("model")
                .with_input("positive")
                .with_input("negative")
                .with_output("LATENT")
                .with_output("seed")
                .with_output("steps")
        });
        self.spawn(slider::NODE_TYPE, Vec2::new(270.0, 70.0), Pos2::new(480.0, 340.0), |n| n.with_output("INT"));
        self.spawn(mode_panel::MODE_COLLECTOR, Vec2::new(260.0, 180.0), Pos2::new(780.0, 240.0), |n| n);
        self.spawn(mode_panel::MODE_CONSOLE, Vec2::new(260.0, 90.0), Pos2::new(780.0, 460.0), |n| n);
        let image = self.spawn(crop_box::NODE_TYPE, Vec2::new(400.0, 340.0), Pos2::new(40.0, 360.0), |n| {
            n.with_output("IMAGE").with_output("MASK")
        });
        if let Some(node) = self.graph.node_mut(image) {
            node.with_extension(|crop: &mut CropBox, context| {
                crop.set_image(context, "example.png", Vec2::new(1024.0, 768.0));
            });
        }

        self.links.push(Link { from: lora, from_slot: 0, to: sampler, to_slot: 0 });
        self.links.push(Link { from: list, from_slot: 0, to: sampler, to_slot: 1 });
    }

    fn spawn(
        &mut self,
        node_type: &str,
        size: Vec2,
        at: Pos2,
        build: impl FnOnce(NodeContext) -> NodeContext,
    ) -> NodeId {
        let id = self.graph.add(node_type, size, build);
        self.positions.insert(id, at);
        id
    }

    fn position(&self, id: NodeId) -> Pos2 {
        self.positions.get(&id).copied().unwrap_or(Pos2::ZERO)
    }

    /// Topmost node containing the canvas point `pos`
    fn node_at(&self, pos: Pos2) -> Option<NodeId> {
        self.graph
            .nodes()
            .iter()
            .rev()
            .find(|node| Rect::from_min_size(self.position(node.id()), node.context.size).contains(pos))
            .map(ExtendedNode::id)
    }

    fn send_pointer(&mut self, id: NodeId, phase: PointerPhase, canvas_pos: Pos2, modifiers: egui::Modifiers, now: Instant) {
        let local = canvas_pos - self.position(id).to_vec2();
        let input = PointerInput::new(phase, local).with_modifiers(modifiers);
        if let Some(node) = self.graph.node_mut(id) {
            node.pointer(&input, now);
        }
    }

    /// Translate this frame's pointer state into node events
    fn route_pointer(&mut self, ui: &egui::Ui, origin: Pos2, now: Instant) {
        let (pos, pressed, released, moved, modifiers) = ui.input(|i| {
            (
                i.pointer.hover_pos(),
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.delta() != Vec2::ZERO,
                i.modifiers,
            )
        });

        let Some(pos) = pos.map(|p| p - origin.to_vec2()) else {
            // Pointer left the window.
            for id in self.captured.take().into_iter().chain(self.hovered.take()) {
                self.send_pointer(id, PointerPhase::Leave, Pos2::ZERO, modifiers, now);
            }
            return;
        };

        let hovered = self.node_at(pos);
        if hovered != self.hovered {
            if let Some(old) = self.hovered.filter(|old| Some(*old) != self.captured) {
                self.send_pointer(old, PointerPhase::Leave, pos, modifiers, now);
            }
            self.hovered = hovered;
        }

        if pressed {
            // A press elsewhere ends whatever the old focus was editing.
            if let Some(old) = self.focused.filter(|old| Some(*old) != hovered) {
                self.send_pointer(old, PointerPhase::Down, pos, modifiers, now);
            }
            self.focused = hovered;
            self.captured = hovered;
            if let Some(id) = hovered {
                self.send_pointer(id, PointerPhase::Down, pos, modifiers, now);
            }
        }
        if moved {
            if let Some(id) = self.captured.or(hovered) {
                self.send_pointer(id, PointerPhase::Move, pos, modifiers, now);
            }
        }
        if released {
            if let Some(id) = self.captured.take() {
                self.send_pointer(id, PointerPhase::Up, pos, modifiers, now);
            }
        }
    }

    /// Forward typed text and key presses to the focused node
    fn route_keys(&mut self, ui: &egui::Ui) {
        let Some(node) = self.focused.and_then(|id| self.graph.node_mut(id)) else {
            return;
        };
        let events = ui.input(|i| i.events.clone());
        for event in events {
            let input = match event {
                egui::Event::Text(text) => KeyInput::Text(text),
                egui::Event::Key { key, pressed: true, modifiers, .. } => KeyInput::Key { key, modifiers },
                _ => continue,
            };
            node.key(&input);
        }
    }

    fn save(&mut self) {
        let document = self.graph.to_document();
        self.status = Some(match persistence::save_to_file(&document, &self.save_path) {
            Ok(()) => {
                log::info!("saved {} node(s) to {}", document.nodes.len(), self.save_path.display());
                format!("Saved to {}", self.save_path.display())
            }
            Err(e) => {
                log::error!("save failed: {}", e);
                format!("Save failed: {}", e)
            }
        });
    }

    fn load(&mut self) {
        self.status = Some(match persistence::load_from_file(&self.save_path) {
            Ok(document) => {
                self.graph.apply_document(&document);
                log::info!("loaded {} node(s) from {}", document.nodes.len(), self.save_path.display());
                format!("Loaded {}", self.save_path.display())
            }
            Err(e) => {
                log::error!("load failed: {}", e);
                format!("Load failed: {}", e)
            }
        });
    }

    /// Draw the top toolbar
    fn draw_toolbar(&mut self, ui: &mut egui::Ui) -> ToolbarActions {
        let mut actions = ToolbarActions::default();

        ui.horizontal(|ui| {
            ui.add_space(8.0);
            ui.label(RichText::new("NODE WIDGETS").size(18.0).color(theme::text::PRIMARY).strong());

            ui.add_space(20.0);
            ui.separator();
            ui.add_space(20.0);

            if ui.button("Save").clicked() {
                actions.save = true;
            }
            if ui.button("Load").clicked() {
                actions.load = true;
            }

            ui.add_space(20.0);
            ui.separator();
            ui.add_space(20.0);

            let focused = self.focused.and_then(|id| self.graph.node(id));
            if let Some(node) = focused {
                ui.label(RichText::new(&node.context.title).color(theme::text::SECONDARY));
                if let Some(collapse) = node.extension::<CollapseSlots>() {
                    if ui.button(collapse.menu_label()).clicked() {
                        actions.toggle_collapse = Some(node.id());
                    }
                }
                for (family, label) in [
                    (PanelFamily::ModeCollector, "Add to collector"),
                    (PanelFamily::ModeConsole, "Send to console"),
                ] {
                    let active = self.graph.panels().borrow().active(family);
                    let enabled = active.is_some_and(|panel| panel != node.id());
                    if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                        actions.collect = Some((family, node.id()));
                    }
                }
            }
        });

        actions
    }

    fn draw_node(&self, painter: &egui::Painter, node: &ExtendedNode, origin: Pos2, now: Instant) {
        let min = origin + self.position(node.id()).to_vec2();
        let context = &node.context;
        let rect = Rect::from_min_size(min, context.size);

        painter.rect_filled(rect, theme::ROUNDING, theme::background::NODE);
        let title = Rect::from_min_size(min, Vec2::new(context.size.x, TITLE_HEIGHT));
        painter.rect_filled(title, theme::ROUNDING, theme::background::TITLE);
        painter.text(
            title.left_center() + Vec2::new(8.0, 0.0),
            Align2::LEFT_CENTER,
            &context.title,
            FontId::proportional(13.0),
            theme::text::HEADING,
        );

        for direction in [SlotDirection::Input, SlotDirection::Output] {
            let visible = context.slots(direction).iter().filter(|s| !s.hidden);
            for (row, slot) in visible.enumerate() {
                let at = min + context.slot_position(direction, row).to_vec2();
                painter.circle_filled(at, 4.0, theme::accent::PRIMARY);
                let (anchor, offset) = match direction {
                    SlotDirection::Input => (Align2::LEFT_CENTER, 8.0),
                    SlotDirection::Output => (Align2::RIGHT_CENTER, -8.0),
                };
                painter.text(at + Vec2::new(offset, 0.0), anchor, &slot.label, FontId::proportional(11.0), theme::text::SECONDARY);
            }
        }

        let mut canvas = PainterCanvas::new(painter.clone(), min);
        node.draw(&mut canvas, now);

        if context.mode != NodeMode::Always {
            painter.rect_filled(rect, theme::ROUNDING, theme::background::MAIN.gamma_multiply(0.6));
            painter.text(
                title.right_center() - Vec2::new(8.0, 0.0),
                Align2::RIGHT_CENTER,
                format!("{:?}", context.mode),
                FontId::proportional(11.0),
                theme::accent::WARNING,
            );
        }

        let border = if self.focused == Some(node.id()) {
            Stroke::new(2.0, theme::accent::PRIMARY)
        } else {
            Stroke::new(1.0, theme::item::BORDER)
        };
        painter.rect_stroke(rect, theme::ROUNDING, border);
    }

    fn draw_links(&self, painter: &egui::Painter, origin: Pos2) {
        for link in &self.links {
            let (Some(from), Some(to)) = (self.graph.node(link.from), self.graph.node(link.to)) else {
                continue;
            };
            // Collapsed nodes route hidden slots to their first row.
            let from_slot = from.remap_slot(SlotDirection::Output, link.from_slot);
            let to_slot = to.remap_slot(SlotDirection::Input, link.to_slot);
            let start = origin
                + self.position(link.from).to_vec2()
                + from.context.slot_position(SlotDirection::Output, from_slot).to_vec2();
            let end = origin
                + self.position(link.to).to_vec2()
                + to.context.slot_position(SlotDirection::Input, to_slot).to_vec2();
            painter.line_segment([start, end], Stroke::new(2.0, theme::text::DISABLED));
        }
    }

    /// Draw the canvas and deliver input to the nodes on it
    fn draw_main_area(&mut self, ui: &mut egui::Ui, now: Instant) {
        let rect = ui.available_rect_before_wrap();
        ui.allocate_rect(rect, egui::Sense::hover());

        self.route_pointer(ui, rect.min, now);
        self.route_keys(ui);

        let painter = ui.painter_at(rect);
        theme::draw_grid_background(&painter, rect);
        self.draw_links(&painter, rect.min);
        for node in self.graph.nodes() {
            self.draw_node(&painter, node, rect.min, now);
        }
    }

    /// Draw the bottom status bar
    fn draw_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.add_space(8.0);
            let status = self.status.as_deref().unwrap_or("Ready");
            ui.label(RichText::new(status).color(theme::text::SECONDARY).small());

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(RichText::new(format!("{} node(s)", self.graph.len())).color(theme::text::DISABLED).small());
            });
        });
    }

    /// Advance every node and keep sizes at or above what the extensions need
    fn tick(&mut self, now: Instant) -> bool {
        self.graph.tick(now);
        let mut redraw = false;
        for node in self.graph.nodes_mut() {
            if let Some(min) = node.min_size() {
                node.context.size = node.context.size.max(min);
            }
            redraw |= node.context.take_redraw();
        }
        redraw
    }
}

/// Actions collected from the toolbar for deferred execution
#[derive(Default)]
struct ToolbarActions {
    save: bool,
    load: bool,
    toggle_collapse: Option<NodeId>,
    collect: Option<(PanelFamily, NodeId)>,
}

impl eframe::App for DemoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            theme::apply_theme(ctx);
            self.theme_applied = true;
        }

        let now = Instant::now();
        if self.tick(now) {
            ctx.request_repaint();
        }
        // Hold timers and the drop glow expire without input.
        ctx.request_repaint_after(Duration::from_millis(100));

        let actions = egui::TopBottomPanel::top("toolbar")
            .frame(egui::Frame::none().fill(theme::background::PANEL).inner_margin(egui::Margin::symmetric(0.0, 8.0)))
            .show(ctx, |ui| self.draw_toolbar(ui))
            .inner;

        egui::TopBottomPanel::bottom("status_bar")
            .frame(egui::Frame::none().fill(theme::background::PANEL).inner_margin(egui::Margin::symmetric(0.0, 4.0)))
            .show(ctx, |ui| self.draw_status_bar(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.draw_main_area(ui, now));

        if actions.save {
            self.save();
        }
        if actions.load {
            self.load();
        }
        if let Some(id) = actions.toggle_collapse {
            if let Some(node) = self.graph.node_mut(id) {
                node.with_extension(|collapse: &mut CollapseSlots, context| collapse.toggle(context));
            }
        }
        if let Some((family, target)) = actions.collect {
            if !mode_panel::collect_into_active(&mut self.graph, family, target) {
                self.status = Some("Node is already collected or the panel is full".to_string());
            }
        }
    }
}
