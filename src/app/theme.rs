//! Theme definitions for the node widgets
//!
//! Provides color constants, styling utilities, and theme configuration
//! for the dark canvas the extensions draw on.

use eframe::egui::{self, Color32, Rounding, Stroke, Vec2};

/// Background colors
pub mod background {
    use super::Color32;

    /// Canvas background
    pub const MAIN: Color32 = Color32::from_rgb(26, 26, 30);

    /// Grid line color - subtle
    pub const GRID: Color32 = Color32::from_rgb(40, 40, 46);

    /// Node body
    pub const NODE: Color32 = Color32::from_rgb(53, 53, 53);

    /// Node title bar
    pub const TITLE: Color32 = Color32::from_rgb(34, 34, 34);

    /// Panel background for side panels
    pub const PANEL: Color32 = Color32::from_rgb(35, 35, 40);
}

/// List item and tag chip colors
pub mod item {
    use super::Color32;

    /// Item at rest
    pub const FILL: Color32 = Color32::from_rgb(30, 30, 30);
    pub const BORDER: Color32 = Color32::from_rgb(51, 51, 51);

    /// Item being dragged
    pub const DRAGGED_FILL: Color32 = Color32::from_rgb(58, 58, 58);

    /// Item in edit mode
    pub const EDITING_FILL: Color32 = Color32::from_rgb(42, 58, 74);

    /// Tag chip at rest
    pub const TAG_FILL: Color32 = Color32::from_rgb(42, 42, 42);
    pub const TAG_BORDER: Color32 = Color32::from_rgb(68, 68, 68);

    /// Tag chip being dragged
    pub const TAG_DRAGGED_FILL: Color32 = Color32::from_rgb(74, 74, 74);

    /// Tag chip in edit mode
    pub const TAG_EDITING_FILL: Color32 = Color32::from_rgb(42, 58, 90);

    /// Glow drawn behind an element right after a drag starts
    pub const GLOW: Color32 = Color32::from_rgba_premultiplied(13, 22, 36, 36);

    /// Image outside the crop box
    pub const SHADE: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 128);
}

/// Toggle row colors
pub mod toggle {
    use super::Color32;

    pub const ON: Color32 = Color32::from_rgb(129, 199, 132);
    pub const OFF: Color32 = Color32::from_rgb(70, 70, 80);
    pub const LOCKED: Color32 = Color32::from_rgb(90, 70, 70);
}

/// Text colors
pub mod text {
    use super::Color32;

    /// Primary text - bright white
    pub const PRIMARY: Color32 = Color32::from_rgb(238, 238, 238);

    /// Secondary text - dimmed
    pub const SECONDARY: Color32 = Color32::from_rgb(136, 136, 136);

    /// Placeholder and disabled text
    pub const DISABLED: Color32 = Color32::from_rgb(102, 102, 102);

    /// Node headings
    pub const HEADING: Color32 = Color32::from_rgb(204, 204, 204);
}

/// UI accent colors
pub mod accent {
    use super::Color32;

    /// Primary accent - blue, used for drag and edit highlights
    pub const PRIMARY: Color32 = Color32::from_rgb(74, 158, 255);

    /// Success/active - green
    pub const SUCCESS: Color32 = Color32::from_rgb(129, 199, 132);

    /// Warning - orange
    pub const WARNING: Color32 = Color32::from_rgb(255, 183, 77);

    /// Error - red
    pub const ERROR: Color32 = Color32::from_rgb(239, 83, 80);
}

/// Grid spacing for the background pattern
pub const GRID_SPACING: f32 = 20.0;

/// Standard rounding for node bodies
pub const ROUNDING: Rounding = Rounding {
    nw: 6.0,
    ne: 6.0,
    sw: 6.0,
    se: 6.0,
};

/// Smaller rounding for compact elements
pub const ROUNDING_SMALL: Rounding = Rounding {
    nw: 4.0,
    ne: 4.0,
    sw: 4.0,
    se: 4.0,
};

/// Stroke for insertion indicators
pub fn insert_stroke(width: f32) -> Stroke {
    Stroke::new(width, accent::PRIMARY)
}

/// Apply the dark theme to an egui context
pub fn apply_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    let visuals = &mut style.visuals;
    visuals.dark_mode = true;

    visuals.window_fill = background::PANEL;
    visuals.window_stroke = Stroke::new(1.0, item::TAG_BORDER);
    visuals.window_rounding = ROUNDING;
    visuals.panel_fill = background::MAIN;

    visuals.widgets.noninteractive.bg_fill = background::NODE;
    visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, text::SECONDARY);
    visuals.widgets.noninteractive.rounding = ROUNDING_SMALL;

    visuals.widgets.inactive.bg_fill = item::TAG_FILL;
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, text::PRIMARY);
    visuals.widgets.inactive.rounding = ROUNDING_SMALL;

    visuals.widgets.hovered.bg_fill = item::TAG_DRAGGED_FILL;
    visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, text::PRIMARY);
    visuals.widgets.hovered.rounding = ROUNDING_SMALL;

    visuals.widgets.active.bg_fill = item::EDITING_FILL;
    visuals.widgets.active.fg_stroke = Stroke::new(1.5, accent::PRIMARY);
    visuals.widgets.active.rounding = ROUNDING_SMALL;

    visuals.selection.bg_fill = accent::PRIMARY.gamma_multiply(0.3);
    visuals.selection.stroke = Stroke::new(1.0, accent::PRIMARY);

    visuals.extreme_bg_color = background::MAIN;

    style.spacing.item_spacing = Vec2::new(8.0, 6.0);
    style.spacing.button_padding = Vec2::new(10.0, 4.0);

    ctx.set_style(style);
}

/// Draw a grid background pattern on a painter
pub fn draw_grid_background(painter: &egui::Painter, rect: egui::Rect) {
    painter.rect_filled(rect, 0.0, background::MAIN);

    let stroke = Stroke::new(1.0, background::GRID);
    let mut x = rect.left() - (rect.left() % GRID_SPACING);
    while x <= rect.right() {
        painter.line_segment([egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())], stroke);
        x += GRID_SPACING;
    }

    let mut y = rect.top() - (rect.top() % GRID_SPACING);
    while y <= rect.bottom() {
        painter.line_segment([egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)], stroke);
        y += GRID_SPACING;
    }
}
