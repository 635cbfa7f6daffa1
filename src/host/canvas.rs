//! Drawing primitives the host exposes to extensions.
//!
//! Extensions draw in node-local coordinates. [`PainterCanvas`] maps them
//! onto an egui painter; [`RecordingCanvas`] keeps the calls for tests and
//! headless hosts.

use egui::{Align2, Color32, FontId, Pos2, Rect, Stroke, Vec2};

use crate::reorder::{MonospaceMeasure, TextMeasure};

/// Rectangle and text primitives in node-local coordinates.
pub trait DrawContext {
    fn fill_rect(&mut self, rect: Rect, rounding: f32, color: Color32);
    fn stroke_rect(&mut self, rect: Rect, rounding: f32, stroke: Stroke);
    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke);
    fn text(&mut self, pos: Pos2, anchor: Align2, text: &str, size: f32, color: Color32);
    /// Measures text the way [`text`](Self::text) will draw it.
    fn measure(&self) -> &dyn TextMeasure;
}

/// Draws onto an egui painter, offset by the node's screen origin.
pub struct PainterCanvas {
    painter: egui::Painter,
    origin: Vec2,
    measure: EguiMeasure,
}

impl PainterCanvas {
    pub fn new(painter: egui::Painter, origin: Pos2) -> Self {
        let measure = EguiMeasure::new(painter.ctx().clone());
        Self {
            painter,
            origin: origin.to_vec2(),
            measure,
        }
    }

    fn to_screen(&self, pos: Pos2) -> Pos2 {
        pos + self.origin
    }
}

impl DrawContext for PainterCanvas {
    fn fill_rect(&mut self, rect: Rect, rounding: f32, color: Color32) {
        self.painter
            .rect_filled(rect.translate(self.origin), rounding, color);
    }

    fn stroke_rect(&mut self, rect: Rect, rounding: f32, stroke: Stroke) {
        self.painter
            .rect_stroke(rect.translate(self.origin), rounding, stroke);
    }

    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        self.painter
            .line_segment([self.to_screen(from), self.to_screen(to)], stroke);
    }

    fn text(&mut self, pos: Pos2, anchor: Align2, text: &str, size: f32, color: Color32) {
        self.painter.text(
            self.to_screen(pos),
            anchor,
            text,
            FontId::proportional(size),
            color,
        );
    }

    fn measure(&self) -> &dyn TextMeasure {
        &self.measure
    }
}

/// Text measurement backed by egui's font atlas.
#[derive(Clone)]
pub struct EguiMeasure {
    ctx: egui::Context,
}

impl EguiMeasure {
    pub fn new(ctx: egui::Context) -> Self {
        Self { ctx }
    }
}

impl TextMeasure for EguiMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.ctx.fonts(|fonts| {
            fonts
                .layout_no_wrap(text.to_string(), FontId::proportional(font_size), Color32::WHITE)
                .size()
                .x
        })
    }
}

/// One recorded draw call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    FillRect { rect: Rect, color: Color32 },
    StrokeRect { rect: Rect, stroke: Stroke },
    Line { from: Pos2, to: Pos2, stroke: Stroke },
    Text { pos: Pos2, text: String, color: Color32 },
}

/// Records draw calls instead of rendering them.
#[derive(Default)]
pub struct RecordingCanvas {
    pub ops: Vec<DrawOp>,
    measure: MonospaceMeasure,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every text string drawn, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Filled rectangles drawn with `color`.
    pub fn fills_of(&self, color: Color32) -> Vec<Rect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillRect { rect, color: c } if *c == color => Some(*rect),
                _ => None,
            })
            .collect()
    }
}

impl DrawContext for RecordingCanvas {
    fn fill_rect(&mut self, rect: Rect, _rounding: f32, color: Color32) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, _rounding: f32, stroke: Stroke) {
        self.ops.push(DrawOp::StrokeRect { rect, stroke });
    }

    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        self.ops.push(DrawOp::Line { from, to, stroke });
    }

    fn text(&mut self, pos: Pos2, _anchor: Align2, text: &str, _size: f32, color: Color32) {
        self.ops.push(DrawOp::Text {
            pos,
            text: text.to_string(),
            color,
        });
    }

    fn measure(&self) -> &dyn TextMeasure {
        &self.measure
    }
}
