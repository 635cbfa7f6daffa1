//! Horizontal slider drawn across a whole node.
//!
//! Clicking or dragging on the track sets the value, snapped to the step
//! (a fifth of the step while Shift is held). The thumb does not jump: it
//! closes half the remaining distance to the value on every redraw tick.

use std::time::Instant;

use egui::{Align2, Pos2, Rect, Stroke, Vec2};
use serde_json::Value;

use crate::app::theme;
use crate::gesture::{Gesture, GestureClassifier, GestureConfig, SmoothedPosition};
use crate::host::node::TITLE_HEIGHT;
use crate::host::{
    DrawContext, EventResponse, NodeContext, NodeExtension, PointerInput, PointerPhase, WidgetValue,
};
use crate::persistence::{state, StateMap};

pub const NODE_TYPE: &str = "A1r Slider Custom";

/// Host widget and state key holding the value.
pub const VALUE_WIDGET: &str = "value";

/// Smallest step Shift can refine to.
pub const MIN_FINE_STEP: f32 = 0.01;

/// Configuration for a [`SliderTrack`].
#[derive(Clone, Debug, PartialEq)]
pub struct SliderConfig {
    pub min: f32,
    pub max: f32,
    /// Grid the value snaps to.
    pub step: f32,
    /// Decimal places kept in the value.
    pub decimals: u32,
    /// Value restored by a double-click.
    pub default: f32,
    /// Space left of the track.
    pub inset_left: f32,
    /// Space right of the track, where the value is printed.
    pub inset_right: f32,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self::percent()
    }
}

impl SliderConfig {
    /// Whole numbers from 0 to 100.
    pub fn percent() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
            step: 1.0,
            decimals: 0,
            default: 20.0,
            inset_left: 10.0,
            inset_right: 60.0,
        }
    }

    /// Two-decimal values from 0 to 1, e.g. a denoise strength.
    pub fn unit() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            step: 0.01,
            decimals: 2,
            default: 1.0,
            ..Self::percent()
        }
    }

    /// Set the range. An empty range is widened by one step.
    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = if max > min { max } else { min + self.step };
        self.default = self.default.clamp(self.min, self.max);
        self
    }

    /// Set the step. Non-positive steps fall back to 1.
    pub fn with_step(mut self, step: f32) -> Self {
        self.step = if step > 0.0 { step } else { 1.0 };
        self
    }

    pub fn with_default(mut self, default: f32) -> Self {
        self.default = default.clamp(self.min, self.max);
        self
    }

    /// Step used while Shift is held.
    pub fn fine_step(&self) -> f32 {
        (self.step / 5.0).max(MIN_FINE_STEP)
    }

    fn span(&self) -> f32 {
        self.max - self.min
    }

    fn round(&self, value: f32) -> f32 {
        let scale = 10f32.powi(self.decimals as i32);
        (value * scale).round() / scale
    }

    /// Snaps `value` to the step grid (or the fine grid) and clamps it.
    pub fn snap(&self, value: f32, fine: bool) -> f32 {
        let step = if fine { self.fine_step() } else { self.step };
        let snapped = self.min + ((value - self.min) / step).round() * step;
        self.round(snapped.clamp(self.min, self.max))
    }

    /// Thumb position of `value` in percent of the track.
    pub fn percent_of(&self, value: f32) -> f32 {
        ((value - self.min) / self.span()).clamp(0.0, 1.0) * 100.0
    }
}

pub struct SliderTrack {
    config: SliderConfig,
    value: f32,
    /// Displayed thumb position, in percent of the track.
    thumb: SmoothedPosition,
    gestures: GestureClassifier<()>,
}

impl Default for SliderTrack {
    fn default() -> Self {
        Self::new(SliderConfig::default())
    }
}

impl SliderTrack {
    pub fn new(config: SliderConfig) -> Self {
        let value = config.default;
        let thumb = SmoothedPosition::new(config.percent_of(value));
        Self {
            config,
            value,
            thumb,
            gestures: GestureClassifier::new(GestureConfig::widget()),
        }
    }

    pub fn config(&self) -> &SliderConfig {
        &self.config
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Where the thumb is drawn right now, in percent of the track.
    pub fn thumb_percent(&self) -> f32 {
        self.thumb.current()
    }

    pub fn is_animating(&self) -> bool {
        self.thumb.is_smoothing()
    }

    /// Sets the value and starts the thumb moving toward it.
    pub fn set_value(&mut self, node: &mut NodeContext, value: f32) {
        let value = self.config.round(value.clamp(self.config.min, self.config.max));
        self.thumb.set_target(self.config.percent_of(value));
        if value != self.value {
            self.value = value;
            node.set_widget_value(VALUE_WIDGET, WidgetValue::Number(f64::from(value)));
            node.request_redraw();
        }
    }

    fn set_immediate(&mut self, node: &mut NodeContext, value: f32) {
        self.set_value(node, value);
        self.thumb.set_immediate(self.config.percent_of(self.value));
    }

    fn track_rect(&self, node: &NodeContext) -> Rect {
        let center_y = TITLE_HEIGHT + (node.size.y - TITLE_HEIGHT).max(0.0) / 2.0;
        let right = (node.size.x - self.config.inset_right).max(self.config.inset_left);
        Rect::from_min_max(
            Pos2::new(self.config.inset_left, center_y - 3.0),
            Pos2::new(right, center_y + 3.0),
        )
    }

    fn hit(&self, node: &NodeContext, pos: Pos2) -> bool {
        let track = self.track_rect(node);
        pos.x >= track.min.x - 5.0
            && pos.x <= track.max.x + 5.0
            && pos.y >= TITLE_HEIGHT
            && pos.y <= node.size.y
    }

    /// Value under the pointer at local x, snapped.
    pub fn value_at(&self, node: &NodeContext, x: f32, fine: bool) -> f32 {
        let track = self.track_rect(node);
        let t = if track.width() > 0.0 {
            ((x - track.min.x) / track.width()).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.config.snap(self.config.min + t * self.config.span(), fine)
    }

    fn drag_to(&mut self, node: &mut NodeContext, input: &PointerInput) {
        let value = self.value_at(node, input.pos.x, input.modifiers.shift);
        self.set_value(node, value);
    }
}

impl NodeExtension for SliderTrack {
    fn name(&self) -> &str {
        "slider"
    }

    fn on_create(&mut self, node: &mut NodeContext) {
        node.add_widget(VALUE_WIDGET, WidgetValue::Number(f64::from(self.value)));
        if let Some(widget) = node.widget_mut(VALUE_WIDGET) {
            widget.hidden = true;
        }
        let stored = node
            .widget(VALUE_WIDGET)
            .and_then(|w| w.value.as_number())
            .map(|v| v as f32);
        if let Some(value) = stored {
            self.set_immediate(node, value);
        }
        // The slider draws over the output label.
        if let Some(output) = node.outputs.first_mut() {
            output.label.clear();
        }
    }

    fn on_configure(&mut self, node: &mut NodeContext, saved: &StateMap) {
        match state::read_f32(saved, VALUE_WIDGET) {
            Ok(Some(value)) if value.is_finite() => self.set_immediate(node, value),
            Ok(Some(_)) | Ok(None) => {}
            Err(err) => log::warn!("slider {}: {}", node.id, err),
        }
        self.gestures.reset();
    }

    fn on_serialize(&self, _node: &NodeContext, saved: &mut StateMap) {
        saved.insert(VALUE_WIDGET.to_string(), Value::from(f64::from(self.value)));
    }

    fn on_tick(&mut self, node: &mut NodeContext, _now: Instant) {
        // The host may have typed a value into the widget.
        let widget = node
            .widget(VALUE_WIDGET)
            .and_then(|w| w.value.as_number())
            .map(|v| v as f32);
        if let Some(value) = widget.filter(|v| v.is_finite() && *v != self.value) {
            self.set_value(node, value);
        }
        if self.thumb.is_smoothing() {
            self.thumb.advance();
            node.request_redraw();
        }
    }

    fn on_draw(&self, node: &NodeContext, canvas: &mut dyn DrawContext, _now: Instant) {
        let track = self.track_rect(node);
        canvas.fill_rect(track, 3.0, theme::item::FILL);
        canvas.stroke_rect(track, 3.0, Stroke::new(1.0, theme::item::BORDER));

        for tick in 0..=10 {
            let x = track.min.x + track.width() * tick as f32 / 10.0;
            let half = if tick % 5 == 0 { 6.0 } else { 4.0 };
            canvas.line(
                Pos2::new(x, track.center().y - half),
                Pos2::new(x, track.center().y + half),
                Stroke::new(1.0, theme::text::DISABLED),
            );
        }

        let thumb_x = track.min.x + track.width() * self.thumb.current() / 100.0;
        let filled = Rect::from_min_max(track.min, Pos2::new(thumb_x, track.max.y));
        canvas.fill_rect(filled, 3.0, theme::accent::PRIMARY);
        canvas.fill_rect(
            Rect::from_center_size(Pos2::new(thumb_x, track.center().y), Vec2::new(10.0, 18.0)),
            3.0,
            theme::text::PRIMARY,
        );

        let label = format!("{:.*}", self.config.decimals as usize, self.value);
        canvas.text(
            Pos2::new(node.size.x - self.config.inset_right + 24.0, track.center().y),
            Align2::CENTER_CENTER,
            &label,
            12.0,
            theme::text::PRIMARY,
        );
    }

    fn on_pointer(&mut self, node: &mut NodeContext, input: &PointerInput, now: Instant) -> EventResponse {
        match input.phase {
            PointerPhase::Down => {
                if !self.hit(node, input.pos) {
                    return EventResponse::Ignored;
                }
                match self.gestures.pointer_down(input.pos, Some(()), now) {
                    Some(Gesture::DoubleClick(())) => {
                        let default = self.config.default;
                        self.set_value(node, default);
                    }
                    _ => self.drag_to(node, input),
                }
                EventResponse::Consumed
            }
            PointerPhase::Move => {
                if !self.gestures.wants_pointer() {
                    return EventResponse::Ignored;
                }
                if let Some(Gesture::DragStart { .. } | Gesture::DragMove(_)) =
                    self.gestures.pointer_move(input.pos, now)
                {
                    self.drag_to(node, input);
                }
                EventResponse::Consumed
            }
            PointerPhase::Up => match self.gestures.pointer_up(input.pos) {
                Some(_) => EventResponse::Consumed,
                None => EventResponse::Ignored,
            },
            PointerPhase::Leave => {
                self.gestures.pointer_leave();
                EventResponse::Ignored
            }
        }
    }

    fn min_size(&self, _node: &NodeContext) -> Option<Vec2> {
        Some(Vec2::new(
            self.config.inset_left + self.config.inset_right + 80.0,
            TITLE_HEIGHT + 30.0,
        ))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
