//! Crop box drawn over an image preview.
//!
//! The box is kept in image pixels. Dragging inside it moves it, dragging
//! one of the eight handles resizes it from that side or corner, and the
//! box never leaves the image or shrinks below [`MIN_CROP_SIZE`]. With an
//! aspect ratio locked, edge handles grow the other dimension around the
//! box centre and corner handles follow whichever axis moved more.
//!
//! Clicking the footer cycles the aspect presets; double-clicking the box
//! resets it to the whole image. The committed crop is written to the
//! hidden `crop_data` widget as JSON in whole pixels.

use std::fmt;
use std::time::Instant;

use egui::{Align2, Pos2, Rect, Stroke, Vec2};
use serde::{Deserialize, Serialize};

use crate::app::theme;
use crate::gesture::{Gesture, GestureClassifier, GestureConfig};
use crate::host::node::{SLOT_ROW_HEIGHT, TITLE_HEIGHT};
use crate::host::{
    DrawContext, EventResponse, NodeContext, NodeExtension, PointerInput, PointerPhase, WidgetValue,
};
use crate::persistence::state::{self, KEY_CROP_DATA};
use crate::persistence::StateMap;

pub const NODE_TYPE: &str = "A1r Load Image";

/// Host widget naming the loaded image.
pub const IMAGE_WIDGET: &str = "image";

/// Hidden widget the committed crop is written to.
pub const CROP_WIDGET: &str = "crop_data";

/// Smallest crop, in image pixels, on either axis.
pub const MIN_CROP_SIZE: f32 = 20.0;

/// Image size assumed until the host reports one.
pub const DEFAULT_IMAGE_SIZE: Vec2 = Vec2::new(512.0, 512.0);

const INSET: f32 = 8.0;
const FOOTER_HEIGHT: f32 = 20.0;
const HANDLE_SIZE: f32 = 10.0;

/// Crop rectangle in image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// The whole image.
    pub fn full(bounds: Vec2) -> Self {
        Self::new(0.0, 0.0, bounds.x, bounds.y)
    }

    fn from_edges(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Pos2 {
        Pos2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Same size, moved the least distance needed to lie inside `bounds`.
    fn shifted_into(self, bounds: Vec2) -> Self {
        Self {
            x: self.x.min(bounds.x - self.width).max(0.0),
            y: self.y.min(bounds.y - self.height).max(0.0),
            ..self
        }
    }

    /// Rounded to whole pixels.
    pub fn to_pixels(&self) -> serde_json::Value {
        serde_json::json!({
            "x": self.x.round() as i64,
            "y": self.y.round() as i64,
            "width": self.width.round() as i64,
            "height": self.height.round() as i64,
        })
    }
}

/// Handle position on the crop box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::NW,
        Direction::N,
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
    ];

    fn moves_left(self) -> bool {
        matches!(self, Direction::W | Direction::NW | Direction::SW)
    }

    fn moves_right(self) -> bool {
        matches!(self, Direction::E | Direction::NE | Direction::SE)
    }

    fn moves_top(self) -> bool {
        matches!(self, Direction::N | Direction::NW | Direction::NE)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Direction::S | Direction::SW | Direction::SE)
    }

    /// Where this handle sits on `rect`.
    pub fn anchor(self, rect: Rect) -> Pos2 {
        let x = if self.moves_left() {
            rect.min.x
        } else if self.moves_right() {
            rect.max.x
        } else {
            rect.center().x
        };
        let y = if self.moves_top() {
            rect.min.y
        } else if self.moves_bottom() {
            rect.max.y
        } else {
            rect.center().y
        };
        Pos2::new(x, y)
    }
}

/// Width-to-height lock of the crop box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AspectRatio {
    #[default]
    Free,
    Fixed(u32, u32),
}

impl AspectRatio {
    /// Presets offered by the footer, in cycling order.
    pub const PRESETS: [AspectRatio; 8] = [
        AspectRatio::Free,
        AspectRatio::Fixed(1, 1),
        AspectRatio::Fixed(4, 3),
        AspectRatio::Fixed(3, 4),
        AspectRatio::Fixed(16, 9),
        AspectRatio::Fixed(9, 16),
        AspectRatio::Fixed(3, 2),
        AspectRatio::Fixed(2, 3),
    ];

    /// Width divided by height; `None` when free.
    pub fn ratio(self) -> Option<f32> {
        match self {
            AspectRatio::Fixed(w, h) if w > 0 && h > 0 => Some(w as f32 / h as f32),
            _ => None,
        }
    }

    /// The preset after this one.
    pub fn next(self) -> Self {
        let index = Self::PRESETS
            .iter()
            .position(|p| *p == self)
            .map_or(0, |i| (i + 1) % Self::PRESETS.len());
        Self::PRESETS[index]
    }

    /// Parses `free` or `W:H`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("free") {
            return Some(AspectRatio::Free);
        }
        let (w, h) = text.split_once(':')?;
        let w: u32 = w.trim().parse().ok()?;
        let h: u32 = h.trim().parse().ok()?;
        (w > 0 && h > 0).then_some(AspectRatio::Fixed(w, h))
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectRatio::Free => f.write_str("free"),
            AspectRatio::Fixed(w, h) => write!(f, "{}:{}", w, h),
        }
    }
}

impl From<AspectRatio> for String {
    fn from(aspect: AspectRatio) -> Self {
        aspect.to_string()
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text).ok_or_else(|| format!("unknown aspect ratio '{}'", text))
    }
}

/// Largest size of `ratio` that is at least the minimum crop and fits in
/// `room`. The room wins over the minimum.
fn fit_size(width: f32, height: f32, ratio: f32, room: Vec2) -> Vec2 {
    let (mut w, mut h) = (width, height);
    if w < MIN_CROP_SIZE {
        w = MIN_CROP_SIZE;
        h = w / ratio;
    }
    if h < MIN_CROP_SIZE {
        h = MIN_CROP_SIZE;
        w = h * ratio;
    }
    if w > room.x {
        w = room.x;
        h = w / ratio;
    }
    if h > room.y {
        h = room.y;
        w = h * ratio;
    }
    Vec2::new(w, h)
}

/// Crop box geometry: the image bounds, the box and its aspect lock.
///
/// Every operation returns or stores a box that lies inside the bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct CropModel {
    bounds: Vec2,
    rect: CropRect,
    aspect: AspectRatio,
}

impl Default for CropModel {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_SIZE)
    }
}

impl CropModel {
    /// Free crop covering the whole image.
    pub fn new(bounds: Vec2) -> Self {
        let bounds = bounds.max(Vec2::ZERO);
        Self {
            bounds,
            rect: CropRect::full(bounds),
            aspect: AspectRatio::Free,
        }
    }

    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    pub fn rect(&self) -> CropRect {
        self.rect
    }

    pub fn aspect(&self) -> AspectRatio {
        self.aspect
    }

    pub fn is_full(&self) -> bool {
        self.rect == CropRect::full(self.bounds)
    }

    /// Back to the whole image, unlocked.
    pub fn reset(&mut self) {
        self.rect = CropRect::full(self.bounds);
        self.aspect = AspectRatio::Free;
    }

    /// New image size. The crop starts over.
    pub fn set_bounds(&mut self, bounds: Vec2) {
        self.bounds = bounds.max(Vec2::ZERO);
        self.reset();
    }

    /// Locks the box to `aspect`, keeping its width where the image
    /// allows and its centre where the bounds allow.
    pub fn set_aspect(&mut self, aspect: AspectRatio) {
        self.aspect = aspect;
        let Some(ratio) = aspect.ratio() else {
            return;
        };
        let center = self.rect.center();
        let size = fit_size(self.rect.width, self.rect.width / ratio, ratio, self.bounds);
        self.rect = CropRect::new(center.x - size.x / 2.0, center.y - size.y / 2.0, size.x, size.y)
            .shifted_into(self.bounds);
    }

    /// Takes an arbitrary box (typed in, or loaded) and makes it valid.
    pub fn set_rect(&mut self, rect: CropRect) {
        self.rect = self.constrain(rect);
    }

    fn constrain(&self, rect: CropRect) -> CropRect {
        let min_w = MIN_CROP_SIZE.min(self.bounds.x);
        let min_h = MIN_CROP_SIZE.min(self.bounds.y);
        let size = match self.aspect.ratio() {
            Some(ratio) => fit_size(rect.width, rect.width / ratio, ratio, self.bounds),
            None => Vec2::new(
                rect.width.max(min_w).min(self.bounds.x),
                rect.height.max(min_h).min(self.bounds.y),
            ),
        };
        CropRect::new(rect.x, rect.y, size.x, size.y).shifted_into(self.bounds)
    }

    /// `origin` moved by `delta`, stopped at the image edges.
    pub fn moved(&self, origin: CropRect, delta: Vec2) -> CropRect {
        CropRect::new(origin.x + delta.x, origin.y + delta.y, origin.width, origin.height)
            .shifted_into(self.bounds)
    }

    /// `origin` resized by dragging the `direction` handle by `delta`.
    ///
    /// The sides the handle does not touch stay put, except that a locked
    /// ratio grows an edge handle's other dimension around the centre.
    pub fn resized(&self, origin: CropRect, direction: Direction, delta: Vec2) -> CropRect {
        let min_w = MIN_CROP_SIZE.min(self.bounds.x);
        let min_h = MIN_CROP_SIZE.min(self.bounds.y);
        let (mut left, mut top, mut right, mut bottom) = (origin.x, origin.y, origin.right(), origin.bottom());
        if direction.moves_left() {
            left = (left + delta.x).min(right - min_w).max(0.0);
        }
        if direction.moves_right() {
            right = (right + delta.x).max(left + min_w).min(self.bounds.x);
        }
        if direction.moves_top() {
            top = (top + delta.y).min(bottom - min_h).max(0.0);
        }
        if direction.moves_bottom() {
            bottom = (bottom + delta.y).max(top + min_h).min(self.bounds.y);
        }
        let free = CropRect::from_edges(left, top, right, bottom);

        match self.aspect.ratio() {
            Some(ratio) => self.fit_ratio(free, origin, direction, delta, ratio),
            None => free,
        }
    }

    fn fit_ratio(&self, free: CropRect, origin: CropRect, direction: Direction, delta: Vec2, ratio: f32) -> CropRect {
        let width_leads = match direction {
            Direction::E | Direction::W => true,
            Direction::N | Direction::S => false,
            _ => delta.x.abs() > delta.y.abs(),
        };
        let (width, height) = if width_leads {
            (free.width, free.width / ratio)
        } else {
            (free.height * ratio, free.height)
        };

        // Room from the side that stays fixed; a centred axis may use the
        // whole image and is shifted back inside afterwards.
        let room_x = if direction.moves_left() {
            origin.right()
        } else if direction.moves_right() {
            self.bounds.x - origin.x
        } else {
            self.bounds.x
        };
        let room_y = if direction.moves_top() {
            origin.bottom()
        } else if direction.moves_bottom() {
            self.bounds.y - origin.y
        } else {
            self.bounds.y
        };
        let size = fit_size(width, height, ratio, Vec2::new(room_x, room_y));

        let x = if direction.moves_left() {
            origin.right() - size.x
        } else if direction.moves_right() {
            origin.x
        } else {
            origin.center().x - size.x / 2.0
        };
        let y = if direction.moves_top() {
            origin.bottom() - size.y
        } else if direction.moves_bottom() {
            origin.y
        } else {
            origin.center().y - size.y / 2.0
        };
        CropRect::new(x, y, size.x, size.y).shifted_into(self.bounds)
    }
}

/// What a press on the node landed on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CropTarget {
    /// Inside the box, away from the handles.
    Move,
    Handle(Direction),
    /// The footer holding the aspect preset.
    Aspect,
}

#[derive(Clone, Copy, Debug)]
struct CropDrag {
    target: CropTarget,
    start: Pos2,
    origin: CropRect,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedCrop {
    #[serde(flatten)]
    rect: CropRect,
    image_width: f32,
    image_height: f32,
    #[serde(default)]
    aspect: AspectRatio,
    #[serde(default)]
    image_name: Option<String>,
}

pub struct CropBox {
    model: CropModel,
    /// Image the crop belongs to.
    image: Option<String>,
    gestures: GestureClassifier<CropTarget>,
    drag: Option<CropDrag>,
}

impl Default for CropBox {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_SIZE)
    }
}

impl CropBox {
    pub fn new(image_size: Vec2) -> Self {
        Self {
            model: CropModel::new(image_size),
            image: None,
            gestures: GestureClassifier::new(GestureConfig::widget()),
            drag: None,
        }
    }

    pub fn model(&self) -> &CropModel {
        &self.model
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The host loaded `name` with pixel size `size`; the crop starts over.
    pub fn set_image(&mut self, node: &mut NodeContext, name: &str, size: Vec2) {
        self.gestures.cancel();
        self.drag = None;
        self.image = Some(name.to_string());
        self.model.set_bounds(size);
        node.set_widget_value(IMAGE_WIDGET, WidgetValue::Text(name.to_string()));
        self.commit(node);
    }

    pub fn set_aspect(&mut self, node: &mut NodeContext, aspect: AspectRatio) {
        self.model.set_aspect(aspect);
        self.commit(node);
    }

    /// Sets the crop from typed-in numbers, repairing what does not fit.
    pub fn set_rect(&mut self, node: &mut NodeContext, rect: CropRect) {
        self.model.set_rect(rect);
        self.commit(node);
    }

    pub fn reset(&mut self, node: &mut NodeContext) {
        self.model.reset();
        self.commit(node);
    }

    /// Writes the crop to its widget. A crop of the whole image is empty.
    fn commit(&self, node: &mut NodeContext) {
        let value = if self.model.is_full() {
            String::new()
        } else {
            self.model.rect().to_pixels().to_string()
        };
        node.set_widget_value(CROP_WIDGET, WidgetValue::Text(value));
        node.request_redraw();
    }

    fn image_area(node: &NodeContext) -> Rect {
        let top = TITLE_HEIGHT + node.visible_slot_rows() as f32 * SLOT_ROW_HEIGHT + INSET;
        let bottom = (node.size.y - INSET - FOOTER_HEIGHT - INSET).max(top);
        Rect::from_min_max(Pos2::new(INSET, top), Pos2::new((node.size.x - INSET).max(INSET), bottom))
    }

    fn footer_rect(node: &NodeContext) -> Rect {
        let top = Self::image_area(node).max.y + INSET;
        Rect::from_min_max(
            Pos2::new(INSET, top),
            Pos2::new((node.size.x - INSET).max(INSET), top + FOOTER_HEIGHT),
        )
    }

    /// Scale from image pixels to node units, and where the image's top
    /// left corner is drawn. The image is centred in its area.
    fn view(&self, node: &NodeContext) -> Option<(f32, Pos2)> {
        let area = Self::image_area(node);
        let bounds = self.model.bounds();
        if bounds.x <= 0.0 || bounds.y <= 0.0 || area.width() <= 0.0 || area.height() <= 0.0 {
            return None;
        }
        let scale = (area.width() / bounds.x).min(area.height() / bounds.y);
        let origin = area.center() - bounds * scale / 2.0;
        Some((scale, origin))
    }

    fn to_screen(&self, node: &NodeContext, rect: CropRect) -> Option<Rect> {
        let (scale, origin) = self.view(node)?;
        Some(Rect::from_min_size(
            origin + Vec2::new(rect.x, rect.y) * scale,
            Vec2::new(rect.width, rect.height) * scale,
        ))
    }

    fn hit_test(&self, node: &NodeContext, pos: Pos2) -> Option<CropTarget> {
        if Self::footer_rect(node).contains(pos) {
            return Some(CropTarget::Aspect);
        }
        let rect = self.to_screen(node, self.model.rect())?;
        let handle = Direction::ALL
            .into_iter()
            .find(|d| Rect::from_center_size(d.anchor(rect), Vec2::splat(HANDLE_SIZE)).contains(pos));
        match handle {
            Some(direction) => Some(CropTarget::Handle(direction)),
            None if rect.contains(pos) => Some(CropTarget::Move),
            None => None,
        }
    }

    fn drag_to(&mut self, node: &mut NodeContext, pos: Pos2) {
        let (Some(drag), Some((scale, _))) = (self.drag, self.view(node)) else {
            return;
        };
        let delta = (pos - drag.start) / scale;
        let rect = match drag.target {
            CropTarget::Move => self.model.moved(drag.origin, delta),
            CropTarget::Handle(direction) => self.model.resized(drag.origin, direction, delta),
            CropTarget::Aspect => return,
        };
        if rect != self.model.rect {
            self.model.rect = rect;
            node.request_redraw();
        }
    }

    fn cycle_aspect(&mut self, node: &mut NodeContext) {
        let next = self.model.aspect().next();
        log::debug!("crop {}: aspect {}", node.id, next);
        self.set_aspect(node, next);
    }
}

impl NodeExtension for CropBox {
    fn name(&self) -> &str {
        "crop_box"
    }

    fn on_create(&mut self, node: &mut NodeContext) {
        node.add_widget(IMAGE_WIDGET, WidgetValue::Text(String::new()));
        node.add_widget(CROP_WIDGET, WidgetValue::Text(String::new()));
        if let Some(widget) = node.widget_mut(CROP_WIDGET) {
            widget.hidden = true;
        }
        self.image = node
            .widget(IMAGE_WIDGET)
            .and_then(|w| w.value.as_text())
            .filter(|name| !name.is_empty())
            .map(str::to_string);
    }

    fn on_configure(&mut self, node: &mut NodeContext, saved: &StateMap) {
        match state::read_value::<SavedCrop>(saved, KEY_CROP_DATA) {
            Ok(Some(crop)) => {
                self.model = CropModel::new(Vec2::new(crop.image_width, crop.image_height));
                self.model.set_aspect(crop.aspect);
                self.model.set_rect(crop.rect);
                self.image = crop.image_name;
                self.commit(node);
            }
            Ok(None) => {}
            Err(err) => log::warn!("crop {}: {}", node.id, err),
        }
        self.gestures.reset();
        self.drag = None;
    }

    fn on_serialize(&self, node: &NodeContext, saved: &mut StateMap) {
        let crop = SavedCrop {
            rect: self.model.rect(),
            image_width: self.model.bounds().x,
            image_height: self.model.bounds().y,
            aspect: self.model.aspect(),
            image_name: self.image.clone(),
        };
        if let Err(err) = state::write_value(saved, KEY_CROP_DATA, &crop) {
            log::warn!("crop {}: {}", node.id, err);
        }
    }

    fn on_tick(&mut self, node: &mut NodeContext, _now: Instant) {
        // A different image invalidates the crop.
        let current = node
            .widget(IMAGE_WIDGET)
            .and_then(|w| w.value.as_text())
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        if current != self.image {
            let had_image = self.image.is_some();
            log::debug!("crop {}: image changed to {:?}", node.id, current);
            self.image = current;
            if had_image {
                self.gestures.cancel();
                self.drag = None;
                self.reset(node);
            }
        }
    }

    fn on_draw(&self, node: &NodeContext, canvas: &mut dyn DrawContext, _now: Instant) {
        let area = Self::image_area(node);
        canvas.fill_rect(area, 4.0, theme::background::PANEL);

        let image = self.to_screen(node, CropRect::full(self.model.bounds()));
        let crop = self.to_screen(node, self.model.rect());
        if let (Some(image), Some(crop)) = (image, crop) {
            canvas.fill_rect(image, 0.0, theme::item::FILL);
            for shade in [
                Rect::from_min_max(image.min, Pos2::new(image.max.x, crop.min.y)),
                Rect::from_min_max(Pos2::new(image.min.x, crop.max.y), image.max),
                Rect::from_min_max(Pos2::new(image.min.x, crop.min.y), Pos2::new(crop.min.x, crop.max.y)),
                Rect::from_min_max(Pos2::new(crop.max.x, crop.min.y), Pos2::new(image.max.x, crop.max.y)),
            ] {
                if shade.width() > 0.0 && shade.height() > 0.0 {
                    canvas.fill_rect(shade, 0.0, theme::item::SHADE);
                }
            }
            canvas.stroke_rect(crop, 0.0, Stroke::new(2.0, theme::text::PRIMARY));
            for direction in Direction::ALL {
                canvas.fill_rect(
                    Rect::from_center_size(direction.anchor(crop), Vec2::splat(HANDLE_SIZE - 2.0)),
                    2.0,
                    theme::accent::PRIMARY,
                );
            }
        }

        let footer = Self::footer_rect(node);
        canvas.fill_rect(footer, 3.0, theme::item::FILL);
        let rect = self.model.rect();
        let label = format!("{:.0} x {:.0}  {}", rect.width, rect.height, self.model.aspect());
        canvas.text(footer.center(), Align2::CENTER_CENTER, &label, 12.0, theme::text::SECONDARY);
    }

    fn on_pointer(&mut self, node: &mut NodeContext, input: &PointerInput, now: Instant) -> EventResponse {
        match input.phase {
            PointerPhase::Down => {
                let target = self.hit_test(node, input.pos);
                if target.is_none() {
                    return EventResponse::Ignored;
                }
                match self.gestures.pointer_down(input.pos, target, now) {
                    Some(Gesture::DoubleClick(CropTarget::Move)) => self.reset(node),
                    // A fast second click still steps the preset.
                    Some(Gesture::DoubleClick(CropTarget::Aspect)) => self.cycle_aspect(node),
                    _ => {}
                }
                EventResponse::Consumed
            }
            PointerPhase::Move if self.gestures.wants_pointer() => {
                match self.gestures.pointer_move(input.pos, now) {
                    Some(Gesture::DragStart { target, origin, pos }) => {
                        self.drag = Some(CropDrag {
                            target,
                            start: origin,
                            origin: self.model.rect(),
                        });
                        self.drag_to(node, pos);
                    }
                    Some(Gesture::DragMove(pos)) => self.drag_to(node, pos),
                    _ => {}
                }
                EventResponse::Consumed
            }
            PointerPhase::Move => EventResponse::Ignored,
            PointerPhase::Up => match self.gestures.pointer_up(input.pos) {
                Some(Gesture::Click(CropTarget::Aspect)) => {
                    self.cycle_aspect(node);
                    EventResponse::Consumed
                }
                Some(Gesture::DragEnd(_)) => {
                    self.drag = None;
                    self.commit(node);
                    EventResponse::Consumed
                }
                Some(_) => EventResponse::Consumed,
                None => EventResponse::Ignored,
            },
            PointerPhase::Leave => {
                if let Some(Gesture::DragCancel) = self.gestures.pointer_leave() {
                    if let Some(drag) = self.drag.take() {
                        self.model.rect = drag.origin;
                        node.request_redraw();
                    }
                }
                EventResponse::Ignored
            }
        }
    }

    fn min_size(&self, node: &NodeContext) -> Option<Vec2> {
        let slots = node.visible_slot_rows() as f32 * SLOT_ROW_HEIGHT;
        Some(Vec2::new(
            INSET * 2.0 + 120.0,
            TITLE_HEIGHT + slots + INSET * 3.0 + FOOTER_HEIGHT + 80.0,
        ))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingCanvas;
    use std::time::Duration;

    const BOUNDS: Vec2 = Vec2::new(400.0, 300.0);

    fn model_with(rect: CropRect) -> CropModel {
        let mut model = CropModel::new(BOUNDS);
        model.set_rect(rect);
        model
    }

    fn square() -> CropRect {
        CropRect::new(100.0, 100.0, 100.0, 100.0)
    }

    /// Node whose image area is exactly 400x300 at (8, 38), so one image
    /// pixel is one node unit.
    fn crop_node() -> (NodeContext, CropBox) {
        let mut node = NodeContext::new(4, NODE_TYPE, Vec2::new(416.0, 374.0));
        let mut crop = CropBox::default();
        crop.on_create(&mut node);
        crop.set_image(&mut node, "cat.png", BOUNDS);
        (node, crop)
    }

    fn screen(p: Pos2) -> Pos2 {
        p + Vec2::new(INSET, TITLE_HEIGHT + INSET)
    }

    fn drag(crop: &mut CropBox, node: &mut NodeContext, from: Pos2, to: Pos2, t0: Instant) {
        crop.on_pointer(node, &PointerInput::down(screen(from)), t0);
        crop.on_pointer(node, &PointerInput::moved(screen(to)), t0 + Duration::from_millis(20));
        crop.on_pointer(node, &PointerInput::up(screen(to)), t0 + Duration::from_millis(40));
    }

    fn crop_widget(node: &NodeContext) -> &str {
        node.widget(CROP_WIDGET).and_then(|w| w.value.as_text()).unwrap()
    }

    #[test]
    fn test_each_handle_moves_its_own_sides() {
        let model = model_with(square());
        let cases = [
            (Direction::N, Vec2::new(5.0, -30.0), CropRect::new(100.0, 70.0, 100.0, 130.0)),
            (Direction::S, Vec2::new(5.0, 30.0), CropRect::new(100.0, 100.0, 100.0, 130.0)),
            (Direction::E, Vec2::new(30.0, 7.0), CropRect::new(100.0, 100.0, 130.0, 100.0)),
            (Direction::W, Vec2::new(-30.0, 7.0), CropRect::new(70.0, 100.0, 130.0, 100.0)),
            (Direction::NE, Vec2::new(10.0, -10.0), CropRect::new(100.0, 90.0, 110.0, 110.0)),
            (Direction::NW, Vec2::new(-20.0, -10.0), CropRect::new(80.0, 90.0, 120.0, 110.0)),
            (Direction::SE, Vec2::new(20.0, 10.0), CropRect::new(100.0, 100.0, 120.0, 110.0)),
            (Direction::SW, Vec2::new(-10.0, 10.0), CropRect::new(90.0, 100.0, 110.0, 110.0)),
        ];
        for (direction, delta, expected) in cases {
            assert_eq!(model.resized(square(), direction, delta), expected, "{:?}", direction);
        }
    }

    #[test]
    fn test_resize_stops_at_image_edges() {
        let model = model_with(square());
        assert_eq!(
            model.resized(square(), Direction::SE, Vec2::new(1000.0, 1000.0)),
            CropRect::new(100.0, 100.0, 300.0, 200.0)
        );
        assert_eq!(
            model.resized(square(), Direction::NW, Vec2::new(-500.0, -500.0)),
            CropRect::new(0.0, 0.0, 200.0, 200.0)
        );
    }

    #[test]
    fn test_resize_keeps_minimum_size() {
        let model = model_with(square());
        assert_eq!(
            model.resized(square(), Direction::E, Vec2::new(-500.0, 0.0)),
            CropRect::new(100.0, 100.0, MIN_CROP_SIZE, 100.0)
        );
        // The opposite side stays put when shrinking from the left.
        assert_eq!(
            model.resized(square(), Direction::W, Vec2::new(500.0, 0.0)),
            CropRect::new(180.0, 100.0, MIN_CROP_SIZE, 100.0)
        );
        assert_eq!(
            model.resized(square(), Direction::N, Vec2::new(0.0, 500.0)),
            CropRect::new(100.0, 180.0, 100.0, MIN_CROP_SIZE)
        );
    }

    #[test]
    fn test_move_is_clamped_to_image() {
        let model = model_with(square());
        assert_eq!(
            model.moved(square(), Vec2::new(1000.0, -1000.0)),
            CropRect::new(300.0, 0.0, 100.0, 100.0)
        );
        assert_eq!(model.moved(square(), Vec2::new(-30.0, 20.0)), CropRect::new(70.0, 120.0, 100.0, 100.0));
    }

    #[test]
    fn test_aspect_preset_keeps_box_centred() {
        let mut model = CropModel::new(BOUNDS);
        model.set_aspect(AspectRatio::Fixed(16, 9));
        assert_eq!(model.rect(), CropRect::new(0.0, 37.5, 400.0, 225.0));

        let mut model = model_with(CropRect::new(100.0, 100.0, 200.0, 100.0));
        model.set_aspect(AspectRatio::Fixed(1, 1));
        assert_eq!(model.rect(), CropRect::new(100.0, 50.0, 200.0, 200.0));

        // Too tall for the image: the height gives way.
        let mut model = CropModel::new(BOUNDS);
        model.set_aspect(AspectRatio::Fixed(9, 16));
        assert_eq!(model.rect(), CropRect::new(115.625, 0.0, 168.75, 300.0));
    }

    #[test]
    fn test_locked_ratio_edge_handle_grows_around_centre() {
        let mut model = model_with(square());
        model.set_aspect(AspectRatio::Fixed(1, 1));
        assert_eq!(
            model.resized(square(), Direction::E, Vec2::new(40.0, 0.0)),
            CropRect::new(100.0, 80.0, 140.0, 140.0)
        );
        assert_eq!(
            model.resized(square(), Direction::N, Vec2::new(0.0, -20.0)),
            CropRect::new(90.0, 80.0, 120.0, 120.0)
        );
    }

    #[test]
    fn test_locked_ratio_corner_follows_larger_motion() {
        let mut model = model_with(square());
        model.set_aspect(AspectRatio::Fixed(1, 1));
        assert_eq!(
            model.resized(square(), Direction::SE, Vec2::new(50.0, 10.0)),
            CropRect::new(100.0, 100.0, 150.0, 150.0)
        );
        // The opposite corner is the anchor.
        assert_eq!(
            model.resized(square(), Direction::NW, Vec2::new(-20.0, -10.0)),
            CropRect::new(80.0, 80.0, 120.0, 120.0)
        );
        // The image bottom caps the growth; the ratio holds.
        assert_eq!(
            model.resized(square(), Direction::SE, Vec2::new(1000.0, 0.0)),
            CropRect::new(100.0, 100.0, 200.0, 200.0)
        );
    }

    #[test]
    fn test_typed_rect_is_repaired() {
        let model = model_with(CropRect::new(350.0, -40.0, 5.0, 900.0));
        assert_eq!(model.rect(), CropRect::new(350.0, 0.0, MIN_CROP_SIZE, 300.0));
    }

    #[test]
    fn test_aspect_presets_cycle_and_parse() {
        assert_eq!(AspectRatio::Free.next(), AspectRatio::Fixed(1, 1));
        assert_eq!(AspectRatio::Fixed(2, 3).next(), AspectRatio::Free);
        assert_eq!(AspectRatio::parse(" 16 : 9 "), Some(AspectRatio::Fixed(16, 9)));
        assert_eq!(AspectRatio::parse("free"), Some(AspectRatio::Free));
        assert_eq!(AspectRatio::parse("0:3"), None);
        assert_eq!(AspectRatio::parse("wide"), None);
    }

    #[test]
    fn test_handle_drag_resizes_and_commits() {
        let (mut node, mut crop) = crop_node();
        assert_eq!(crop_widget(&node), "");

        // Bottom-right handle of the full image sits at (400, 300).
        drag(&mut crop, &mut node, Pos2::new(400.0, 300.0), Pos2::new(300.0, 250.0), Instant::now());
        assert_eq!(crop.model().rect(), CropRect::new(0.0, 0.0, 300.0, 250.0));
        assert!(!crop.is_dragging());

        let written: serde_json::Value = serde_json::from_str(crop_widget(&node)).unwrap();
        assert_eq!(written, serde_json::json!({"x": 0, "y": 0, "width": 300, "height": 250}));
    }

    #[test]
    fn test_box_drag_moves_it() {
        let (mut node, mut crop) = crop_node();
        crop.set_rect(&mut node, square());
        drag(&mut crop, &mut node, Pos2::new(150.0, 150.0), Pos2::new(400.0, 100.0), Instant::now());
        assert_eq!(crop.model().rect(), CropRect::new(300.0, 50.0, 100.0, 100.0));
    }

    #[test]
    fn test_leaving_mid_drag_restores_box() {
        let (mut node, mut crop) = crop_node();
        crop.set_rect(&mut node, square());
        let t0 = Instant::now();
        crop.on_pointer(&mut node, &PointerInput::down(screen(Pos2::new(150.0, 150.0))), t0);
        crop.on_pointer(&mut node, &PointerInput::moved(screen(Pos2::new(170.0, 150.0))), t0 + Duration::from_millis(20));
        assert_eq!(crop.model().rect().x, 120.0);

        crop.on_pointer(&mut node, &PointerInput::leave(), t0 + Duration::from_millis(30));
        assert_eq!(crop.model().rect(), square());
        assert!(!crop.is_dragging());
    }

    #[test]
    fn test_footer_click_cycles_aspect() {
        let (mut node, mut crop) = crop_node();
        let footer = Pos2::new(200.0, 374.0 - INSET - FOOTER_HEIGHT / 2.0);
        let t0 = Instant::now();
        crop.on_pointer(&mut node, &PointerInput::down(footer), t0);
        crop.on_pointer(&mut node, &PointerInput::up(footer), t0 + Duration::from_millis(30));
        assert_eq!(crop.model().aspect(), AspectRatio::Fixed(1, 1));
        assert_eq!(crop.model().rect(), CropRect::new(50.0, 0.0, 300.0, 300.0));

        // A quick second click steps again.
        crop.on_pointer(&mut node, &PointerInput::down(footer), t0 + Duration::from_millis(150));
        crop.on_pointer(&mut node, &PointerInput::up(footer), t0 + Duration::from_millis(180));
        assert_eq!(crop.model().aspect(), AspectRatio::Fixed(4, 3));
    }

    #[test]
    fn test_double_click_resets_crop() {
        let (mut node, mut crop) = crop_node();
        crop.set_rect(&mut node, square());
        let inside = screen(Pos2::new(150.0, 150.0));
        let t0 = Instant::now();
        crop.on_pointer(&mut node, &PointerInput::down(inside), t0);
        crop.on_pointer(&mut node, &PointerInput::up(inside), t0 + Duration::from_millis(30));
        crop.on_pointer(&mut node, &PointerInput::down(inside), t0 + Duration::from_millis(120));
        assert!(crop.model().is_full());
        assert_eq!(crop_widget(&node), "");
    }

    #[test]
    fn test_new_image_clears_crop() {
        let (mut node, mut crop) = crop_node();
        crop.set_rect(&mut node, square());
        crop.on_tick(&mut node, Instant::now());
        assert!(!crop.model().is_full());

        node.set_widget_value(IMAGE_WIDGET, WidgetValue::Text("dog.png".into()));
        crop.on_tick(&mut node, Instant::now());
        assert!(crop.model().is_full());
        assert_eq!(crop_widget(&node), "");
    }

    #[test]
    fn test_state_round_trip() {
        let (mut node, mut crop) = crop_node();
        crop.set_aspect(&mut node, AspectRatio::Fixed(1, 1));
        crop.set_rect(&mut node, CropRect::new(10.0, 20.0, 120.0, 0.0));
        let mut saved = StateMap::new();
        crop.on_serialize(&node, &mut saved);
        assert_eq!(saved[KEY_CROP_DATA]["aspect"], serde_json::json!("1:1"));
        assert_eq!(saved[KEY_CROP_DATA]["imageName"], serde_json::json!("cat.png"));

        let mut fresh_node = NodeContext::new(4, NODE_TYPE, Vec2::new(416.0, 374.0));
        let mut fresh = CropBox::default();
        fresh.on_create(&mut fresh_node);
        fresh.on_configure(&mut fresh_node, &saved);
        assert_eq!(fresh.model().bounds(), BOUNDS);
        assert_eq!(fresh.model().rect(), CropRect::new(10.0, 20.0, 120.0, 120.0));
        assert_eq!(fresh.model().aspect(), AspectRatio::Fixed(1, 1));
        assert!(!crop_widget(&fresh_node).is_empty());
    }

    #[test]
    fn test_bad_aspect_in_state_is_ignored() {
        let (mut node, mut crop) = crop_node();
        let saved: StateMap = serde_json::from_value(serde_json::json!({
            "cropData": { "x": 0, "y": 0, "width": 10, "height": 10,
                          "imageWidth": 100, "imageHeight": 100, "aspect": "wide" }
        }))
        .unwrap();
        crop.on_configure(&mut node, &saved);
        assert_eq!(crop.model().bounds(), BOUNDS);
        assert!(crop.model().is_full());
    }

    #[test]
    fn test_draw_shows_handles_and_size() {
        let (mut node, mut crop) = crop_node();
        crop.set_rect(&mut node, square());
        let mut canvas = RecordingCanvas::new();
        crop.on_draw(&node, &mut canvas, Instant::now());
        assert_eq!(canvas.fills_of(theme::accent::PRIMARY).len(), 8);
        assert_eq!(canvas.fills_of(theme::item::SHADE).len(), 4);
        assert!(canvas.texts().contains(&"100 x 100  free"));
    }
}
