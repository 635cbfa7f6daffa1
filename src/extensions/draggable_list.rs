//! Reorderable list of tagged text items.
//!
//! The node shows a fixed number of text items stacked vertically. Each
//! item's text is split into tag chips. Items can be dragged to reorder the
//! list, tags can be dragged within their item, and double-clicking an item
//! or a tag edits it in place.
//!
//! Item texts live in the host's `text1..textN` widgets; the display order
//! is mirrored into the hidden `item_order` widget as `"2,0,1,3"`.

use std::time::{Duration, Instant};

use egui::{Align2, Pos2, Rect, Stroke, Vec2};
use super::edit::{EditOutcome, EditSession};
use crate::app::theme;
use crate::gesture::{Gesture, GestureClassifier, GestureConfig};
use crate::host::{
    DrawContext, EventResponse, KeyInput, NodeContext, NodeExtension, PointerInput, PointerPhase,
    WidgetValue,
};
use crate::persistence::{self, state, StateMap};
use crate::reorder::{
    rect_index_at, ListLayout, MonospaceMeasure, OrderedList, ReorderEngine, TagSequence,
    TextMeasure,
};

pub const NODE_TYPE: &str = "A1r Draggable List";

/// Hidden widget holding the order as comma-separated indices.
pub const ORDER_WIDGET: &str = "item_order";

/// State key for the item texts, in content order.
pub const KEY_TEXTS: &str = "texts";

/// How long the glow stays on after a drag starts.
pub const FEEDBACK_DURATION: Duration = Duration::from_millis(400);

const HEADING: &str = "Draggable Tag List";
const HINT: &str = "Drag to move • Double-click to edit • Shift+Enter/Esc to exit";
const LINE_HEIGHT: f32 = 18.0;

/// Name of the host widget holding content item `content`.
pub fn text_widget_name(content: usize) -> String {
    format!("text{}", content + 1)
}

/// Something in the list the pointer can act on. Slots are display
/// positions, not content indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListTarget {
    Item(usize),
    Tag { slot: usize, tag: usize },
}

pub struct DraggableList {
    layout: ListLayout,
    measure: Box<dyn TextMeasure>,
    order: OrderedList,
    gestures: GestureClassifier<ListTarget>,
    items: ReorderEngine,
    tags: ReorderEngine,
    /// Slot whose tags are being dragged.
    tag_slot: Option<usize>,
    edit: Option<EditSession<ListTarget>>,
    feedback_since: Option<Instant>,
}

impl Default for DraggableList {
    fn default() -> Self {
        Self::new(ListLayout::default())
    }
}

impl DraggableList {
    pub fn new(layout: ListLayout) -> Self {
        let order = OrderedList::identity(layout.item_count);
        Self {
            layout,
            measure: Box::new(MonospaceMeasure::default()),
            order,
            gestures: GestureClassifier::new(GestureConfig::list_item()),
            items: ReorderEngine::new(),
            tags: ReorderEngine::new(),
            tag_slot: None,
            edit: None,
            feedback_since: None,
        }
    }

    /// Use `measure` for chip widths instead of the monospace estimate.
    pub fn with_measure(mut self, measure: Box<dyn TextMeasure>) -> Self {
        self.measure = measure;
        self
    }

    /// Override the gesture thresholds.
    pub fn with_gestures(mut self, config: GestureConfig) -> Self {
        self.gestures = GestureClassifier::new(config);
        self
    }

    pub fn order(&self) -> &OrderedList {
        &self.order
    }

    /// The order in the hidden widget's format.
    pub fn item_order_csv(&self) -> String {
        self.order.to_csv()
    }

    pub fn edit_session(&self) -> Option<&EditSession<ListTarget>> {
        self.edit.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.gestures.is_dragging()
    }

    /// Text of the item shown in `slot`.
    pub fn item_text(&self, node: &NodeContext, slot: usize) -> String {
        self.order
            .content_at(slot)
            .and_then(|content| node.widget(&text_widget_name(content)))
            .and_then(|w| w.value.as_text())
            .unwrap_or_default()
            .to_string()
    }

    pub fn item_tags(&self, node: &NodeContext, slot: usize) -> TagSequence {
        TagSequence::parse(&self.item_text(node, slot))
    }

    fn set_item_text(&self, node: &mut NodeContext, slot: usize, text: String) {
        if let Some(content) = self.order.content_at(slot) {
            node.set_widget_value(&text_widget_name(content), WidgetValue::Text(text));
        }
    }

    fn sync_order_widget(&self, node: &mut NodeContext) {
        node.set_widget_value(ORDER_WIDGET, WidgetValue::Text(self.order.to_csv()));
    }

    fn tag_rects(&self, node: &NodeContext, item: Rect, slot: usize) -> Vec<Rect> {
        let tags = self.item_tags(node, slot);
        self.layout.tag_rects(item, tags.iter(), self.measure.as_ref())
    }

    fn editing_item(&self, slot: usize) -> bool {
        matches!(self.edit.as_ref().map(|e| e.target), Some(ListTarget::Item(s)) if s == slot)
    }

    /// What lies under `pos`, if anything.
    pub fn hit_test(&self, node: &NodeContext, pos: Pos2) -> Option<ListTarget> {
        let rects = self.layout.item_rects(node.size);
        let slot = rects.iter().position(|r| r.contains(pos))?;
        if !self.editing_item(slot) {
            if let Some(tag) = rect_index_at(&self.tag_rects(node, rects[slot], slot), pos) {
                return Some(ListTarget::Tag { slot, tag });
            }
        }
        Some(ListTarget::Item(slot))
    }

    /// Inserts the tags parsed from `text` before tag `index` of the item in
    /// `slot`. Returns how many tags were added.
    ///
    /// Like [`remove_tag`](Self::remove_tag), this drops a tag drag or tag
    /// edit running in the same item.
    pub fn insert_tags(&mut self, node: &mut NodeContext, slot: usize, index: usize, text: &str) -> usize {
        if self.order.content_at(slot).is_none() {
            return 0;
        }
        let mut tags = self.item_tags(node, slot);
        let before = tags.len();
        tags.insert(index, text);
        let added = tags.len() - before;
        if added == 0 {
            return 0;
        }
        self.set_item_text(node, slot, tags.serialize());

        if self.tag_slot == Some(slot) {
            self.tags.cancel();
            self.gestures.cancel();
            self.tag_slot = None;
        }
        if matches!(self.edit.as_ref().map(|e| e.target), Some(ListTarget::Tag { slot: s, .. }) if s == slot) {
            self.edit = None;
        }
        log::debug!("list: inserted {} tag(s) into slot {}", added, slot);
        node.request_redraw();
        added
    }

    /// Removes one tag from the item in `slot`.
    ///
    /// A tag drag or tag edit in that item is cancelled, since the indices
    /// it refers to no longer hold.
    pub fn remove_tag(&mut self, node: &mut NodeContext, slot: usize, tag: usize) -> Option<String> {
        let mut tags = self.item_tags(node, slot);
        let removed = tags.remove(tag)?;
        self.set_item_text(node, slot, tags.serialize());

        if self.tag_slot == Some(slot) {
            self.tags.element_removed(tag);
            self.gestures.cancel();
            self.tag_slot = None;
        }
        self.gestures.cancel_target(&ListTarget::Tag { slot, tag });
        if matches!(self.edit.as_ref().map(|e| e.target), Some(ListTarget::Tag { slot: s, .. }) if s == slot) {
            self.edit = None;
        }
        log::debug!("list: removed tag '{}' from slot {}", removed, slot);
        node.request_redraw();
        Some(removed)
    }

    fn begin_edit(&mut self, node: &mut NodeContext, target: ListTarget) {
        self.finish_edit(node, true);
        let session = match target {
            ListTarget::Item(slot) => EditSession::new(target, &self.item_text(node, slot)).multiline(),
            ListTarget::Tag { slot, tag } => {
                let text = self.item_tags(node, slot).get(tag).unwrap_or_default().to_string();
                EditSession::new(target, &text)
            }
        };
        log::debug!("list: editing {:?}", target);
        self.edit = Some(session);
        node.request_redraw();
    }

    /// Leaves edit mode, writing the buffer back if `keep` is set.
    fn finish_edit(&mut self, node: &mut NodeContext, keep: bool) {
        let Some(session) = self.edit.take() else {
            return;
        };
        node.request_redraw();
        if !keep {
            return;
        }
        let target = session.target;
        let text = session.into_text();
        match target {
            ListTarget::Item(slot) => self.set_item_text(node, slot, text),
            ListTarget::Tag { slot, tag } => {
                let mut tags = self.item_tags(node, slot);
                if tags.replace(tag, &text) {
                    self.set_item_text(node, slot, tags.serialize());
                }
            }
        }
    }

    fn start_drag(&mut self, node: &mut NodeContext, target: ListTarget, pos: Pos2, now: Instant) {
        self.finish_edit(node, true);
        self.feedback_since = Some(now);
        match target {
            ListTarget::Item(slot) => {
                self.items.begin_drag(slot);
                self.items.hover_vertical(pos, &self.layout.item_rects(node.size));
            }
            ListTarget::Tag { slot, tag } => {
                let item = self.layout.item_rects(node.size).get(slot).copied();
                let source = item.and_then(|item| self.tag_rects(node, item, slot).get(tag).copied());
                self.tags.begin_drag(tag);
                self.tags.seed_from_source(pos, source);
                self.tag_slot = Some(slot);
            }
        }
        node.request_redraw();
    }

    fn drag_to(&mut self, node: &mut NodeContext, pos: Pos2) {
        let rects = self.layout.item_rects(node.size);
        if self.items.is_dragging() {
            self.items.hover_vertical(pos, &rects);
        } else if let Some(slot) = self.tag_slot {
            if let Some(&item) = rects.get(slot) {
                let tag_rects = self.tag_rects(node, item, slot);
                self.tags.hover_wrapped(pos, item, &tag_rects);
            }
        }
        node.request_redraw();
    }

    fn drop(&mut self, node: &mut NodeContext) {
        if self.items.is_dragging() {
            if let Some(moved) = self.items.drop_into(self.order.order_mut()) {
                log::debug!("list: item {} -> {}, order {}", moved.from, moved.to, self.order.to_csv());
                self.sync_order_widget(node);
            }
        } else if let Some(slot) = self.tag_slot.take() {
            let mut tags = self.item_tags(node, slot);
            if self.tags.drop_into(tags.tags_mut()).is_some() {
                self.set_item_text(node, slot, tags.serialize());
            }
        }
        node.request_redraw();
    }

    fn cancel_drag(&mut self, node: &mut NodeContext) {
        if self.items.is_dragging() || self.tags.is_dragging() {
            node.request_redraw();
        }
        self.items.cancel();
        self.tags.cancel();
        self.tag_slot = None;
    }

    fn feedback_active(&self, now: Instant) -> bool {
        self.feedback_since
            .is_some_and(|since| now.saturating_duration_since(since) <= FEEDBACK_DURATION)
    }

    fn draw_tags(&self, canvas: &mut dyn DrawContext, slot: usize, item: Rect, tags: &TagSequence) {
        let rects = self.layout.tag_rects(item, tags.iter(), self.measure.as_ref());
        let dragged = self
            .tags
            .active()
            .filter(|_| self.tag_slot == Some(slot))
            .map(|d| d.source);
        let editing = match self.edit.as_ref().map(|e| e.target) {
            Some(ListTarget::Tag { slot: s, tag }) if s == slot => Some(tag),
            _ => None,
        };

        for (index, (rect, tag)) in rects.iter().zip(tags.iter()).enumerate() {
            let (fill, border) = if editing == Some(index) {
                (theme::item::TAG_EDITING_FILL, theme::accent::PRIMARY)
            } else if dragged == Some(index) {
                (theme::item::TAG_DRAGGED_FILL, theme::accent::PRIMARY)
            } else {
                (theme::item::TAG_FILL, theme::item::TAG_BORDER)
            };
            canvas.fill_rect(*rect, 3.0, fill);
            canvas.stroke_rect(*rect, 3.0, Stroke::new(1.0, border));

            let text_pos = Pos2::new(rect.min.x + self.layout.tag_padding, rect.center().y);
            match self.edit.as_ref().filter(|_| editing == Some(index)) {
                Some(session) => {
                    canvas.text(text_pos, Align2::LEFT_CENTER, session.text(), self.layout.font_size, theme::text::PRIMARY);
                    let x = text_pos.x + self.measure.text_width(session.text_before_cursor(), self.layout.font_size);
                    canvas.line(
                        Pos2::new(x, rect.min.y + 4.0),
                        Pos2::new(x, rect.max.y - 4.0),
                        Stroke::new(1.5, theme::text::PRIMARY),
                    );
                }
                None => canvas.text(text_pos, Align2::LEFT_CENTER, tag, self.layout.font_size, theme::text::PRIMARY),
            }
        }

        let insertion = self
            .tags
            .active()
            .filter(|_| self.tag_slot == Some(slot))
            .and_then(|d| d.insertion);
        if let Some(insertion) = insertion {
            let x = match (rects.get(insertion), rects.last()) {
                (Some(rect), _) => rect.min.x,
                (None, Some(last)) => last.max.x,
                (None, None) => item.min.x + self.layout.padding,
            };
            let top = item.min.y + self.layout.padding - 2.0;
            let bottom = item.max.y - self.layout.padding;
            canvas.line(Pos2::new(x, top), Pos2::new(x, bottom), theme::insert_stroke(2.0));
        }
    }

    fn draw_item_editor(&self, canvas: &mut dyn DrawContext, item: Rect, session: &EditSession<ListTarget>) {
        let origin = item.min + Vec2::splat(self.layout.padding);
        for (row, line) in session.text().split('\n').enumerate() {
            let pos = origin + Vec2::new(0.0, row as f32 * LINE_HEIGHT);
            canvas.text(pos, Align2::LEFT_TOP, line, self.layout.font_size, theme::text::PRIMARY);
        }
        let before = session.text_before_cursor();
        let row = before.matches('\n').count();
        let column_text = before.rsplit('\n').next().unwrap_or_default();
        let x = origin.x + self.measure.text_width(column_text, self.layout.font_size);
        let y = origin.y + row as f32 * LINE_HEIGHT;
        canvas.line(
            Pos2::new(x, y),
            Pos2::new(x, y + LINE_HEIGHT),
            Stroke::new(1.5, theme::text::PRIMARY),
        );
    }
}

impl NodeExtension for DraggableList {
    fn name(&self) -> &str {
        "draggable_list"
    }

    fn on_create(&mut self, node: &mut NodeContext) {
        for content in 0..self.layout.item_count {
            node.add_widget(text_widget_name(content), WidgetValue::Text(String::new()));
        }
        node.add_widget(ORDER_WIDGET, WidgetValue::Text(self.order.to_csv()));
        // The list draws its own content.
        for widget in &mut node.widgets {
            widget.hidden = true;
        }

        let stored = node
            .widget(ORDER_WIDGET)
            .and_then(|w| w.value.as_text())
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string);
        if let Some(text) = stored {
            self.order = OrderedList::parse_or_identity(&text, self.layout.item_count);
        }
        self.sync_order_widget(node);
    }

    fn on_configure(&mut self, node: &mut NodeContext, saved: &StateMap) {
        match state::read_strings(saved, KEY_TEXTS) {
            Ok(Some(texts)) => {
                for (content, text) in texts.into_iter().enumerate().take(self.layout.item_count) {
                    node.set_widget_value(&text_widget_name(content), WidgetValue::Text(text));
                }
            }
            Ok(None) => {}
            Err(err) => log::warn!("list: ignoring saved texts: {}", err),
        }

        self.order = match persistence::read_item_order(saved, self.layout.item_count) {
            Ok(Some(order)) => order,
            Ok(None) => self.order.clone(),
            Err(err) => {
                log::warn!("list: malformed item order, using identity: {}", err);
                OrderedList::identity(self.layout.item_count)
            }
        };
        self.gestures.reset();
        self.cancel_drag(node);
        self.edit = None;
        self.sync_order_widget(node);
    }

    fn on_serialize(&self, node: &NodeContext, saved: &mut StateMap) {
        persistence::write_item_order(saved, &self.order);
        let texts = (0..self.layout.item_count).map(|content| {
            node.widget(&text_widget_name(content))
                .and_then(|w| w.value.as_text())
                .unwrap_or_default()
                .to_string()
        });
        state::write_strings(saved, KEY_TEXTS, texts);
    }

    fn on_tick(&mut self, node: &mut NodeContext, now: Instant) {
        if self.feedback_since.is_some() && !self.feedback_active(now) {
            self.feedback_since = None;
            node.request_redraw();
        }
    }

    fn on_draw(&self, node: &NodeContext, canvas: &mut dyn DrawContext, now: Instant) {
        canvas.text(Pos2::new(10.0, 20.0), Align2::LEFT_BOTTOM, HEADING, 14.0, theme::text::HEADING);
        canvas.text(Pos2::new(10.0, 38.0), Align2::LEFT_BOTTOM, HINT, 10.0, theme::text::SECONDARY);

        let glow = self.feedback_active(now);
        let dragged_item = self.items.active().map(|d| d.source);
        let hovered_item = self.items.active().and_then(|d| d.hover);

        for (slot, item) in self.layout.item_rects(node.size).into_iter().enumerate() {
            let editing = self.editing_item(slot);
            let dragged = dragged_item == Some(slot);

            if glow && (dragged || self.tag_slot == Some(slot)) {
                canvas.fill_rect(item.expand(4.0), 6.0, theme::item::GLOW);
            }
            let (fill, border, width) = if editing {
                (theme::item::EDITING_FILL, theme::accent::PRIMARY, 2.0)
            } else if dragged {
                (theme::item::DRAGGED_FILL, theme::accent::PRIMARY, 1.0)
            } else {
                (theme::item::FILL, theme::item::BORDER, 1.0)
            };
            canvas.fill_rect(item, 4.0, fill);
            canvas.stroke_rect(item, 4.0, Stroke::new(width, border));

            match self.edit.as_ref().filter(|_| editing) {
                Some(session) => self.draw_item_editor(canvas, item, session),
                None => {
                    let tags = self.item_tags(node, slot);
                    if tags.is_empty() {
                        let content = self.order.content_at(slot).unwrap_or(slot);
                        canvas.text(
                            item.min + Vec2::splat(self.layout.padding),
                            Align2::LEFT_TOP,
                            &format!("Item {} (double-click to edit)", content + 1),
                            self.layout.font_size,
                            theme::text::DISABLED,
                        );
                    } else {
                        self.draw_tags(canvas, slot, item, &tags);
                    }
                }
            }

            if let (Some(source), Some(hovered)) = (dragged_item, hovered_item) {
                if hovered == slot && source != slot {
                    let y = if source < slot { item.max.y } else { item.min.y };
                    canvas.line(Pos2::new(item.min.x, y), Pos2::new(item.max.x, y), theme::insert_stroke(3.0));
                }
            }
        }
    }

    fn on_pointer(&mut self, node: &mut NodeContext, input: &PointerInput, now: Instant) -> EventResponse {
        match input.phase {
            PointerPhase::Down => {
                let Some(target) = self.hit_test(node, input.pos) else {
                    self.finish_edit(node, true);
                    return EventResponse::Ignored;
                };
                if self.edit.as_ref().is_some_and(|e| e.target != target) {
                    self.finish_edit(node, true);
                }
                if let Some(Gesture::DoubleClick(target)) =
                    self.gestures.pointer_down(input.pos, Some(target), now)
                {
                    self.begin_edit(node, target);
                }
                EventResponse::Consumed
            }
            PointerPhase::Move => {
                if !self.gestures.wants_pointer() {
                    return EventResponse::Ignored;
                }
                match self.gestures.pointer_move(input.pos, now) {
                    Some(Gesture::DragStart { target, pos, .. }) => self.start_drag(node, target, pos, now),
                    Some(Gesture::DragMove(pos)) => self.drag_to(node, pos),
                    _ => {}
                }
                EventResponse::Consumed
            }
            PointerPhase::Up => match self.gestures.pointer_up(input.pos) {
                Some(Gesture::DragEnd(pos)) => {
                    self.drag_to(node, pos);
                    self.drop(node);
                    EventResponse::Consumed
                }
                Some(_) => EventResponse::Consumed,
                None => EventResponse::Ignored,
            },
            PointerPhase::Leave => {
                self.gestures.pointer_leave();
                self.cancel_drag(node);
                EventResponse::Ignored
            }
        }
    }

    fn on_key(&mut self, node: &mut NodeContext, input: &KeyInput) -> EventResponse {
        let Some(session) = self.edit.as_mut() else {
            return EventResponse::Ignored;
        };
        match session.handle(input) {
            EditOutcome::Edited => node.request_redraw(),
            EditOutcome::Commit => self.finish_edit(node, true),
            EditOutcome::Cancel => self.finish_edit(node, false),
            EditOutcome::Unhandled => return EventResponse::Ignored,
        }
        EventResponse::Consumed
    }

    fn min_size(&self, _node: &NodeContext) -> Option<Vec2> {
        let rows = self.layout.item_count as f32;
        let gaps = self.layout.item_margin * (rows - 1.0).max(0.0);
        let row_height = self.layout.tag_height + self.layout.padding * 2.0;
        Some(Vec2::new(
            200.0,
            self.layout.header_height + self.layout.footer_height + gaps + rows * row_height,
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
    use egui::{Key, Modifiers};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup(texts: [&str; 4]) -> (NodeContext, DraggableList) {
        let mut node = NodeContext::new(1, NODE_TYPE, Vec2::new(400.0, 280.0));
        for (i, text) in texts.iter().enumerate() {
            node = node.with_widget(text_widget_name(i), WidgetValue::Text(text.to_string()));
        }
        let mut list = DraggableList::default();
        list.on_create(&mut node);
        (node, list)
    }

    fn press(list: &mut DraggableList, node: &mut NodeContext, phase: PointerPhase, x: f32, y: f32, at: Instant) -> EventResponse {
        list.on_pointer(node, &PointerInput::new(phase, Pos2::new(x, y)), at)
    }

    fn key(k: Key) -> KeyInput {
        KeyInput::Key {
            key: k,
            modifiers: Modifiers::NONE,
        }
    }

    fn text_of(node: &NodeContext, content: usize) -> &str {
        node.widget(&text_widget_name(content))
            .and_then(|w| w.value.as_text())
            .unwrap()
    }

    #[test]
    fn test_create_fills_missing_widgets() {
        let mut node = NodeContext::new(1, NODE_TYPE, Vec2::new(400.0, 280.0));
        let mut list = DraggableList::default();
        list.on_create(&mut node);
        assert!(node.widget("text4").is_some());
        assert_eq!(node.widget(ORDER_WIDGET).unwrap().value.as_text(), Some("0,1,2,3"));
        assert!(node.widgets.iter().all(|w| w.hidden));
    }

    #[test]
    fn test_click_does_not_reorder() {
        let (mut node, mut list) = setup(["a", "b", "c", "d"]);
        let t0 = Instant::now();
        assert_eq!(press(&mut list, &mut node, PointerPhase::Down, 300.0, 60.0, t0), EventResponse::Consumed);
        // Moves before the hold delay are swallowed.
        assert_eq!(press(&mut list, &mut node, PointerPhase::Move, 300.0, 170.0, t0 + ms(50)), EventResponse::Consumed);
        assert!(!list.is_dragging());
        press(&mut list, &mut node, PointerPhase::Up, 300.0, 170.0, t0 + ms(60));
        assert_eq!(list.item_order_csv(), "0,1,2,3");
    }

    #[test]
    fn test_item_drag_lands_in_hovered_slot() {
        let (mut node, mut list) = setup(["a", "b", "c", "d"]);
        let t0 = Instant::now();
        press(&mut list, &mut node, PointerPhase::Down, 300.0, 60.0, t0);
        press(&mut list, &mut node, PointerPhase::Move, 300.0, 62.0, t0 + ms(1100));
        assert!(list.is_dragging());
        press(&mut list, &mut node, PointerPhase::Move, 300.0, 170.0, t0 + ms(1150));
        press(&mut list, &mut node, PointerPhase::Up, 300.0, 170.0, t0 + ms(1200));

        assert_eq!(list.item_order_csv(), "1,2,0,3");
        assert_eq!(node.widget(ORDER_WIDGET).unwrap().value.as_text(), Some("1,2,0,3"));
        assert_eq!(list.item_text(&node, 2), "a");
    }

    #[test]
    fn test_tag_drag_reorders_within_item() {
        let (mut node, mut list) = setup(["a, b, c", "", "", ""]);
        let t0 = Instant::now();
        // Chips are 19.2px wide starting at x=18, 4px apart.
        assert_eq!(list.hit_test(&node, Pos2::new(25.0, 70.0)), Some(ListTarget::Tag { slot: 0, tag: 0 }));
        press(&mut list, &mut node, PointerPhase::Down, 25.0, 70.0, t0);
        press(&mut list, &mut node, PointerPhase::Move, 30.0, 70.0, t0 + ms(1000));
        press(&mut list, &mut node, PointerPhase::Move, 76.0, 70.0, t0 + ms(1050));
        press(&mut list, &mut node, PointerPhase::Up, 76.0, 70.0, t0 + ms(1100));
        assert_eq!(text_of(&node, 0), "b, c, a");
    }

    #[test]
    fn test_tag_drop_outside_item_is_noop() {
        let (mut node, mut list) = setup(["a, b, c", "x", "", ""]);
        let t0 = Instant::now();
        press(&mut list, &mut node, PointerPhase::Down, 25.0, 70.0, t0);
        press(&mut list, &mut node, PointerPhase::Move, 30.0, 70.0, t0 + ms(1000));
        press(&mut list, &mut node, PointerPhase::Move, 30.0, 130.0, t0 + ms(1050));
        press(&mut list, &mut node, PointerPhase::Up, 30.0, 130.0, t0 + ms(1100));
        assert_eq!(text_of(&node, 0), "a, b, c");
        assert_eq!(text_of(&node, 1), "x");
    }

    #[test]
    fn test_leave_cancels_drag() {
        let (mut node, mut list) = setup(["a", "b", "c", "d"]);
        let t0 = Instant::now();
        press(&mut list, &mut node, PointerPhase::Down, 300.0, 60.0, t0);
        press(&mut list, &mut node, PointerPhase::Move, 300.0, 170.0, t0 + ms(1100));
        list.on_pointer(&mut node, &PointerInput::leave(), t0 + ms(1150));
        list.on_pointer(&mut node, &PointerInput::leave(), t0 + ms(1160));
        press(&mut list, &mut node, PointerPhase::Up, 300.0, 170.0, t0 + ms(1200));
        assert!(!list.is_dragging());
        assert_eq!(list.item_order_csv(), "0,1,2,3");
    }

    #[test]
    fn test_double_click_tag_edits_in_place() {
        let (mut node, mut list) = setup(["a, b, c", "", "", ""]);
        let t0 = Instant::now();
        press(&mut list, &mut node, PointerPhase::Down, 25.0, 70.0, t0);
        press(&mut list, &mut node, PointerPhase::Up, 25.0, 70.0, t0 + ms(50));
        press(&mut list, &mut node, PointerPhase::Down, 25.0, 70.0, t0 + ms(150));
        assert_eq!(
            list.edit_session().map(|e| e.target),
            Some(ListTarget::Tag { slot: 0, tag: 0 })
        );

        list.on_key(&mut node, &KeyInput::Text("x".to_string()));
        assert_eq!(list.on_key(&mut node, &key(Key::Enter)), EventResponse::Consumed);
        assert!(list.edit_session().is_none());
        assert_eq!(text_of(&node, 0), "ax, b, c");
    }

    #[test]
    fn test_emptied_tag_is_removed() {
        let (mut node, mut list) = setup(["a, b", "", "", ""]);
        let t0 = Instant::now();
        press(&mut list, &mut node, PointerPhase::Down, 25.0, 70.0, t0);
        press(&mut list, &mut node, PointerPhase::Up, 25.0, 70.0, t0 + ms(10));
        press(&mut list, &mut node, PointerPhase::Down, 25.0, 70.0, t0 + ms(20));
        list.on_key(&mut node, &key(Key::Backspace));
        list.on_key(&mut node, &key(Key::Enter));
        assert_eq!(text_of(&node, 0), "b");
    }

    #[test]
    fn test_escape_discards_item_edit() {
        let (mut node, mut list) = setup(["a, b", "", "", ""]);
        let t0 = Instant::now();
        press(&mut list, &mut node, PointerPhase::Down, 300.0, 60.0, t0);
        press(&mut list, &mut node, PointerPhase::Up, 300.0, 60.0, t0 + ms(10));
        press(&mut list, &mut node, PointerPhase::Down, 300.0, 60.0, t0 + ms(20));
        assert_eq!(list.edit_session().map(|e| e.target), Some(ListTarget::Item(0)));
        list.on_key(&mut node, &KeyInput::Text("zzz".to_string()));
        list.on_key(&mut node, &key(Key::Escape));
        assert_eq!(text_of(&node, 0), "a, b");
        assert_eq!(list.on_key(&mut node, &key(Key::Escape)), EventResponse::Ignored);
    }

    #[test]
    fn test_click_outside_commits_edit() {
        let (mut node, mut list) = setup(["a", "", "", ""]);
        let t0 = Instant::now();
        press(&mut list, &mut node, PointerPhase::Down, 300.0, 60.0, t0);
        press(&mut list, &mut node, PointerPhase::Up, 300.0, 60.0, t0 + ms(10));
        press(&mut list, &mut node, PointerPhase::Down, 300.0, 60.0, t0 + ms(20));
        list.on_key(&mut node, &KeyInput::Text(", b".to_string()));
        let response = press(&mut list, &mut node, PointerPhase::Down, 300.0, 10.0, t0 + ms(500));
        assert_eq!(response, EventResponse::Ignored);
        assert_eq!(text_of(&node, 0), "a, b");
    }

    #[test]
    fn test_removing_dragged_tag_cancels() {
        let (mut node, mut list) = setup(["a, b, c", "", "", ""]);
        let t0 = Instant::now();
        press(&mut list, &mut node, PointerPhase::Down, 25.0, 70.0, t0);
        press(&mut list, &mut node, PointerPhase::Move, 30.0, 70.0, t0 + ms(1000));
        assert_eq!(list.remove_tag(&mut node, 0, 0), Some("a".to_string()));
        press(&mut list, &mut node, PointerPhase::Up, 76.0, 70.0, t0 + ms(1100));
        assert_eq!(text_of(&node, 0), "b, c");
        assert!(!list.is_dragging());
    }

    #[test]
    fn test_inserted_tags_land_before_index() {
        let (mut node, mut list) = setup(["a, c", "", "", ""]);
        assert_eq!(list.insert_tags(&mut node, 0, 1, "b1, , b2"), 2);
        assert_eq!(text_of(&node, 0), "a, b1, b2, c");
        assert_eq!(list.insert_tags(&mut node, 0, 99, "z"), 1);
        assert_eq!(text_of(&node, 0), "a, b1, b2, c, z");
        assert_eq!(list.insert_tags(&mut node, 0, 0, " , "), 0);
        assert_eq!(list.insert_tags(&mut node, 9, 0, "x"), 0);
    }

    #[test]
    fn test_inserting_tag_cancels_tag_drag() {
        let (mut node, mut list) = setup(["a, b, c", "", "", ""]);
        let t0 = Instant::now();
        press(&mut list, &mut node, PointerPhase::Down, 25.0, 70.0, t0);
        press(&mut list, &mut node, PointerPhase::Move, 30.0, 70.0, t0 + ms(1000));
        assert!(list.is_dragging());
        list.insert_tags(&mut node, 0, 0, "new");
        assert!(!list.is_dragging());
        press(&mut list, &mut node, PointerPhase::Up, 76.0, 70.0, t0 + ms(1100));
        assert_eq!(text_of(&node, 0), "new, a, b, c");
    }

    #[test]
    fn test_feedback_glow_expires() {
        let (mut node, mut list) = setup(["a", "b", "c", "d"]);
        let t0 = Instant::now();
        press(&mut list, &mut node, PointerPhase::Down, 300.0, 60.0, t0);
        press(&mut list, &mut node, PointerPhase::Move, 300.0, 62.0, t0 + ms(1000));

        let mut canvas = RecordingCanvas::new();
        list.on_draw(&node, &mut canvas, t0 + ms(1100));
        assert_eq!(canvas.fills_of(theme::item::GLOW).len(), 1);

        list.on_tick(&mut node, t0 + ms(1500));
        let mut canvas = RecordingCanvas::new();
        list.on_draw(&node, &mut canvas, t0 + ms(1500));
        assert!(canvas.fills_of(theme::item::GLOW).is_empty());
    }

    #[test]
    fn test_draw_shows_tags_and_placeholder() {
        let (node, list) = setup(["cat, dog", "", "", ""]);
        let mut canvas = RecordingCanvas::new();
        list.on_draw(&node, &mut canvas, Instant::now());
        let texts = canvas.texts();
        assert!(texts.contains(&"cat"));
        assert!(texts.contains(&"dog"));
        assert!(texts.contains(&"Item 2 (double-click to edit)"));
    }

    #[test]
    fn test_state_round_trip() {
        let (mut node, mut list) = setup(["a", "b", "c", "d"]);
        let mut saved = StateMap::new();
        saved.insert("itemOrder".to_string(), serde_json::json!("3,2,1,0"));
        list.on_configure(&mut node, &saved);
        assert_eq!(list.item_text(&node, 0), "d");

        let mut out = StateMap::new();
        list.on_serialize(&node, &mut out);
        assert_eq!(out.get("itemOrder"), Some(&serde_json::json!([3, 2, 1, 0])));
        assert_eq!(out.get(KEY_TEXTS), Some(&serde_json::json!(["a", "b", "c", "d"])));

        let (mut fresh_node, mut fresh) = setup(["", "", "", ""]);
        fresh.on_configure(&mut fresh_node, &out);
        assert_eq!(fresh.item_order_csv(), "3,2,1,0");
        assert_eq!(fresh.item_text(&fresh_node, 0), "d");
    }

    #[test]
    fn test_malformed_order_falls_back_to_identity() {
        let (mut node, mut list) = setup(["a", "b", "c", "d"]);
        let mut saved = StateMap::new();
        saved.insert("itemOrder".to_string(), serde_json::json!([0, 0, 1, 2]));
        list.on_configure(&mut node, &saved);
        assert_eq!(list.item_order_csv(), "0,1,2,3");
    }
}
