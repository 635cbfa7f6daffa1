//! Drag-driven reordering of a collection.
//!
//! The engine owns only the transient drag state. The collection itself is
//! passed in on commit, so one engine can serve a list of items as well as
//! the tags inside one item.

use egui::{Pos2, Rect};

use super::layout::{item_index_at, rect_index_at};
use super::ordered_list::move_element;

/// State of a drag that has been promoted from a pending gesture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveDrag {
    /// Index of the element being moved.
    pub source: usize,
    /// Element currently under the pointer, if any.
    pub hover: Option<usize>,
    /// Where the element would land if dropped now (pre-removal index).
    pub insertion: Option<usize>,
}

/// A committed move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Moved {
    pub from: usize,
    pub to: usize,
}

/// Reorder state machine for one collection.
#[derive(Clone, Debug, Default)]
pub struct ReorderEngine {
    drag: Option<ActiveDrag>,
}

impl ReorderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts dragging the element at `source`. Does not touch the order.
    pub fn begin_drag(&mut self, source: usize) {
        log::debug!("reorder: begin drag of {}", source);
        self.drag = Some(ActiveDrag {
            source,
            hover: None,
            insertion: None,
        });
    }

    /// The drag in progress, if any.
    pub fn active(&self) -> Option<&ActiveDrag> {
        self.drag.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Updates the hover for a vertical list of items.
    ///
    /// The hovered item is the one whose `[top, top + height)` band holds the
    /// pointer. Dropping lands the dragged item in the hovered item's slot, so
    /// the insertion index is one past the hovered item when moving down.
    /// A pointer outside every item keeps the previous hover.
    pub fn hover_vertical(&mut self, pointer: Pos2, item_rects: &[Rect]) -> Option<usize> {
        let drag = self.drag.as_mut()?;
        if let Some(hovered) = item_index_at(item_rects, pointer.y) {
            drag.hover = Some(hovered);
            drag.insertion = Some(if drag.source < hovered {
                hovered + 1
            } else {
                hovered
            });
        }
        drag.insertion
    }

    /// Updates the hover for chips laid out left-to-right with wrapping.
    ///
    /// Over a chip, the insertion index is the chip's index when the pointer
    /// is left of its horizontal midpoint and one past it otherwise. Inside
    /// the item but left of the first chip gives `0`, right of the last chip
    /// gives the chip count. Anywhere else inside the item keeps the previous
    /// hover; outside the item the hover is cleared.
    pub fn hover_wrapped(&mut self, pointer: Pos2, item: Rect, tag_rects: &[Rect]) -> Option<usize> {
        let drag = self.drag.as_mut()?;
        let len = tag_rects.len();

        if let Some(index) = rect_index_at(tag_rects, pointer) {
            let rect = tag_rects[index];
            let insertion = if pointer.x < rect.center().x { index } else { index + 1 };
            drag.hover = Some(index);
            drag.insertion = Some(insertion.min(len));
            return drag.insertion;
        }

        let inside_item = pointer.y >= item.min.y && pointer.y < item.max.y;
        if !inside_item {
            drag.hover = None;
            drag.insertion = None;
            return None;
        }

        match (tag_rects.first(), tag_rects.last()) {
            (None, _) | (_, None) => {
                drag.hover = None;
                drag.insertion = Some(0);
            }
            (Some(first), Some(last)) => {
                if pointer.x < first.min.x {
                    drag.hover = Some(0);
                    drag.insertion = Some(0);
                } else if pointer.x > last.max.x {
                    drag.hover = Some(len - 1);
                    drag.insertion = Some(len);
                }
            }
        }
        drag.insertion
    }

    /// Seeds the insertion index from which half of the dragged element
    /// the pointer is on, before any hover update has happened.
    pub fn seed_from_source(&mut self, pointer: Pos2, source_rect: Option<Rect>) {
        if let Some(drag) = self.drag.as_mut() {
            let left_half = source_rect.map_or(true, |r| pointer.x < r.center().x);
            drag.hover = Some(drag.source);
            drag.insertion = Some(if left_half { drag.source } else { drag.source + 1 });
        }
    }

    /// Overrides the insertion index directly.
    pub fn set_insertion(&mut self, insertion: Option<usize>) {
        if let Some(drag) = self.drag.as_mut() {
            drag.insertion = insertion;
        }
    }

    /// Moves `source` to `insertion` in `items`, ending the drag.
    ///
    /// Nothing happens (and `None` is returned) when no drag for `source` is
    /// in progress, when the move resolves to the same position, or when
    /// `source` no longer exists in `items`. The drag state is cleared in
    /// every case, so repeating a commit is always a no-op.
    pub fn commit<T>(&mut self, items: &mut Vec<T>, source: usize, insertion: usize) -> Option<Moved> {
        let drag = self.drag.take()?;
        if drag.source != source {
            log::debug!("reorder: commit for {} does not match drag of {}", source, drag.source);
            return None;
        }
        if source >= items.len() {
            log::warn!("reorder: source {} vanished before commit (len {})", source, items.len());
            return None;
        }
        let to = move_element(items, source, insertion)?;
        log::debug!("reorder: moved {} -> {}", source, to);
        Some(Moved { from: source, to })
    }

    /// Commits the drag at its current hover position.
    pub fn drop_into<T>(&mut self, items: &mut Vec<T>) -> Option<Moved> {
        let (source, insertion) = {
            let drag = self.drag.as_ref()?;
            (drag.source, drag.insertion)
        };
        match insertion {
            Some(insertion) => self.commit(items, source, insertion),
            None => {
                self.cancel();
                None
            }
        }
    }

    /// Tells the engine that the element at `index` was removed externally.
    ///
    /// Any drag in progress is cancelled, because the indices it recorded
    /// no longer describe the collection.
    pub fn element_removed(&mut self, index: usize) {
        if let Some(drag) = self.drag.take() {
            log::debug!("reorder: element {} removed during drag of {}; cancelled", index, drag.source);
        }
    }

    /// Discards the drag. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        self.drag = None;
    }
}
