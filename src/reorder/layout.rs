//! Geometry of a vertical item list whose items hold wrapped tag chips.

use egui::{Pos2, Rect, Vec2};

/// Layout constants for a list node.
#[derive(Clone, Debug, PartialEq)]
pub struct ListLayout {
    /// Number of item rows.
    pub item_count: usize,
    /// Space reserved above the first item (title bar and header).
    pub header_height: f32,
    /// Space reserved below the last item.
    pub footer_height: f32,
    /// Vertical gap between items.
    pub item_margin: f32,
    /// Horizontal inset of items from the node edge.
    pub side_inset: f32,
    /// Inner padding of an item.
    pub padding: f32,
    /// Height of a tag chip.
    pub tag_height: f32,
    /// Gap between tag chips, horizontally and between rows.
    pub tag_margin: f32,
    /// Horizontal padding inside a chip around its text.
    pub tag_padding: f32,
    /// Font size used for tag text.
    pub font_size: f32,
}

impl Default for ListLayout {
    fn default() -> Self {
        Self {
            item_count: 4,
            header_height: 50.0,
            footer_height: 10.0,
            item_margin: 5.0,
            side_inset: 10.0,
            padding: 8.0,
            tag_height: 24.0,
            tag_margin: 4.0,
            tag_padding: 6.0,
            font_size: 12.0,
        }
    }
}

impl ListLayout {
    /// Set the number of items.
    pub fn with_item_count(mut self, count: usize) -> Self {
        self.item_count = count;
        self
    }

    /// Bounds of every item for a node of `size`, top to bottom.
    pub fn item_rects(&self, size: Vec2) -> Vec<Rect> {
        if self.item_count == 0 {
            return Vec::new();
        }
        let gaps = self.item_margin * (self.item_count.saturating_sub(1)) as f32;
        let available = size.y - self.header_height - self.footer_height - gaps;
        let item_height = (available / self.item_count as f32).max(0.0);
        let width = (size.x - self.side_inset * 2.0).max(0.0);

        (0..self.item_count)
            .map(|i| {
                Rect::from_min_size(
                    Pos2::new(
                        self.side_inset,
                        self.header_height + i as f32 * (item_height + self.item_margin),
                    ),
                    Vec2::new(width, item_height),
                )
            })
            .collect()
    }

    /// Index of the item whose vertical extent `[top, top + height)`
    /// contains `y`.
    pub fn item_at(&self, size: Vec2, y: f32) -> Option<usize> {
        item_index_at(&self.item_rects(size), y)
    }

    /// Width of a tag chip for `text`.
    pub fn tag_width(&self, text: &str, measure: &dyn TextMeasure) -> f32 {
        measure.text_width(text, self.font_size) + self.tag_padding * 2.0
    }

    /// Bounds of the tag chips laid out inside `item`, wrapping to new rows.
    ///
    /// Chips that would overflow the bottom of the item are not laid out,
    /// so the result may be shorter than `tags`.
    pub fn tag_rects<'a, I>(&self, item: Rect, tags: I, measure: &dyn TextMeasure) -> Vec<Rect>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let start_x = item.min.x + self.padding;
        let max_width = item.width() - self.padding * 2.0;
        let mut x = start_x;
        let mut y = item.min.y + self.padding;
        let mut rects = Vec::new();

        for tag in tags {
            let width = self.tag_width(tag, measure);
            if x + width > start_x + max_width && x > start_x {
                x = start_x;
                y += self.tag_height + self.tag_margin;
            }
            if y + self.tag_height > item.max.y {
                break;
            }
            rects.push(Rect::from_min_size(Pos2::new(x, y), Vec2::new(width, self.tag_height)));
            x += width + self.tag_margin;
        }
        rects
    }
}

/// Index of the rect whose vertical extent `[top, top + height)` holds `y`.
pub fn item_index_at(rects: &[Rect], y: f32) -> Option<usize> {
    rects.iter().position(|r| y >= r.min.y && y < r.max.y)
}

/// Index of the rect containing `pos`.
pub fn rect_index_at(rects: &[Rect], pos: Pos2) -> Option<usize> {
    rects.iter().position(|r| r.contains(pos))
}

/// Text width measurement, provided by whatever renders the text.
pub trait TextMeasure {
    /// Width in pixels of `text` drawn at `font_size`.
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

/// Fixed-advance approximation of a monospace font.
///
/// Used when no renderer is available (tests, headless hosts).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonospaceMeasure {
    /// Advance of one character as a fraction of the font size.
    pub advance_ratio: f32,
}

impl Default for MonospaceMeasure {
    fn default() -> Self {
        Self { advance_ratio: 0.6 }
    }
}

impl TextMeasure for MonospaceMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.advance_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is exactly 10px wide.
    struct TenPx;

    impl TextMeasure for TenPx {
        fn text_width(&self, text: &str, _font_size: f32) -> f32 {
            text.chars().count() as f32 * 10.0
        }
    }

    #[test]
    fn test_item_rects_fill_available_height() {
        let layout = ListLayout::default();
        let rects = layout.item_rects(Vec2::new(400.0, 280.0));
        assert_eq!(rects.len(), 4);
        // (280 - 50 - 10 - 15) / 4
        let expected_height = 205.0 / 4.0;
        assert!((rects[0].height() - expected_height).abs() < 1e-4);
        assert_eq!(rects[0].min, Pos2::new(10.0, 50.0));
        assert!((rects[1].min.y - (50.0 + expected_height + 5.0)).abs() < 1e-4);
        assert_eq!(rects[3].width(), 380.0);
    }

    #[test]
    fn test_item_hit_test_is_half_open() {
        let rects = vec![
            Rect::from_min_size(Pos2::new(0.0, 0.0), Vec2::new(10.0, 10.0)),
            Rect::from_min_size(Pos2::new(0.0, 10.0), Vec2::new(10.0, 10.0)),
        ];
        assert_eq!(item_index_at(&rects, 0.0), Some(0));
        assert_eq!(item_index_at(&rects, 9.99), Some(0));
        assert_eq!(item_index_at(&rects, 10.0), Some(1));
        assert_eq!(item_index_at(&rects, 20.0), None);
    }

    #[test]
    fn test_tags_wrap_to_next_row() {
        let layout = ListLayout::default();
        let item = Rect::from_min_size(Pos2::new(0.0, 0.0), Vec2::new(116.0, 100.0));
        // chip width = 10 * chars + 12; usable width = 100
        let rects = layout.tag_rects(item, ["abcd", "efgh", "ij"], &TenPx);
        assert_eq!(rects.len(), 3);
        assert_eq!(rects[0].min, Pos2::new(8.0, 8.0));
        assert_eq!(rects[1].min, Pos2::new(8.0, 8.0 + 24.0 + 4.0));
        assert_eq!(rects[2].min.y, rects[1].min.y);
    }

    #[test]
    fn test_overflowing_tags_are_dropped() {
        let layout = ListLayout::default();
        let item = Rect::from_min_size(Pos2::new(0.0, 0.0), Vec2::new(60.0, 40.0));
        let rects = layout.tag_rects(item, ["aaaa", "bbbb", "cccc"], &TenPx);
        assert_eq!(rects.len(), 1);
    }
}
