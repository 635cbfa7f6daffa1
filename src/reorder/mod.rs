//! Reorder module
//!
//! Ordered collections that are rearranged by dragging: the display order
//! of a fixed set of items, tag sequences inside an item, the engine that
//! computes insertion indices from the pointer, and the list geometry it
//! hit-tests against.

mod engine;
mod layout;
mod ordered_list;
mod tags;

pub use engine::{ActiveDrag, Moved, ReorderEngine};
pub use layout::{item_index_at, rect_index_at, ListLayout, MonospaceMeasure, TextMeasure};
pub use ordered_list::{move_element, OrderedList};
pub use tags::TagSequence;

use thiserror::Error;

/// Errors raised while building or parsing an order.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReorderError {
    /// An entry is not a valid index for the collection.
    #[error("invalid index '{0}'")]
    InvalidIndex(String),
    /// The same index appears twice.
    #[error("index {0} appears more than once")]
    DuplicateIndex(usize),
    /// The order does not cover the collection exactly.
    #[error("order has {found} entries, expected {expected}")]
    LengthMismatch { found: usize, expected: usize },
}
