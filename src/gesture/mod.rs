//! Gesture module
//!
//! Pointer gesture classification (click / double-click / drag) and the
//! per-frame smoothing used for animated widget feedback.

mod classifier;
mod smoothing;

pub use classifier::{Gesture, GestureClassifier, GestureConfig, PointerEvent};
pub use smoothing::SmoothedPosition;
