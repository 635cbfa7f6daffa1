//! Pointer gesture classification.
//!
//! Turns raw pointer down/move/up/leave events into discrete intents:
//! click, double-click, drag start, drag move, drag end and drag cancel.
//!
//! A pointer-down over a target only *arms* a pending gesture. Nothing
//! visible happens until either the pointer is released (a click) or the
//! pointer has moved far enough *and* been held long enough to promote the
//! gesture into a drag. Moves that arrive while a gesture is pending are
//! swallowed so the host does not react to them.

use egui::Pos2;
use std::time::{Duration, Instant};

/// Thresholds for the gesture classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureConfig {
    /// Two presses on the same target within this window form a double-click.
    pub double_click_window: Duration,
    /// Minimum time between press and promotion to a drag.
    pub hold_delay: Duration,
    /// Minimum per-axis displacement (pixels) before a drag may start.
    /// Zero means any move qualifies once the hold delay has elapsed.
    pub move_threshold: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self::widget()
    }
}

impl GestureConfig {
    /// Thresholds for simple widgets: drag starts on the first move.
    pub fn widget() -> Self {
        Self {
            double_click_window: Duration::from_millis(300),
            hold_delay: Duration::ZERO,
            move_threshold: 0.0,
        }
    }

    /// Thresholds for reorderable list items and tags.
    ///
    /// A one-second hold is required so that clicks and text selection are
    /// never mistaken for a reorder.
    pub fn list_item() -> Self {
        Self {
            double_click_window: Duration::from_millis(300),
            hold_delay: Duration::from_millis(1000),
            move_threshold: 0.0,
        }
    }

    /// Set the hold delay.
    pub fn with_hold_delay(mut self, delay: Duration) -> Self {
        self.hold_delay = delay;
        self
    }

    /// Set the movement threshold.
    pub fn with_move_threshold(mut self, pixels: f32) -> Self {
        self.move_threshold = pixels.max(0.0);
        self
    }

    /// Set the double-click window.
    pub fn with_double_click_window(mut self, window: Duration) -> Self {
        self.double_click_window = window;
        self
    }
}

/// A raw pointer event in node-local coordinates.
///
/// `Down` carries the hit-test result for the press position; `None` means
/// nothing interactive is under the pointer.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerEvent<T> {
    Down { pos: Pos2, target: Option<T> },
    Move { pos: Pos2 },
    Up { pos: Pos2 },
    Leave,
}

/// A classified pointer intent.
#[derive(Clone, Debug, PartialEq)]
pub enum Gesture<T> {
    /// Press and release without promotion to a drag.
    Click(T),
    /// Second press on the same target within the double-click window.
    DoubleClick(T),
    /// The pending gesture was promoted to a drag.
    DragStart { target: T, origin: Pos2, pos: Pos2 },
    /// Pointer moved while dragging.
    DragMove(Pos2),
    /// Pointer released while dragging.
    DragEnd(Pos2),
    /// Drag abandoned without commit.
    DragCancel,
}

/// Press recorded between pointer-down and promotion or release.
#[derive(Clone, Debug)]
struct PendingGesture<T> {
    origin: Pos2,
    started: Instant,
    target: T,
}

/// A drag in progress.
#[derive(Clone, Debug)]
struct ActiveGesture<T> {
    target: T,
    last_pos: Pos2,
}

/// Stateful pointer gesture classifier.
///
/// Time is passed in explicitly so that hosts can drive it from their own
/// clock and tests stay deterministic.
#[derive(Clone, Debug)]
pub struct GestureClassifier<T> {
    config: GestureConfig,
    pending: Option<PendingGesture<T>>,
    active: Option<ActiveGesture<T>>,
    last_press: Option<(T, Instant)>,
}

impl<T: Clone + PartialEq> GestureClassifier<T> {
    /// Create a classifier with the given thresholds.
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            pending: None,
            active: None,
            last_press: None,
        }
    }

    /// The thresholds in use.
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Feed one pointer event, returning the intent it produced (if any).
    pub fn process(&mut self, event: PointerEvent<T>, now: Instant) -> Option<Gesture<T>> {
        match event {
            PointerEvent::Down { pos, target } => self.pointer_down(pos, target, now),
            PointerEvent::Move { pos } => self.pointer_move(pos, now),
            PointerEvent::Up { pos } => self.pointer_up(pos),
            PointerEvent::Leave => self.pointer_leave(),
        }
    }

    /// Pointer pressed at `pos` over `target`.
    pub fn pointer_down(&mut self, pos: Pos2, target: Option<T>, now: Instant) -> Option<Gesture<T>> {
        let target = target?;

        // A stray press while dragging is ignored; the drag ends on release.
        if self.active.is_some() {
            return None;
        }

        let is_double = self.last_press.as_ref().is_some_and(|(last, at)| {
            *last == target && now.saturating_duration_since(*at) < self.config.double_click_window
        });

        if is_double {
            self.pending = None;
            self.last_press = None;
            return Some(Gesture::DoubleClick(target));
        }

        self.last_press = Some((target.clone(), now));
        self.pending = Some(PendingGesture {
            origin: pos,
            started: now,
            target,
        });
        None
    }

    /// Pointer moved to `pos`.
    pub fn pointer_move(&mut self, pos: Pos2, now: Instant) -> Option<Gesture<T>> {
        if let Some(active) = self.active.as_mut() {
            active.last_pos = pos;
            return Some(Gesture::DragMove(pos));
        }

        let pending = self.pending.as_ref()?;
        let dx = (pos.x - pending.origin.x).abs();
        let dy = (pos.y - pending.origin.y).abs();
        let moved = dx >= self.config.move_threshold || dy >= self.config.move_threshold;
        let held = now.saturating_duration_since(pending.started) >= self.config.hold_delay;

        if !(moved && held) {
            return None;
        }

        let pending = self.pending.take()?;
        log::debug!("gesture promoted to drag after {:?}", now.saturating_duration_since(pending.started));
        self.active = Some(ActiveGesture {
            target: pending.target.clone(),
            last_pos: pos,
        });
        Some(Gesture::DragStart {
            target: pending.target,
            origin: pending.origin,
            pos,
        })
    }

    /// Pointer released at `pos`.
    pub fn pointer_up(&mut self, pos: Pos2) -> Option<Gesture<T>> {
        if self.active.take().is_some() {
            self.pending = None;
            return Some(Gesture::DragEnd(pos));
        }
        self.pending.take().map(|pending| Gesture::Click(pending.target))
    }

    /// Pointer left the node.
    pub fn pointer_leave(&mut self) -> Option<Gesture<T>> {
        self.cancel()
    }

    /// Abandon any pending or active gesture.
    ///
    /// Returns `DragCancel` only if a drag was active. Safe to call any
    /// number of times.
    pub fn cancel(&mut self) -> Option<Gesture<T>> {
        self.pending = None;
        self.active.take().map(|_| Gesture::DragCancel)
    }

    /// Cancel tracking if it refers to `target`, e.g. because the element
    /// was deleted externally.
    pub fn cancel_target(&mut self, target: &T) -> Option<Gesture<T>> {
        if self.pending.as_ref().is_some_and(|p| p.target == *target) {
            self.pending = None;
        }
        if self.last_press.as_ref().is_some_and(|(t, _)| t == target) {
            self.last_press = None;
        }
        if self.active.as_ref().is_some_and(|a| a.target == *target) {
            self.active = None;
            return Some(Gesture::DragCancel);
        }
        None
    }

    /// Whether a press is armed but not yet promoted.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Whether pointer moves should be consumed rather than passed on.
    pub fn wants_pointer(&self) -> bool {
        self.pending.is_some() || self.active.is_some()
    }

    /// The target being dragged, if any.
    pub fn drag_target(&self) -> Option<&T> {
        self.active.as_ref().map(|a| &a.target)
    }

    /// Last pointer position seen during the current drag.
    pub fn drag_position(&self) -> Option<Pos2> {
        self.active.as_ref().map(|a| a.last_pos)
    }

    /// Return to the idle state, forgetting click history as well.
    pub fn reset(&mut self) {
        self.pending = None;
        self.active = None;
        self.last_press = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn collect(
        classifier: &mut GestureClassifier<u32>,
        events: Vec<(PointerEvent<u32>, Duration)>,
        t0: Instant,
    ) -> Vec<Gesture<u32>> {
        events
            .into_iter()
            .filter_map(|(event, offset)| classifier.process(event, t0 + offset))
            .collect()
    }

    #[test]
    fn test_quick_release_is_single_click() {
        let mut c = GestureClassifier::new(GestureConfig::list_item());
        let t0 = Instant::now();
        let p = Pos2::new(10.0, 10.0);

        let out = collect(
            &mut c,
            vec![
                (PointerEvent::Down { pos: p, target: Some(7) }, ms(0)),
                (PointerEvent::Up { pos: p }, ms(50)),
            ],
            t0,
        );

        assert_eq!(out, vec![Gesture::Click(7)]);
        assert!(!c.wants_pointer());
    }

    #[test]
    fn test_moves_before_hold_delay_are_swallowed() {
        let mut c = GestureClassifier::new(GestureConfig::list_item());
        let t0 = Instant::now();

        c.pointer_down(Pos2::new(0.0, 0.0), Some(1), t0);
        assert_eq!(c.pointer_move(Pos2::new(30.0, 0.0), t0 + ms(200)), None);
        assert!(c.is_pending());
        assert!(c.wants_pointer());
        assert!(!c.is_dragging());
    }

    #[test]
    fn test_drag_promotion_sequence() {
        let mut c = GestureClassifier::new(GestureConfig::list_item());
        let t0 = Instant::now();
        let origin = Pos2::new(5.0, 5.0);

        let out = collect(
            &mut c,
            vec![
                (PointerEvent::Down { pos: origin, target: Some(2) }, ms(0)),
                (PointerEvent::Move { pos: Pos2::new(6.0, 5.0) }, ms(500)),
                (PointerEvent::Move { pos: Pos2::new(8.0, 5.0) }, ms(1000)),
                (PointerEvent::Move { pos: Pos2::new(20.0, 5.0) }, ms(1100)),
                (PointerEvent::Up { pos: Pos2::new(20.0, 5.0) }, ms(1200)),
            ],
            t0,
        );

        assert_eq!(
            out,
            vec![
                Gesture::DragStart {
                    target: 2,
                    origin,
                    pos: Pos2::new(8.0, 5.0)
                },
                Gesture::DragMove(Pos2::new(20.0, 5.0)),
                Gesture::DragEnd(Pos2::new(20.0, 5.0)),
            ]
        );
    }

    #[test]
    fn test_movement_threshold_gates_promotion() {
        let config = GestureConfig::widget().with_move_threshold(4.0);
        let mut c = GestureClassifier::new(config);
        let t0 = Instant::now();

        c.pointer_down(Pos2::new(0.0, 0.0), Some(1), t0);
        assert_eq!(c.pointer_move(Pos2::new(3.0, 3.0), t0 + ms(10)), None);
        assert!(matches!(
            c.pointer_move(Pos2::new(0.0, 4.0), t0 + ms(20)),
            Some(Gesture::DragStart { target: 1, .. })
        ));
    }

    #[test]
    fn test_double_click_skips_drag_arming() {
        let mut c = GestureClassifier::new(GestureConfig::list_item());
        let t0 = Instant::now();
        let p = Pos2::new(1.0, 1.0);

        let out = collect(
            &mut c,
            vec![
                (PointerEvent::Down { pos: p, target: Some(3) }, ms(0)),
                (PointerEvent::Up { pos: p }, ms(40)),
                (PointerEvent::Down { pos: p, target: Some(3) }, ms(120)),
                (PointerEvent::Up { pos: p }, ms(160)),
            ],
            t0,
        );

        assert_eq!(out, vec![Gesture::Click(3), Gesture::DoubleClick(3)]);
        assert!(!c.is_pending());
    }

    #[test]
    fn test_double_click_requires_same_target_and_window() {
        let mut c = GestureClassifier::new(GestureConfig::widget());
        let t0 = Instant::now();
        let p = Pos2::new(1.0, 1.0);

        c.pointer_down(p, Some(1), t0);
        c.pointer_up(p);
        assert_eq!(c.pointer_down(p, Some(2), t0 + ms(100)), None);
        c.pointer_up(p);
        assert_eq!(c.pointer_down(p, Some(2), t0 + ms(500)), None);
    }

    #[test]
    fn test_double_click_recognized_after_cancelled_drag() {
        let mut c = GestureClassifier::new(GestureConfig::widget());
        let t0 = Instant::now();
        let p = Pos2::new(1.0, 1.0);

        c.pointer_down(p, Some(9), t0);
        assert!(matches!(
            c.pointer_move(Pos2::new(4.0, 1.0), t0 + ms(10)),
            Some(Gesture::DragStart { .. })
        ));
        assert_eq!(c.pointer_leave(), Some(Gesture::DragCancel));
        assert_eq!(c.pointer_down(p, Some(9), t0 + ms(200)), Some(Gesture::DoubleClick(9)));
    }

    #[test]
    fn test_down_without_target_is_noop() {
        let mut c: GestureClassifier<u32> = GestureClassifier::new(GestureConfig::widget());
        let t0 = Instant::now();
        assert_eq!(c.pointer_down(Pos2::ZERO, None, t0), None);
        assert!(!c.wants_pointer());
        assert_eq!(c.pointer_up(Pos2::ZERO), None);
    }

    #[test]
    fn test_leave_while_pending_discards_silently() {
        let mut c = GestureClassifier::new(GestureConfig::list_item());
        let t0 = Instant::now();
        c.pointer_down(Pos2::ZERO, Some(1), t0);
        assert_eq!(c.pointer_leave(), None);
        assert_eq!(c.pointer_up(Pos2::ZERO), None);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut c = GestureClassifier::new(GestureConfig::widget());
        let t0 = Instant::now();
        c.pointer_down(Pos2::ZERO, Some(1), t0);
        c.pointer_move(Pos2::new(1.0, 0.0), t0);
        assert_eq!(c.cancel(), Some(Gesture::DragCancel));
        assert_eq!(c.cancel(), None);
        assert_eq!(c.cancel(), None);
    }

    #[test]
    fn test_cancel_target_only_affects_matching_drag() {
        let mut c = GestureClassifier::new(GestureConfig::widget());
        let t0 = Instant::now();
        c.pointer_down(Pos2::ZERO, Some(4), t0);
        c.pointer_move(Pos2::new(2.0, 0.0), t0);

        assert_eq!(c.cancel_target(&5), None);
        assert!(c.is_dragging());
        assert_eq!(c.cancel_target(&4), Some(Gesture::DragCancel));
        assert!(!c.is_dragging());
    }
}
