//! Per-frame smoothing of a displayed position toward a target.
//!
//! There is no scheduler: the owner calls [`SmoothedPosition::advance`]
//! once per redraw tick and the displayed value closes a fixed fraction of
//! the remaining distance each time.

/// A displayed position that converges toward its target on every tick.
///
/// # Example
///
/// ```ignore
/// let mut thumb = SmoothedPosition::new(0.0);
/// thumb.set_target(100.0);
///
/// // Once per frame
/// let x = thumb.advance();
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SmoothedPosition {
    /// Currently displayed value.
    current: f32,
    /// Value we are converging toward.
    target: f32,
    /// Fraction of the remaining distance covered per tick (0-1).
    rate: f32,
    /// Distance below which the value snaps onto the target.
    snap_distance: f32,
}

impl SmoothedPosition {
    /// Default convergence rate: half the remaining distance per frame.
    pub const DEFAULT_RATE: f32 = 0.5;

    /// Default snap distance, in the same units as the value.
    pub const DEFAULT_SNAP: f32 = 0.5;

    /// Creates a settled position.
    pub fn new(initial: f32) -> Self {
        Self::with_rate(initial, Self::DEFAULT_RATE, Self::DEFAULT_SNAP)
    }

    /// Creates a settled position with custom convergence parameters.
    ///
    /// A rate of `1.0` or more jumps straight to the target; a rate of zero
    /// or less is treated as `1.0` as well so the position can never stall.
    pub fn with_rate(initial: f32, rate: f32, snap_distance: f32) -> Self {
        let rate = if rate <= 0.0 || rate > 1.0 { 1.0 } else { rate };
        Self {
            current: initial,
            target: initial,
            rate,
            snap_distance: snap_distance.max(0.0),
        }
    }

    /// Sets a new target to converge toward.
    #[inline]
    pub fn set_target(&mut self, value: f32) {
        self.target = value;
    }

    /// The current target.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// The displayed value without advancing.
    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Advances one tick and returns the new displayed value.
    pub fn advance(&mut self) -> f32 {
        let diff = self.target - self.current;
        if diff.abs() <= self.snap_distance {
            self.current = self.target;
        } else {
            self.current += diff * self.rate;
        }
        self.current
    }

    /// Jumps to `value` immediately.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Whether further ticks would still move the value.
    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.current != self.target
    }
}

impl Default for SmoothedPosition {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_value_is_settled() {
        let p = SmoothedPosition::new(40.0);
        assert_eq!(p.current(), 40.0);
        assert_eq!(p.target(), 40.0);
        assert!(!p.is_smoothing());
    }

    #[test]
    fn test_halves_remaining_distance() {
        let mut p = SmoothedPosition::new(0.0);
        p.set_target(100.0);
        assert_eq!(p.current(), 0.0); // unchanged until advanced
        assert_eq!(p.advance(), 50.0);
        assert_eq!(p.advance(), 75.0);
        assert_eq!(p.advance(), 87.5);
    }

    #[test]
    fn test_snaps_when_close() {
        let mut p = SmoothedPosition::new(0.0);
        p.set_target(100.0);
        let mut ticks = 0;
        while p.is_smoothing() {
            p.advance();
            ticks += 1;
            assert!(ticks < 32, "did not converge");
        }
        assert_eq!(p.current(), 100.0);
    }

    #[test]
    fn test_set_immediate() {
        let mut p = SmoothedPosition::new(0.0);
        p.set_target(10.0);
        p.set_immediate(3.0);
        assert_eq!(p.current(), 3.0);
        assert!(!p.is_smoothing());
    }

    #[test]
    fn test_invalid_rate_jumps() {
        let mut p = SmoothedPosition::with_rate(0.0, 0.0, 0.0);
        p.set_target(7.0);
        assert_eq!(p.advance(), 7.0);
    }
}
