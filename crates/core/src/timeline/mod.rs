/// Monotonic animation clock in seconds, advanced once per rendered frame.
///
/// Continuous motion phase, gesture start and gesture expiry all read this
/// one clock.
#[derive(Debug, Default, Clone)]
pub struct AnimationClock {
    elapsed: f64,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.elapsed
    }

    /// Moves the clock forward. Negative or non-finite deltas are ignored.
    pub fn advance(&mut self, delta: f64) -> f64 {
        if delta.is_finite() && delta > 0.0 {
            self.elapsed += delta;
        }
        self.elapsed
    }
}
