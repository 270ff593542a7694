//! Board status indicator trait

/// Single on/off status indicator (typically an LED)
///
/// Implementations handle pin polarity; `set(true)` always means lit.
pub trait Indicator {
    /// Light or extinguish the indicator
    fn set(&mut self, on: bool);

    /// Current logical state
    fn is_on(&self) -> bool;

    /// Flip the indicator and return the new state
    fn toggle(&mut self) -> bool {
        let next = !self.is_on();
        self.set(next);
        next
    }
}
