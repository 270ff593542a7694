//! Monotonic time source

/// Monotonic millisecond clock
///
/// Used to measure how long a frame took to draw so the per-step delay
/// can absorb render jitter.
pub trait Clock {
    /// Milliseconds elapsed since an arbitrary fixed origin (usually boot)
    fn now_ms(&self) -> u64;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
