//! GPIO status indicators
//!
//! Board LEDs driven through an `embedded-hal` output pin. The RGB LED on
//! Interstate75 boards is wired active-low.

use embedded_hal::digital::OutputPin;
use marquee_core::traits::Indicator;

/// Heartbeat toggle period
pub const HEARTBEAT_PERIOD_MS: u64 = 500;

/// LED on a GPIO pin
///
/// The pin can be configured as active-high (default) or active-low.
pub struct GpioIndicator<P> {
    pin: P,
    /// If true, indicator ON = pin LOW
    inverted: bool,
    /// Current logical state (true = lit)
    on: bool,
}

impl<P: OutputPin> GpioIndicator<P> {
    /// Create a new indicator, initially off
    ///
    /// # Arguments
    /// - `pin`: The GPIO pin to control
    /// - `inverted`: If true, the LED is lit when the pin is LOW
    pub fn new(pin: P, inverted: bool) -> Self {
        let mut indicator = Self {
            pin,
            inverted,
            on: false,
        };
        indicator.set(false);
        indicator
    }

    pub fn new_active_high(pin: P) -> Self {
        Self::new(pin, false)
    }

    pub fn new_active_low(pin: P) -> Self {
        Self::new(pin, true)
    }
}

impl<P: OutputPin> Indicator for GpioIndicator<P> {
    fn set(&mut self, on: bool) {
        self.on = on;

        // GPIO writes on the supported boards are infallible
        let _ = if on != self.inverted {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

/// Liveness blinker, independent of network state
pub struct Heartbeat<I> {
    indicator: I,
    beats: u32,
}

impl<I: Indicator> Heartbeat<I> {
    pub fn new(indicator: I) -> Self {
        Self {
            indicator,
            beats: 0,
        }
    }

    /// Toggle the indicator; call every [`HEARTBEAT_PERIOD_MS`]
    ///
    /// Returns the new indicator state.
    pub fn beat(&mut self) -> bool {
        self.beats = self.beats.wrapping_add(1);
        self.indicator.toggle()
    }

    /// Number of toggles so far
    pub fn beats(&self) -> u32 {
        self.beats
    }
}
