//! HUB75 shift clock and modulation timing
//!
//! The PIO program spends two instructions per column (data with CLK low,
//! then CLK high), so the shift clock is `SYS_CLK / (divider * 2)`.
//!
//! Bit plane `n` is lit for `base_on_us << n`, which gives binary-coded
//! modulation: the perceived level of a channel is the sum of the planes
//! whose bit is set.

use marquee_display::BIT_PLANES;

/// System clock frequency (RP2040 default)
pub const SYS_CLK_HZ: u32 = 125_000_000;

/// Fastest shift clock most HUB75 panels accept
pub const MAX_SHIFT_HZ: u32 = 25_000_000;

/// Instructions executed per shifted column
const INSTRUCTIONS_PER_COLUMN: u32 = 2;

/// Refresh timing for one panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hub75Timing {
    /// Column shift clock in Hz
    pub shift_hz: u32,
    /// On-time of the least significant plane in microseconds
    pub base_on_us: u32,
    /// Number of planes shown (from the most significant down)
    pub planes: u8,
}

impl Default for Hub75Timing {
    fn default() -> Self {
        Self {
            shift_hz: 12_500_000,
            base_on_us: 1,
            planes: BIT_PLANES,
        }
    }
}

impl Hub75Timing {
    /// First plane shown; dropping low planes trades colour depth for refresh rate
    pub fn first_plane(&self) -> u8 {
        BIT_PLANES - self.planes.clamp(1, BIT_PLANES)
    }

    /// How long plane `plane` stays lit
    pub fn plane_on_us(&self, plane: u8) -> u32 {
        self.base_on_us.max(1) << plane.min(BIT_PLANES - 1)
    }

    /// Lit time of one row pair across all shown planes
    pub fn row_on_us(&self) -> u32 {
        (self.first_plane()..BIT_PLANES)
            .map(|plane| self.plane_on_us(plane))
            .sum()
    }

    /// Time to shift one row of `columns` into the panel
    pub fn shift_us(&self, columns: usize) -> u32 {
        let hz = self.shift_hz.clamp(1, MAX_SHIFT_HZ);
        (columns as u64 * 1_000_000).div_ceil(hz as u64) as u32
    }

    /// Estimated full-frame refresh rate, ignoring address and latch overhead
    pub fn refresh_hz(&self, columns: usize, row_pairs: usize) -> u32 {
        let planes = (BIT_PLANES - self.first_plane()) as u32;
        let per_row = self.row_on_us() + planes * self.shift_us(columns);
        let frame_us = per_row * row_pairs.max(1) as u32;
        1_000_000 / frame_us.max(1)
    }
}

/// Calculate the PIO clock divider for a shift clock
///
/// Returns (integer_part, fractional_part) for the 16.8 fixed-point divider.
/// Frequencies above [`MAX_SHIFT_HZ`] are clamped.
pub fn calc_clock_divider(shift_hz: u32) -> (u16, u8) {
    if shift_hz == 0 {
        return (0xFFFF, 0xFF);
    }

    let divisor = shift_hz.min(MAX_SHIFT_HZ) * INSTRUCTIONS_PER_COLUMN;
    let divider_x256 = (SYS_CLK_HZ as u64 * 256) / (divisor as u64);

    let int_part = (divider_x256 / 256).min(0xFFFF) as u16;
    let frac_part = (divider_x256 % 256) as u8;

    (int_part, frac_part)
}
