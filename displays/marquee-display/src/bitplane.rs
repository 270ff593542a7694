//! HUB75 bit-plane packing
//!
//! A HUB75 panel with 1/(H/2) scan lights two rows at once: row `r` on the
//! R1/G1/B1 lines and row `r + H/2` on R2/G2/B2. Brightness comes from
//! binary-coded modulation: plane `n` holds bit `n` of every channel and is
//! shown for a time proportional to `2^n`.
//!
//! Each column becomes one byte `0b00_B2G2R2_B1G1R1`; four columns are
//! packed little-end-first into a `u32` for the PIO shifter.

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;

use crate::framebuffer::FrameBuffer;
use crate::surface::DisplayError;

/// Number of bit planes per channel
pub const BIT_PLANES: u8 = 8;

/// Columns packed into one FIFO word
pub const COLUMNS_PER_WORD: usize = 4;

/// Approximate gamma 2.0 so low levels are distinguishable on LEDs
pub const fn gamma(level: u8) -> u8 {
    ((level as u16 * level as u16 + 254) / 255) as u8
}

fn column_bits(pixel: Rgb888, plane: u8) -> u8 {
    let bit = |level: u8| (gamma(level) >> plane) & 1;
    bit(pixel.r()) | bit(pixel.g()) << 1 | bit(pixel.b()) << 2
}

/// Pack one row pair of one bit plane into `out`
///
/// `row` selects the upper row (0..H/2). `out` needs `W / 4` words.
pub fn pack_row<const W: usize, const H: usize>(
    frame: &FrameBuffer<W, H>,
    row: usize,
    plane: u8,
    out: &mut [u32],
) -> Result<(), DisplayError> {
    let half = H / 2;
    if row >= half || plane >= BIT_PLANES {
        return Err(DisplayError::InvalidCoordinates);
    }
    let words = W.div_ceil(COLUMNS_PER_WORD);
    if out.len() < words {
        return Err(DisplayError::BufferOverflow);
    }
    let (Some(upper), Some(lower)) = (frame.row(row), frame.row(row + half)) else {
        return Err(DisplayError::InvalidCoordinates);
    };

    out[..words].fill(0);
    for (x, (top, bottom)) in upper.iter().zip(lower.iter()).enumerate() {
        let bits = column_bits(*top, plane) | column_bits(*bottom, plane) << 3;
        out[x / COLUMNS_PER_WORD] |= (bits as u32) << ((x % COLUMNS_PER_WORD) * 8);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gamma_endpoints() {
        assert_eq!(gamma(0), 0);
        assert_eq!(gamma(255), 255);
        assert_eq!(gamma(1), 1);
        assert_eq!(gamma(128), 65);
    }

    #[test]
    fn test_pack_upper_and_lower_rows() {
        let mut frame = FrameBuffer::<8, 4>::new();
        frame.set(Point::new(0, 0), Rgb888::RED);
        frame.set(Point::new(1, 2), Rgb888::BLUE);
        frame.set(Point::new(5, 0), Rgb888::WHITE);

        let mut out = [0u32; 2];
        pack_row(&frame, 0, 7, &mut out).unwrap();

        // Column 0: R1; column 1: B2
        assert_eq!(out[0], 0b000_001 | (0b100_000 << 8));
        // Column 5: R1 G1 B1
        assert_eq!(out[1], 0b000_111 << 8);
    }

    #[test]
    fn test_dim_pixel_only_in_low_planes() {
        let mut frame = FrameBuffer::<4, 2>::new();
        // gamma(16) = 2: only plane 1 is set
        frame.set(Point::new(0, 0), Rgb888::new(16, 0, 0));

        let mut out = [0u32; 1];
        pack_row(&frame, 0, 1, &mut out).unwrap();
        assert_eq!(out[0], 1);
        pack_row(&frame, 0, 0, &mut out).unwrap();
        assert_eq!(out[0], 0);
    }

    #[test]
    fn test_pack_rejects_bad_arguments() {
        let frame = FrameBuffer::<8, 4>::new();
        let mut out = [0u32; 2];
        assert_eq!(
            pack_row(&frame, 2, 0, &mut out),
            Err(DisplayError::InvalidCoordinates)
        );
        assert_eq!(
            pack_row(&frame, 0, BIT_PLANES, &mut out),
            Err(DisplayError::InvalidCoordinates)
        );
        assert_eq!(
            pack_row(&frame, 0, 0, &mut out[..1]),
            Err(DisplayError::BufferOverflow)
        );
    }
}
