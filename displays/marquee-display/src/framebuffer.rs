//! RGB888 frame buffer
//!
//! Statically sized so back and front buffers can live in `static`s and
//! the animation never allocates per frame.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use marquee_core::Rgb;

/// Full-color frame of `W` x `H` pixels
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer<const W: usize, const H: usize> {
    rows: [[Rgb888; W]; H],
}

impl<const W: usize, const H: usize> FrameBuffer<W, H> {
    /// All-black frame (usable in a `static`)
    pub const fn new() -> Self {
        Self {
            rows: [[Rgb888::BLACK; W]; H],
        }
    }

    pub const fn width(&self) -> usize {
        W
    }

    pub const fn height(&self) -> usize {
        H
    }

    /// Set every pixel
    pub fn fill(&mut self, color: Rgb888) {
        for row in self.rows.iter_mut() {
            row.fill(color);
        }
    }

    /// Set one pixel; coordinates off the frame are clipped
    pub fn set(&mut self, point: Point, color: Rgb888) {
        if point.x < 0 || point.y < 0 {
            return;
        }
        if let Some(pixel) = self
            .rows
            .get_mut(point.y as usize)
            .and_then(|row| row.get_mut(point.x as usize))
        {
            *pixel = color;
        }
    }

    /// Read one pixel
    pub fn get(&self, x: usize, y: usize) -> Option<Rgb888> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    /// One row of pixels
    pub fn row(&self, y: usize) -> Option<&[Rgb888; W]> {
        self.rows.get(y)
    }

    /// Overwrite this frame with `other`
    pub fn copy_from(&mut self, other: &Self) {
        self.rows = other.rows;
    }
}

impl<const W: usize, const H: usize> Default for FrameBuffer<W, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize, const H: usize> OriginDimensions for FrameBuffer<W, H> {
    fn size(&self) -> Size {
        Size::new(W as u32, H as u32)
    }
}

impl<const W: usize, const H: usize> DrawTarget for FrameBuffer<W, H> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set(point, color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color);
        Ok(())
    }
}

/// Convert a palette color to the draw target's color type
pub fn to_rgb888(color: Rgb) -> Rgb888 {
    Rgb888::new(color.r, color.g, color.b)
}
