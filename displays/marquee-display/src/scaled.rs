//! Integer-scaled drawing
//!
//! Fonts are drawn at their native size into a virtual space anchored at
//! `origin`; every virtual pixel becomes a `scale` x `scale` block.

use embedded_graphics::prelude::*;

/// Draw target adapter magnifying by an integer factor
pub struct ScaledTarget<'a, T> {
    inner: &'a mut T,
    origin: Point,
    scale: i32,
}

impl<'a, T> ScaledTarget<'a, T>
where
    T: DrawTarget + OriginDimensions,
{
    /// Wrap `inner`; a scale of 0 is treated as 1
    pub fn new(inner: &'a mut T, origin: Point, scale: u8) -> Self {
        Self {
            inner,
            origin,
            scale: scale.max(1) as i32,
        }
    }
}

impl<'a, T> OriginDimensions for ScaledTarget<'a, T>
where
    T: DrawTarget + OriginDimensions,
{
    fn size(&self) -> Size {
        self.inner.size() / self.scale as u32
    }
}

impl<'a, T> DrawTarget for ScaledTarget<'a, T>
where
    T: DrawTarget + OriginDimensions,
{
    type Color = T::Color;
    type Error = T::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (origin, scale) = (self.origin, self.scale);
        self.inner.draw_iter(pixels.into_iter().flat_map(move |Pixel(p, color)| {
            let base = origin + p * scale;
            (0..scale * scale).map(move |i| Pixel(base + Point::new(i % scale, i / scale), color))
        }))
    }
}
