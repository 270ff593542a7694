//! Pixel surface the banner frames are drawn on

use crate::color::Rgb;

/// Drawing target for banner frames
///
/// Coordinates are signed because lines are drawn partially above the top
/// edge while scrolling out. Implementations clip anything off-screen.
pub trait Surface {
    /// Error raised while drawing or flipping
    type Error;

    /// Visible width in pixels
    fn width(&self) -> u16;

    /// Visible height in pixels
    fn height(&self) -> u16;

    /// Height of one text line at `scale`
    fn line_height(&self, scale: u8) -> u16;

    /// Width in pixels of `text` rendered at `scale`
    fn measure_text(&self, text: &str, scale: u8) -> u32;

    /// Fill the whole drawing buffer with `color`
    fn clear(&mut self, color: Rgb) -> Result<(), Self::Error>;

    /// Draw `text` with its top-left corner at (`x`, `y`)
    ///
    /// Text is never wrapped; layout is the caller's job.
    fn draw_text(
        &mut self,
        text: &str,
        x: i32,
        y: i32,
        color: Rgb,
        scale: u8,
    ) -> Result<(), Self::Error>;

    /// Hand the finished drawing buffer to the hardware
    fn flip(&mut self) -> Result<(), Self::Error>;
}
