use alloc::string::String;

use crate::color::{Palette, Rgb};
use crate::traits::Surface;

/// One-pixel outline offsets drawn behind the fill
const OUTLINE: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// How banner lines are drawn on a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameStyle {
    /// Left edge of every line
    pub x: i32,
    pub line_height: i32,
    pub scale: u8,
    pub fill: Rgb,
    pub outline: Rgb,
}

impl FrameStyle {
    /// White text with a black outline, taken from the palette
    pub fn new(palette: &Palette, x: i32, line_height: u16, scale: u8) -> Self {
        Self {
            x,
            line_height: line_height as i32,
            scale,
            fill: palette.white(),
            outline: palette.black(),
        }
    }

    /// Draw one frame with the first line's top edge at `y` and flip it
    ///
    /// Lines entirely outside the panel are skipped.
    pub fn render<S: Surface>(
        &self,
        surface: &mut S,
        lines: &[String],
        y: i32,
        background: Rgb,
    ) -> Result<(), S::Error> {
        surface.clear(background)?;

        let height = surface.height() as i32;
        for (i, line) in lines.iter().enumerate() {
            let line_y = y + i as i32 * self.line_height;
            if line_y < -(self.line_height + 2) || line_y > height {
                continue;
            }

            for (dx, dy) in OUTLINE {
                surface.draw_text(line, self.x + dx, line_y + dy, self.outline, self.scale)?;
            }
            surface.draw_text(line, self.x, line_y, self.fill, self.scale)?;
        }

        surface.flip()
    }
}
