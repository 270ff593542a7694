//! Panel surface
//!
//! Implements the animation engine's [`Surface`] on a back buffer with
//! `embedded-graphics` monospace fonts, and hands finished frames to a
//! [`Present`] sink on flip.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_graphics::mono_font::ascii::FONT_5X8;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use marquee_core::traits::Surface;
use marquee_core::Rgb;

use crate::framebuffer::{to_rgb888, FrameBuffer};
use crate::scaled::ScaledTarget;

/// Display errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Frame could not be handed to the panel
    Communication,
    /// Invalid coordinates or dimensions
    InvalidCoordinates,
    /// Buffer overflow
    BufferOverflow,
}

/// Destination for finished frames
pub trait Present<const W: usize, const H: usize> {
    fn present(&mut self, frame: &FrameBuffer<W, H>) -> Result<(), DisplayError>;
}

/// Front buffer shared with the panel refresher
///
/// With `CriticalSectionRawMutex` this is safe to share between cores.
pub struct SharedFrame<M: RawMutex, const W: usize, const H: usize> {
    frame: Mutex<M, RefCell<FrameBuffer<W, H>>>,
}

impl<M: RawMutex, const W: usize, const H: usize> SharedFrame<M, W, H> {
    /// Black frame (usable in a `static`)
    pub const fn new() -> Self {
        Self {
            frame: Mutex::new(RefCell::new(FrameBuffer::new())),
        }
    }

    /// Run `f` with the current front frame
    pub fn with<R>(&self, f: impl FnOnce(&FrameBuffer<W, H>) -> R) -> R {
        self.frame.lock(|frame| f(&frame.borrow()))
    }

    /// Replace the front frame
    pub fn publish(&self, frame: &FrameBuffer<W, H>) {
        self.frame.lock(|front| front.borrow_mut().copy_from(frame));
    }
}

impl<M: RawMutex, const W: usize, const H: usize> Default for SharedFrame<M, W, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const W: usize, const H: usize> Present<W, H> for &SharedFrame<M, W, H> {
    fn present(&mut self, frame: &FrameBuffer<W, H>) -> Result<(), DisplayError> {
        self.publish(frame);
        Ok(())
    }
}

/// Drawing surface backed by a `W` x `H` frame buffer
pub struct PanelSurface<P, const W: usize, const H: usize> {
    back: FrameBuffer<W, H>,
    sink: P,
    font: &'static MonoFont<'static>,
    frames: u32,
}

impl<P: Present<W, H>, const W: usize, const H: usize> PanelSurface<P, W, H> {
    /// Surface using the 5x8 font
    pub fn new(sink: P) -> Self {
        Self::with_font(sink, &FONT_5X8)
    }

    pub fn with_font(sink: P, font: &'static MonoFont<'static>) -> Self {
        Self {
            back: FrameBuffer::new(),
            sink,
            font,
            frames: 0,
        }
    }

    /// Frame being drawn
    pub fn back(&self) -> &FrameBuffer<W, H> {
        &self.back
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    /// Number of successful flips
    pub fn frames(&self) -> u32 {
        self.frames
    }
}

impl<P: Present<W, H>, const W: usize, const H: usize> Surface for PanelSurface<P, W, H> {
    type Error = DisplayError;

    fn width(&self) -> u16 {
        W as u16
    }

    fn height(&self) -> u16 {
        H as u16
    }

    fn line_height(&self, scale: u8) -> u16 {
        self.font.character_size.height as u16 * scale.max(1) as u16
    }

    fn measure_text(&self, text: &str, scale: u8) -> u32 {
        let count = text.chars().count() as u32;
        if count == 0 {
            return 0;
        }
        let advance = self.font.character_size.width + self.font.character_spacing;
        (count * advance - self.font.character_spacing) * scale.max(1) as u32
    }

    fn clear(&mut self, color: Rgb) -> Result<(), Self::Error> {
        self.back.fill(to_rgb888(color));
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        x: i32,
        y: i32,
        color: Rgb,
        scale: u8,
    ) -> Result<(), Self::Error> {
        let style = MonoTextStyle::new(self.font, to_rgb888(color));
        let mut target = ScaledTarget::new(&mut self.back, Point::new(x, y), scale);
        // Drawing into the frame buffer cannot fail
        let _ = Text::with_baseline(text, Point::zero(), style, Baseline::Top).draw(&mut target);
        Ok(())
    }

    fn flip(&mut self) -> Result<(), Self::Error> {
        self.sink.present(&self.back)?;
        self.frames = self.frames.wrapping_add(1);
        Ok(())
    }
}
