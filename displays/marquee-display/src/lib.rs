//! Rendering surface for HUB75 LED matrix panels
//!
//! This crate provides:
//! - `FrameBuffer`, an RGB888 `embedded-graphics` draw target
//! - `PanelSurface`, the `Surface` the animation engine draws through
//! - `SharedFrame`, the front buffer handed to the panel refresher
//! - Bit-plane packing for binary-coded modulation on HUB75 panels
//!
//! # Architecture
//!
//! ```text
//! Animator -> PanelSurface (back buffer) --flip--> SharedFrame (front)
//!                                                      |
//!                                  refresh loop <- pack_row per plane
//! ```
//!
//! The animation side never waits for the refresher: a flip copies the
//! back buffer into the front buffer under a short critical section.

#![no_std]
#![deny(unsafe_code)]

pub mod bitplane;
pub mod framebuffer;
pub mod scaled;
pub mod surface;

pub use bitplane::{pack_row, BIT_PLANES};
pub use framebuffer::FrameBuffer;
pub use scaled::ScaledTarget;
pub use surface::{DisplayError, PanelSurface, Present, SharedFrame};
