//! Board-agnostic core logic for the banner firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (surface, clock, indicator, reclaimer, session)
//! - Greedy word-wrapping text layout
//! - Banner queue and latest-status cell shared between the two activities
//! - Animation engine driving scroll-in, hold and scroll-out cycles
//! - Network session supervisor and inbound message classification
//! - Configuration type definitions and the embedded TOML parser

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod animation;
pub mod color;
pub mod config;
pub mod layout;
pub mod queue;
pub mod session;
pub mod traits;

pub use color::{Palette, Rgb};
pub use queue::{BannerSink, BannerSource, Message, MessageQueue, StatusCell};
