//! Shared state between the network and display sides
//!
//! The banner queue (or latest-status cell) is the only mutable structure
//! the two sides share. Both use `CriticalSectionRawMutex`, which is sound
//! across the two RP2040 cores.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use marquee_display::SharedFrame;

#[cfg(not(feature = "status-cell"))]
use marquee_core::MessageQueue;
#[cfg(feature = "status-cell")]
use marquee_core::StatusCell;

// PANEL_WIDTH and PANEL_HEIGHT, generated from banner.toml [display]
include!(concat!(env!("OUT_DIR"), "/panel.rs"));

/// Banners from the network supervisor to the animation engine
#[cfg(not(feature = "status-cell"))]
pub type Banners = MessageQueue<CriticalSectionRawMutex>;

/// Latest banner only; older unseen banners are replaced
#[cfg(feature = "status-cell")]
pub type Banners = StatusCell<CriticalSectionRawMutex>;

pub static BANNERS: Banners = Banners::new();

/// Front buffer read by the panel refresh loop
pub type Frame = SharedFrame<CriticalSectionRawMutex, PANEL_WIDTH, PANEL_HEIGHT>;

pub static FRONT_FRAME: Frame = Frame::new();
