//! RP2040-specific HAL for the banner firmware
//!
//! This crate drives a HUB75 LED matrix from the RP2040:
//!
//! - PIO program shifting six colour bits per clock with side-set CLK
//! - GPIO row addressing, latch and output enable
//! - Binary-coded modulation over the bit planes packed by `marquee-display`

#![no_std]

pub mod hub75;
pub mod timing;

pub use hub75::{Hub75, Hub75Error, MAX_COLUMNS, MAX_ROW_PAIRS};
pub use timing::{calc_clock_divider, Hub75Timing, SYS_CLK_HZ};

