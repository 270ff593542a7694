//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in marquee-core:
//!
//! - GPIO status indicators and the heartbeat toggler
//! - MQTT 3.1.1 session client over any `embedded-io-async` transport

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod indicator;
pub mod mqtt;
