//! MQTT 3.1.1 Client Codec
//!
//! This crate encodes the packets a subscribe-only client sends and decodes
//! the packets a broker sends back. It has no I/O of its own: the session
//! client in `marquee-drivers` feeds received bytes into a [`PacketParser`]
//! and writes encoded packets to its transport.
//!
//! # Packet Overview
//!
//! Every control packet starts with a fixed header:
//! ```text
//! ┌──────────────┬──────────────┬─────────────────────┬──────────────────┐
//! │ TYPE (4 bit) │ FLAGS (4bit) │ REMAINING LENGTH    │ BODY             │
//! │ 1B                          │ 1-4B (varint)       │ 0-1024B accepted │
//! └──────────────┴──────────────┴─────────────────────┴──────────────────┘
//! ```
//!
//! Only QoS 0 and 1 are supported; the client never publishes.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod messages;
pub mod packet;
pub mod topic;

pub use messages::{ClientPacket, ServerPacket};
pub use packet::{PacketError, PacketParser, RawPacket, MAX_BODY_SIZE};
