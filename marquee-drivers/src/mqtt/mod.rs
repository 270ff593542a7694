//! MQTT session client
//!
//! Implements [`MessagingSession`](marquee_core::traits::MessagingSession)
//! on top of the `marquee-protocol` codec. The byte stream comes from a
//! [`Transport`], which the firmware backs with a TCP socket.

mod client;
mod transport;

pub use client::{
    MqttOptions, MqttSession, SessionError, RX_BUFFER_SIZE, STASH_DEPTH, TX_BUFFER_SIZE,
};
pub use transport::Transport;
