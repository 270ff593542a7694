//! Network link and messaging session traits
//!
//! The supervisor drives these; the firmware implements them on top of the
//! Wi-Fi chip and a TCP socket, tests implement them with scripted mocks.

/// Outcome of one [`MessagingSession::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent<'a> {
    /// An application message arrived on a subscribed topic
    Message {
        /// Topic the message was published to
        topic: &'a str,
        /// Raw payload bytes, not yet decoded
        payload: &'a [u8],
        /// Broker replayed a retained message
        retained: bool,
    },
    /// Nothing arrived within one liveness tick
    Idle,
}

/// Link layer (Wi-Fi association plus addressing)
#[allow(async_fn_in_trait)]
pub trait LinkControl {
    /// Error raised when joining fails
    type Error: core::fmt::Debug;

    /// Bring the link up, blocking until it is usable or has failed
    async fn join(&mut self) -> Result<(), Self::Error>;

    /// Whether the link is currently usable
    fn is_up(&self) -> bool;
}

/// Publish/subscribe session with a broker
#[allow(async_fn_in_trait)]
pub trait MessagingSession {
    /// Error raised by any session operation
    type Error: core::fmt::Debug;

    /// Open a fresh session (clean start)
    async fn connect(&mut self) -> Result<(), Self::Error>;

    /// Subscribe to a topic filter at `qos` and wait for the broker to confirm
    async fn subscribe(&mut self, filter: &str, qos: u8) -> Result<(), Self::Error>;

    /// Wait for the next inbound event or one liveness tick
    ///
    /// Keep-alive traffic is handled internally. An error means the session
    /// is gone and must be reconnected.
    async fn poll(&mut self) -> Result<SessionEvent<'_>, Self::Error>;
}
