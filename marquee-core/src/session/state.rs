//! Connection state machine
//!
//! The connection state never touches the display directly; banners are
//! posted by the supervisor around transitions.

/// Broker connection states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    /// No session; the next step is an attempt
    #[default]
    Disconnected,
    /// Link join, connect and subscribe in progress
    Connecting,
    /// Subscribed and receiving
    Connected,
}

/// Events that trigger connection state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionEvent {
    /// A connection attempt begins
    Attempt,
    /// Subscription confirmed by the broker
    Established,
    /// The attempt failed at any stage
    Failed,
    /// An established session (or the link under it) dropped
    Lost,
}

impl ConnectionState {
    /// Check if inbound messages can arrive in this state
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Process an event and return the next state
    ///
    /// Events that make no sense in the current state leave it unchanged.
    pub fn transition(self, event: ConnectionEvent) -> Self {
        use ConnectionEvent::*;
        use ConnectionState::*;

        match (self, event) {
            (Disconnected, Attempt) => Connecting,

            (Connecting, Established) => Connected,
            (Connecting, Failed) => Disconnected,
            (Connecting, Lost) => Disconnected,

            (Connected, Lost) => Disconnected,

            // Invalid transitions stay in current state
            (state, _) => state,
        }
    }
}
