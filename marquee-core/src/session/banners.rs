//! Status banners posted by the supervisor

use crate::color::{Palette, Rgb};
use crate::queue::Message;

/// Lifecycle status shown on the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Booting,
    WifiConnected,
    WifiLost,
    /// A connection attempt failed and another follows after the backoff
    NetRetry,
    /// A connection attempt failed and the device will restart
    ConnectionFailed,
    /// Subscribed to the topic filter
    MqttReady,
}

impl Status {
    /// Banner text
    pub const fn text(self) -> &'static str {
        match self {
            Status::Booting => "Booting...",
            Status::WifiConnected => "WiFi Connected",
            Status::WifiLost => "WiFi Lost",
            Status::NetRetry => "Net Retry...",
            Status::ConnectionFailed => "Connection Failed",
            Status::MqttReady => "MQTT Ready",
        }
    }

    /// Banner background, scaled by the palette brightness
    pub fn color(self, palette: &Palette) -> Rgb {
        match self {
            Status::Booting | Status::NetRetry => palette.orange(),
            Status::WifiConnected => palette.blue(),
            Status::WifiLost | Status::ConnectionFailed => palette.red(),
            Status::MqttReady => palette.green(),
        }
    }

    pub fn message(self, palette: &Palette) -> Message {
        Message::new(self.text(), self.color(palette))
    }
}
