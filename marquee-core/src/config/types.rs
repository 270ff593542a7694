//! Configuration type definitions
//!
//! These types represent the banner configuration. Strings are heapless so
//! the whole configuration can live in a `static` on the device.

use heapless::{String, Vec};

use crate::color::{ColorDef, Palette, MAX_COLOR_NAME_LEN, MAX_CUSTOM_COLORS};

/// Maximum keyword length
pub const MAX_KEYWORD_LEN: usize = 16;

/// Maximum number of keyword rules
pub const MAX_KEYWORDS: usize = 8;

/// Maximum Wi-Fi SSID length (802.11 limit)
pub const MAX_SSID_LEN: usize = 32;

/// Maximum Wi-Fi passphrase length (WPA2 limit)
pub const MAX_PASSPHRASE_LEN: usize = 64;

/// Maximum broker host name length
pub const MAX_HOST_LEN: usize = 64;

/// Maximum MQTT client identifier length (3.1.1 guaranteed minimum)
pub const MAX_CLIENT_ID_LEN: usize = 23;

/// Maximum MQTT user name / password length
pub const MAX_CREDENTIAL_LEN: usize = 32;

/// Maximum topic filter length
pub const MAX_TOPIC_LEN: usize = 64;

/// Panel geometry and text placement
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayConfig {
    /// Panel width in pixels
    pub width: u16,
    /// Panel height in pixels
    pub height: u16,
    /// Pen brightness, 0-100
    pub brightness: u8,
    /// Pixels kept free horizontally, split evenly between both sides
    pub horizontal_buffer: u16,
    /// Integer font scale
    pub text_scale: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 32,
            brightness: 100,
            horizontal_buffer: 4,
            text_scale: 1,
        }
    }
}

/// Scroll timing
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnimationConfig {
    /// Target period of one 1-pixel scroll step
    pub step_interval_ms: u32,
    /// Lower bound for the sleep between steps (at least 1)
    pub min_step_delay_ms: u32,
    /// How long a centered message stays still
    pub hold_s: u16,
    /// How long the background-only frame is shown after scroll-out (0 = off)
    pub post_scroll_s: u16,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: 60,
            min_step_delay_ms: 1,
            hold_s: 5,
            post_scroll_s: 0,
        }
    }
}

/// Wi-Fi and broker settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkConfig {
    pub ssid: String<MAX_SSID_LEN>,
    pub password: String<MAX_PASSPHRASE_LEN>,
    /// IPv4 literal or host name
    pub broker: String<MAX_HOST_LEN>,
    pub port: u16,
    pub client_id: String<MAX_CLIENT_ID_LEN>,
    /// Broker user name; empty for anonymous sessions
    pub username: String<MAX_CREDENTIAL_LEN>,
    pub mqtt_password: String<MAX_CREDENTIAL_LEN>,
    /// Topic filter subscribed after every connect
    pub topic: String<MAX_TOPIC_LEN>,
    /// Subscription QoS (0 or 1)
    pub qos: u8,
    pub keep_alive_s: u16,
    /// Pause after a link transition before continuing
    pub link_settle_ms: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            broker: String::new(),
            port: 1883,
            client_id: label("marquee"),
            username: String::new(),
            mqtt_password: String::new(),
            topic: label("personal/ucfnaps/led/#"),
            qos: 1,
            keep_alive_s: 60,
            link_settle_ms: 1000,
        }
    }
}

/// What to do when a connection attempt fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReconnectPolicy {
    /// Show a retry banner, wait, try again
    #[default]
    Backoff,
    /// Show a failure banner and restart the device
    Restart,
}

/// Reconnection behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReconnectConfig {
    pub policy: ReconnectPolicy,
    /// Wait between attempts (also the grace period before a restart)
    pub backoff_s: u16,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            policy: ReconnectPolicy::Backoff,
            backoff_s: 5,
        }
    }
}

/// One keyword to color rule
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeywordRuleConfig {
    /// Case-sensitive substring to look for
    pub keyword: String<MAX_KEYWORD_LEN>,
    /// Palette color name
    pub color: String<MAX_COLOR_NAME_LEN>,
}

/// Ordered keyword rules; the first match wins
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeywordConfig {
    /// Color used when no keyword matches
    pub default: String<MAX_COLOR_NAME_LEN>,
    pub rules: Vec<KeywordRuleConfig, MAX_KEYWORDS>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        let mut rules = Vec::new();
        for (keyword, color) in [
            ("Time", "yellow"),
            ("News", "red"),
            ("Weather", "blue"),
            ("Air", "green"),
        ] {
            let _ = rules.push(KeywordRuleConfig {
                keyword: label(keyword),
                color: label(color),
            });
        }
        Self {
            default: label("blue"),
            rules,
        }
    }
}

/// Complete banner configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BannerConfig {
    pub display: DisplayConfig,
    pub animation: AnimationConfig,
    pub network: NetworkConfig,
    pub reconnect: ReconnectConfig,
    pub colors: Vec<ColorDef, MAX_CUSTOM_COLORS>,
    pub keywords: KeywordConfig,
}

impl BannerConfig {
    /// Create a configuration with defaults everywhere
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the brightness-scaled palette
    pub fn palette(&self) -> Palette {
        Palette::with_custom(self.display.brightness, &self.colors)
    }

    /// Reconnect backoff in milliseconds
    pub fn backoff_ms(&self) -> u32 {
        self.reconnect.backoff_s as u32 * 1000
    }
}

/// Build a heapless string, truncating at capacity
pub(crate) fn label<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
