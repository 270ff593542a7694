//! Embedded configuration loading
//!
//! banner.toml is compiled into the firmware. It was already checked by
//! build.rs, so a parse failure here means the two parsers disagree; the
//! firmware then keeps running on defaults so the panel can still say so.

use defmt::*;

use marquee_core::config::{parse_config, BannerConfig, ParseError, ReconnectPolicy};

use crate::channels::{PANEL_HEIGHT, PANEL_WIDTH};

/// Embedded configuration (compiled into firmware)
/// Edit banner.toml and rebuild to customize
pub const EMBEDDED_CONFIG: &str = include_str!("../../banner.toml");

/// Configuration loading errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The embedded TOML did not parse or validate
    Parse(ParseError),
    /// [display] size differs from the frame buffers the firmware was built with
    PanelMismatch { width: u16, height: u16 },
}

impl From<ParseError> for ConfigError {
    fn from(e: ParseError) -> Self {
        ConfigError::Parse(e)
    }
}

/// Parse and check a configuration
pub fn load(source: &str) -> Result<BannerConfig, ConfigError> {
    let config = parse_config(source)?;

    let display = &config.display;
    if display.width as usize != PANEL_WIDTH || display.height as usize != PANEL_HEIGHT {
        return Err(ConfigError::PanelMismatch {
            width: display.width,
            height: display.height,
        });
    }

    Ok(config)
}

/// Load the embedded configuration, falling back to defaults
pub fn load_or_default() -> BannerConfig {
    match load(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            log_config_summary(&config);
            config
        }
        Err(e) => {
            error!("Failed to load embedded config: {:?}", e);
            error!("Using default configuration");
            let mut config = BannerConfig::default();
            config.display.width = PANEL_WIDTH as u16;
            config.display.height = PANEL_HEIGHT as u16;
            config
        }
    }
}

/// Log a summary of the loaded configuration
fn log_config_summary(config: &BannerConfig) {
    let d = &config.display;
    let n = &config.network;
    debug!(
        "  display {}x{} brightness={}% scale={}",
        d.width, d.height, d.brightness, d.text_scale
    );
    debug!(
        "  step={}ms hold={}s post_scroll={}s",
        config.animation.step_interval_ms, config.animation.hold_s, config.animation.post_scroll_s
    );
    debug!(
        "  broker {}:{} topic '{}' qos={}",
        n.broker.as_str(),
        n.port,
        n.topic.as_str(),
        n.qos
    );
    match config.reconnect.policy {
        ReconnectPolicy::Backoff => debug!("  reconnect: backoff {}s", config.reconnect.backoff_s),
        ReconnectPolicy::Restart => debug!("  reconnect: restart"),
    }
    debug!(
        "  {} custom colors, {} keyword rules",
        config.colors.len(),
        config.keywords.rules.len()
    );
}
