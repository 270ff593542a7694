//! Simple TOML parser for banner configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! the banner configuration. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer)
//! - [section] headers
//! - Inline tables for arrays: rules = [{ match = "Time", color = "yellow" }]
//! - Comments (# ...)
//!
//! NOT supported:
//! - Multi-line strings or arrays
//! - Escapes inside strings
//! - Nested inline tables
//!
//! Unknown keys are ignored so older firmware accepts newer files.

use heapless::{String as HString, Vec as HVec};

use super::types::{
    BannerConfig, KeywordRuleConfig, ReconnectPolicy, MAX_KEYWORDS, MAX_KEYWORD_LEN,
};
use crate::color::{ColorDef, Palette, Rgb, MAX_COLOR_NAME_LEN};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Invalid or unknown section header
    InvalidSection,
    /// Invalid value type or malformed literal
    InvalidValue,
    /// Too many items (exceeded heapless capacity)
    TooManyItems,
    /// Color name not built in and not defined under [colors]
    UnknownColor,
    /// Value parsed but outside its allowed range
    OutOfRange,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Display,
    Animation,
    Network,
    Reconnect,
    Colors,
    Keywords,
}

/// Parse TOML configuration into a validated BannerConfig
pub fn parse_config(input: &str) -> Result<BannerConfig, ParseError> {
    let mut config = BannerConfig::new();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            apply_value(section, key, value, &mut config)?;
        }
    }

    validate(&config)?;
    Ok(config)
}

/// Parse a section header like "display" or "keywords"
fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "display" => Ok(Section::Display),
        "animation" => Ok(Section::Animation),
        "network" => Ok(Section::Network),
        "reconnect" => Ok(Section::Reconnect),
        "colors" => Ok(Section::Colors),
        "keywords" => Ok(Section::Keywords),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Remove inline comments; a # inside quotes belongs to the value
    let mut in_string = false;
    let comment = value.char_indices().find(|&(_, c)| {
        if c == '"' {
            in_string = !in_string;
        }
        c == '#' && !in_string
    });
    let value = match comment {
        Some((hash_pos, _)) => value[..hash_pos].trim(),
        None => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> Result<&str, ParseError> {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        Ok(&value[1..value.len() - 1])
    } else {
        // Allow unquoted strings for simple values
        Ok(value)
    }
}

/// Parse an integer value
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

/// Parse a string into a bounded heapless string
fn parse_label<const N: usize>(value: &str) -> Result<HString<N>, ParseError> {
    let s = parse_string(value)?;
    HString::try_from(s).map_err(|_| ParseError::InvalidValue)
}

/// Parse "backoff" or "restart"
fn parse_policy(value: &str) -> Result<ReconnectPolicy, ParseError> {
    match parse_string(value)? {
        "backoff" => Ok(ReconnectPolicy::Backoff),
        "restart" => Ok(ReconnectPolicy::Restart),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse keyword rules array
fn parse_rules(value: &str) -> Result<HVec<KeywordRuleConfig, MAX_KEYWORDS>, ParseError> {
    let mut rules = HVec::new();

    // Remove outer brackets
    let value = value.trim();
    if !value.starts_with('[') || !value.ends_with(']') {
        return Err(ParseError::InvalidValue);
    }
    let inner = &value[1..value.len() - 1];

    // Parse each rule { match = "x", color = "y" }
    let mut depth = 0;
    let mut start = 0;

    for (i, c) in inner.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    return Err(ParseError::InvalidValue);
                }
                depth -= 1;
                if depth == 0 {
                    let rule = parse_single_rule(&inner[start..=i])?;
                    rules.push(rule).map_err(|_| ParseError::TooManyItems)?;
                }
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(ParseError::InvalidValue);
    }

    Ok(rules)
}

/// Parse a single rule like { match = "News", color = "red" }
fn parse_single_rule(s: &str) -> Result<KeywordRuleConfig, ParseError> {
    let s = s.trim();
    if !s.starts_with('{') || !s.ends_with('}') {
        return Err(ParseError::InvalidValue);
    }
    let inner = &s[1..s.len() - 1];

    let mut keyword: Option<HString<MAX_KEYWORD_LEN>> = None;
    let mut color: Option<HString<MAX_COLOR_NAME_LEN>> = None;

    for part in inner.split(',') {
        let part = part.trim();
        if let Some((key, value)) = parse_key_value(part) {
            match key {
                "match" | "keyword" => keyword = Some(parse_label(value)?),
                "color" => color = Some(parse_label(value)?),
                _ => {}
            }
        }
    }

    match (keyword, color) {
        (Some(keyword), Some(color)) if !keyword.is_empty() => {
            Ok(KeywordRuleConfig { keyword, color })
        }
        _ => Err(ParseError::InvalidValue),
    }
}

/// Apply a parsed value to the appropriate config field
fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut BannerConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Display => {
            let d = &mut config.display;
            match key {
                "width" => d.width = parse_int(value)?,
                "height" => d.height = parse_int(value)?,
                "brightness" => d.brightness = parse_int(value)?,
                "horizontal_buffer" => d.horizontal_buffer = parse_int(value)?,
                "text_scale" => d.text_scale = parse_int(value)?,
                _ => {}
            }
        }
        Section::Animation => {
            let a = &mut config.animation;
            match key {
                "step_interval_ms" => a.step_interval_ms = parse_int(value)?,
                "min_step_delay_ms" => a.min_step_delay_ms = parse_int(value)?,
                "hold_s" => a.hold_s = parse_int(value)?,
                "post_scroll_s" => a.post_scroll_s = parse_int(value)?,
                _ => {}
            }
        }
        Section::Network => {
            let n = &mut config.network;
            match key {
                "ssid" => n.ssid = parse_label(value)?,
                "password" => n.password = parse_label(value)?,
                "broker" => n.broker = parse_label(value)?,
                "port" => n.port = parse_int(value)?,
                "client_id" => n.client_id = parse_label(value)?,
                "username" => n.username = parse_label(value)?,
                "mqtt_password" => n.mqtt_password = parse_label(value)?,
                "topic" => n.topic = parse_label(value)?,
                "qos" => n.qos = parse_int(value)?,
                "keep_alive_s" => n.keep_alive_s = parse_int(value)?,
                "link_settle_ms" => n.link_settle_ms = parse_int(value)?,
                _ => {}
            }
        }
        Section::Reconnect => match key {
            "policy" => config.reconnect.policy = parse_policy(value)?,
            "backoff_s" => config.reconnect.backoff_s = parse_int(value)?,
            _ => {}
        },
        Section::Colors => {
            let name = HString::try_from(parse_string(key)?).map_err(|_| ParseError::InvalidValue)?;
            let rgb = Rgb::parse(parse_string(value)?).ok_or(ParseError::InvalidValue)?;
            // A later definition of the same name replaces the earlier one
            if let Some(existing) = config.colors.iter_mut().find(|def| def.name == name) {
                existing.rgb = rgb;
            } else {
                config
                    .colors
                    .push(ColorDef { name, rgb })
                    .map_err(|_| ParseError::TooManyItems)?;
            }
        }
        Section::Keywords => match key {
            "default" => config.keywords.default = parse_label(value)?,
            "rules" => config.keywords.rules = parse_rules(value)?,
            _ => {}
        },
        Section::Root => {
            // No root-level keys
        }
    }

    Ok(())
}

/// Check ranges and color references once the whole file is read
pub fn validate(config: &BannerConfig) -> Result<(), ParseError> {
    let d = &config.display;
    if d.width == 0 || d.height == 0 || d.horizontal_buffer >= d.width {
        return Err(ParseError::OutOfRange);
    }
    if d.brightness > 100 || d.text_scale == 0 {
        return Err(ParseError::OutOfRange);
    }

    let a = &config.animation;
    if a.step_interval_ms == 0 || a.min_step_delay_ms == 0 {
        return Err(ParseError::OutOfRange);
    }

    let n = &config.network;
    if n.port == 0 || n.qos > 1 || n.client_id.is_empty() || n.topic.is_empty() {
        return Err(ParseError::OutOfRange);
    }

    let palette: Palette = config.palette();
    if palette.named(&config.keywords.default).is_none() {
        return Err(ParseError::UnknownColor);
    }
    for rule in &config.keywords.rules {
        if palette.named(&rule.color).is_none() {
            return Err(ParseError::UnknownColor);
        }
    }

    Ok(())
}
