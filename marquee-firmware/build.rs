//! Build script for marquee-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates banner.toml at compile time
//! - Generates the panel size constants from banner.toml
//! - Checks that the CYW43439 firmware blobs are present

use std::collections::HashSet;
use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Colors every palette knows
const BUILTIN_COLORS: &[&str] = &["black", "white", "red", "green", "blue", "yellow", "orange"];

/// Sections the firmware parser accepts
const SECTIONS: &[&str] = &["display", "animation", "network", "reconnect", "colors", "keywords"];

/// Wi-Fi chip firmware, included with `include_bytes!`
const WIFI_BLOBS: &[&str] = &["cyw43-firmware/43439A0.bin", "cyw43-firmware/43439A0_clm.bin"];

fn main() {
    setup_linker();
    validate_config();
    check_wifi_blobs();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Print a boxed error and abort the build
fn fail(title: &str, lines: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<57}║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        lines
            .iter()
            .map(|e| format!("║  • {:<62} ║", truncate(e)))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

fn truncate(line: &str) -> String {
    if line.chars().count() > 62 {
        let head: String = line.chars().take(59).collect();
        format!("{}...", head)
    } else {
        line.to_string()
    }
}

/// Validate banner.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=banner.toml");

    let config_path = Path::new("banner.toml");
    if !config_path.exists() {
        fail(
            "banner.toml not found!",
            &[
                "The firmware embeds banner.toml from the crate directory.".to_string(),
                "Create one there (see the [display] ... [keywords] layout).".to_string(),
            ],
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read banner.toml", &[e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(
            "Invalid TOML syntax in banner.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();

    if let Some(table) = config.as_table() {
        for key in table.keys() {
            if !SECTIONS.contains(&key.as_str()) {
                errors.push(format!("unknown section [{}]", key));
            }
        }
    }

    validate_display(&config, &mut errors);
    validate_animation(&config, &mut errors);
    validate_network(&config, &mut errors);
    validate_reconnect(&config, &mut errors);
    let colors = validate_colors(&config, &mut errors);
    validate_keywords(&config, &colors, &mut errors);

    if !errors.is_empty() {
        fail("Invalid configuration in banner.toml", &errors);
    }

    generate_panel_size(&config);
    println!("cargo:warning=banner.toml validated successfully");
}

/// Frame buffers are sized at compile time from [display]
fn generate_panel_size(config: &toml::Value) {
    let width = int(config, "display", "width").unwrap_or(64);
    let height = int(config, "display", "height").unwrap_or(32);
    if height % 2 != 0 {
        fail(
            "Invalid panel size in banner.toml",
            &["[display] height must be even (two rows per scan line)".to_string()],
        );
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let mut f = File::create(out_dir.join("panel.rs")).unwrap();
    writeln!(f, "/// Panel width in pixels").unwrap();
    writeln!(f, "pub const PANEL_WIDTH: usize = {};", width).unwrap();
    writeln!(f, "/// Panel height in pixels").unwrap();
    writeln!(f, "pub const PANEL_HEIGHT: usize = {};", height).unwrap();
}

fn int(config: &toml::Value, section: &str, key: &str) -> Option<i64> {
    config.get(section)?.get(key)?.as_integer()
}

fn string<'a>(config: &'a toml::Value, section: &str, key: &str) -> Option<&'a str> {
    config.get(section)?.get(key)?.as_str()
}

/// Check an optional integer against a range
fn check_range(
    config: &toml::Value,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) {
    if let Some(value) = config.get(section).and_then(|s| s.get(key)) {
        match value.as_integer() {
            Some(n) if range.contains(&n) => {}
            Some(_) => errors.push(format!(
                "[{}] {} must be {}..={}",
                section,
                key,
                range.start(),
                range.end()
            )),
            None => errors.push(format!("[{}] {} must be an integer", section, key)),
        }
    }
}

fn validate_display(config: &toml::Value, errors: &mut Vec<String>) {
    check_range(config, "display", "width", 1..=256, errors);
    check_range(config, "display", "height", 1..=64, errors);
    check_range(config, "display", "brightness", 0..=100, errors);
    check_range(config, "display", "horizontal_buffer", 0..=255, errors);
    check_range(config, "display", "text_scale", 1..=8, errors);

    let width = int(config, "display", "width").unwrap_or(64);
    if let Some(buffer) = int(config, "display", "horizontal_buffer") {
        if buffer >= width {
            errors.push("[display] horizontal_buffer must be less than width".to_string());
        }
    }
}

fn validate_animation(config: &toml::Value, errors: &mut Vec<String>) {
    check_range(config, "animation", "step_interval_ms", 1..=60_000, errors);
    check_range(config, "animation", "min_step_delay_ms", 1..=60_000, errors);
    check_range(config, "animation", "hold_s", 0..=3_600, errors);
    check_range(config, "animation", "post_scroll_s", 0..=3_600, errors);
}

fn validate_network(config: &toml::Value, errors: &mut Vec<String>) {
    if config.get("network").is_none() {
        errors.push("Missing [network] section - ssid and broker are required".to_string());
        return;
    }

    for (key, max) in [("ssid", 32), ("broker", 64), ("password", 64)] {
        match string(config, "network", key) {
            Some(s) if s.len() <= max => {}
            Some(_) => errors.push(format!("[network] {} is longer than {} bytes", key, max)),
            None if key == "password" => {}
            None => errors.push(format!("[network] missing '{}'", key)),
        }
    }
    if string(config, "network", "broker").is_some_and(str::is_empty) {
        errors.push("[network] broker cannot be empty".to_string());
    }

    if let Some(id) = string(config, "network", "client_id") {
        if id.is_empty() || id.len() > 23 {
            errors.push("[network] client_id must be 1-23 bytes".to_string());
        }
    }
    if let Some(topic) = string(config, "network", "topic") {
        if topic.is_empty() || topic.len() > 64 {
            errors.push("[network] topic must be 1-64 bytes".to_string());
        } else if !is_valid_filter(topic) {
            errors.push(format!("[network] topic '{}' is not a valid filter", topic));
        }
    }

    check_range(config, "network", "port", 1..=65_535, errors);
    check_range(config, "network", "qos", 0..=1, errors);
    check_range(config, "network", "keep_alive_s", 0..=65_535, errors);
    check_range(config, "network", "link_settle_ms", 0..=60_000, errors);
}

/// `+` fills a whole level, `#` only the last one
fn is_valid_filter(filter: &str) -> bool {
    let levels: Vec<&str> = filter.split('/').collect();
    levels.iter().enumerate().all(|(i, level)| {
        (!level.contains('#') || (*level == "#" && i == levels.len() - 1))
            && (!level.contains('+') || *level == "+")
    })
}

fn validate_reconnect(config: &toml::Value, errors: &mut Vec<String>) {
    if let Some(policy) = config.get("reconnect").and_then(|r| r.get("policy")) {
        if !matches!(policy.as_str(), Some("backoff") | Some("restart")) {
            errors.push("[reconnect] policy must be 'backoff' or 'restart'".to_string());
        }
    }
    check_range(config, "reconnect", "backoff_s", 0..=3_600, errors);
}

/// Returns every color name the keyword table may use
fn validate_colors(config: &toml::Value, errors: &mut Vec<String>) -> HashSet<String> {
    let mut names: HashSet<String> = BUILTIN_COLORS.iter().map(|s| s.to_string()).collect();

    let custom = match config.get("colors") {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push("[colors] must be a table".to_string());
            return names;
        }
        None => return names,
    };

    if custom.len() > 8 {
        errors.push("[colors] at most 8 custom colors".to_string());
    }
    for (name, value) in custom {
        if name.len() > 12 {
            errors.push(format!("[colors] name '{}' is longer than 12 bytes", name));
        }
        let channels: Option<Vec<u8>> = value
            .as_str()
            .and_then(|s| s.split(',').map(|c| c.trim().parse::<u8>().ok()).collect());
        match channels {
            Some(c) if c.len() == 3 => {
                names.insert(name.clone());
            }
            _ => errors.push(format!("[colors] {} must be \"r,g,b\" with 0-255 channels", name)),
        }
    }
    names
}

fn validate_keywords(config: &toml::Value, colors: &HashSet<String>, errors: &mut Vec<String>) {
    let keywords = match config.get("keywords") {
        Some(k) => k,
        None => return,
    };

    if let Some(default) = keywords.get("default").and_then(|d| d.as_str()) {
        if !colors.contains(default) {
            errors.push(format!("[keywords] default color '{}' is unknown", default));
        }
    }

    let rules = match keywords.get("rules") {
        Some(toml::Value::Array(rules)) => rules,
        Some(_) => {
            errors.push("[keywords] rules must be an array".to_string());
            return;
        }
        None => return,
    };

    if rules.len() > 8 {
        errors.push("[keywords] at most 8 rules".to_string());
    }
    for (i, rule) in rules.iter().enumerate() {
        let keyword = rule
            .get("match")
            .or_else(|| rule.get("keyword"))
            .and_then(|k| k.as_str());
        match keyword {
            Some(k) if !k.is_empty() && k.len() <= 16 => {}
            Some(_) => errors.push(format!("[keywords] rule {} keyword must be 1-16 bytes", i)),
            None => errors.push(format!("[keywords] rule {} missing 'match'", i)),
        }
        match rule.get("color").and_then(|c| c.as_str()) {
            Some(color) if colors.contains(color) => {}
            Some(color) => errors.push(format!("[keywords] rule {} color '{}' is unknown", i, color)),
            None => errors.push(format!("[keywords] rule {} missing 'color'", i)),
        }
    }
}

/// The CYW43439 firmware is not redistributed with this crate
fn check_wifi_blobs() {
    let missing: Vec<String> = WIFI_BLOBS
        .iter()
        .inspect(|blob| println!("cargo:rerun-if-changed={}", blob))
        .filter(|blob| !Path::new(blob).exists())
        .map(|blob| format!("missing {}", blob))
        .collect();

    if !missing.is_empty() {
        let mut lines = missing;
        lines.push("Copy 43439A0.bin and 43439A0_clm.bin from the embassy".to_string());
        lines.push("repository (cyw43-firmware/) into marquee-firmware/.".to_string());
        fail("CYW43439 firmware not found", &lines);
    }
}
