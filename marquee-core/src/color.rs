//! Colors and the brightness-scaled palette
//!
//! Every color handed to the display is pre-scaled by the configured
//! brightness when the palette is built. The palette is immutable after
//! boot and shared by reference between the network and display sides.

use heapless::{String, Vec};

/// Maximum length of a color name
pub const MAX_COLOR_NAME_LEN: usize = 12;

/// Maximum number of custom colors
pub const MAX_CUSTOM_COLORS: usize = 8;

/// 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
    pub const ORANGE: Rgb = Rgb::new(255, 165, 0);

    /// Create a color from its channels
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `brightness` percent (clamped to 100)
    pub const fn scaled(self, brightness: u8) -> Self {
        let pct = if brightness > 100 { 100 } else { brightness } as u16;
        Self {
            r: (self.r as u16 * pct / 100) as u8,
            g: (self.g as u16 * pct / 100) as u8,
            b: (self.b as u16 * pct / 100) as u8,
        }
    }

    /// Parse "r,g,b" with decimal channels
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(',').map(|p| p.trim().parse::<u8>());
        let r = parts.next()?.ok()?;
        let g = parts.next()?.ok()?;
        let b = parts.next()?.ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(r, g, b))
    }

    /// Look up one of the built-in color names
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "red" => Some(Self::RED),
            "green" => Some(Self::GREEN),
            "blue" => Some(Self::BLUE),
            "yellow" => Some(Self::YELLOW),
            "orange" => Some(Self::ORANGE),
            _ => None,
        }
    }
}

/// User-defined named color
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ColorDef {
    pub name: String<MAX_COLOR_NAME_LEN>,
    /// Unscaled channels as written in the config
    pub rgb: Rgb,
}

/// Brightness-scaled pens
#[derive(Debug, Clone)]
pub struct Palette {
    brightness: u8,
    custom: Vec<ColorDef, MAX_CUSTOM_COLORS>,
}

impl Palette {
    /// Palette with only the built-in colors
    pub fn new(brightness: u8) -> Self {
        Self {
            brightness: brightness.min(100),
            custom: Vec::new(),
        }
    }

    /// Palette extended with custom colors
    ///
    /// A custom color shadows a built-in of the same name.
    pub fn with_custom(brightness: u8, custom: &[ColorDef]) -> Self {
        let mut palette = Self::new(brightness);
        for def in custom.iter().take(MAX_CUSTOM_COLORS) {
            let _ = palette.custom.push(def.clone());
        }
        palette
    }

    /// Brightness percentage applied to every pen
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Create a pen from raw channels, scaled by brightness
    pub fn pen(&self, r: u8, g: u8, b: u8) -> Rgb {
        Rgb::new(r, g, b).scaled(self.brightness)
    }

    /// Resolve a color name to a scaled pen
    pub fn named(&self, name: &str) -> Option<Rgb> {
        self.custom
            .iter()
            .find(|def| def.name.as_str() == name)
            .map(|def| def.rgb)
            .or_else(|| Rgb::builtin(name))
            .map(|rgb| rgb.scaled(self.brightness))
    }

    pub fn black(&self) -> Rgb {
        Rgb::BLACK.scaled(self.brightness)
    }

    pub fn white(&self) -> Rgb {
        Rgb::WHITE.scaled(self.brightness)
    }

    pub fn red(&self) -> Rgb {
        Rgb::RED.scaled(self.brightness)
    }

    pub fn green(&self) -> Rgb {
        Rgb::GREEN.scaled(self.brightness)
    }

    pub fn blue(&self) -> Rgb {
        Rgb::BLUE.scaled(self.brightness)
    }

    pub fn yellow(&self) -> Rgb {
        Rgb::YELLOW.scaled(self.brightness)
    }

    pub fn orange(&self) -> Rgb {
        Rgb::ORANGE.scaled(self.brightness)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_brightness_is_identity() {
        assert_eq!(Rgb::ORANGE.scaled(100), Rgb::ORANGE);
        assert_eq!(Rgb::WHITE.scaled(255), Rgb::WHITE);
    }

    #[test]
    fn test_brightness_truncates() {
        // 165 * 50 / 100 = 82.5
        assert_eq!(Rgb::ORANGE.scaled(50), Rgb::new(127, 82, 0));
        assert_eq!(Rgb::WHITE.scaled(0), Rgb::BLACK);
    }

    #[test]
    fn test_parse_rgb() {
        assert_eq!(Rgb::parse("0,128,128"), Some(Rgb::new(0, 128, 128)));
        assert_eq!(Rgb::parse(" 1, 2 ,3 "), Some(Rgb::new(1, 2, 3)));
        assert_eq!(Rgb::parse("1,2"), None);
        assert_eq!(Rgb::parse("1,2,3,4"), None);
        assert_eq!(Rgb::parse("256,0,0"), None);
    }

    #[test]
    fn test_named_lookup_scales() {
        let palette = Palette::new(20);
        assert_eq!(palette.named("red"), Some(Rgb::new(51, 0, 0)));
        assert_eq!(palette.named("magenta"), None);
        assert_eq!(palette.pen(255, 255, 255), palette.white());
    }

    #[test]
    fn test_custom_color_shadows_builtin() {
        let mut name = String::new();
        name.push_str("blue").unwrap();
        let palette = Palette::with_custom(
            100,
            &[ColorDef {
                name,
                rgb: Rgb::new(10, 20, 200),
            }],
        );
        assert_eq!(palette.named("blue"), Some(Rgb::new(10, 20, 200)));
        // Accessors always return the built-in
        assert_eq!(palette.blue(), Rgb::BLUE);
    }
}
