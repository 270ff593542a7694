//! Keyword-based banner color classification
//!
//! Rules are kept in configuration order. The first rule whose keyword
//! occurs in the text decides the color.

use heapless::{String, Vec};

use crate::color::{Palette, Rgb};
use crate::config::{KeywordConfig, ParseError, MAX_KEYWORDS, MAX_KEYWORD_LEN};

/// Resolved keyword rule
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeywordRule {
    pub keyword: String<MAX_KEYWORD_LEN>,
    pub color: Rgb,
}

/// Ordered keyword to color table
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeywordTable {
    rules: Vec<KeywordRule, MAX_KEYWORDS>,
    default: Rgb,
}

impl KeywordTable {
    /// Empty table; everything classifies as `default`
    pub fn new(default: Rgb) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    /// Resolve configured color names against the palette
    pub fn from_config(config: &KeywordConfig, palette: &Palette) -> Result<Self, ParseError> {
        let default = palette
            .named(&config.default)
            .ok_or(ParseError::UnknownColor)?;
        let mut table = Self::new(default);
        for rule in &config.rules {
            let color = palette.named(&rule.color).ok_or(ParseError::UnknownColor)?;
            table.push(&rule.keyword, color)?;
        }
        Ok(table)
    }

    /// Append a rule with the lowest priority so far
    pub fn push(&mut self, keyword: &str, color: Rgb) -> Result<(), ParseError> {
        if keyword.is_empty() {
            return Err(ParseError::InvalidValue);
        }
        let keyword = String::try_from(keyword).map_err(|_| ParseError::InvalidValue)?;
        self.rules
            .push(KeywordRule { keyword, color })
            .map_err(|_| ParseError::TooManyItems)
    }

    /// Color for `text`: first matching rule, else the default
    pub fn classify(&self, text: &str) -> Rgb {
        self.rules
            .iter()
            .find(|rule| text.contains(rule.keyword.as_str()))
            .map_or(self.default, |rule| rule.color)
    }

    pub fn default_color(&self) -> Rgb {
        self.default
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_table() -> KeywordTable {
        KeywordTable::from_config(&KeywordConfig::default(), &Palette::default()).unwrap()
    }

    #[test]
    fn test_default_rules() {
        let table = default_table();
        assert_eq!(table.classify("Time 12:04"), Rgb::YELLOW);
        assert_eq!(table.classify("News: launch"), Rgb::RED);
        assert_eq!(table.classify("Weather 14C"), Rgb::BLUE);
        assert_eq!(table.classify("Air quality good"), Rgb::GREEN);
        assert_eq!(table.classify("hello"), Rgb::BLUE);
    }

    #[test]
    fn test_first_match_wins() {
        let table = default_table();
        // Contains both "News" and "Air"; News is listed first
        assert_eq!(table.classify("Air News"), Rgb::RED);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let table = default_table();
        assert_eq!(table.classify("time for tea"), table.default_color());
    }

    #[test]
    fn test_brightness_applies_to_rules() {
        let table = KeywordTable::from_config(&KeywordConfig::default(), &Palette::new(50)).unwrap();
        assert_eq!(table.classify("Time"), Rgb::new(127, 127, 0));
    }

    #[test]
    fn test_push_limits() {
        let mut table = KeywordTable::new(Rgb::BLACK);
        assert_eq!(table.push("", Rgb::RED), Err(ParseError::InvalidValue));
        for i in 0..MAX_KEYWORDS {
            let keyword = [b'a' + i as u8];
            table
                .push(core::str::from_utf8(&keyword).unwrap(), Rgb::RED)
                .unwrap();
        }
        assert_eq!(table.push("z", Rgb::RED), Err(ParseError::TooManyItems));
        assert_eq!(table.rules().len(), MAX_KEYWORDS);
    }
}
