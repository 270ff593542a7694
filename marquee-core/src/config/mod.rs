//! Configuration types and parsing
//!
//! The firmware embeds a TOML file and parses it at boot with the small
//! no_std parser in [`toml`].

pub mod toml;
pub mod types;

pub use self::toml::{parse_config, validate, ParseError};
pub use types::*;
