//! Configuration loading
//!
//! Parses the embedded banner.toml with the no_std parser from
//! `marquee-core`.

pub mod loader;

pub use loader::load_or_default;
