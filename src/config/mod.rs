//! Configuration management
//!
//! Where the chain lives on disk and the difficulty blocks are mined at.
//! Settings are layered: built-in defaults, an optional TOML file, environment
//! variables, then whatever the CLI overrides.

pub mod settings;

pub use settings::{Settings, DEFAULT_TARGET_BITS};
