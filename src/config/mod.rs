//! Configuration loading and parsing for pole.
//!
//! This module handles:
//! - TOML config file parsing
//! - Config file discovery
//! - Rule definition validation

pub mod discovery;
pub mod parser;
pub mod types;

pub use discovery::{discover_config, user_config_path};
pub use parser::{parse_config_file, parse_config_str};
pub use types::{Config, LoadedConfig, Rule};
