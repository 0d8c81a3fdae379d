//! Pole - browse, search and auto-resolve secrets in a Vault kv store.
//!
//! This library provides the core functionality for pole, including:
//! - A tree index over remote secret paths with listing and fuzzy search
//! - User-defined rules mapping URLs or command lines to secret paths
//! - A resolver with a stable first-declared-wins tie-break
//! - Vault kv v1/v2 access and clipboard handling
//!
//! # Example
//!
//! ```no_run
//! use pole::config::discover_config;
//! use pole::resolver::Resolver;
//! use pole::rules::RuleSet;
//! use pole::store::{VaultSettings, VaultStore};
//!
//! let loaded = discover_config(None).unwrap();
//! let rules = RuleSet::load(&loaded.config).unwrap();
//! let store = VaultStore::new(VaultSettings::resolve(&loaded.config)).unwrap();
//!
//! let resolver = Resolver::new(&rules);
//! let result = resolver.resolve("https://ampere3-ipmi.example.com/#/login").unwrap();
//! let secret = resolver.fetch(&store, &result).unwrap();
//! println!("{}: {} keys", result.path(), secret.len());
//! ```

pub mod clipboard;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod path;
pub mod resolver;
pub mod rules;
pub mod store;
pub mod table;

pub use error::{PoleError, Result};
