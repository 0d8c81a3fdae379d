//! Access to the remote secrets engine.
//!
//! This module handles:
//! - The `SecretStore` interface consumed by the index and resolver
//! - A Vault kv v1/v2 HTTP client
//! - An in-process store

pub mod memory;
pub mod vault;

pub use memory::MemoryStore;
pub use vault::{KvVersion, VaultSettings, VaultStore};

use crate::error::{PoleError, Result};
use crate::path::SecretPath;
use std::collections::BTreeMap;

/// One name returned by a listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
	/// Child name without any trailing delimiter.
	pub name: String,

	/// Whether the child is an enumerable prefix rather than a secret.
	pub is_directory: bool,
}

impl ListEntry {
	/// Build an entry from a raw listing key, where a trailing `/` marks a directory.
	pub fn from_key(key: &str) -> Self {
		match key.strip_suffix('/') {
			Some(name) => ListEntry {
				name: name.to_string(),
				is_directory: true,
			},
			None => ListEntry {
				name: key.to_string(),
				is_directory: false,
			},
		}
	}
}

/// Key/value pairs stored in one secret.
pub type SecretData = BTreeMap<String, String>;

/// The two read operations pole needs from a secrets engine.
///
/// Implementations must be `Sync`: listings of independent directories may be
/// issued from several threads.
pub trait SecretStore: Sync {
	/// List the immediate children of a directory path.
	///
	/// Fails with `NotFound` if the directory does not exist.
	fn list(&self, path: &SecretPath) -> Result<Vec<ListEntry>>;

	/// Read the key/value pairs of a leaf path.
	///
	/// Fails with `NotFound` if the secret does not exist.
	fn read(&self, path: &SecretPath) -> Result<SecretData>;
}

/// Pick the value to copy out of a secret.
///
/// With `key`, that key must exist. Without one, the secret must hold exactly
/// one key; several keys fail with `AmbiguousKey`.
pub fn select_value<'a>(
	path: &SecretPath,
	data: &'a SecretData,
	key: Option<&str>,
) -> Result<(&'a str, &'a str)> {
	if let Some(key) = key {
		return data
			.get_key_value(key)
			.map(|(k, v)| (k.as_str(), v.as_str()))
			.ok_or_else(|| PoleError::KeyNotFound {
				path: path.to_string(),
				key: key.to_string(),
			});
	}

	let mut entries = data.iter();
	match (entries.next(), entries.next()) {
		(Some((k, v)), None) => Ok((k.as_str(), v.as_str())),
		(None, _) => Err(PoleError::EmptySecret {
			path: path.to_string(),
		}),
		(Some(_), Some(_)) => Err(PoleError::AmbiguousKey {
			path: path.to_string(),
			keys: data.keys().cloned().collect(),
		}),
	}
}
