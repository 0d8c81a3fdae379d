use crate::error::{PoleError, Result};
use crate::path::SecretPath;
use crate::store::{ListEntry, SecretData, SecretStore};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A secrets engine held entirely in memory.
///
/// Counts calls so callers can check how many remote round-trips an
/// operation would cost.
#[derive(Debug, Default)]
pub struct MemoryStore {
	secrets: BTreeMap<Vec<String>, SecretData>,
	list_calls: AtomicUsize,
	read_calls: AtomicUsize,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Build a store from `(path, key, value)` triples.
	pub fn from_entries<'a, I>(entries: I) -> Self
	where
		I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
	{
		let mut store = Self::new();
		for (path, key, value) in entries {
			store.insert(path, key, value);
		}
		store
	}

	/// Set one key of the secret at `path`.
	pub fn insert(&mut self, path: &str, key: &str, value: &str) {
		let segments = SecretPath::parse(path).segments().to_vec();
		self.secrets
			.entry(segments)
			.or_default()
			.insert(key.to_string(), value.to_string());
	}

	pub fn list_calls(&self) -> usize {
		self.list_calls.load(Ordering::SeqCst)
	}

	pub fn read_calls(&self) -> usize {
		self.read_calls.load(Ordering::SeqCst)
	}
}

impl SecretStore for MemoryStore {
	fn list(&self, path: &SecretPath) -> Result<Vec<ListEntry>> {
		self.list_calls.fetch_add(1, Ordering::SeqCst);

		let prefix = path.segments();
		let mut entries: BTreeSet<(&str, bool)> = BTreeSet::new();
		for segments in self.secrets.keys() {
			if segments.len() <= prefix.len() || !segments.starts_with(prefix) {
				continue;
			}
			let name = segments[prefix.len()].as_str();
			entries.insert((name, segments.len() > prefix.len() + 1));
		}

		if entries.is_empty() {
			return Err(PoleError::NotFound {
				path: path.to_string(),
			});
		}
		Ok(entries
			.into_iter()
			.map(|(name, is_directory)| ListEntry {
				name: name.to_string(),
				is_directory,
			})
			.collect())
	}

	fn read(&self, path: &SecretPath) -> Result<SecretData> {
		self.read_calls.fetch_add(1, Ordering::SeqCst);

		if !path.is_leaf() {
			return Err(PoleError::NotFound {
				path: path.to_string(),
			});
		}
		self.secrets
			.get(path.segments())
			.cloned()
			.ok_or_else(|| PoleError::NotFound {
				path: path.to_string(),
			})
	}
}
