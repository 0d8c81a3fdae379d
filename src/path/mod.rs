//! Secret paths and the in-memory path index.
//!
//! This module handles:
//! - Parsing and ordering of slash-delimited secret paths
//! - Building a tree from remote listings
//! - Prefix listing, tree rendering and fuzzy search

pub mod fuzzy;
pub mod index;

pub use fuzzy::{FuzzyMatch, fuzzy_score};
pub use index::{PathIndex, PathIndexBuilder, TreeEntry, TreeIter};

use std::cmp::Ordering;
use std::fmt;

/// Segment delimiter used by the secrets engine.
pub const DELIMITER: char = '/';

/// Whether a path is an enumerable prefix or an addressable secret.
///
/// Directories order before leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathKind {
	Directory,
	Leaf,
}

impl fmt::Display for PathKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PathKind::Directory => f.write_str("directory"),
			PathKind::Leaf => f.write_str("leaf"),
		}
	}
}

/// An immutable sequence of path segments plus its kind.
///
/// Ordering follows a pre-order tree walk: an ancestor comes before its
/// descendants, and among siblings directories come before leaves, each group
/// sorted lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretPath {
	segments: Vec<String>,
	kind: PathKind,
}

impl SecretPath {
	/// The empty directory path.
	pub fn root() -> Self {
		SecretPath {
			segments: Vec::new(),
			kind: PathKind::Directory,
		}
	}

	/// Parse a path string. A trailing delimiter (or an empty path) marks a
	/// directory; empty segments are ignored.
	pub fn parse(input: &str) -> Self {
		let segments: Vec<String> = input
			.split(DELIMITER)
			.filter(|s| !s.is_empty())
			.map(|s| s.to_string())
			.collect();
		let kind = if segments.is_empty() || input.ends_with(DELIMITER) {
			PathKind::Directory
		} else {
			PathKind::Leaf
		};
		SecretPath { segments, kind }
	}

	/// Parse a path string that always names a directory.
	pub fn directory(input: &str) -> Self {
		SecretPath::parse(input).into_kind(PathKind::Directory)
	}

	pub fn from_segments(segments: Vec<String>, kind: PathKind) -> Self {
		let kind = if segments.is_empty() {
			PathKind::Directory
		} else {
			kind
		};
		SecretPath { segments, kind }
	}

	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	pub fn kind(&self) -> PathKind {
		self.kind
	}

	pub fn is_leaf(&self) -> bool {
		self.kind == PathKind::Leaf
	}

	pub fn is_root(&self) -> bool {
		self.segments.is_empty()
	}

	/// Whether any segment is `.` or `..`, which a server would treat as
	/// relative navigation rather than a name.
	pub fn has_relative_segment(&self) -> bool {
		self.segments.iter().any(|s| s == "." || s == "..")
	}

	/// Last segment, or the empty string for the root.
	pub fn name(&self) -> &str {
		self.segments.last().map(String::as_str).unwrap_or("")
	}

	/// Append a child segment.
	pub fn child(&self, name: &str, kind: PathKind) -> Self {
		let mut segments = self.segments.clone();
		segments.push(name.to_string());
		SecretPath { segments, kind }
	}

	fn into_kind(self, kind: PathKind) -> Self {
		SecretPath::from_segments(self.segments, kind)
	}

	/// Kind of the segment at `i` as seen from this path: every segment but
	/// the last is a directory.
	fn kind_at(&self, i: usize) -> PathKind {
		if i + 1 < self.segments.len() {
			PathKind::Directory
		} else {
			self.kind
		}
	}
}

impl Ord for SecretPath {
	fn cmp(&self, other: &Self) -> Ordering {
		for (i, (a, b)) in self.segments.iter().zip(&other.segments).enumerate() {
			let ord = self
				.kind_at(i)
				.cmp(&other.kind_at(i))
				.then_with(|| a.cmp(b));
			if ord != Ordering::Equal {
				return ord;
			}
		}
		self.segments
			.len()
			.cmp(&other.segments.len())
			.then_with(|| self.kind.cmp(&other.kind))
	}
}

impl PartialOrd for SecretPath {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl fmt::Display for SecretPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.segments.join("/"))?;
		if self.kind == PathKind::Directory && !self.segments.is_empty() {
			f.write_str("/")?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_leaf_and_directory() {
		let leaf = SecretPath::parse("secret/ipmi/ampere3");
		assert_eq!(leaf.segments(), ["secret", "ipmi", "ampere3"]);
		assert!(leaf.is_leaf());

		let dir = SecretPath::parse("secret/ipmi/");
		assert_eq!(dir.segments(), ["secret", "ipmi"]);
		assert_eq!(dir.kind(), PathKind::Directory);
	}

	#[test]
	fn test_parse_ignores_empty_segments() {
		let path = SecretPath::parse("/secret//db/");
		assert_eq!(path.segments(), ["secret", "db"]);
		assert_eq!(path.to_string(), "secret/db/");
	}

	#[test]
	fn test_empty_path_is_root() {
		let root = SecretPath::parse("");
		assert!(root.is_root());
		assert_eq!(root, SecretPath::root());
		assert_eq!(root.to_string(), "");
	}

	#[test]
	fn test_directories_sort_before_sibling_leaves() {
		let mut paths = vec![
			SecretPath::parse("a/zeta"),
			SecretPath::parse("a/beta/"),
			SecretPath::parse("a/alpha"),
			SecretPath::parse("a/beta/x"),
			SecretPath::parse("a/"),
		];
		paths.sort();
		let rendered: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
		assert_eq!(rendered, ["a/", "a/beta/", "a/beta/x", "a/alpha", "a/zeta"]);
	}

	#[test]
	fn test_relative_segments_are_detected() {
		assert!(SecretPath::parse("secret/ipmi/x/../../sys").has_relative_segment());
		assert!(SecretPath::parse("secret/./db").has_relative_segment());
		assert!(!SecretPath::parse("secret/a..b/.hidden").has_relative_segment());
	}

	#[test]
	fn test_same_segments_different_kind_are_distinct() {
		assert_ne!(SecretPath::parse("a/b"), SecretPath::parse("a/b/"));
		assert!(SecretPath::parse("a/b/") < SecretPath::parse("a/b"));
	}
}
