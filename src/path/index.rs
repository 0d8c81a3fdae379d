use crate::error::{PoleError, Result};
use crate::path::fuzzy::{FuzzyMatch, fuzzy_score};
use crate::path::{PathKind, SecretPath};
use crate::store::SecretStore;
use std::collections::HashMap;

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId(usize);

#[derive(Debug)]
struct Node {
	name: String,
	kind: PathKind,
	children: HashMap<String, NodeId>,
	/// Position in the remote listing order, used as the final tie-break.
	seq: usize,
}

/// Tree view of remote secret paths.
///
/// Nodes live in an arena and own their children by id. The index is built
/// once and is read-only afterwards.
#[derive(Debug)]
pub struct PathIndex {
	nodes: Vec<Node>,
	root: NodeId,
}

/// Incrementally inserts full paths, creating missing ancestors.
#[derive(Debug)]
pub struct PathIndexBuilder {
	index: PathIndex,
	conflicts: Vec<PoleError>,
}

impl Default for PathIndexBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl PathIndexBuilder {
	pub fn new() -> Self {
		let root = Node {
			name: String::new(),
			kind: PathKind::Directory,
			children: HashMap::new(),
			seq: 0,
		};
		PathIndexBuilder {
			index: PathIndex {
				nodes: vec![root],
				root: NodeId(0),
			},
			conflicts: Vec::new(),
		}
	}

	/// Insert a path. Fails with `IndexConflict` if the path, or one of its
	/// ancestors, is already indexed with a different kind; the tree is left
	/// unchanged in that case.
	pub fn insert(&mut self, path: &SecretPath) -> Result<()> {
		// Check the whole chain first so a conflicting entry adds nothing.
		let mut cursor = Some(self.index.root);
		for (i, segment) in path.segments().iter().enumerate() {
			let expected = if i + 1 == path.segments().len() {
				path.kind()
			} else {
				PathKind::Directory
			};
			let Some(child) = cursor.and_then(|id| self.index.child(id, segment)) else {
				break;
			};
			let existing = self.index.node(child).kind;
			if existing != expected {
				let conflicting = SecretPath::from_segments(path.segments()[..=i].to_vec(), expected);
				return Err(PoleError::IndexConflict {
					path: conflicting.to_string(),
					existing,
					reported: expected,
				});
			}
			cursor = Some(child);
		}

		let mut current = self.index.root;
		for (i, segment) in path.segments().iter().enumerate() {
			let kind = if i + 1 == path.segments().len() {
				path.kind()
			} else {
				PathKind::Directory
			};
			current = match self.index.child(current, segment) {
				Some(child) => child,
				None => self.index.add_child(current, segment, kind),
			};
		}
		Ok(())
	}

	/// Insert a path, recording a conflict as a warning instead of failing.
	pub fn insert_or_warn(&mut self, path: &SecretPath) {
		if let Err(e) = self.insert(path) {
			tracing::warn!("dropping listing entry: {e}");
			self.conflicts.push(e);
		}
	}

	/// Conflicts recorded so far by `insert_or_warn`.
	pub fn conflicts(&self) -> &[PoleError] {
		&self.conflicts
	}

	pub fn build(self) -> PathIndex {
		self.index
	}
}

/// One node visited by `PathIndex::render_tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry<'a> {
	pub name: &'a str,
	pub kind: PathKind,
	pub path: SecretPath,
}

/// Lazy pre-order walk over a subtree.
pub struct TreeIter<'a> {
	index: &'a PathIndex,
	stack: Vec<(usize, NodeId, SecretPath)>,
}

impl<'a> Iterator for TreeIter<'a> {
	type Item = (usize, TreeEntry<'a>);

	fn next(&mut self) -> Option<Self::Item> {
		let (depth, id, path) = self.stack.pop()?;
		let node = self.index.node(id);
		// Push in reverse so the smallest child is visited first.
		for (child_id, child_path) in self.index.sorted_children(id, &path).into_iter().rev() {
			self.stack.push((depth + 1, child_id, child_path));
		}
		Some((
			depth,
			TreeEntry {
				name: &node.name,
				kind: node.kind,
				path,
			},
		))
	}
}

impl PathIndex {
	/// Build an index from full paths, dropping (and logging) conflicting entries.
	pub fn from_paths<'a, I>(paths: I) -> (Self, Vec<PoleError>)
	where
		I: IntoIterator<Item = &'a SecretPath>,
	{
		let mut builder = PathIndexBuilder::new();
		for path in paths {
			builder.insert_or_warn(path);
		}
		let conflicts = std::mem::take(&mut builder.conflicts);
		(builder.build(), conflicts)
	}

	/// Build an index by listing `prefix` on the remote store.
	///
	/// Directories are listed level by level, one call per directory, with up
	/// to `workers` calls of a level in flight at once. `max_depth` limits how
	/// many levels below `prefix` are listed (`Some(1)` lists only `prefix`).
	/// A missing `prefix` yields an empty index.
	pub fn load<S>(
		store: &S,
		prefix: &SecretPath,
		max_depth: Option<usize>,
		workers: usize,
	) -> Result<(Self, Vec<PoleError>)>
	where
		S: SecretStore + ?Sized,
	{
		let workers = workers.max(1);
		let mut builder = PathIndexBuilder::new();
		let prefix = SecretPath::from_segments(prefix.segments().to_vec(), PathKind::Directory);
		if !prefix.is_root() {
			builder.insert_or_warn(&prefix);
		}

		let mut frontier = vec![prefix.clone()];
		let mut depth = 0;
		while !frontier.is_empty() && max_depth.is_none_or(|max| depth < max) {
			let mut listings = Vec::with_capacity(frontier.len());
			for chunk in frontier.chunks(workers) {
				listings.extend(list_chunk(store, chunk));
			}

			let mut next = Vec::new();
			for (dir, listing) in frontier.iter().zip(listings) {
				let entries = match listing {
					Ok(entries) => entries,
					Err(PoleError::NotFound { .. }) if *dir == prefix => Vec::new(),
					Err(e) => return Err(e),
				};
				for entry in entries {
					let kind = if entry.is_directory {
						PathKind::Directory
					} else {
						PathKind::Leaf
					};
					let child = dir.child(&entry.name, kind);
					match builder.insert(&child) {
						Ok(()) if kind == PathKind::Directory => next.push(child),
						Ok(()) => {}
						Err(e) => {
							tracing::warn!("dropping listing entry: {e}");
							builder.conflicts.push(e);
						}
					}
				}
			}
			frontier = next;
			depth += 1;
		}

		let conflicts = std::mem::take(&mut builder.conflicts);
		Ok((builder.build(), conflicts))
	}

	fn node(&self, id: NodeId) -> &Node {
		&self.nodes[id.0]
	}

	fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
		self.node(id).children.get(name).copied()
	}

	fn add_child(&mut self, parent: NodeId, name: &str, kind: PathKind) -> NodeId {
		let id = NodeId(self.nodes.len());
		self.nodes.push(Node {
			name: name.to_string(),
			kind,
			children: HashMap::new(),
			seq: id.0,
		});
		self.nodes[parent.0].children.insert(name.to_string(), id);
		id
	}

	/// Locate the node for `path`, ignoring the kind recorded on `path`.
	fn find(&self, path: &SecretPath) -> Option<NodeId> {
		path.segments()
			.iter()
			.try_fold(self.root, |id, segment| self.child(id, segment))
	}

	/// Children of `id` as paths under `path`, directories first then by name.
	fn sorted_children(&self, id: NodeId, path: &SecretPath) -> Vec<(NodeId, SecretPath)> {
		let mut children: Vec<(NodeId, SecretPath)> = self
			.node(id)
			.children
			.iter()
			.map(|(name, &child)| (child, path.child(name, self.node(child).kind)))
			.collect();
		children.sort_by(|a, b| a.1.cmp(&b.1));
		children
	}

	/// Whether `path` is indexed with the same kind.
	pub fn contains(&self, path: &SecretPath) -> bool {
		self.find(path)
			.is_some_and(|id| self.node(id).kind == path.kind())
	}

	/// Number of indexed nodes, excluding the root.
	pub fn len(&self) -> usize {
		self.nodes.len() - 1
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Immediate children of `prefix`, directories first then lexicographic.
	/// Empty when `prefix` is unknown or a leaf.
	pub fn list_children(&self, prefix: &SecretPath) -> Vec<SecretPath> {
		match self.find(prefix) {
			Some(id) if self.node(id).kind == PathKind::Directory => {
				let base = SecretPath::from_segments(prefix.segments().to_vec(), PathKind::Directory);
				self.sorted_children(id, &base)
					.into_iter()
					.map(|(_, path)| path)
					.collect()
			}
			_ => Vec::new(),
		}
	}

	/// Pre-order walk of the subtree at `prefix` as `(depth, entry)` pairs,
	/// the prefix itself at depth 0. Empty when `prefix` is unknown.
	pub fn render_tree(&self, prefix: &SecretPath) -> TreeIter<'_> {
		let stack = match self.find(prefix) {
			Some(id) => {
				let path = SecretPath::from_segments(prefix.segments().to_vec(), self.node(id).kind);
				vec![(0, id, path)]
			}
			None => Vec::new(),
		};
		TreeIter { index: self, stack }
	}

	/// All leaf paths, in tree order.
	pub fn leaves(&self) -> Vec<SecretPath> {
		self.render_tree(&SecretPath::root())
			.filter(|(_, entry)| entry.kind == PathKind::Leaf)
			.map(|(_, entry)| entry.path)
			.collect()
	}

	/// Leaf paths containing `query` as a case-insensitive subsequence.
	///
	/// Ranked by fewest skipped characters, then shorter path, then
	/// lexicographic path, then remote listing order.
	pub fn fuzzy_search(&self, query: &str) -> Vec<FuzzyMatch> {
		let mut matches: Vec<(usize, FuzzyMatch)> = self
			.render_tree(&SecretPath::root())
			.filter(|(_, entry)| entry.kind == PathKind::Leaf)
			.filter_map(|(_, entry)| {
				let seq = self.find(&entry.path).map(|id| self.node(id).seq)?;
				let text = entry.path.to_string();
				let skipped = fuzzy_score(query, &text)?;
				Some((
					seq,
					FuzzyMatch {
						path: entry.path,
						skipped,
					},
				))
			})
			.collect();

		matches.sort_by(|(seq_a, a), (seq_b, b)| {
			let text_a = a.path.to_string();
			let text_b = b.path.to_string();
			a.skipped
				.cmp(&b.skipped)
				.then_with(|| text_a.chars().count().cmp(&text_b.chars().count()))
				.then_with(|| text_a.cmp(&text_b))
				.then_with(|| seq_a.cmp(seq_b))
		});
		matches.into_iter().map(|(_, m)| m).collect()
	}
}

/// List a batch of directories, one thread per directory when there is more
/// than one. Results come back in input order.
fn list_chunk<S>(store: &S, dirs: &[SecretPath]) -> Vec<Result<Vec<crate::store::ListEntry>>>
where
	S: SecretStore + ?Sized,
{
	if dirs.len() == 1 {
		return vec![store.list(&dirs[0])];
	}
	std::thread::scope(|scope| {
		let handles: Vec<_> = dirs
			.iter()
			.map(|dir| scope.spawn(move || store.list(dir)))
			.collect();
		handles
			.into_iter()
			.map(|handle| match handle.join() {
				Ok(result) => result,
				Err(panic) => std::panic::resume_unwind(panic),
			})
			.collect()
	})
}
