use crate::error::{PoleError, Result};
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Values captured by a successful match.
///
/// Index 0 is the whole input; groups are numbered from 1 in pattern order.
/// Named groups are also reachable by number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures {
	values: Vec<Option<String>>,
	names: HashMap<String, usize>,
}

impl Captures {
	pub fn get(&self, index: usize) -> Option<&str> {
		self.values.get(index)?.as_deref()
	}

	pub fn name(&self, name: &str) -> Option<&str> {
		self.get(*self.names.get(name)?)
	}

	/// Number of groups, excluding the whole-input group.
	pub fn len(&self) -> usize {
		self.values.len() - 1
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// One piece of a placeholder glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
	/// Text that must appear verbatim.
	Literal(String),

	/// `*`: any text, captured positionally.
	Wildcard,

	/// `{name}`: any text, captured by name and position.
	Capture(String),
}

/// A compiled placeholder pattern such as `ssh {user}@{host}*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
	segments: Vec<Segment>,
}

impl GlobPattern {
	/// Parse a glob. `\` escapes the next character.
	pub fn parse(rule: usize, pattern: &str) -> Result<Self> {
		let invalid = |reason: &str| PoleError::InvalidGlob {
			rule,
			pattern: pattern.to_string(),
			reason: reason.to_string(),
		};

		let mut segments = Vec::new();
		let mut literal = String::new();
		let mut seen_names: Vec<String> = Vec::new();
		let mut chars = pattern.chars();

		while let Some(c) = chars.next() {
			match c {
				'\\' => match chars.next() {
					Some(escaped) => literal.push(escaped),
					None => return Err(invalid("trailing escape")),
				},
				'*' => {
					flush_literal(&mut literal, &mut segments);
					segments.push(Segment::Wildcard);
				}
				'{' => {
					let mut name = String::new();
					let mut closed = false;
					for c in chars.by_ref() {
						if c == '}' {
							closed = true;
							break;
						}
						name.push(c);
					}
					if !closed {
						return Err(invalid("unclosed placeholder"));
					}
					if !is_identifier(&name) {
						return Err(invalid("placeholder names must be non-empty identifiers"));
					}
					if seen_names.contains(&name) {
						return Err(invalid("duplicate placeholder name"));
					}
					seen_names.push(name.clone());
					flush_literal(&mut literal, &mut segments);
					segments.push(Segment::Capture(name));
				}
				'}' => return Err(invalid("unmatched '}'")),
				_ => literal.push(c),
			}
		}
		flush_literal(&mut literal, &mut segments);

		Ok(GlobPattern { segments })
	}

	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	fn capture_count(&self) -> usize {
		self.segments
			.iter()
			.filter(|s| !matches!(s, Segment::Literal(_)))
			.count()
	}

	fn captures(&self, input: &str) -> Option<Captures> {
		let mut spans = Vec::with_capacity(self.capture_count());
		let mut dead_ends = HashSet::new();
		if !self.match_from(0, 0, input, &mut spans, &mut dead_ends) {
			return None;
		}

		let mut values = Vec::with_capacity(spans.len() + 1);
		values.push(Some(input.to_string()));
		values.extend(spans.iter().map(|&(start, end)| Some(input[start..end].to_string())));

		let names = self
			.segments
			.iter()
			.filter(|s| !matches!(s, Segment::Literal(_)))
			.enumerate()
			.filter_map(|(i, s)| match s {
				Segment::Capture(name) => Some((name.clone(), i + 1)),
				_ => None,
			})
			.collect();

		Some(Captures { values, names })
	}

	/// Backtracking match of `segments[seg..]` against `input[pos..]`.
	/// Placeholders try the longest span first.
	///
	/// Whether a suffix matches depends only on `(seg, pos)`, so failed pairs
	/// are recorded in `dead_ends` and never explored twice. This bounds the
	/// work to segments × positions × span lengths.
	fn match_from(
		&self,
		seg: usize,
		pos: usize,
		input: &str,
		spans: &mut Vec<(usize, usize)>,
		dead_ends: &mut HashSet<(usize, usize)>,
	) -> bool {
		let Some(segment) = self.segments.get(seg) else {
			return pos == input.len();
		};
		if dead_ends.contains(&(seg, pos)) {
			return false;
		}

		let matched = match segment {
			Segment::Literal(text) => {
				input[pos..].starts_with(text.as_str())
					&& self.match_from(seg + 1, pos + text.len(), input, spans, dead_ends)
			}
			Segment::Wildcard | Segment::Capture(_) => {
				let ends: Vec<usize> = input[pos..]
					.char_indices()
					.map(|(i, _)| pos + i)
					.chain(std::iter::once(input.len()))
					.collect();
				let mut found = false;
				for &end in ends.iter().rev() {
					spans.push((pos, end));
					if self.match_from(seg + 1, end, input, spans, dead_ends) {
						found = true;
						break;
					}
					spans.pop();
				}
				found
			}
		};

		if !matched {
			dead_ends.insert((seg, pos));
		}
		matched
	}
}

fn flush_literal(literal: &mut String, segments: &mut Vec<Segment>) {
	if !literal.is_empty() {
		segments.push(Segment::Literal(std::mem::take(literal)));
	}
}

pub(crate) fn is_identifier(name: &str) -> bool {
	!name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A compiled rule pattern, always anchored to the whole input.
#[derive(Debug, Clone)]
pub enum Matcher {
	Regex(Regex),
	Glob(GlobPattern),
}

impl Matcher {
	/// Compile a regular expression, anchored at both ends.
	pub fn regex(rule: usize, pattern: &str) -> Result<Self> {
		let anchored = format!("^(?:{pattern})$");
		let regex = Regex::new(&anchored).map_err(|source| PoleError::InvalidRegex {
			rule,
			pattern: pattern.to_string(),
			source,
		})?;
		Ok(Matcher::Regex(regex))
	}

	pub fn glob(rule: usize, pattern: &str) -> Result<Self> {
		Ok(Matcher::Glob(GlobPattern::parse(rule, pattern)?))
	}

	/// Number of capture groups, excluding the whole-input group.
	pub fn capture_count(&self) -> usize {
		match self {
			Matcher::Regex(regex) => regex.captures_len() - 1,
			Matcher::Glob(glob) => glob.capture_count(),
		}
	}

	/// Whether the pattern defines a group called `name`.
	pub fn has_name(&self, name: &str) -> bool {
		match self {
			Matcher::Regex(regex) => regex.capture_names().flatten().any(|n| n == name),
			Matcher::Glob(glob) => glob
				.segments
				.iter()
				.any(|s| matches!(s, Segment::Capture(n) if n == name)),
		}
	}

	/// Match the whole input, returning the captured values.
	pub fn captures(&self, input: &str) -> Option<Captures> {
		match self {
			Matcher::Regex(regex) => {
				let caps = regex.captures(input)?;
				let values = (0..caps.len())
					.map(|i| caps.get(i).map(|m| m.as_str().to_string()))
					.collect();
				let names = regex
					.capture_names()
					.enumerate()
					.filter_map(|(i, name)| name.map(|n| (n.to_string(), i)))
					.collect();
				Some(Captures { values, names })
			}
			Matcher::Glob(glob) => glob.captures(input),
		}
	}

	pub fn is_match(&self, input: &str) -> bool {
		self.captures(input).is_some()
	}
}
