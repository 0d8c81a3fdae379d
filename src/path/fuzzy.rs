use crate::path::SecretPath;

/// A leaf path found by fuzzy search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
	pub path: SecretPath,

	/// Characters skipped between the first and last matched character.
	pub skipped: usize,
}

/// Score `text` against `query` as a case-insensitive ordered subsequence.
///
/// Returns `None` when `query` is not a subsequence of `text`, otherwise the
/// smallest number of unmatched characters inside any window that contains
/// the whole query. An empty query matches everything with a score of 0.
pub fn fuzzy_score(query: &str, text: &str) -> Option<usize> {
	let query: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
	let text: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();

	let Some(&first) = query.first() else {
		return Some(0);
	};

	let mut best: Option<usize> = None;
	for start in (0..text.len()).filter(|&i| text[i] == first) {
		// Greedy forward match gives the earliest end for this start.
		let mut qi = 1;
		let mut end = start;
		for (offset, &c) in text[start + 1..].iter().enumerate() {
			if qi == query.len() {
				break;
			}
			if c == query[qi] {
				qi += 1;
				end = start + 1 + offset;
			}
		}
		if qi < query.len() {
			// Later starts cannot succeed either.
			break;
		}
		let skipped = end + 1 - start - query.len();
		best = Some(best.map_or(skipped, |b| b.min(skipped)));
		if skipped == 0 {
			break;
		}
	}
	best
}
