//! Plain-text key/value tables.

use std::fmt::Write;

const DEFAULT_WIDTH: usize = 80;

/// Render a two-column `Key`/`Value` table without a trailing newline.
///
/// ```text
/// Key   Value
/// ====  =====
/// user  admin
/// ```
///
/// `term_width` only limits the length of the value underline. Values are
/// never wrapped so they stay copyable from the terminal.
pub fn dict_to_table<'a, I>(data: I, term_width: usize) -> String
where
	I: IntoIterator<Item = (&'a str, &'a str)>,
{
	let rows: Vec<(&str, &str)> = data.into_iter().collect();

	let key_width = rows
		.iter()
		.map(|(k, _)| k.chars().count())
		.max()
		.unwrap_or(0)
		.max(3);
	let value_width = rows
		.iter()
		.map(|(_, v)| v.chars().count())
		.max()
		.unwrap_or(0)
		.max(5);
	let value_width = value_width.min(term_width.saturating_sub(key_width + 2));

	let mut out = String::new();
	let _ = writeln!(out, "{:<key_width$}  Value", "Key");
	let _ = writeln!(out, "{}  {}", "=".repeat(key_width), "=".repeat(value_width));
	for (key, value) in rows {
		let _ = writeln!(out, "{key:<key_width$}  {value}");
	}

	out.pop();
	out
}

/// Width of the terminal on stdout, else `$COLUMNS`, else 80.
pub fn terminal_width() -> usize {
	#[cfg(unix)]
	{
		let mut size: libc::winsize = unsafe { std::mem::zeroed() };
		// SAFETY: TIOCGWINSZ only writes into the provided winsize.
		let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut size) };
		if rc == 0 && size.ws_col > 0 {
			return size.ws_col as usize;
		}
	}

	std::env::var("COLUMNS")
		.ok()
		.and_then(|c| c.parse().ok())
		.filter(|&c: &usize| c > 0)
		.unwrap_or(DEFAULT_WIDTH)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty() {
		assert_eq!(dict_to_table(std::iter::empty(), 100), "Key  Value\n===  =====");
	}

	#[test]
	fn test_short() {
		assert_eq!(
			dict_to_table([("a", "A"), ("be", "B")], 100),
			"Key  Value\n===  =====\na    A\nbe   B"
		);
	}

	#[test]
	fn test_long() {
		assert_eq!(
			dict_to_table(
				[("long_key", "long_value"), ("longer_key", "longer_value")],
				100
			),
			"Key         Value\n\
			 ==========  ============\n\
			 long_key    long_value\n\
			 longer_key  longer_value"
		);
	}

	#[test]
	fn test_longer_than_terminal() {
		assert_eq!(
			dict_to_table(
				[("long_key", "long_value"), ("longer_key", "longer_value")],
				15
			),
			"Key         Value\n\
			 ==========  ===\n\
			 long_key    long_value\n\
			 longer_key  longer_value"
		);
	}

	#[test]
	fn test_degenerate_terminal() {
		assert_eq!(dict_to_table([("a", "A")], 0), "Key  Value\n===  \na    A");
	}

	#[test]
	fn test_terminal_width_is_positive() {
		assert!(terminal_width() > 0);
	}
}
