use crate::error::{PoleError, Result};
use crate::rules::pattern::{Captures, Matcher, is_identifier};

/// One piece of a parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
	Literal(String),

	/// `{1}`: a positional capture, `{0}` being the whole input.
	Index(usize),

	/// `{name}`: a named capture.
	Name(String),
}

/// Parsed secret path template (e.g. `secret/ipmi/{1}`).
///
/// `{{` and `}}` produce literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
	source: String,
	parts: Vec<TemplatePart>,
}

impl Template {
	pub fn parse(rule: usize, template: &str) -> Result<Self> {
		let invalid = |reason: &str| PoleError::InvalidTemplate {
			rule,
			template: template.to_string(),
			reason: reason.to_string(),
		};

		let mut parts = Vec::new();
		let mut literal = String::new();
		let mut chars = template.chars().peekable();

		while let Some(c) = chars.next() {
			match c {
				'{' if chars.peek() == Some(&'{') => {
					chars.next();
					literal.push('{');
				}
				'}' if chars.peek() == Some(&'}') => {
					chars.next();
					literal.push('}');
				}
				'{' => {
					let mut reference = String::new();
					let mut closed = false;
					for c in chars.by_ref() {
						if c == '}' {
							closed = true;
							break;
						}
						reference.push(c);
					}
					if !closed {
						return Err(invalid("unclosed placeholder"));
					}
					let part = if !reference.is_empty() && reference.chars().all(|c| c.is_ascii_digit())
					{
						let index = reference
							.parse()
							.map_err(|_| invalid("placeholder index out of range"))?;
						TemplatePart::Index(index)
					} else if is_identifier(&reference) {
						TemplatePart::Name(reference)
					} else {
						return Err(invalid("placeholders must be a number or an identifier"));
					};
					if !literal.is_empty() {
						parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
					}
					parts.push(part);
				}
				'}' => return Err(invalid("unmatched '}'")),
				_ => literal.push(c),
			}
		}
		if !literal.is_empty() {
			parts.push(TemplatePart::Literal(literal));
		}

		Ok(Template {
			source: template.to_string(),
			parts,
		})
	}

	pub fn source(&self) -> &str {
		&self.source
	}

	pub fn parts(&self) -> &[TemplatePart] {
		&self.parts
	}

	/// Check every placeholder refers to a group defined by `matcher`.
	pub fn check(&self, rule: usize, matcher: &Matcher) -> Result<()> {
		for part in &self.parts {
			let unknown = match part {
				TemplatePart::Index(i) if *i > matcher.capture_count() => Some(i.to_string()),
				TemplatePart::Name(name) if !matcher.has_name(name) => Some(name.clone()),
				_ => None,
			};
			if let Some(capture) = unknown {
				return Err(PoleError::UnknownCapture {
					rule,
					template: self.source.clone(),
					capture,
				});
			}
		}
		Ok(())
	}

	/// Substitute captured values. Groups that did not participate in the
	/// match render as empty text.
	pub fn render(&self, captures: &Captures) -> String {
		let mut out = String::new();
		for part in &self.parts {
			match part {
				TemplatePart::Literal(text) => out.push_str(text),
				TemplatePart::Index(i) => out.push_str(captures.get(*i).unwrap_or("")),
				TemplatePart::Name(name) => out.push_str(captures.name(name).unwrap_or("")),
			}
		}
		out
	}
}
