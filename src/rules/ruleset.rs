use crate::config::types::{Config, Rule};
use crate::error::{PoleError, Result};
use crate::rules::pattern::{Captures, Matcher};
use crate::rules::template::Template;

/// A compiled rule ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledRule {
	/// 1-based declaration position.
	pub index: usize,

	/// The original rule.
	pub rule: Rule,

	pub matcher: Matcher,

	pub template: Template,
}

impl CompiledRule {
	/// Compile a rule declared at `index` (1-based).
	pub fn compile(index: usize, rule: &Rule) -> Result<Self> {
		rule.validate(index)?;

		let matcher = match (&rule.pattern, &rule.glob) {
			(Some(pattern), None) => Matcher::regex(index, pattern)?,
			(None, Some(glob)) => Matcher::glob(index, glob)?,
			// validate() guarantees exactly one is set
			_ => {
				return Err(PoleError::MissingField {
					rule: index,
					field: "pattern",
				});
			}
		};

		let source = rule.path.as_deref().ok_or(PoleError::MissingField {
			rule: index,
			field: "path",
		})?;
		let template = Template::parse(index, source)?;
		template.check(index, &matcher)?;

		Ok(CompiledRule {
			index,
			rule: rule.clone(),
			matcher,
			template,
		})
	}

	/// Match the whole input against this rule.
	pub fn matches(&self, input: &str) -> Option<Captures> {
		self.matcher.captures(input)
	}

	pub fn label(&self) -> String {
		self.rule.label(self.index)
	}

	/// The pattern text as written in config.
	pub fn pattern_source(&self) -> &str {
		self.rule
			.pattern
			.as_deref()
			.or(self.rule.glob.as_deref())
			.unwrap_or("")
	}
}

/// The ordered, immutable collection of rules loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
	rules: Vec<CompiledRule>,
}

impl RuleSet {
	/// Compile every rule in `config`. Any broken rule fails the whole set.
	pub fn load(config: &Config) -> Result<Self> {
		let rules = config
			.rules
			.iter()
			.enumerate()
			.map(|(i, rule)| CompiledRule::compile(i + 1, rule))
			.collect::<Result<Vec<_>>>()?;
		Ok(RuleSet { rules })
	}

	/// Rules in declaration order, which is also the tie-break order.
	pub fn all_rules(&self) -> &[CompiledRule] {
		&self.rules
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}
}
