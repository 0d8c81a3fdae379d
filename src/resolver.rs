//! Resolution of free-form input (URLs, `ssh` command lines) to a secret.
//!
//! Every rule is tried against the whole input. When several match, the
//! first declared rule wins; users settle real ambiguity by reordering their
//! rules, so this order is part of the contract.

use crate::error::{PoleError, Result};
use crate::path::SecretPath;
use crate::rules::{Captures, CompiledRule, RuleSet};
use crate::store::{SecretData, SecretStore};

/// A rule that matched the input, with its substituted target.
#[derive(Debug, Clone)]
pub struct Candidate<'r> {
	pub rule: &'r CompiledRule,
	pub captures: Captures,
	pub path: SecretPath,
}

/// Outcome of resolving one input.
#[derive(Debug, Clone)]
pub struct MatchResult<'r> {
	/// The first declared matching rule.
	pub winner: Candidate<'r>,

	/// Other matching rules, in declaration order.
	pub others: Vec<Candidate<'r>>,
}

impl<'r> MatchResult<'r> {
	pub fn rule(&self) -> &'r CompiledRule {
		self.winner.rule
	}

	pub fn path(&self) -> &SecretPath {
		&self.winner.path
	}

	pub fn is_ambiguous(&self) -> bool {
		!self.others.is_empty()
	}

	/// Every matching rule, winner first.
	pub fn contenders(&self) -> impl Iterator<Item = &Candidate<'r>> {
		std::iter::once(&self.winner).chain(&self.others)
	}
}

/// Evaluates a rule set against input strings.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
	rules: &'r RuleSet,
	warn_on_ambiguous: bool,
}

impl<'r> Resolver<'r> {
	pub fn new(rules: &'r RuleSet) -> Self {
		Resolver {
			rules,
			warn_on_ambiguous: true,
		}
	}

	/// Whether to log every contender when more than one rule matches.
	pub fn warn_on_ambiguous(mut self, warn: bool) -> Self {
		self.warn_on_ambiguous = warn;
		self
	}

	/// All rules matching `input`, in declaration order.
	pub fn candidates(&self, input: &str) -> Vec<Candidate<'r>> {
		self.rules
			.all_rules()
			.iter()
			.filter_map(|rule| {
				let captures = rule.matches(input)?;
				let path = SecretPath::parse(&rule.template.render(&captures));
				Some(Candidate {
					rule,
					captures,
					path,
				})
			})
			.collect()
	}

	/// Select the secret path for `input`. Makes no remote calls.
	///
	/// A winning path with `.` or `..` segments fails with `InvalidPath`;
	/// captures come from untrusted input and must not navigate the store.
	pub fn resolve(&self, input: &str) -> Result<MatchResult<'r>> {
		let mut candidates = self.candidates(input).into_iter();
		let Some(winner) = candidates.next() else {
			return Err(PoleError::NoMatch {
				input: input.to_string(),
			});
		};
		if winner.path.has_relative_segment() {
			return Err(PoleError::InvalidPath {
				path: winner.path.to_string(),
			});
		}
		let result = MatchResult {
			winner,
			others: candidates.collect(),
		};

		if result.is_ambiguous() && self.warn_on_ambiguous {
			let contenders: Vec<String> = result
				.contenders()
				.map(|c| format!("{} -> {}", c.rule.label(), c.path))
				.collect();
			tracing::warn!(
				"{} rules match {input:?}, using rule {}: {}",
				contenders.len(),
				result.rule().label(),
				contenders.join(", ")
			);
		}
		tracing::debug!(rule = %result.rule().label(), path = %result.path(), "resolved");

		Ok(result)
	}

	/// Read the resolved secret with a single remote read.
	///
	/// A target that is missing, or that names a directory, fails with
	/// `UnresolvedSecret` rather than `NotFound`.
	pub fn fetch<S>(&self, store: &S, result: &MatchResult<'r>) -> Result<SecretData>
	where
		S: SecretStore + ?Sized,
	{
		let unresolved = || PoleError::UnresolvedSecret {
			rule: result.rule().index,
			path: result.path().to_string(),
		};
		if !result.path().is_leaf() {
			return Err(unresolved());
		}
		match store.read(result.path()) {
			Err(PoleError::NotFound { .. }) => Err(unresolved()),
			other => other,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{Config, Rule};
	use crate::store::MemoryStore;

	fn rule(pattern: &str, path: &str) -> Rule {
		Rule {
			pattern: Some(pattern.to_string()),
			path: Some(path.to_string()),
			..Default::default()
		}
	}

	fn rule_set(rules: Vec<Rule>) -> RuleSet {
		RuleSet::load(&Config {
			rules,
			..Default::default()
		})
		.unwrap()
	}

	#[test]
	fn test_resolve_ipmi_url() {
		let rules = rule_set(vec![rule(r"https://(.*)-ipmi\..*", "secret/ipmi/{1}")]);
		let result = Resolver::new(&rules)
			.resolve("https://ampere3-ipmi.example.com/#/login")
			.unwrap();
		assert_eq!(result.path().to_string(), "secret/ipmi/ampere3");
		assert!(result.path().is_leaf());
		assert!(!result.is_ambiguous());
	}

	#[test]
	fn test_first_declared_rule_wins() {
		let rules = rule_set(vec![
			rule(r"ssh (\w+)", "secret/first/{1}"),
			rule(r"ssh (.*)", "secret/second/{1}"),
		]);
		let result = Resolver::new(&rules).resolve("ssh bastion").unwrap();
		assert_eq!(result.rule().index, 1);
		assert_eq!(result.path().to_string(), "secret/first/bastion");
		assert!(result.is_ambiguous());

		let contenders: Vec<usize> = result.contenders().map(|c| c.rule.index).collect();
		assert_eq!(contenders, [1, 2]);
	}

	#[test]
	fn test_reordering_rules_changes_winner() {
		let rules = rule_set(vec![
			rule(r"ssh (.*)", "secret/second/{1}"),
			rule(r"ssh (\w+)", "secret/first/{1}"),
		]);
		let result = Resolver::new(&rules)
			.warn_on_ambiguous(false)
			.resolve("ssh bastion")
			.unwrap();
		assert_eq!(result.path().to_string(), "secret/second/bastion");
	}

	#[test]
	fn test_no_match_makes_no_remote_call() {
		let rules = rule_set(vec![rule(r"https://(.*)-ipmi\..*", "secret/ipmi/{1}")]);
		let store = MemoryStore::from_entries([("secret/ipmi/ampere3", "password", "x")]);
		let resolver = Resolver::new(&rules);

		let err = resolver.resolve("ssh somewhere").unwrap_err();
		assert!(matches!(err, PoleError::NoMatch { .. }));
		assert_eq!(store.read_calls(), 0);
		assert_eq!(store.list_calls(), 0);
	}

	#[test]
	fn test_capture_cannot_climb_out_of_template() {
		let rules = rule_set(vec![rule(r"https://(.*)-ipmi\..*", "secret/ipmi/{1}")]);
		let store = MemoryStore::from_entries([("sys/mounts/z", "k", "v")]);
		let resolver = Resolver::new(&rules);

		let err = resolver
			.resolve("https://x/../../../sys/mounts/z-ipmi.example.com")
			.unwrap_err();
		match err {
			PoleError::InvalidPath { path } => assert_eq!(path, "secret/ipmi/x/../../../sys/mounts/z"),
			e => panic!("Expected InvalidPath error, got {e:?}"),
		}
		assert_eq!(store.read_calls(), 0);
	}

	#[test]
	fn test_capture_with_url_delimiters_stays_one_segment() {
		let rules = rule_set(vec![rule(r"https://(.*)-ipmi\..*", "secret/ipmi/{1}")]);
		let store = MemoryStore::from_entries([("secret/ipmi/a#b?x=1", "password", "x")]);
		let resolver = Resolver::new(&rules);

		let result = resolver.resolve("https://a#b?x=1-ipmi.example.com").unwrap();
		assert_eq!(result.path().segments(), ["secret", "ipmi", "a#b?x=1"]);
		assert_eq!(resolver.fetch(&store, &result).unwrap()["password"], "x");
	}

	#[test]
	fn test_empty_rule_set_never_matches() {
		let rules = RuleSet::default();
		let err = Resolver::new(&rules).resolve("").unwrap_err();
		assert!(matches!(err, PoleError::NoMatch { .. }));
	}

	#[test]
	fn test_fetch_reads_once() {
		let rules = rule_set(vec![rule(r"https://(.*)-ipmi\..*", "secret/ipmi/{1}")]);
		let store = MemoryStore::from_entries([("secret/ipmi/ampere3", "password", "x")]);
		let resolver = Resolver::new(&rules);

		let result = resolver
			.resolve("https://ampere3-ipmi.example.com/#/login")
			.unwrap();
		let data = resolver.fetch(&store, &result).unwrap();
		assert_eq!(data["password"], "x");
		assert_eq!(store.read_calls(), 1);
	}

	#[test]
	fn test_fetch_missing_secret_is_unresolved() {
		let rules = rule_set(vec![rule(r"https://(.*)-ipmi\..*", "secret/ipmi/{1}")]);
		let store = MemoryStore::from_entries([("secret/ipmi/other", "password", "x")]);
		let resolver = Resolver::new(&rules);

		let result = resolver.resolve("https://ampere3-ipmi.example.com").unwrap();
		match resolver.fetch(&store, &result).unwrap_err() {
			PoleError::UnresolvedSecret { rule, path } => {
				assert_eq!(rule, 1);
				assert_eq!(path, "secret/ipmi/ampere3");
			}
			e => panic!("Expected UnresolvedSecret error, got {e:?}"),
		}
	}

	#[test]
	fn test_fetch_directory_target_is_unresolved() {
		let rules = rule_set(vec![rule(r"dir (\w+)", "secret/{1}/")]);
		let store = MemoryStore::from_entries([("secret/web/nginx", "k", "v")]);
		let resolver = Resolver::new(&rules);

		let result = resolver.resolve("dir web").unwrap();
		assert!(matches!(
			resolver.fetch(&store, &result),
			Err(PoleError::UnresolvedSecret { .. })
		));
		assert_eq!(store.read_calls(), 0);
	}
}
