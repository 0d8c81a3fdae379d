use pole::PoleError;
use pole::config::{Config, Rule, parse_config_str};
use pole::path::{PathIndex, PathKind, SecretPath};
use pole::resolver::Resolver;
use pole::rules::RuleSet;
use pole::store::{MemoryStore, select_value};
use std::path::Path;

fn store() -> MemoryStore {
	MemoryStore::from_entries([
		("secret/ipmi/ampere3", "password", "hunter2"),
		("secret/ipmi/ampere3", "user", "ADMIN"),
		("secret/ipmi/ampere4", "password", "correct-horse"),
		("secret/web/nginx", "token", "abc"),
		("secret/ssh/bastion/root", "password", "toor"),
	])
}

fn rules(toml: &str) -> RuleSet {
	let config = parse_config_str(toml, Path::new("test.toml")).unwrap();
	RuleSet::load(&config).unwrap()
}

const RULES: &str = r#"
[[rules]]
name = "ipmi"
pattern = 'https://(.*)-ipmi\..*'
path = "secret/ipmi/{1}"
key = "password"

[[rules]]
name = "catch-all"
pattern = 'https://([^./]+).*'
path = "secret/web/{1}"

[[rules]]
glob = "ssh {user}@{host}"
path = "secret/ssh/{host}/{user}"
"#;

#[test]
fn test_url_to_password_round_trip() {
	let store = store();
	let rules = rules(RULES);
	let resolver = Resolver::new(&rules);

	let result = resolver
		.resolve("https://ampere3-ipmi.example.com/#/login")
		.unwrap();
	assert_eq!(result.rule().rule.name.as_deref(), Some("ipmi"));

	let data = resolver.fetch(&store, &result).unwrap();
	let key = result.rule().rule.key.as_deref();
	let (key, value) = select_value(result.path(), &data, key).unwrap();
	assert_eq!((key, value), ("password", "hunter2"));
	assert_eq!(store.read_calls(), 1);
	assert_eq!(store.list_calls(), 0);
}

#[test]
fn test_ssh_command_line_resolves_through_glob() {
	let store = store();
	let rules = rules(RULES);
	let resolver = Resolver::new(&rules);

	let result = resolver.resolve("ssh root@bastion").unwrap();
	assert_eq!(result.path().to_string(), "secret/ssh/bastion/root");
	assert_eq!(result.winner.captures.name("user"), Some("root"));

	let data = resolver.fetch(&store, &result).unwrap();
	assert_eq!(select_value(result.path(), &data, None).unwrap().1, "toor");
}

#[test]
fn test_both_matching_rules_are_reported() {
	let rules = rules(RULES);
	let result = Resolver::new(&rules)
		.warn_on_ambiguous(false)
		.resolve("https://ampere3-ipmi.example.com")
		.unwrap();

	let paths: Vec<String> = result.contenders().map(|c| c.path.to_string()).collect();
	assert_eq!(paths, ["secret/ipmi/ampere3", "secret/web/ampere3-ipmi"]);
}

#[test]
fn test_no_match_costs_nothing() {
	let store = store();
	let rules = rules(RULES);

	let err = Resolver::new(&rules).resolve("telnet ampere3").unwrap_err();
	assert!(matches!(err, PoleError::NoMatch { .. }));
	assert_eq!(store.read_calls() + store.list_calls(), 0);
}

#[test]
fn test_matched_but_missing_is_not_a_no_match() {
	let store = store();
	let rules = rules(RULES);
	let resolver = Resolver::new(&rules);

	let result = resolver.resolve("https://ampere9-ipmi.example.com").unwrap();
	match resolver.fetch(&store, &result) {
		Err(PoleError::UnresolvedSecret { rule, path }) => {
			assert_eq!(rule, 1);
			assert_eq!(path, "secret/ipmi/ampere9");
		}
		other => panic!("Expected UnresolvedSecret error, got {other:?}"),
	}
}

#[test]
fn test_secret_with_several_keys_needs_a_key() {
	let store = store();
	let rules = RuleSet::load(&Config {
		rules: vec![Rule {
			pattern: Some(r"bmc (\w+)".to_string()),
			path: Some("secret/ipmi/{1}".to_string()),
			..Default::default()
		}],
		..Default::default()
	})
	.unwrap();
	let resolver = Resolver::new(&rules);

	let result = resolver.resolve("bmc ampere3").unwrap();
	let data = resolver.fetch(&store, &result).unwrap();
	match select_value(result.path(), &data, None) {
		Err(PoleError::AmbiguousKey { keys, .. }) => assert_eq!(keys, ["password", "user"]),
		other => panic!("Expected AmbiguousKey error, got {other:?}"),
	}
}

#[test]
fn test_load_then_browse() {
	let store = store();
	let (index, conflicts) =
		PathIndex::load(&store, &SecretPath::directory("secret"), None, 4).unwrap();
	assert!(conflicts.is_empty());

	let children: Vec<String> = index
		.list_children(&SecretPath::directory("secret"))
		.iter()
		.map(ToString::to_string)
		.collect();
	assert_eq!(children, ["secret/ipmi/", "secret/ssh/", "secret/web/"]);

	let tree: Vec<(usize, String)> = index
		.render_tree(&SecretPath::directory("secret/ssh"))
		.map(|(depth, entry)| (depth, entry.path.to_string()))
		.collect();
	assert_eq!(
		tree,
		[
			(0, "secret/ssh/".to_string()),
			(1, "secret/ssh/bastion/".to_string()),
			(2, "secret/ssh/bastion/root".to_string()),
		]
	);

	// One list call per directory: secret, ipmi, ssh, ssh/bastion, web.
	assert_eq!(store.list_calls(), 5);
	assert_eq!(store.read_calls(), 0);
}

#[test]
fn test_load_then_fuzzy_search() {
	let store = store();
	let (index, _) = PathIndex::load(&store, &SecretPath::directory("secret"), None, 2).unwrap();

	let found: Vec<String> = index
		.fuzzy_search("amp4")
		.iter()
		.map(|m| m.path.to_string())
		.collect();
	assert_eq!(found, ["secret/ipmi/ampere4"]);

	let ranked = index.fuzzy_search("ampere");
	assert_eq!(ranked.len(), 2);
	assert!(ranked.iter().all(|m| m.skipped == 0 && m.path.kind() == PathKind::Leaf));
	assert_eq!(ranked[0].path.to_string(), "secret/ipmi/ampere3");
}

#[test]
fn test_load_missing_prefix_is_empty() {
	let store = store();
	let (index, _) = PathIndex::load(&store, &SecretPath::directory("kv"), None, 4).unwrap();
	assert!(index.list_children(&SecretPath::directory("kv")).is_empty());
	assert!(index.fuzzy_search("").is_empty());
}
