use crate::config::types::Config;
use crate::error::{PoleError, Result};
use std::path::Path;

/// Parse a config file from the given path.
pub fn parse_config_file(path: &Path) -> Result<Config> {
	let content = std::fs::read_to_string(path).map_err(|source| PoleError::ConfigReadError {
		path: path.to_path_buf(),
		source,
	})?;

	parse_config_str(&content, path)
}

/// Parse a config from a string (useful for testing).
pub fn parse_config_str(content: &str, path: &Path) -> Result<Config> {
	let config: Config = toml::from_str(content).map_err(|source| PoleError::ConfigParseError {
		path: path.to_path_buf(),
		source,
	})?;

	// Validate the parsed config
	config.validate()?;

	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::KvVersion;
	use std::path::PathBuf;

	#[test]
	fn test_parse_empty_config() {
		let content = "";
		let path = PathBuf::from("test.toml");
		let config = parse_config_str(content, &path).unwrap();

		assert_eq!(config.mount, "secret");
		assert!(config.address.is_none());
		assert!(config.kv_version.is_none());
		assert_eq!(config.clear_after, 30);
		assert!(config.warn_on_ambiguous);
		assert_eq!(config.workers, 8);
		assert!(config.rules.is_empty());
	}

	#[test]
	fn test_parse_basic_config() {
		let content = r#"
mount = "kv"
address = "https://vault.example.com:8200"
kv-version = 2
clear-after = 10
warn-on-ambiguous = false
workers = 2
"#;
		let path = PathBuf::from("test.toml");
		let config = parse_config_str(content, &path).unwrap();

		assert_eq!(config.mount, "kv");
		assert_eq!(
			config.address,
			Some("https://vault.example.com:8200".to_string())
		);
		assert_eq!(config.kv_version, Some(KvVersion::V2));
		assert_eq!(config.clear_after, 10);
		assert!(!config.warn_on_ambiguous);
		assert_eq!(config.workers, 2);
	}

	#[test]
	fn test_parse_kv_version_as_string() {
		let path = PathBuf::from("test.toml");
		let config = parse_config_str(r#"kv-version = "1""#, &path).unwrap();
		assert_eq!(config.kv_version, Some(KvVersion::V1));
	}

	#[test]
	fn test_parse_unsupported_kv_version() {
		let path = PathBuf::from("test.toml");
		let result = parse_config_str("kv-version = 3", &path);
		assert!(matches!(result, Err(PoleError::ConfigParseError { .. })));
	}

	#[test]
	fn test_parse_rules_array_of_tables() {
		let content = r#"
[[rules]]
name = "ipmi"
pattern = 'https://(.*)-ipmi\..*'
path = "secret/ipmi/{1}"
key = "password"

[[rules]]
glob = "ssh {user}@{host}"
path = "secret/ssh/{host}/{user}"
"#;
		let path = PathBuf::from("test.toml");
		let config = parse_config_str(content, &path).unwrap();

		assert_eq!(config.rules.len(), 2);

		let rule1 = &config.rules[0];
		assert_eq!(rule1.name, Some("ipmi".to_string()));
		assert_eq!(rule1.pattern, Some(r"https://(.*)-ipmi\..*".to_string()));
		assert_eq!(rule1.path, Some("secret/ipmi/{1}".to_string()));
		assert_eq!(rule1.key, Some("password".to_string()));

		let rule2 = &config.rules[1];
		assert_eq!(rule2.glob, Some("ssh {user}@{host}".to_string()));
		assert!(rule2.pattern.is_none());
	}

	#[test]
	fn test_parse_rules_inline_tables() {
		let content = r#"
rules = [
    { pattern = "a(.*)", path = "secret/a/{1}" },
    { glob = "b*", path = "secret/b/{1}" },
]
"#;
		let path = PathBuf::from("test.toml");
		let config = parse_config_str(content, &path).unwrap();

		assert_eq!(config.rules.len(), 2);
	}

	#[test]
	fn test_mutually_exclusive_matcher_options() {
		let content = r#"
[[rules]]
pattern = "a.*"
glob = "a*"
path = "secret/a"
"#;
		let path = PathBuf::from("test.toml");
		let result = parse_config_str(content, &path);

		assert!(result.is_err());
		match result.unwrap_err() {
			PoleError::MutuallyExclusive {
				rule,
				option1,
				option2,
			} => {
				assert_eq!(rule, 1);
				assert_eq!(option1, "pattern");
				assert_eq!(option2, "glob");
			}
			_ => panic!("Expected MutuallyExclusive error"),
		}
	}

	#[test]
	fn test_missing_path_is_rejected() {
		let content = r#"
[[rules]]
pattern = "a.*"
path = "secret/a"

[[rules]]
pattern = "b.*"
"#;
		let path = PathBuf::from("test.toml");
		let err = parse_config_str(content, &path).unwrap_err();
		assert!(err.is_rule_parse());
		assert!(matches!(
			err,
			PoleError::MissingField {
				rule: 2,
				field: "path"
			}
		));
	}

	#[test]
	fn test_missing_pattern_is_rejected() {
		let content = r#"
[[rules]]
path = "secret/a"
"#;
		let path = PathBuf::from("test.toml");
		let err = parse_config_str(content, &path).unwrap_err();
		assert!(matches!(
			err,
			PoleError::MissingField {
				rule: 1,
				field: "pattern"
			}
		));
	}

	#[test]
	fn test_invalid_toml() {
		let path = PathBuf::from("test.toml");
		let result = parse_config_str("rules = [[[", &path);
		assert!(matches!(result, Err(PoleError::ConfigParseError { .. })));
	}
}
