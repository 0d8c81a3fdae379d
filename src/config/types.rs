use crate::error::PoleError;
use crate::store::KvVersion;
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level configuration from a pole config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
	/// Mount used when a command is given no path.
	#[serde(default = "default_mount")]
	pub mount: String,

	/// Vault server address. Falls back to `VAULT_ADDR`.
	#[serde(default)]
	pub address: Option<String>,

	/// Force a kv version instead of detecting it per mount.
	#[serde(default)]
	pub kv_version: Option<KvVersion>,

	/// Seconds before a copied value is cleared from the clipboard.
	#[serde(default = "default_clear_after")]
	pub clear_after: u64,

	/// Log a warning listing every contender when several rules match.
	#[serde(default = "default_true")]
	pub warn_on_ambiguous: bool,

	/// Maximum concurrent listing calls while walking a tree.
	#[serde(default = "default_workers")]
	pub workers: usize,

	/// Rules for resolving free-form input to a secret path.
	/// First declared matching rule wins.
	#[serde(default)]
	pub rules: Vec<Rule>,
}

fn default_mount() -> String {
	"secret".to_string()
}

fn default_clear_after() -> u64 {
	30
}

fn default_true() -> bool {
	true
}

fn default_workers() -> usize {
	8
}

impl Default for Config {
	fn default() -> Self {
		Config {
			mount: default_mount(),
			address: None,
			kv_version: None,
			clear_after: default_clear_after(),
			warn_on_ambiguous: true,
			workers: default_workers(),
			rules: Vec::new(),
		}
	}
}

/// A rule mapping free-form input to a secret path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Rule {
	/// Optional label shown in diagnostics.
	pub name: Option<String>,

	/// Regular expression matched against the whole input (mutually exclusive with glob).
	pub pattern: Option<String>,

	/// Placeholder pattern matched against the whole input (mutually exclusive with pattern).
	/// `*` captures positionally, `{name}` captures by name.
	pub glob: Option<String>,

	/// Secret path template. `{1}`, `{name}` and `{0}` are replaced by captures.
	pub path: Option<String>,

	/// Key copied by `auto` when none is given on the command line.
	pub key: Option<String>,
}

/// A loaded configuration with its source path for display.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
	/// The parsed configuration.
	pub config: Config,

	/// The path this config was loaded from, `None` for built-in defaults.
	pub path: Option<PathBuf>,
}

impl Rule {
	/// Validate field presence and that mutually exclusive fields are not both set.
	/// `index` is the 1-based position of the rule in its file.
	pub fn validate(&self, index: usize) -> Result<(), PoleError> {
		let matcher_fields = [
			("pattern", self.pattern.is_some()),
			("glob", self.glob.is_some()),
		];

		let set_fields: Vec<_> = matcher_fields
			.iter()
			.filter(|(_, is_set)| *is_set)
			.map(|(name, _)| *name)
			.collect();

		match set_fields.len() {
			0 => {
				return Err(PoleError::MissingField {
					rule: index,
					field: "pattern",
				});
			}
			1 => {}
			_ => {
				return Err(PoleError::MutuallyExclusive {
					rule: index,
					option1: set_fields[0].to_string(),
					option2: set_fields[1].to_string(),
				});
			}
		}

		if self.path.is_none() {
			return Err(PoleError::MissingField {
				rule: index,
				field: "path",
			});
		}

		Ok(())
	}

	/// Label for diagnostics: the rule name, or its position.
	pub fn label(&self, index: usize) -> String {
		match self.name {
			Some(ref name) => format!("#{index} ({name})"),
			None => format!("#{index}"),
		}
	}
}

impl Config {
	/// Validate all rules in this config.
	pub fn validate(&self) -> Result<(), PoleError> {
		for (i, rule) in self.rules.iter().enumerate() {
			rule.validate(i + 1)?;
		}
		Ok(())
	}
}
