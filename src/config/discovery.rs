use crate::config::parser::parse_config_file;
use crate::config::types::LoadedConfig;
use crate::error::{PoleError, Result};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "POLE_CONFIG";

/// Locate and load the effective config.
///
/// The lookup order is:
/// 1. `explicit` (from `--config`), which must exist
/// 2. `$POLE_CONFIG`, which must exist
/// 3. `<config dir>/pole/config.toml`
/// 4. `~/.pole.toml`
///
/// If nothing is found the built-in defaults (no rules) are returned.
pub fn discover_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
	let required = explicit.map(Path::to_path_buf).or_else(|| {
		std::env::var_os(CONFIG_ENV_VAR)
			.filter(|v| !v.is_empty())
			.map(PathBuf::from)
	});

	if let Some(path) = required {
		if !path.exists() {
			return Err(PoleError::ConfigNotFound { path });
		}
		return load(path);
	}

	for path in candidate_paths() {
		if path.exists() {
			return load(path);
		}
	}

	tracing::debug!("no config file found, using defaults");
	Ok(LoadedConfig::default())
}

fn load(path: PathBuf) -> Result<LoadedConfig> {
	tracing::debug!(path = %path.display(), "loading config");
	let config = parse_config_file(&path)?;
	Ok(LoadedConfig {
		config,
		path: Some(path),
	})
}

/// Implicit config locations, most preferred first.
fn candidate_paths() -> Vec<PathBuf> {
	let mut paths = Vec::new();
	if let Some(config_dir) = dirs::config_dir() {
		paths.push(config_dir.join("pole").join("config.toml"));
	}
	if let Some(home_dir) = dirs::home_dir() {
		paths.push(home_dir.join(".pole.toml"));
	}
	paths
}

/// Check if an environment variable is set to a truthy value.
pub fn is_env_truthy(var_name: &str) -> bool {
	match std::env::var(var_name) {
		Ok(value) => {
			let lower = value.to_lowercase();
			!value.is_empty() && lower != "0" && lower != "false" && lower != "no"
		}
		Err(_) => false,
	}
}

/// Get the path to the user's preferred config file.
pub fn user_config_path() -> Result<PathBuf> {
	let config_dir = dirs::config_dir().ok_or(PoleError::HomeDirectoryNotFound)?;
	Ok(config_dir.join("pole").join("config.toml"))
}
