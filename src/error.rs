use std::path::PathBuf;

use crate::path::PathKind;

/// Library-level structured errors for pole.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum PoleError {
	#[error("Config file not found: {path}")]
	ConfigNotFound { path: PathBuf },

	#[error("Failed to read config file: {path}")]
	ConfigReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse config file: {path}")]
	ConfigParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Invalid regex pattern in rule {rule}: {pattern}")]
	InvalidRegex {
		rule: usize,
		pattern: String,
		#[source]
		source: regex::Error,
	},

	#[error("Invalid glob pattern in rule {rule}: {pattern} ({reason})")]
	InvalidGlob {
		rule: usize,
		pattern: String,
		reason: String,
	},

	#[error("Invalid path template in rule {rule}: {template} ({reason})")]
	InvalidTemplate {
		rule: usize,
		template: String,
		reason: String,
	},

	#[error("Path template in rule {rule} references unknown capture {{{capture}}}: {template}")]
	UnknownCapture {
		rule: usize,
		template: String,
		capture: String,
	},

	#[error("Rule {rule} is missing required field: {field}")]
	MissingField { rule: usize, field: &'static str },

	#[error("Mutually exclusive options in rule {rule}: {option1} and {option2}")]
	MutuallyExclusive {
		rule: usize,
		option1: String,
		option2: String,
	},

	#[error("Request to secrets engine failed: {url}")]
	Remote {
		url: String,
		#[source]
		source: reqwest::Error,
	},

	#[error("Secrets engine returned {status} for {url}: {}", errors.join("; "))]
	RemoteStatus {
		url: String,
		status: u16,
		errors: Vec<String>,
	},

	#[error("Invalid Vault address: {address} ({reason})")]
	InvalidAddress { address: String, reason: String },

	#[error("Secret path must not contain '.' or '..' segments: {path}")]
	InvalidPath { path: String },

	#[error("No such secret: {path}")]
	NotFound { path: String },

	#[error("Listing inconsistency: {path} reported as {reported} but already indexed as {existing}")]
	IndexConflict {
		path: String,
		existing: PathKind,
		reported: PathKind,
	},

	#[error("No rule matched: {input}")]
	NoMatch { input: String },

	#[error("Rule {rule} matched but secret does not exist: {path}")]
	UnresolvedSecret { rule: usize, path: String },

	#[error("Secret {path} has several keys, specify one of: {}", keys.join(", "))]
	AmbiguousKey { path: String, keys: Vec<String> },

	#[error("Secret {path} has no key {key}")]
	KeyNotFound { path: String, key: String },

	#[error("Secret {path} is empty")]
	EmptySecret { path: String },

	#[error("No clipboard tool found (tried {})", tried.join(", "))]
	ClipboardUnavailable { tried: Vec<&'static str> },

	#[error("Clipboard command failed: {command}")]
	ClipboardFailed {
		command: String,
		#[source]
		source: std::io::Error,
	},

	#[error("Clipboard command exited with non-zero status: {command} (exit code: {exit_code})")]
	ClipboardNonZeroExit { command: String, exit_code: i32 },

	#[error("Failed to resolve home directory")]
	HomeDirectoryNotFound,
}

impl PoleError {
	/// Whether this error came from loading the rule set. These are fatal at startup.
	pub fn is_rule_parse(&self) -> bool {
		matches!(
			self,
			PoleError::InvalidRegex { .. }
				| PoleError::InvalidGlob { .. }
				| PoleError::InvalidTemplate { .. }
				| PoleError::UnknownCapture { .. }
				| PoleError::MissingField { .. }
				| PoleError::MutuallyExclusive { .. }
		)
	}
}

/// Result type alias using PoleError.
pub type Result<T> = std::result::Result<T, PoleError>;
