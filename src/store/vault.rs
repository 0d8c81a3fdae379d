use crate::config::Config;
use crate::config::discovery::is_env_truthy;
use crate::error::{PoleError, Result};
use crate::path::SecretPath;
use crate::store::{ListEntry, SecretData, SecretStore};
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Address used by the Vault CLI when nothing else is configured.
pub const DEFAULT_ADDRESS: &str = "https://127.0.0.1:8200";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Version of a kv secrets engine mount.
///
/// Deserializes from `1`/`2` given either as numbers or strings, since Vault
/// reports the version as a string and config files tend to use numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawKvVersion")]
pub enum KvVersion {
	V1,
	V2,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKvVersion {
	Number(u64),
	Text(String),
}

impl TryFrom<RawKvVersion> for KvVersion {
	type Error = String;

	fn try_from(raw: RawKvVersion) -> std::result::Result<Self, Self::Error> {
		let version = match raw {
			RawKvVersion::Number(n) => n.to_string(),
			RawKvVersion::Text(s) => s,
		};
		match version.as_str() {
			"1" => Ok(KvVersion::V1),
			"2" => Ok(KvVersion::V2),
			other => Err(format!("unsupported kv version: {other}")),
		}
	}
}

/// Connection settings for a Vault server.
#[derive(Debug, Clone)]
pub struct VaultSettings {
	pub address: String,
	pub token: Option<String>,
	pub skip_verify: bool,

	/// Forces the kv version for every mount instead of detecting it.
	pub kv_version: Option<KvVersion>,
}

impl VaultSettings {
	/// Resolve settings from config, falling back to the standard Vault
	/// environment (`VAULT_ADDR`, `VAULT_TOKEN`, `~/.vault-token`,
	/// `VAULT_SKIP_VERIFY`).
	pub fn resolve(config: &Config) -> Self {
		let address = config
			.address
			.clone()
			.or_else(|| std::env::var("VAULT_ADDR").ok().filter(|a| !a.is_empty()))
			.unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

		let token = std::env::var("VAULT_TOKEN")
			.ok()
			.filter(|t| !t.is_empty())
			.or_else(read_token_helper_file);

		VaultSettings {
			address,
			token,
			skip_verify: is_env_truthy("VAULT_SKIP_VERIFY"),
			kv_version: config.kv_version,
		}
	}
}

/// Token written by `vault login`.
fn read_token_helper_file() -> Option<String> {
	let path = dirs::home_dir()?.join(".vault-token");
	let token = std::fs::read_to_string(path).ok()?;
	let token = token.trim();
	(!token.is_empty()).then(|| token.to_string())
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
	#[serde(default)]
	errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DataBody<T> {
	data: T,
}

#[derive(Debug, Deserialize)]
struct ListData {
	#[serde(default)]
	keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MountData {
	#[serde(default)]
	options: Option<MountOptions>,
}

#[derive(Debug, Deserialize)]
struct MountOptions {
	#[serde(default)]
	version: Option<KvVersion>,
}

#[derive(Debug, Deserialize)]
struct KvV2Data {
	data: Option<HashMap<String, serde_json::Value>>,
}

/// Read-only client for Vault kv mounts.
///
/// The first path segment names the mount; the kv version of each mount is
/// detected once and cached. Every path segment is percent-encoded on its own,
/// so a name can never change which endpoint is addressed.
#[derive(Debug)]
pub struct VaultStore {
	client: Client,
	base: Url,
	settings: VaultSettings,
	versions: Mutex<HashMap<String, KvVersion>>,
}

impl VaultStore {
	pub fn new(settings: VaultSettings) -> Result<Self> {
		let invalid = |reason: String| PoleError::InvalidAddress {
			address: settings.address.clone(),
			reason,
		};
		let base = Url::parse(&settings.address).map_err(|e| invalid(e.to_string()))?;
		if base.cannot_be_a_base() {
			return Err(invalid("not a hierarchical URL".to_string()));
		}

		let client = Client::builder()
			.timeout(REQUEST_TIMEOUT)
			.danger_accept_invalid_certs(settings.skip_verify)
			.build()
			.map_err(|source| PoleError::Remote {
				url: settings.address.clone(),
				source,
			})?;
		Ok(VaultStore {
			client,
			base,
			settings,
			versions: Mutex::new(HashMap::new()),
		})
	}

	/// `<address>/v1/<segments...>`, with `?list=true` for listings.
	fn api_url(&self, segments: &[&str], list: bool, path: &SecretPath) -> Result<Url> {
		if segments.iter().any(|s| *s == "." || *s == "..") {
			return Err(PoleError::InvalidPath {
				path: path.to_string(),
			});
		}

		let mut url = self.base.clone();
		{
			let mut url_path = url.path_segments_mut().map_err(|()| PoleError::InvalidAddress {
				address: self.settings.address.clone(),
				reason: "not a hierarchical URL".to_string(),
			})?;
			url_path.pop_if_empty().push("v1").extend(segments);
			if list {
				// Vault lists directories addressed with a trailing slash.
				url_path.push("");
			}
		}
		if list {
			url.query_pairs_mut().append_pair("list", "true");
		}
		Ok(url)
	}

	fn get<T: DeserializeOwned>(&self, url: Url, path: &SecretPath) -> Result<T> {
		tracing::debug!(%url, "vault request");

		let mut request = self.client.get(url.clone());
		if let Some(ref token) = self.settings.token {
			request = request.header("X-Vault-Token", token);
		}
		let response = request.send().map_err(|source| PoleError::Remote {
			url: url.to_string(),
			source,
		})?;
		decode(response, url.as_str(), path)
	}

	fn kv_version(&self, mount: &str) -> Result<KvVersion> {
		if let Some(version) = self.settings.kv_version {
			return Ok(version);
		}
		if let Some(version) = self.cached_version(mount) {
			return Ok(version);
		}

		let mount_path = SecretPath::directory(mount);
		let url = self.api_url(&["sys", "internal", "ui", "mounts", mount], false, &mount_path)?;
		let body: DataBody<MountData> = self.get(url, &mount_path)?;
		let version = body
			.data
			.options
			.and_then(|o| o.version)
			.unwrap_or(KvVersion::V1);
		tracing::debug!(mount, ?version, "detected kv version");

		if let Ok(mut versions) = self.versions.lock() {
			versions.insert(mount.to_string(), version);
		}
		Ok(version)
	}

	fn cached_version(&self, mount: &str) -> Option<KvVersion> {
		self.versions.lock().ok()?.get(mount).copied()
	}
}

impl SecretStore for VaultStore {
	fn list(&self, path: &SecretPath) -> Result<Vec<ListEntry>> {
		let Some((mount, rest)) = path.segments().split_first() else {
			return Err(PoleError::NotFound {
				path: path.to_string(),
			});
		};
		let version = self.kv_version(mount)?;
		let url = self.api_url(&list_segments(version, mount, rest), true, path)?;
		let body: DataBody<ListData> = self.get(url, path)?;

		let mut keys = body.data.keys;
		keys.sort();
		Ok(keys.iter().map(|key| ListEntry::from_key(key)).collect())
	}

	fn read(&self, path: &SecretPath) -> Result<SecretData> {
		let not_found = || PoleError::NotFound {
			path: path.to_string(),
		};
		let Some((mount, rest)) = path.segments().split_first() else {
			return Err(not_found());
		};
		if rest.is_empty() || !path.is_leaf() {
			return Err(not_found());
		}

		let version = self.kv_version(mount)?;
		let url = self.api_url(&read_segments(version, mount, rest), false, path)?;
		let values = match version {
			KvVersion::V1 => {
				let body: DataBody<HashMap<String, serde_json::Value>> = self.get(url, path)?;
				body.data
			}
			KvVersion::V2 => {
				// A deleted latest version comes back with null data.
				let body: DataBody<KvV2Data> = self.get(url, path)?;
				body.data.data.ok_or_else(not_found)?
			}
		};
		Ok(values
			.into_iter()
			.map(|(key, value)| (key, value_to_string(value)))
			.collect())
	}
}

/// Map an HTTP response onto a decoded body or a structured error.
fn decode<T: DeserializeOwned>(response: Response, url: &str, path: &SecretPath) -> Result<T> {
	let status = response.status();
	if status == reqwest::StatusCode::NOT_FOUND {
		return Err(PoleError::NotFound {
			path: path.to_string(),
		});
	}
	if !status.is_success() {
		let body: ErrorBody = response.json().unwrap_or_default();
		return Err(PoleError::RemoteStatus {
			url: url.to_string(),
			status: status.as_u16(),
			errors: body.errors,
		});
	}
	response.json().map_err(|source| PoleError::Remote {
		url: url.to_string(),
		source,
	})
}

fn list_segments<'a>(version: KvVersion, mount: &'a str, rest: &'a [String]) -> Vec<&'a str> {
	let mut segments = vec![mount];
	if version == KvVersion::V2 {
		segments.push("metadata");
	}
	segments.extend(rest.iter().map(String::as_str));
	segments
}

fn read_segments<'a>(version: KvVersion, mount: &'a str, rest: &'a [String]) -> Vec<&'a str> {
	let mut segments = vec![mount];
	if version == KvVersion::V2 {
		segments.push("data");
	}
	segments.extend(rest.iter().map(String::as_str));
	segments
}

/// Strings are shown as-is, anything else as compact JSON.
fn value_to_string(value: serde_json::Value) -> String {
	match value {
		serde_json::Value::String(s) => s,
		other => other.to_string(),
	}
}
