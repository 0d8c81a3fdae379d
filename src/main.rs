use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use pole::clipboard::{HoldOutcome, SystemClipboard, copy_and_hold};
use pole::config::{Config, LoadedConfig, discover_config, user_config_path};
use pole::path::{PathIndex, PathKind, SecretPath};
use pole::resolver::Resolver;
use pole::rules::RuleSet;
use pole::store::{SecretData, SecretStore, VaultSettings, VaultStore, select_value};
use pole::table::{dict_to_table, terminal_width};

/// Exit code used when an interrupt cut the clipboard hold short.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "pole")]
#[command(
	author,
	version,
	about = "Browse, search and auto-resolve secrets in a Vault kv store"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Config file to use instead of the default locations
	#[arg(long, global = true, value_name = "FILE")]
	config: Option<PathBuf>,

	/// Mount used when no path is given (overrides config)
	#[arg(long, global = true)]
	mount: Option<String>,

	/// Vault address (overrides config and VAULT_ADDR)
	#[arg(long, global = true, value_name = "URL")]
	address: Option<String>,

	/// Increase log verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = ArgAction::Count)]
	verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
	/// List the immediate children of a directory
	Ls {
		/// Directory to list (defaults to the configured mount)
		path: Option<String>,
	},
	/// Show every secret below a directory as a tree
	Tree {
		/// Directory to walk (defaults to the configured mount)
		path: Option<String>,
	},
	/// Fuzzy-search secret paths
	Find {
		/// Characters that must appear in order in the path
		query: String,

		/// Directory to search (defaults to the configured mount)
		#[arg(long)]
		root: Option<String>,
	},
	/// Print a secret as a table, or a single value
	Get {
		/// Secret path
		path: String,
		/// Key to print
		key: Option<String>,
	},
	/// Copy a secret value to the clipboard, clearing it after a delay
	Copy {
		/// Secret path
		path: String,
		/// Key to copy (required when the secret has several keys)
		key: Option<String>,
	},
	/// Resolve a URL or command line to a secret using the configured rules
	Auto {
		/// Key to use instead of the rule's default key
		#[arg(long)]
		key: Option<String>,

		/// Print instead of copying to the clipboard
		#[arg(long, conflicts_with = "dry_run")]
		print: bool,

		/// Show which rule and path would be used without reading the secret
		#[arg(long)]
		dry_run: bool,

		/// Input to resolve, e.g. a URL or an ssh command line
		#[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
		input: Vec<String>,
	},
	/// Configuration management commands
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
}

#[derive(Subcommand)]
enum ConfigAction {
	/// Display the effective configuration and its source
	Show,
	/// Check the config file and its rules for errors
	Validate,
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	match run(cli) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn init_logging(verbose: u8) {
	let filter = match verbose {
		0 => EnvFilter::try_from_env("POLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
		1 => EnvFilter::new("info"),
		_ => EnvFilter::new("debug"),
	};
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(std::io::stderr().is_terminal())
		.with_target(false)
		.without_time()
		.init();
}

fn run(cli: Cli) -> Result<ExitCode> {
	let overrides = Overrides {
		config: cli.config,
		mount: cli.mount,
		address: cli.address,
	};

	match cli.command {
		Commands::Ls { path } => handle_ls(overrides.load()?.config(), path.as_deref()),
		Commands::Tree { path } => handle_tree(overrides.load()?.config(), path.as_deref()),
		Commands::Find { query, root } => {
			handle_find(overrides.load()?.config(), &query, root.as_deref())
		}
		Commands::Get { path, key } => handle_get(overrides.load()?.config(), &path, key.as_deref()),
		Commands::Copy { path, key } => handle_copy(overrides.load()?.config(), &path, key.as_deref()),
		Commands::Auto {
			key,
			print,
			dry_run,
			input,
		} => handle_auto(
			&overrides.load()?,
			&input.join(" "),
			key.as_deref(),
			print,
			dry_run,
		),
		Commands::Config { action } => match action {
			ConfigAction::Show => handle_config_show(&overrides.load()?),
			ConfigAction::Validate => handle_config_validate(overrides.config.as_deref()),
		},
	}
}

/// Global options that adjust the loaded config.
struct Overrides {
	config: Option<PathBuf>,
	mount: Option<String>,
	address: Option<String>,
}

/// The effective config and its compiled rules.
///
/// Every command loads one, so a broken rule is fatal before any remote call.
struct Session {
	loaded: LoadedConfig,
	rules: RuleSet,
}

impl Session {
	fn config(&self) -> &Config {
		&self.loaded.config
	}
}

impl Overrides {
	fn load(&self) -> Result<Session> {
		let mut loaded =
			discover_config(self.config.as_deref()).context("Failed to load configuration")?;
		if let Some(ref mount) = self.mount {
			loaded.config.mount = mount.clone();
		}
		if let Some(ref address) = self.address {
			loaded.config.address = Some(address.clone());
		}
		let rules = RuleSet::load(&loaded.config).context("Failed to compile rules")?;
		Ok(Session { loaded, rules })
	}
}

fn open_store(config: &Config) -> Result<VaultStore> {
	let settings = VaultSettings::resolve(config);
	VaultStore::new(settings).context("Failed to create Vault client")
}

/// Directory to operate on: the given path, or the configured mount.
fn directory_arg(config: &Config, path: Option<&str>) -> SecretPath {
	SecretPath::directory(path.unwrap_or(&config.mount))
}

fn handle_ls(config: &Config, path: Option<&str>) -> Result<ExitCode> {
	let store = open_store(config)?;
	let dir = directory_arg(config, path);
	let (index, _) = PathIndex::load(&store, &dir, Some(1), config.workers)
		.with_context(|| format!("Failed to list {dir}"))?;

	for child in index.list_children(&dir) {
		match child.kind() {
			PathKind::Directory => println!("{}/", child.name()),
			PathKind::Leaf => println!("{}", child.name()),
		}
	}
	Ok(ExitCode::SUCCESS)
}

fn handle_tree(config: &Config, path: Option<&str>) -> Result<ExitCode> {
	let store = open_store(config)?;
	let dir = directory_arg(config, path);
	let (index, _) = PathIndex::load(&store, &dir, None, config.workers)
		.with_context(|| format!("Failed to list {dir}"))?;

	for (depth, entry) in index.render_tree(&dir) {
		if depth == 0 {
			println!("{}", entry.path);
			continue;
		}
		let indent = "  ".repeat(depth - 1);
		match entry.kind {
			PathKind::Directory => println!("{indent}{}/", entry.name),
			PathKind::Leaf => println!("{indent}{}", entry.name),
		}
	}
	Ok(ExitCode::SUCCESS)
}

fn handle_find(config: &Config, query: &str, root: Option<&str>) -> Result<ExitCode> {
	let store = open_store(config)?;
	let dir = directory_arg(config, root);
	let (index, _) = PathIndex::load(&store, &dir, None, config.workers)
		.with_context(|| format!("Failed to list {dir}"))?;

	for found in index.fuzzy_search(query) {
		println!("{}", found.path);
	}
	Ok(ExitCode::SUCCESS)
}

fn read_secret(store: &dyn SecretStore, path: &SecretPath) -> Result<SecretData> {
	store
		.read(path)
		.with_context(|| format!("Failed to read {path}"))
}

fn handle_get(config: &Config, path: &str, key: Option<&str>) -> Result<ExitCode> {
	let store = open_store(config)?;
	let path = SecretPath::parse(path);
	let data = read_secret(&store, &path)?;
	print_secret(&path, &data, key)
}

fn handle_copy(config: &Config, path: &str, key: Option<&str>) -> Result<ExitCode> {
	let store = open_store(config)?;
	let path = SecretPath::parse(path);
	let data = read_secret(&store, &path)?;
	copy_secret(config, &path, &data, key)
}

fn handle_auto(
	session: &Session,
	input: &str,
	key: Option<&str>,
	print: bool,
	dry_run: bool,
) -> Result<ExitCode> {
	let config = session.config();
	let resolver = Resolver::new(&session.rules).warn_on_ambiguous(config.warn_on_ambiguous);
	let result = resolver.resolve(input)?;

	if dry_run {
		println!("{}", result.path());
		for candidate in result.contenders() {
			eprintln!(
				"  rule {}: {} -> {}",
				candidate.rule.label(),
				candidate.rule.pattern_source(),
				candidate.path
			);
		}
		return Ok(ExitCode::SUCCESS);
	}

	let store = open_store(config)?;
	let data = resolver.fetch(&store, &result)?;
	let key = key.or(result.rule().rule.key.as_deref());

	if print {
		print_secret(result.path(), &data, key)
	} else {
		copy_secret(config, result.path(), &data, key)
	}
}

fn print_secret(path: &SecretPath, data: &SecretData, key: Option<&str>) -> Result<ExitCode> {
	match key {
		Some(key) => {
			let (_, value) = select_value(path, data, Some(key))?;
			println!("{value}");
		}
		None => {
			let rows = data.iter().map(|(k, v)| (k.as_str(), v.as_str()));
			println!("{}", dict_to_table(rows, terminal_width()));
		}
	}
	Ok(ExitCode::SUCCESS)
}

fn copy_secret(
	config: &Config,
	path: &SecretPath,
	data: &SecretData,
	key: Option<&str>,
) -> Result<ExitCode> {
	let (key, value) = select_value(path, data, key)?;
	let clipboard = SystemClipboard::detect()?;

	let outcome = copy_and_hold(&clipboard, value, Duration::from_secs(config.clear_after), || {
		eprintln!(
			"Copied {key} of {path} to the clipboard; clearing in {}s (Ctrl-C to clear now)",
			config.clear_after
		)
	})
	.context("Clipboard command failed")?;
	eprintln!("Clipboard cleared");

	Ok(match outcome {
		HoldOutcome::Elapsed => ExitCode::SUCCESS,
		HoldOutcome::Interrupted => ExitCode::from(EXIT_INTERRUPTED),
	})
}

fn handle_config_show(session: &Session) -> Result<ExitCode> {
	let loaded = &session.loaded;
	let config = &loaded.config;

	match loaded.path {
		Some(ref path) => println!("# Source: {}", path.display()),
		None => println!("# Source: built-in defaults"),
	}
	println!("# mount: {}", config.mount);
	if let Some(ref address) = config.address {
		println!("# address: {}", address);
	}
	if let Some(version) = config.kv_version {
		println!("# kv-version: {:?}", version);
	}
	println!("# clear-after: {}s", config.clear_after);
	println!("# warn-on-ambiguous: {}", config.warn_on_ambiguous);
	println!("# workers: {}", config.workers);
	println!("# rules: {}", config.rules.len());
	println!();

	for (i, rule) in config.rules.iter().enumerate() {
		println!("  Rule {}:", rule.label(i + 1));
		if let Some(ref pattern) = rule.pattern {
			println!("    pattern: {}", pattern);
		}
		if let Some(ref glob) = rule.glob {
			println!("    glob: {}", glob);
		}
		if let Some(ref path) = rule.path {
			println!("    path: {}", path);
		}
		if let Some(ref key) = rule.key {
			println!("    key: {}", key);
		}
		println!();
	}

	if let Ok(user_path) = user_config_path() {
		println!("User config path: {}", user_path.display());
		if user_path.exists() {
			println!("  (exists)");
		} else {
			println!("  (not found)");
		}
	}

	Ok(ExitCode::SUCCESS)
}

fn handle_config_validate(explicit: Option<&std::path::Path>) -> Result<ExitCode> {
	let result = discover_config(explicit).and_then(|loaded| {
		let rules = RuleSet::load(&loaded.config)?;
		Ok((loaded, rules))
	});

	match result {
		Ok((loaded, rules)) => {
			match loaded.path {
				Some(path) => println!(
					"Configuration is valid: {} ({} rules)",
					path.display(),
					rules.len()
				),
				None => println!("No configuration file found, using defaults."),
			}
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => {
			eprintln!("Configuration error: {:#}", anyhow::Error::from(e));
			Ok(ExitCode::FAILURE)
		}
	}
}
