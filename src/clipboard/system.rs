use crate::clipboard::Clipboard;
use crate::error::{PoleError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// An external program able to set the clipboard from stdin.
#[derive(Debug, Clone, Copy)]
struct ClipboardTool {
	name: &'static str,
	copy_args: &'static [&'static str],

	/// Arguments that clear the clipboard, if the tool has a dedicated mode.
	/// Otherwise the empty string is copied.
	clear_args: Option<&'static [&'static str]>,

	/// Only considered when this environment variable is set.
	requires_env: Option<&'static str>,
}

const TOOLS: &[ClipboardTool] = &[
	ClipboardTool {
		name: "pbcopy",
		copy_args: &[],
		clear_args: None,
		requires_env: None,
	},
	ClipboardTool {
		name: "wl-copy",
		copy_args: &[],
		clear_args: Some(&["--clear"]),
		requires_env: Some("WAYLAND_DISPLAY"),
	},
	ClipboardTool {
		name: "xclip",
		copy_args: &["-selection", "clipboard"],
		clear_args: None,
		requires_env: None,
	},
	ClipboardTool {
		name: "xsel",
		copy_args: &["--clipboard", "--input"],
		clear_args: Some(&["--clipboard", "--delete"]),
		requires_env: None,
	},
];

/// Clipboard backed by the first clipboard tool found on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemClipboard {
	tool: ClipboardTool,
	binary: PathBuf,
}

impl SystemClipboard {
	/// Find a usable clipboard tool.
	pub fn detect() -> Result<Self> {
		for tool in TOOLS {
			if let Some(var) = tool.requires_env
				&& std::env::var_os(var).is_none()
			{
				continue;
			}
			if let Some(binary) = resolve_command(tool.name) {
				tracing::debug!(tool = tool.name, "using clipboard tool");
				return Ok(SystemClipboard { tool: *tool, binary });
			}
		}
		Err(PoleError::ClipboardUnavailable {
			tried: TOOLS.iter().map(|t| t.name).collect(),
		})
	}

	fn run(&self, args: &[&str], input: Option<&str>) -> Result<()> {
		let command = self.binary.to_string_lossy().to_string();
		let failed = |source| PoleError::ClipboardFailed {
			command: command.clone(),
			source,
		};

		let mut child = Command::new(&self.binary)
			.args(args)
			.stdin(if input.is_some() {
				Stdio::piped()
			} else {
				Stdio::null()
			})
			.stdout(Stdio::null())
			.stderr(Stdio::inherit())
			.spawn()
			.map_err(failed)?;

		if let Some(input) = input
			&& let Some(mut stdin) = child.stdin.take()
		{
			stdin.write_all(input.as_bytes()).map_err(failed)?;
		}

		let status = child.wait().map_err(failed)?;
		if !status.success() {
			return Err(PoleError::ClipboardNonZeroExit {
				command,
				exit_code: status.code().unwrap_or(-1),
			});
		}
		Ok(())
	}
}

impl Clipboard for SystemClipboard {
	fn copy(&self, value: &str) -> Result<()> {
		self.run(self.tool.copy_args, Some(value))
	}

	fn clear(&self) -> Result<()> {
		match self.tool.clear_args {
			Some(args) => self.run(args, None),
			None => self.run(self.tool.copy_args, Some("")),
		}
	}
}

/// Resolve a command name to its full path.
///
/// If the command is already an absolute path, returns it as-is.
/// Otherwise, searches PATH for the command.
fn resolve_command(command: &str) -> Option<PathBuf> {
	let path = Path::new(command);

	// If it's already an absolute path, return it if it exists
	if path.is_absolute() {
		if path.exists() {
			return Some(path.to_path_buf());
		} else {
			return None;
		}
	}

	// Search PATH
	if let Ok(path_var) = std::env::var("PATH") {
		for dir in std::env::split_paths(&path_var) {
			let full_path = dir.join(command);
			if full_path.is_file() {
				return Some(full_path);
			}
		}
	}

	None
}
