//! Clipboard access for pole.
//!
//! This module handles:
//! - Copying values through the platform clipboard tool
//! - Clearing the clipboard exactly once after a delay, on interrupt, or on exit

pub mod system;

pub use system::SystemClipboard;

use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How often `ClipboardGuard::hold` checks for an interrupt.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A clipboard that can be set and cleared.
pub trait Clipboard {
	fn copy(&self, value: &str) -> Result<()>;
	fn clear(&self) -> Result<()>;
}

/// Why `ClipboardGuard::hold` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldOutcome {
	Elapsed,
	Interrupted,
}

/// Owns a copied value until it is cleared.
///
/// The clipboard is cleared exactly once: by `hold` when the delay elapses or
/// an interrupt arrives, by an explicit `clear`, or when the guard is dropped.
pub struct ClipboardGuard<'c, C: Clipboard + ?Sized> {
	clipboard: &'c C,
	cleared: bool,
}

impl<'c, C: Clipboard + ?Sized> ClipboardGuard<'c, C> {
	/// Copy `value` and take responsibility for clearing it.
	pub fn copy(clipboard: &'c C, value: &str) -> Result<Self> {
		clipboard.copy(value)?;
		Ok(ClipboardGuard {
			clipboard,
			cleared: false,
		})
	}

	/// Clear now. Later calls, and the drop, do nothing.
	pub fn clear(&mut self) -> Result<()> {
		if self.cleared {
			return Ok(());
		}
		self.cleared = true;
		tracing::debug!("clearing clipboard");
		self.clipboard.clear()
	}

	pub fn is_cleared(&self) -> bool {
		self.cleared
	}

	/// Block until `delay` has elapsed or `interrupted` is set, then clear.
	pub fn hold(mut self, delay: Duration, interrupted: &AtomicBool) -> Result<HoldOutcome> {
		let deadline = Instant::now() + delay;
		let outcome = loop {
			if interrupted.load(Ordering::SeqCst) {
				break HoldOutcome::Interrupted;
			}
			let now = Instant::now();
			if now >= deadline {
				break HoldOutcome::Elapsed;
			}
			std::thread::sleep(POLL_INTERVAL.min(deadline - now));
		};
		self.clear()?;
		Ok(outcome)
	}
}

/// Copy `value` and keep it until `delay` elapses or SIGINT/SIGTERM arrives,
/// then clear it. `on_copied` runs once the value is on the clipboard.
///
/// The signal handler is installed before the copy starts, so an interrupt
/// at any point after that still clears the clipboard.
pub fn copy_and_hold<C>(
	clipboard: &C,
	value: &str,
	delay: Duration,
	on_copied: impl FnOnce(),
) -> Result<HoldOutcome>
where
	C: Clipboard + ?Sized,
{
	let interrupted = crate::interrupt::install();
	let guard = ClipboardGuard::copy(clipboard, value)?;
	on_copied();
	guard.hold(delay, interrupted)
}

impl<C: Clipboard + ?Sized> Drop for ClipboardGuard<'_, C> {
	fn drop(&mut self) {
		if let Err(e) = self.clear() {
			tracing::warn!("failed to clear clipboard: {e}");
		}
	}
}
