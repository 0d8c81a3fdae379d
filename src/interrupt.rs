//! Process interrupt flag.
//!
//! Installing the handler replaces the default SIGINT/SIGTERM behaviour (exit
//! immediately) with setting a flag, so a command holding the clipboard can
//! clear it before exiting.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_signal(_signal: libc::c_int) {
	// Only async-signal-safe work here.
	INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Route SIGINT and SIGTERM to the interrupt flag and return it.
pub fn install() -> &'static AtomicBool {
	#[cfg(unix)]
	unsafe {
		// SAFETY: on_signal only performs an atomic store.
		libc::signal(libc::SIGINT, on_signal as libc::sighandler_t);
		libc::signal(libc::SIGTERM, on_signal as libc::sighandler_t);
	}
	&INTERRUPTED
}
