//! Stop requests from SIGINT/SIGTERM
//!
//! The handler only stores into a static atomic. Handlers are installed
//! without `SA_RESTART`, so a blocked semaphore wait returns `EINTR` and the
//! waiting code gets to look at the flag. A signal that arrives just before
//! the wait starts is picked up by the wait's poll interval instead.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

static SIGNALLED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_sig: libc::c_int) {
    SIGNALLED.store(true, Ordering::SeqCst);
}

/// Route SIGINT and SIGTERM to the stop flag.
pub fn install_handlers() -> io::Result<()> {
    for sig in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: a zeroed sigaction is valid; the handler is async-signal
        // safe (a single atomic store).
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_signal as *const () as libc::sighandler_t;
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);
            if libc::sigaction(sig, &action, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

/// Whether a handled signal has arrived in this process.
pub fn signalled() -> bool {
    SIGNALLED.load(Ordering::SeqCst)
}

/// Cancellation token handed to each role's entry point.
///
/// A flag created with [`StopFlag::from_signals`] also reports signals
/// caught by [`install_handlers`].
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    local: Arc<AtomicBool>,
    signals: bool,
}

impl StopFlag {
    /// A flag raised only through [`StopFlag::raise`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag that is also raised by SIGINT/SIGTERM.
    pub fn from_signals() -> Self {
        Self {
            signals: true,
            ..Self::new()
        }
    }

    #[cfg(test)]
    pub fn raise(&self) {
        self.local.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.local.load(Ordering::SeqCst) || (self.signals && signalled())
    }
}
