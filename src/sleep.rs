//! Waits that a terminating signal can cut short.
//!
//! SIGINT and SIGTERM are caught only while a wait is in progress; outside
//! of it they keep their default disposition and simply kill the process.

use crate::error::{BeepError, Result};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

/// Something that can wait for a number of milliseconds.
pub trait Sleeper {
    /// Waits `ms` milliseconds. Returns [`BeepError::Interrupted`] if a
    /// terminating signal arrived first.
    fn sleep_ms(&mut self, ms: u32) -> Result<()>;
}

/// Set from the signal handler.
static TERMINATE: AtomicBool = AtomicBool::new(false);

const CAUGHT: [libc::c_int; 2] = [libc::SIGINT, libc::SIGTERM];

extern "C" fn on_terminate(_signum: libc::c_int) {
    TERMINATE.store(true, Ordering::SeqCst);
}

/// Installs the handlers on creation and restores the defaults on drop.
struct SignalGuard;

impl SignalGuard {
    fn install() -> io::Result<Self> {
        TERMINATE.store(false, Ordering::SeqCst);
        // Without SA_RESTART so nanosleep returns EINTR.
        set_disposition(on_terminate as extern "C" fn(libc::c_int) as libc::sighandler_t)?;
        Ok(SignalGuard)
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        if let Err(e) = set_disposition(libc::SIG_DFL) {
            log::warn!("could not restore signal handlers: {}", e);
        }
    }
}

fn set_disposition(handler: libc::sighandler_t) -> io::Result<()> {
    for signum in CAUGHT {
        // SAFETY: the handler only touches an atomic.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = handler;
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);
            if libc::sigaction(signum, &action, std::ptr::null_mut()) == -1 {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

/// Sleeps with `nanosleep(2)` so that signal delivery is observed.
#[derive(Debug, Default)]
pub struct SignalSleeper;

impl SignalSleeper {
    pub fn new() -> Self {
        Self
    }
}

impl Sleeper for SignalSleeper {
    fn sleep_ms(&mut self, ms: u32) -> Result<()> {
        let _guard = SignalGuard::install().map_err(BeepError::Stream)?;

        let mut request = libc::timespec {
            tv_sec: (ms / 1000) as libc::time_t,
            tv_nsec: ((ms % 1000) as libc::c_long) * 1_000_000,
        };
        loop {
            if TERMINATE.load(Ordering::SeqCst) {
                return Err(BeepError::Interrupted);
            }
            let mut remaining = libc::timespec {
                tv_sec: 0,
                tv_nsec: 0,
            };
            // SAFETY: both pointers refer to live stack values.
            if unsafe { libc::nanosleep(&request, &mut remaining) } == 0 {
                // The signal may have been handled on another thread.
                if TERMINATE.load(Ordering::SeqCst) {
                    return Err(BeepError::Interrupted);
                }
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(BeepError::Stream(err));
            }
            // Some other signal; keep waiting for what is left.
            request = remaining;
        }
    }
}
