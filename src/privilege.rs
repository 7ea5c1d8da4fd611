//! Refuses to run with borrowed privileges.
//!
//! beep opens device files for writing and may write to them, so it cannot
//! be made setuid-safe. Running through sudo is refused for the same reason.
//! Users should be given write access to the pcspkr evdev node instead.

use crate::error::{BeepError, Result};

const SUDO_VARS: &[&str] = &["SUDO_COMMAND", "SUDO_USER", "SUDO_UID", "SUDO_GID"];

pub const HINT: &str = "Set up permissions for the pcspkr evdev device file instead.";

/// Real and effective ids of the process.
#[derive(Debug, Clone, Copy)]
struct Ids {
    uid: libc::uid_t,
    euid: libc::uid_t,
    gid: libc::gid_t,
    egid: libc::gid_t,
}

impl Ids {
    fn current() -> Self {
        // SAFETY: these calls cannot fail.
        unsafe {
            Self {
                uid: libc::getuid(),
                euid: libc::geteuid(),
                gid: libc::getgid(),
                egid: libc::getegid(),
            }
        }
    }
}

/// Fails if running setuid, setgid or under sudo.
pub fn check() -> Result<()> {
    check_with(Ids::current(), |name| std::env::var_os(name).is_some())
}

fn check_with(ids: Ids, env_set: impl Fn(&str) -> bool) -> Result<()> {
    if ids.uid != ids.euid || ids.gid != ids.egid {
        return Err(BeepError::Privileged(
            "Running setuid or setgid, which is not supported for security reasons.".into(),
        ));
    }

    if SUDO_VARS.iter().any(|&name| env_set(name)) {
        return Err(BeepError::Privileged(
            "Running under sudo, which is not supported for security reasons.".into(),
        ));
    }

    Ok(())
}
