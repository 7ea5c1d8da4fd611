//! Last resort when no tone device can be opened.
//!
//! Writes a BEL character to stdout, which makes the terminal emulator
//! beep if it is configured to.

use std::io::{self, Write};

const BEL: u8 = 0x07;

/// Prints a bell to stdout if and only if stdout is a terminal.
pub fn fallback_beep() {
    // SAFETY: isatty only inspects the descriptor.
    let is_tty = unsafe { libc::isatty(libc::STDOUT_FILENO) } == 1;
    let stdout = io::stdout();
    ring_bell(&mut stdout.lock(), is_tty);
}

/// Best effort: write errors are logged, never returned.
fn ring_bell<W: Write>(out: &mut W, is_tty: bool) {
    if !is_tty {
        log::debug!("stdout is not a tty, not ringing the bell");
        return;
    }
    if let Err(e) = out.write_all(&[BEL]).and_then(|()| out.flush()) {
        log::debug!("could not ring the bell: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rings_on_terminal() {
        let mut out = Vec::new();
        ring_bell(&mut out, true);
        assert_eq!(out, b"\x07");
    }

    #[test]
    fn stays_quiet_when_piped() {
        let mut out = Vec::new();
        ring_bell(&mut out, false);
        assert!(out.is_empty());
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_not_an_error() {
        ring_bell(&mut Broken, true);
    }
}
