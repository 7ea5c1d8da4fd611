//! Console beep driver.
//!
//! Uses the `KIOCSOUND` ioctl of the Linux virtual console, which programs
//! the PIT channel feeding the PC speaker.

use crate::drivers::{Backend, ToneDriver};
use crate::error::{BeepError, Result};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

const NAME: &str = "console";

/// Start sound generation (0 for off), from `<linux/kd.h>`.
const KIOCSOUND: libc::c_ulong = 0x4B2F;

/// PIT input clock in Hz.
const CLOCK_TICK_RATE: u32 = 1_193_180;

/// Current console first, then the devfs style name.
const CANDIDATES: &[&str] = &["/dev/tty0", "/dev/vc/0"];

/// PIT divisor for `frequency_hz`. 0 keeps the speaker silent.
pub fn period_ticks(frequency_hz: u16) -> libc::c_int {
    if frequency_hz == 0 {
        0
    } else {
        (CLOCK_TICK_RATE / u32::from(frequency_hz)) as libc::c_int
    }
}

fn kiocsound(file: &File, ticks: libc::c_int) -> io::Result<()> {
    // SAFETY: KIOCSOUND takes its argument by value; fd is owned by `file`.
    let ret = unsafe { libc::ioctl(file.as_raw_fd(), KIOCSOUND as _, ticks) };
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Maps a refused silent `KIOCSOUND` on an opened `path`.
///
/// A console that may be opened but not controlled (EPERM, EACCES) is a
/// permission problem; anything else means `path` is not a console.
fn kiocsound_refused(path: &Path, err: io::Error) -> BeepError {
    match err.raw_os_error() {
        Some(libc::EPERM) | Some(libc::EACCES) => BeepError::PermissionDenied {
            path: path.to_path_buf(),
            source: err,
        },
        _ => {
            log::debug!("{}: KIOCSOUND rejected: {}", path.display(), err);
            BeepError::not_found(NAME, Some(path))
        }
    }
}

/// Finds a console that accepts `KIOCSOUND`.
pub struct ConsoleBackend {
    candidates: Vec<PathBuf>,
}

impl ConsoleBackend {
    pub fn new() -> Self {
        Self {
            candidates: CANDIDATES.iter().map(PathBuf::from).collect(),
        }
    }

    fn open_path(path: &Path) -> Result<ConsoleDriver> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| BeepError::open_failed(NAME, path, e))?;

        // A silent KIOCSOUND tells consoles apart from everything else.
        if let Err(e) = kiocsound(&file, 0) {
            return Err(kiocsound_refused(path, e));
        }

        log::info!("using console device {}", path.display());
        Ok(ConsoleDriver {
            path: path.to_path_buf(),
            file: Some(file),
            sounding: false,
        })
    }
}

impl Default for ConsoleBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for ConsoleBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn open(&self, explicit: Option<&Path>) -> Result<Box<dyn ToneDriver>> {
        if let Some(path) = explicit {
            return Ok(Box::new(Self::open_path(path)?));
        }

        for path in &self.candidates {
            match Self::open_path(path) {
                Ok(driver) => return Ok(Box::new(driver)),
                Err(err) if err.is_not_found() => log::debug!("{}", err),
                Err(err) => log::warn!("{}", err),
            }
        }

        Err(BeepError::not_found(NAME, None))
    }
}

/// An open console.
pub struct ConsoleDriver {
    path: PathBuf,
    file: Option<File>,
    sounding: bool,
}

impl ToneDriver for ConsoleDriver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn device_path(&self) -> &Path {
        &self.path
    }

    fn begin_tone(&mut self, frequency_hz: u16) {
        let Some(file) = &self.file else {
            return;
        };
        if let Err(e) = kiocsound(file, period_ticks(frequency_hz)) {
            log::warn!("{}: could not start tone: {}", self.path.display(), e);
            return;
        }
        self.sounding = frequency_hz != 0;
    }

    fn end_tone(&mut self) {
        if !self.sounding {
            return;
        }
        if let Some(file) = &self.file {
            if let Err(e) = kiocsound(file, 0) {
                log::warn!("{}: could not stop tone: {}", self.path.display(), e);
            }
        }
        self.sounding = false;
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            log::debug!("closed {}", self.path.display());
        }
    }
}
