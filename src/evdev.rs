//! Input event device driver.
//!
//! The `pcspkr` kernel module exposes the speaker as an input device that
//! accepts `EV_SND`/`SND_TONE` events. Unlike the console, access can be
//! granted with ordinary file permissions on the device node.

use crate::drivers::{Backend, ToneDriver};
use crate::error::{BeepError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::mem;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

const NAME: &str = "evdev";

const EV_SND: u16 = 0x12;
const SND_TONE: u16 = 0x02;

/// Stable name of the PC speaker node created by udev.
const PCSPKR_DEVICE: &str = "/dev/input/by-path/platform-pcspkr-event-spkr";
const INPUT_DIR: &str = "/dev/input";

/// `EVIOCGBIT(ev, len)` from `<linux/input.h>`.
const fn eviocgbit(ev: u16, len: usize) -> libc::c_ulong {
    const IOC_READ: libc::c_ulong = 2;
    (IOC_READ << 30)
        | ((len as libc::c_ulong) << 16)
        | ((b'E' as libc::c_ulong) << 8)
        | (0x20 + ev as libc::c_ulong)
}

/// Whether the device behind `file` advertises `SND_TONE`.
fn supports_tone(file: &File) -> io::Result<bool> {
    let mut bits = [0u8; 1];
    // SAFETY: the kernel writes at most `bits.len()` bytes into `bits`.
    let ret = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            eviocgbit(EV_SND, bits.len()) as _,
            bits.as_mut_ptr(),
        )
    };
    if ret == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(bits[0] & (1 << SND_TONE) != 0)
}

/// Serialized `struct input_event` carrying a tone request.
fn tone_event(value: i32) -> [u8; mem::size_of::<libc::input_event>()] {
    let event = libc::input_event {
        time: libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        },
        type_: EV_SND,
        code: SND_TONE,
        value,
    };
    // SAFETY: input_event is plain old data without padding on Linux.
    unsafe { mem::transmute(event) }
}

/// `/dev/input/eventN` nodes in numeric order.
fn event_nodes(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut nodes: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let index = name.to_str()?.strip_prefix("event")?.parse().ok()?;
            Some((index, entry.path()))
        })
        .collect();
    nodes.sort();
    nodes.into_iter().map(|(_, path)| path).collect()
}

/// Finds an input device that can play tones.
pub struct EvdevBackend {
    pcspkr: PathBuf,
    input_dir: PathBuf,
}

impl EvdevBackend {
    pub fn new() -> Self {
        Self {
            pcspkr: PathBuf::from(PCSPKR_DEVICE),
            input_dir: PathBuf::from(INPUT_DIR),
        }
    }

    fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = vec![self.pcspkr.clone()];
        candidates.extend(event_nodes(&self.input_dir));
        candidates
    }

    /// Level for a failed candidate that exists but cannot be used.
    ///
    /// Most `eventN` nodes are keyboards and mice that only root may open,
    /// so only the speaker's own node is worth a warning.
    fn failure_level(&self, path: &Path) -> log::Level {
        if path == self.pcspkr {
            log::Level::Warn
        } else {
            log::Level::Debug
        }
    }

    fn open_path(path: &Path) -> Result<EvdevDriver> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| BeepError::open_failed(NAME, path, e))?;

        let not_found = || BeepError::not_found(NAME, Some(path));
        match supports_tone(&file) {
            Ok(true) => {}
            Ok(false) => {
                log::debug!("{}: no SND_TONE capability", path.display());
                return Err(not_found());
            }
            Err(e) => {
                log::debug!("{}: EVIOCGBIT failed: {}", path.display(), e);
                return Err(not_found());
            }
        }

        log::info!("using evdev device {}", path.display());
        Ok(EvdevDriver {
            path: path.to_path_buf(),
            file: Some(file),
            sounding: false,
        })
    }
}

impl Default for EvdevBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for EvdevBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn open(&self, explicit: Option<&Path>) -> Result<Box<dyn ToneDriver>> {
        if let Some(path) = explicit {
            return Ok(Box::new(Self::open_path(path)?));
        }

        for path in self.candidates() {
            match Self::open_path(&path) {
                Ok(driver) => return Ok(Box::new(driver)),
                Err(err) if err.is_not_found() => log::debug!("{}", err),
                Err(err) => log::log!(self.failure_level(&path), "{}", err),
            }
        }

        Err(BeepError::not_found(NAME, None))
    }
}

/// An open input event device.
pub struct EvdevDriver {
    path: PathBuf,
    file: Option<File>,
    sounding: bool,
}

impl EvdevDriver {
    fn send(&mut self, value: i32) -> io::Result<()> {
        match &mut self.file {
            Some(file) => file.write_all(&tone_event(value)),
            None => Ok(()),
        }
    }
}

impl ToneDriver for EvdevDriver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn device_path(&self) -> &Path {
        &self.path
    }

    fn begin_tone(&mut self, frequency_hz: u16) {
        if let Err(e) = self.send(i32::from(frequency_hz)) {
            log::warn!("{}: could not start tone: {}", self.path.display(), e);
            return;
        }
        self.sounding = frequency_hz != 0;
    }

    fn end_tone(&mut self) {
        if !self.sounding {
            return;
        }
        if let Err(e) = self.send(0) {
            log::warn!("{}: could not stop tone: {}", self.path.display(), e);
        }
        self.sounding = false;
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            log::debug!("closed {}", self.path.display());
        }
    }
}
