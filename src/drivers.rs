//! Driver registry and detection.
//!
//! Every kernel interface that can make the speaker sound is a [`Backend`].
//! Backends are registered in priority order; detection opens the first one
//! that works and hands back its [`ToneDriver`].

use crate::error::{BeepError, Result};
use std::path::Path;

/// An opened tone device.
pub trait ToneDriver {
    /// Backend name, for log messages.
    fn name(&self) -> &'static str;

    /// Path of the opened device.
    fn device_path(&self) -> &Path;

    /// Starts a continuous tone. Calling it while a tone sounds retriggers.
    fn begin_tone(&mut self, frequency_hz: u16);

    /// Stops the tone. Does nothing when no tone is sounding.
    fn end_tone(&mut self);

    /// Releases the device. Later calls are no-ops.
    fn close(&mut self);
}

/// A way of finding and opening one kind of tone device.
pub trait Backend {
    fn name(&self) -> &'static str;

    /// Opens `explicit` with this backend's semantics, or tries the
    /// backend's default candidates when `explicit` is `None`.
    ///
    /// `BeepError::NotFound` means "not mine, try the next backend".
    fn open(&self, explicit: Option<&Path>) -> Result<Box<dyn ToneDriver>>;
}

/// Ordered list of backends. Registration order is detection priority.
#[derive(Default)]
pub struct Registry {
    backends: Vec<Box<dyn Backend>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in backends, console first.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::console::ConsoleBackend::new()));
        registry.register(Box::new(crate::evdev::EvdevBackend::new()));
        registry
    }

    pub fn register(&mut self, backend: Box<dyn Backend>) {
        log::debug!("registering driver {}", backend.name());
        self.backends.push(backend);
    }

    /// Selects and opens the first usable backend.
    ///
    /// With an explicit path the backends only ever see that path: a backend
    /// that does not recognise it passes, any other failure is final.
    /// Without one, failures are logged and probing continues; if nothing is
    /// usable the result is [`BeepError::NoDevice`].
    pub fn detect(&self, explicit: Option<&Path>) -> Result<Box<dyn ToneDriver>> {
        match explicit {
            Some(path) => self.detect_explicit(path),
            None => self.detect_auto(),
        }
    }

    fn detect_explicit(&self, path: &Path) -> Result<Box<dyn ToneDriver>> {
        let mut not_found: Option<BeepError> = None;

        for backend in &self.backends {
            log::debug!("driver {}: trying {}", backend.name(), path.display());
            match backend.open(Some(path)) {
                Ok(driver) => return Ok(driver),
                Err(err) if err.is_not_found() => {
                    log::debug!("driver {}: {}", backend.name(), err);
                    // The open error says more than a capability miss.
                    let replace = match &not_found {
                        None => true,
                        Some(kept) => err.is_missing_path() && !kept.is_missing_path(),
                    };
                    if replace {
                        not_found = Some(err);
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Err(not_found.unwrap_or_else(|| BeepError::not_found("tone", Some(path))))
    }

    fn detect_auto(&self) -> Result<Box<dyn ToneDriver>> {
        for backend in &self.backends {
            log::debug!("driver {}: probing default devices", backend.name());
            match backend.open(None) {
                Ok(driver) => return Ok(driver),
                Err(err) if err.is_not_found() => {
                    log::debug!("driver {}: {}", backend.name(), err);
                }
                Err(err) => {
                    log::warn!("driver {}: {}", backend.name(), err);
                }
            }
        }

        Err(BeepError::NoDevice)
    }
}
