//! Error types shared by the drivers, the player and the command line.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BeepError>;

/// Everything that can make beep give up.
#[derive(Error, Debug)]
pub enum BeepError {
    /// The path does not exist or is not a device this backend can drive.
    /// `source` is set when opening the path failed.
    #[error("{}", not_found_message(.backend, .path.as_deref(), .source.as_ref()))]
    NotFound {
        backend: &'static str,
        path: Option<PathBuf>,
        #[source]
        source: Option<io::Error>,
    },

    /// The device exists but cannot be opened for writing.
    #[error("Could not open {} for writing: {source}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other OS level failure on a device.
    #[error("{}: {source}", .path.display())]
    Device {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Auto detection found nothing usable.
    #[error("Could not open any device")]
    NoDevice,

    /// SIGINT or SIGTERM arrived while waiting.
    #[error("Interrupted by signal")]
    Interrupted,

    /// Running with elevated privileges.
    #[error("{0}")]
    Privileged(String),

    /// Malformed command line, including `--help` and `--version` requests.
    #[error(transparent)]
    Cli(#[from] clap::Error),

    /// Command line combination clap cannot reject by itself.
    #[error("{0}")]
    Usage(String),

    /// Reading stdin or echoing to stdout failed.
    #[error("stream error: {0}")]
    Stream(#[from] io::Error),
}

impl BeepError {
    /// `path` (or no candidate at all) is not a device of this backend.
    pub fn not_found(backend: &'static str, path: Option<&Path>) -> Self {
        BeepError::NotFound {
            backend,
            path: path.map(Path::to_path_buf),
            source: None,
        }
    }

    /// Classifies a failed `open(2)` on `path`.
    pub fn open_failed(backend: &'static str, path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => BeepError::NotFound {
                backend,
                path: Some(path.to_path_buf()),
                source: Some(source),
            },
            io::ErrorKind::PermissionDenied => BeepError::PermissionDenied {
                path: path.to_path_buf(),
                source,
            },
            _ => BeepError::Device {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Whether the detector may move on to the next backend.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BeepError::NotFound { .. })
    }

    /// A `NotFound` caused by the path itself failing to open.
    pub fn is_missing_path(&self) -> bool {
        matches!(self, BeepError::NotFound { source: Some(_), .. })
    }
}

fn not_found_message(backend: &str, path: Option<&Path>, source: Option<&io::Error>) -> String {
    match (path, source) {
        (Some(path), Some(source)) => {
            format!("Could not open {} for writing: {}", path.display(), source)
        }
        (Some(path), None) => format!("{}: not a usable {} device", path.display(), backend),
        (None, _) => format!("no {} device found", backend),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_failures_are_classified_by_kind() {
        let path = Path::new("/dev/input/event3");

        let err = BeepError::open_failed("evdev", path, io::ErrorKind::NotFound.into());
        assert!(err.is_not_found());
        assert!(err.is_missing_path());

        let err = BeepError::open_failed("evdev", path, io::ErrorKind::PermissionDenied.into());
        assert!(matches!(err, BeepError::PermissionDenied { .. }));
        assert!(err.to_string().starts_with("Could not open /dev/input/event3 for writing"));

        let err = BeepError::open_failed("evdev", path, io::Error::from_raw_os_error(libc::EIO));
        assert!(matches!(err, BeepError::Device { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_messages_mention_backend() {
        let err = BeepError::not_found("console", None);
        assert_eq!(err.to_string(), "no console device found");

        let err = BeepError::not_found("console", Some(Path::new("/tmp/x")));
        assert_eq!(err.to_string(), "/tmp/x: not a usable console device");
        assert!(!err.is_missing_path());
    }

    #[test]
    fn missing_path_reports_the_open_error() {
        let source = io::Error::from_raw_os_error(libc::ENOENT);
        let expected = format!("Could not open /nonexistent/beepdev for writing: {}", source);
        let err = BeepError::open_failed("evdev", Path::new("/nonexistent/beepdev"), source);
        assert_eq!(err.to_string(), expected);
    }
}
