//! Error types for watch sessions

use crate::event::WatchDescriptor;
use crate::mask::EventMask;
use nix::errno::Errno;
use std::path::PathBuf;
use thiserror::Error;

/// Watch session failure
///
/// Variants that come from a failed syscall carry the errno.
#[derive(Debug, Error)]
pub enum Error {
    /// Session was closed
    #[error("notification channel is closed")]
    InvalidHandle,

    /// Underlying call failed
    #[error("{op} failed: {errno}")]
    OsFailure { op: &'static str, errno: Errno },

    /// Path is at or over `PATH_MAX`, or a component is over `NAME_MAX`
    #[error("path too long: {}{}", path.display(), errno_suffix(*errno))]
    PathTooLong { path: PathBuf, errno: Option<Errno> },

    #[error("path not found: {} ({errno})", path.display())]
    PathNotFound { path: PathBuf, errno: Errno },

    /// Path cannot be passed to the kernel
    #[error("path contains an interior NUL byte: {}", path.display())]
    InvalidPath { path: PathBuf },

    /// Mask has no event bits, unknown bits, or conflicting options
    #[error("invalid watch mask {:#010x}{}", mask.bits(), errno_suffix(*errno))]
    InvalidMask { mask: EventMask, errno: Option<Errno> },

    #[error("unknown watch descriptor {wd} ({errno})")]
    UnknownWatch { wd: WatchDescriptor, errno: Errno },

    /// Blocking read was interrupted by a signal
    #[error("read interrupted")]
    Interrupted,

    /// Non-blocking session with nothing queued
    #[error("no event queued")]
    WouldBlock,
}

impl Error {
    pub(crate) fn os(op: &'static str, errno: Errno) -> Self {
        Error::OsFailure { op, errno }
    }

    /// Raw OS error code, when the failure came from the OS
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Error::OsFailure { errno, .. }
            | Error::PathNotFound { errno, .. }
            | Error::UnknownWatch { errno, .. } => Some(*errno as i32),
            Error::PathTooLong { errno, .. } | Error::InvalidMask { errno, .. } => {
                errno.map(|errno| errno as i32)
            }
            Error::Interrupted => Some(Errno::EINTR as i32),
            Error::WouldBlock => Some(Errno::EAGAIN as i32),
            Error::InvalidHandle | Error::InvalidPath { .. } => None,
        }
    }
}

fn errno_suffix(errno: Option<Errno>) -> String {
    errno.map(|errno| format!(" ({errno})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_code() {
        assert_eq!(Error::os("read", Errno::EIO).os_code(), Some(libc::EIO));
        assert_eq!(Error::Interrupted.os_code(), Some(libc::EINTR));
        assert_eq!(Error::InvalidHandle.os_code(), None);
        assert_eq!(
            Error::InvalidMask { mask: EventMask::empty(), errno: None }.os_code(),
            None
        );
        assert_eq!(
            Error::UnknownWatch {
                wd: WatchDescriptor::from_raw(4),
                errno: Errno::EINVAL,
            }
            .os_code(),
            Some(libc::EINVAL)
        );
    }

    #[test]
    fn test_messages_include_errno() {
        let err = Error::PathNotFound { path: PathBuf::from("/nope"), errno: Errno::ENOENT };
        let message = err.to_string();
        assert!(message.contains("/nope"));
        assert!(message.contains("ENOENT"));

        let err = Error::PathTooLong { path: PathBuf::from("/x"), errno: None };
        assert_eq!(err.to_string(), "path too long: /x");
    }
}
