//! Decoded notification events

use crate::mask::{EventKind, EventMask};
use std::ffi::{OsStr, OsString};
use std::fmt;

/// Watch descriptor returned by `inotify_add_watch`
///
/// Only meaningful for the session that produced it. The kernel may hand the
/// same number out again once the watch is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchDescriptor(i32);

impl WatchDescriptor {
    pub const fn from_raw(wd: i32) -> Self {
        Self(wd)
    }

    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for WatchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wd{}", self.0)
    }
}

/// One notification record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Watch the event was reported on
    pub watch_descriptor: WatchDescriptor,
    /// Event kind bits plus kernel flags such as `ISDIR`
    pub mask: EventMask,
    /// Shared by the `MOVED_FROM`/`MOVED_TO` halves of one rename, 0 otherwise
    pub cookie: u32,
    /// Entry name inside a watched directory; `None` for events on the
    /// watched object itself
    pub name: Option<OsString>,
}

impl Event {
    /// Event kinds set in the mask
    pub fn kinds(&self) -> Vec<EventKind> {
        self.mask.kinds()
    }

    pub fn is_dir(&self) -> bool {
        self.mask.contains(EventMask::ISDIR)
    }

    /// The kernel dropped events because its queue was full
    pub fn is_overflow(&self) -> bool {
        self.mask.contains(EventMask::Q_OVERFLOW)
    }

    /// The watch no longer exists after this event
    pub fn is_ignored(&self) -> bool {
        self.mask.contains(EventMask::IGNORED)
    }

    pub fn name(&self) -> Option<&OsStr> {
        self.name.as_deref()
    }
}
