//! Event bitmask registry
//!
//! Bit values are the Linux inotify constants (`<sys/inotify.h>`), so masks
//! built here go to the kernel unchanged and masks read back from records can
//! be tested directly.

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

bitflags! {
    /// Registration and event mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        /// File was accessed
        const ACCESS = 0x0000_0001;
        /// File was modified
        const MODIFY = 0x0000_0002;
        /// Metadata changed
        const ATTRIB = 0x0000_0004;
        /// Writable file was closed
        const CLOSE_WRITE = 0x0000_0008;
        /// Unwritable file was closed
        const CLOSE_NOWRITE = 0x0000_0010;
        /// File was opened
        const OPEN = 0x0000_0020;
        /// File was moved out of a watched directory
        const MOVED_FROM = 0x0000_0040;
        /// File was moved into a watched directory
        const MOVED_TO = 0x0000_0080;
        /// Entry was created in a watched directory
        const CREATE = 0x0000_0100;
        /// Entry was deleted from a watched directory
        const DELETE = 0x0000_0200;
        /// Watched file or directory was deleted
        const DELETE_SELF = 0x0000_0400;
        /// Watched file or directory was moved
        const MOVE_SELF = 0x0000_0800;

        /// Backing filesystem was unmounted
        const UNMOUNT = 0x0000_2000;
        /// Kernel event queue overflowed
        const Q_OVERFLOW = 0x0000_4000;
        /// Watch was removed, explicitly or by the kernel
        const IGNORED = 0x0000_8000;

        /// Only watch the path if it is a directory
        const ONLYDIR = 0x0100_0000;
        /// Do not follow a trailing symlink
        const DONT_FOLLOW = 0x0200_0000;
        /// Ignore events for children after they are unlinked
        const EXCL_UNLINK = 0x0400_0000;
        /// Fail if the path is already watched
        const MASK_CREATE = 0x1000_0000;
        /// OR the mask into an existing watch instead of replacing it
        const MASK_ADD = 0x2000_0000;
        /// Event subject is a directory
        const ISDIR = 0x4000_0000;
        /// Remove the watch after one event
        const ONESHOT = 0x8000_0000;

        const CLOSE = Self::CLOSE_WRITE.bits() | Self::CLOSE_NOWRITE.bits();
        const MOVE = Self::MOVED_FROM.bits() | Self::MOVED_TO.bits();
        const ALL_EVENTS = 0x0000_0fff;
    }
}

impl EventMask {
    /// Option bits accepted at registration time
    pub const WATCH_OPTIONS: EventMask = EventMask::ONLYDIR
        .union(EventMask::DONT_FOLLOW)
        .union(EventMask::EXCL_UNLINK)
        .union(EventMask::MASK_CREATE)
        .union(EventMask::MASK_ADD)
        .union(EventMask::ONESHOT);

    /// Flags only the kernel sets on returned events
    pub const EVENT_FLAGS: EventMask = EventMask::UNMOUNT
        .union(EventMask::Q_OVERFLOW)
        .union(EventMask::IGNORED)
        .union(EventMask::ISDIR);

    /// Event kinds present in this mask, in registry order
    pub fn kinds(self) -> Vec<EventKind> {
        EventKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.contains(kind.mask()))
            .collect()
    }

    /// Check a mask is usable for `inotify_add_watch`
    ///
    /// At least one event kind must be set, no bit outside the kinds and
    /// registration options may be set, and `MASK_CREATE` excludes `MASK_ADD`.
    pub fn is_valid_watch(self) -> bool {
        let known = EventMask::ALL_EVENTS | EventMask::WATCH_OPTIONS;
        if self.bits() & !known.bits() != 0 {
            return false;
        }
        if !self.intersects(EventMask::ALL_EVENTS) {
            return false;
        }
        !self.contains(EventMask::MASK_CREATE | EventMask::MASK_ADD)
    }
}

impl From<EventKind> for EventMask {
    fn from(kind: EventKind) -> Self {
        kind.mask()
    }
}

/// One symbolic event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Access,
    AttributeChange,
    CloseWrite,
    CloseNowrite,
    Create,
    Delete,
    DeleteSelf,
    Modify,
    MoveSelf,
    MovedFrom,
    MovedTo,
    Open,
}

impl EventKind {
    /// Every kind, in registry order
    pub const ALL: [EventKind; 12] = [
        EventKind::Access,
        EventKind::AttributeChange,
        EventKind::CloseWrite,
        EventKind::CloseNowrite,
        EventKind::Create,
        EventKind::Delete,
        EventKind::DeleteSelf,
        EventKind::Modify,
        EventKind::MoveSelf,
        EventKind::MovedFrom,
        EventKind::MovedTo,
        EventKind::Open,
    ];

    /// Canonical name, e.g. `close-write`
    pub const fn name(self) -> &'static str {
        match self {
            EventKind::Access => "access",
            EventKind::AttributeChange => "attribute-change",
            EventKind::CloseWrite => "close-write",
            EventKind::CloseNowrite => "close-nowrite",
            EventKind::Create => "create",
            EventKind::Delete => "delete",
            EventKind::DeleteSelf => "delete-self",
            EventKind::Modify => "modify",
            EventKind::MoveSelf => "move-self",
            EventKind::MovedFrom => "moved-from",
            EventKind::MovedTo => "moved-to",
            EventKind::Open => "open",
        }
    }

    /// The single bit for this kind
    pub const fn mask(self) -> EventMask {
        match self {
            EventKind::Access => EventMask::ACCESS,
            EventKind::AttributeChange => EventMask::ATTRIB,
            EventKind::CloseWrite => EventMask::CLOSE_WRITE,
            EventKind::CloseNowrite => EventMask::CLOSE_NOWRITE,
            EventKind::Create => EventMask::CREATE,
            EventKind::Delete => EventMask::DELETE,
            EventKind::DeleteSelf => EventMask::DELETE_SELF,
            EventKind::Modify => EventMask::MODIFY,
            EventKind::MoveSelf => EventMask::MOVE_SELF,
            EventKind::MovedFrom => EventMask::MOVED_FROM,
            EventKind::MovedTo => EventMask::MOVED_TO,
            EventKind::Open => EventMask::OPEN,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized event kind name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event kind: {0}")]
pub struct ParseKindError(pub String);

impl FromStr for EventKind {
    type Err = ParseKindError;

    /// Accepts canonical names, `in-` prefixed names and `_` separators
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let bare = normalized.strip_prefix("in-").unwrap_or(&normalized);

        // Short kernel spelling of attribute-change
        if bare == "attrib" {
            return Ok(EventKind::AttributeChange);
        }

        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == bare)
            .ok_or_else(|| ParseKindError(s.to_string()))
    }
}

/// Static name -> bit table
pub static EVENT_KINDS: [(&str, EventMask); 12] = [
    ("access", EventMask::ACCESS),
    ("attribute-change", EventMask::ATTRIB),
    ("close-write", EventMask::CLOSE_WRITE),
    ("close-nowrite", EventMask::CLOSE_NOWRITE),
    ("create", EventMask::CREATE),
    ("delete", EventMask::DELETE),
    ("delete-self", EventMask::DELETE_SELF),
    ("modify", EventMask::MODIFY),
    ("move-self", EventMask::MOVE_SELF),
    ("moved-from", EventMask::MOVED_FROM),
    ("moved-to", EventMask::MOVED_TO),
    ("open", EventMask::OPEN),
];

/// Parse a comma separated list of kind names into a mask
pub fn parse_kinds(list: &str) -> Result<EventMask, ParseKindError> {
    list.split(',')
        .filter(|part| !part.trim().is_empty())
        .try_fold(EventMask::empty(), |mask, part| {
            Ok(mask | part.parse::<EventKind>()?.mask())
        })
}
