//! Linux inotify watch sessions
//!
//! This crate provides:
//! - Watch sessions over one inotify channel (open/close, add/remove watch,
//!   blocking read of the next event)
//! - A pure codec for raw inotify records
//! - Descriptor -> path bookkeeping
//! - The event bitmask registry, bit-identical to the kernel constants
//!
//! ```no_run
//! use watcher::{EventMask, WatchSession};
//!
//! let session = WatchSession::open()?;
//! session.add_watch("/tmp", EventMask::CREATE | EventMask::DELETE)?;
//! let event = session.read_next_event()?;
//! println!("{:?} {:?}", event.kinds(), event.name);
//! # Ok::<(), watcher::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod mask;
pub mod record;
pub mod session;
pub mod table;

mod sys;

// Re-exports
pub use config::SessionConfig;
pub use error::Error;
pub use event::{Event, WatchDescriptor};
pub use mask::{EventKind, EventMask, EVENT_KINDS};
pub use record::{DecodeError, MAX_RECORD_SIZE};
pub use session::{ChannelHandle, WatchSession, PATH_MAX};
pub use table::{WatchEntry, WatchTable};

/// Result type for session operations
pub type Result<T> = std::result::Result<T, Error>;
