//! Watch session over one inotify channel
//!
//! A session owns the channel descriptor, the watch bookkeeping and a small
//! read buffer. All methods take `&self`, so a session shared through `Arc`
//! can be closed from one thread while another is blocked in
//! [`WatchSession::read_next_event`]; the blocked read then returns
//! [`Error::InvalidHandle`].

use crate::config::SessionConfig;
use crate::error::Error;
use crate::event::{Event, WatchDescriptor};
use crate::mask::EventMask;
use crate::record::{self, HEADER_SIZE, MAX_RECORD_SIZE};
use crate::sys::{self, Readiness};
use crate::table::{WatchEntry, WatchTable};
use crate::Result;
use nix::errno::Errno;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::ffi::CString;
use std::fmt;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Longest accepted path, including the terminating NUL
pub const PATH_MAX: usize = 4096;

/// Raw channel descriptor of an open session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle(RawFd);

impl ChannelHandle {
    pub const fn as_raw(self) -> RawFd {
        self.0
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd{}", self.0)
    }
}

/// Inotify session
pub struct WatchSession {
    /// `None` once closed
    channel: RwLock<Option<Arc<Channel>>>,
    /// Registrations made through this session
    table: Mutex<WatchTable>,
    config: SessionConfig,
}

impl WatchSession {
    /// Open a session with the default configuration (blocking reads)
    pub fn open() -> Result<Self> {
        Self::open_with(SessionConfig::default())
    }

    /// Open a session
    ///
    /// Fails with `OsFailure` when the per-user instance limit or the process
    /// descriptor limit is reached.
    pub fn open_with(config: SessionConfig) -> Result<Self> {
        let fd = sys::inotify_init(config.init_flags())
            .map_err(|errno| Error::os("inotify_init1", errno))?;
        let waker = sys::waker().map_err(|errno| Error::os("eventfd", errno))?;

        debug!(
            fd = fd.as_raw_fd(),
            nonblocking = config.nonblocking,
            "Opened notification channel"
        );

        Ok(Self {
            channel: RwLock::new(Some(Arc::new(Channel::new(fd, waker)))),
            table: Mutex::new(WatchTable::new()),
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.channel.read().is_some()
    }

    /// Channel descriptor, for callers that multiplex it themselves
    pub fn handle(&self) -> Result<ChannelHandle> {
        Ok(ChannelHandle(self.channel()?.fd.as_raw_fd()))
    }

    /// Close the channel
    ///
    /// Clears the bookkeeping and wakes blocked readers. A second close fails
    /// with `InvalidHandle`. If readers still hold the channel, the descriptor
    /// is released when the last of them returns.
    pub fn close(&self) -> Result<()> {
        let channel = self.channel.write().take().ok_or(Error::InvalidHandle)?;
        channel.shutdown();
        self.table.lock().clear();

        match Arc::try_unwrap(channel) {
            Ok(channel) => {
                let fd = channel.fd.as_raw_fd();
                channel.release()?;
                debug!(fd, "Closed notification channel");
                Ok(())
            }
            Err(channel) => {
                debug!(
                    fd = channel.fd.as_raw_fd(),
                    "Channel close deferred until in-flight reads return"
                );
                Ok(())
            }
        }
    }

    /// Register a watch on `path`
    ///
    /// Paths of `PATH_MAX` bytes or more are rejected before any syscall.
    /// Watching an already watched path returns its existing descriptor; the
    /// stored mask is replaced, or merged when `MASK_ADD` is set.
    pub fn add_watch(&self, path: impl AsRef<Path>, mask: EventMask) -> Result<WatchDescriptor> {
        let path = path.as_ref();
        let channel = self.channel()?;

        if !mask.is_valid_watch() {
            return Err(Error::InvalidMask { mask, errno: None });
        }

        let bytes = path.as_os_str().as_bytes();
        if bytes.len() >= PATH_MAX {
            return Err(Error::PathTooLong {
                path: path.to_path_buf(),
                errno: None,
            });
        }
        let c_path = CString::new(bytes).map_err(|_| Error::InvalidPath {
            path: path.to_path_buf(),
        })?;

        // Held across the syscall so the table never disagrees with the kernel
        let mut table = self.lock_table(&channel)?;

        let wd = sys::add_watch(&channel.fd, &c_path, mask.bits())
            .map_err(|errno| add_watch_error(path, mask, errno))?;
        let wd = WatchDescriptor::from_raw(wd);

        let requested = mask - (EventMask::MASK_ADD | EventMask::MASK_CREATE);
        let stored = match table.lookup(wd) {
            Some(existing) if mask.contains(EventMask::MASK_ADD) => existing.mask | requested,
            _ => requested,
        };
        table.insert(wd, path.to_path_buf(), stored);

        debug!(
            %wd,
            path = %path.display(),
            mask = format_args!("{:#x}", stored.bits()),
            "Added watch"
        );
        Ok(wd)
    }

    /// Remove a watch
    ///
    /// Not idempotent: removing a descriptor the kernel no longer knows fails
    /// with `UnknownWatch`.
    pub fn remove_watch(&self, wd: WatchDescriptor) -> Result<()> {
        let channel = self.channel()?;
        let mut table = self.lock_table(&channel)?;

        match sys::rm_watch(&channel.fd, wd.as_raw()) {
            Ok(()) => {
                table.remove(wd);
                debug!(%wd, "Removed watch");
                Ok(())
            }
            Err(Errno::EINVAL) => {
                table.remove(wd);
                Err(Error::UnknownWatch {
                    wd,
                    errno: Errno::EINVAL,
                })
            }
            Err(errno) => Err(Error::os("inotify_rm_watch", errno)),
        }
    }

    /// Return the next event, blocking until one is queued
    ///
    /// Reads at most `MAX_RECORD_SIZE` bytes from the kernel at a time and
    /// returns one record per call; records that arrived in the same read are
    /// returned by the following calls. `Interrupted` is never retried here.
    pub fn read_next_event(&self) -> Result<Event> {
        let channel = self.channel()?;
        let event = channel.next_event(self.config.nonblocking)?;

        if event.is_ignored() {
            if let Some(entry) = self.table.lock().remove(event.watch_descriptor) {
                debug!(
                    wd = %event.watch_descriptor,
                    path = %entry.path.display(),
                    "Watch dropped by kernel"
                );
            }
        }
        if event.is_overflow() {
            warn!("Kernel event queue overflowed, events were lost");
        }

        trace!(
            wd = %event.watch_descriptor,
            mask = format_args!("{:#x}", event.mask.bits()),
            cookie = event.cookie,
            name = ?event.name,
            "Read event"
        );
        Ok(event)
    }

    /// Registration for a descriptor
    pub fn lookup(&self, wd: WatchDescriptor) -> Option<WatchEntry> {
        self.table.lock().lookup(wd).cloned()
    }

    /// Snapshot of all registrations
    pub fn watches(&self) -> Vec<(WatchDescriptor, WatchEntry)> {
        let mut watches: Vec<_> = self
            .table
            .lock()
            .iter()
            .map(|(wd, entry)| (wd, entry.clone()))
            .collect();
        watches.sort_by_key(|(wd, _)| *wd);
        watches
    }

    /// Descriptor currently registered for exactly this path
    pub fn find_by_path(&self, path: impl AsRef<Path>) -> Option<WatchDescriptor> {
        self.table.lock().find_by_path(path.as_ref())
    }

    /// Full path an event refers to: the watched path, joined with the entry
    /// name when there is one
    pub fn event_path(&self, event: &Event) -> Option<PathBuf> {
        let table = self.table.lock();
        let entry = table.lookup(event.watch_descriptor)?;
        Some(match &event.name {
            Some(name) => entry.path.join(name),
            None => entry.path.clone(),
        })
    }

    fn channel(&self) -> Result<Arc<Channel>> {
        self.channel.read().clone().ok_or(Error::InvalidHandle)
    }

    /// Table lock, refused once `channel` has been shut down
    ///
    /// `close` marks the channel closed before clearing the table, so a
    /// caller that gets the lock here either sees the flag or has its entry
    /// removed by that clear.
    fn lock_table(&self, channel: &Channel) -> Result<MutexGuard<'_, WatchTable>> {
        let table = self.table.lock();
        if channel.is_closed() {
            return Err(Error::InvalidHandle);
        }
        Ok(table)
    }
}

impl fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSession")
            .field("handle", &self.handle().ok())
            .field("watches", &self.table.lock().len())
            .field("config", &self.config)
            .finish()
    }
}

fn add_watch_error(path: &Path, mask: EventMask, errno: Errno) -> Error {
    let path = path.to_path_buf();
    match errno {
        Errno::ENOENT => Error::PathNotFound { path, errno },
        Errno::ENAMETOOLONG => Error::PathTooLong {
            path,
            errno: Some(errno),
        },
        Errno::EINVAL => Error::InvalidMask {
            mask,
            errno: Some(errno),
        },
        _ => Error::os("inotify_add_watch", errno),
    }
}

/// Open kernel channel shared by the session and in-flight readers
struct Channel {
    fd: OwnedFd,
    /// eventfd signalled on close
    waker: OwnedFd,
    closed: AtomicBool,
    /// Bytes read from the kernel but not yet returned as events
    pending: Mutex<ReadBuffer>,
}

impl Channel {
    fn new(fd: OwnedFd, waker: OwnedFd) -> Self {
        Self {
            fd,
            waker,
            closed: AtomicBool::new(false),
            pending: Mutex::new(ReadBuffer::new()),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        if let Err(errno) = sys::wake(&self.waker) {
            warn!(%errno, "Failed to wake blocked readers");
        }
    }

    fn release(self) -> Result<()> {
        let Channel { fd, waker, .. } = self;
        drop(waker);
        sys::close(fd).map_err(|errno| Error::os("close", errno))
    }

    fn next_event(&self, nonblocking: bool) -> Result<Event> {
        let mut pending = self.pending.lock();

        loop {
            if self.is_closed() {
                return Err(Error::InvalidHandle);
            }

            if !pending.is_empty() {
                return match record::decode_record(pending.filled()) {
                    Ok((event, used)) => {
                        pending.consume(used);
                        Ok(event)
                    }
                    Err(e) => {
                        pending.clear();
                        warn!(error = %e, "Discarding undecodable notification data");
                        Err(Error::os("read", Errno::EIO))
                    }
                };
            }

            if !nonblocking {
                match sys::wait_readable(&self.fd, &self.waker) {
                    Ok(Readiness::Woken) => return Err(Error::InvalidHandle),
                    Ok(Readiness::Channel) => {}
                    Err(Errno::EINTR) => return Err(Error::Interrupted),
                    Err(errno) => return Err(Error::os("poll", errno)),
                }
            }

            match sys::read(&self.fd, pending.refill()) {
                Ok(n) if n < HEADER_SIZE => {
                    warn!(bytes = n, "Short read from notification channel");
                    return Err(Error::os("read", Errno::EIO));
                }
                Ok(n) => pending.set_filled(n),
                Err(Errno::EAGAIN) if nonblocking => return Err(Error::WouldBlock),
                // Another reader took the record between poll and read
                Err(Errno::EAGAIN) => continue,
                Err(Errno::EINTR) => return Err(Error::Interrupted),
                Err(errno) => return Err(Error::os("read", errno)),
            }
        }
    }
}

/// Fixed buffer sized for one worst-case record
struct ReadBuffer {
    data: [u8; MAX_RECORD_SIZE],
    start: usize,
    end: usize,
}

impl ReadBuffer {
    fn new() -> Self {
        Self {
            data: [0; MAX_RECORD_SIZE],
            start: 0,
            end: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn filled(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }

    fn consume(&mut self, n: usize) {
        self.start = (self.start + n).min(self.end);
    }

    fn clear(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    /// Whole buffer as a read target; only valid when empty
    fn refill(&mut self) -> &mut [u8] {
        self.clear();
        &mut self.data
    }

    fn set_filled(&mut self, n: usize) {
        self.start = 0;
        self.end = n.min(MAX_RECORD_SIZE);
    }
}
