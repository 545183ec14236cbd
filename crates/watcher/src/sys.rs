//! Thin wrappers over the inotify, poll and eventfd syscalls

use nix::errno::Errno;
use std::ffi::CStr;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd};

/// Which descriptor woke a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Readiness {
    Channel,
    Woken,
}

pub(crate) fn inotify_init(flags: libc::c_int) -> Result<OwnedFd, Errno> {
    let fd = Errno::result(unsafe { libc::inotify_init1(flags) })?;
    // SAFETY: fd was just returned by the kernel and is owned by nobody else
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Non-blocking eventfd used to wake readers on close
pub(crate) fn waker() -> Result<OwnedFd, Errno> {
    let fd = Errno::result(unsafe { libc::eventfd(0, libc::EFD_CLOEXEC | libc::EFD_NONBLOCK) })?;
    // SAFETY: as above
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

pub(crate) fn add_watch(fd: &OwnedFd, path: &CStr, mask: u32) -> Result<i32, Errno> {
    Errno::result(unsafe { libc::inotify_add_watch(fd.as_raw_fd(), path.as_ptr(), mask) })
}

pub(crate) fn rm_watch(fd: &OwnedFd, wd: i32) -> Result<(), Errno> {
    Errno::result(unsafe { libc::inotify_rm_watch(fd.as_raw_fd(), wd) }).map(drop)
}

pub(crate) fn read(fd: &OwnedFd, buf: &mut [u8]) -> Result<usize, Errno> {
    let n = Errno::result(unsafe {
        libc::read(fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len())
    })?;
    Ok(n as usize)
}

/// Close and report the result, unlike dropping an `OwnedFd`
pub(crate) fn close(fd: OwnedFd) -> Result<(), Errno> {
    Errno::result(unsafe { libc::close(fd.into_raw_fd()) }).map(drop)
}

pub(crate) fn wake(waker: &OwnedFd) -> Result<(), Errno> {
    let one: u64 = 1;
    let n = unsafe {
        libc::write(
            waker.as_raw_fd(),
            (&one as *const u64).cast(),
            std::mem::size_of::<u64>(),
        )
    };
    match Errno::result(n) {
        // Counter saturated, a wake is already pending
        Err(Errno::EAGAIN) => Ok(()),
        other => other.map(drop),
    }
}

/// Block until the channel is readable or the waker fires
pub(crate) fn wait_readable(channel: &OwnedFd, waker: &OwnedFd) -> Result<Readiness, Errno> {
    let mut fds = [
        libc::pollfd {
            fd: channel.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: waker.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        },
    ];

    Errno::result(unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) })?;

    if fds[1].revents != 0 {
        Ok(Readiness::Woken)
    } else {
        Ok(Readiness::Channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_is_observed() {
        let channel = inotify_init(libc::IN_NONBLOCK | libc::IN_CLOEXEC).unwrap();
        let waker = waker().unwrap();

        wake(&waker).unwrap();
        wake(&waker).unwrap();
        assert_eq!(wait_readable(&channel, &waker).unwrap(), Readiness::Woken);
    }

    #[test]
    fn test_empty_channel_would_block() {
        let channel = inotify_init(libc::IN_NONBLOCK).unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(read(&channel, &mut buf), Err(Errno::EAGAIN));
        close(channel).unwrap();
    }
}
