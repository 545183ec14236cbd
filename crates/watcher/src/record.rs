//! Raw inotify record codec
//!
//! Kernel record layout (native byte order):
//! ```text
//! offset  size  field
//!      0     4  wd      (i32)
//!      4     4  mask    (u32)
//!      8     4  cookie  (u32)
//!     12     4  len     (u32)
//!     16   len  name    (NUL terminated, NUL padded)
//! ```
//! The kernel pads `len` to a multiple of the header size, so the largest
//! `len` for a `NAME_MAX` name is `NAME_MAX + 1`.

use crate::event::{Event, WatchDescriptor};
use crate::mask::EventMask;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use thiserror::Error;

/// Size of the fixed record header (`struct inotify_event` without name)
pub const HEADER_SIZE: usize = 16;

/// Longest single path component
pub const NAME_MAX: usize = 255;

/// Largest single record: header, longest name, terminating NUL
pub const MAX_RECORD_SIZE: usize = HEADER_SIZE + NAME_MAX + 1;

/// Record decoding failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Buffer ends before the header or the declared name does
    #[error("record truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// Header and payload disagree
    #[error("malformed record: {reason}")]
    Malformed { reason: &'static str },
}

/// Decode the first record in `buf`
pub fn decode(buf: &[u8]) -> Result<Event, DecodeError> {
    decode_record(buf).map(|(event, _)| event)
}

/// Decode the first record in `buf`, returning it with the number of bytes
/// it occupies
pub fn decode_record(buf: &[u8]) -> Result<(Event, usize), DecodeError> {
    if buf.len() < HEADER_SIZE {
        return Err(DecodeError::Truncated {
            needed: HEADER_SIZE,
            available: buf.len(),
        });
    }

    let wd = read_u32(buf, 0) as i32;
    let mask = read_u32(buf, 4);
    let cookie = read_u32(buf, 8);
    let len = read_u32(buf, 12) as usize;

    if len > NAME_MAX + 1 {
        return Err(DecodeError::Malformed {
            reason: "name length exceeds NAME_MAX",
        });
    }

    let total = HEADER_SIZE + len;
    if buf.len() < total {
        return Err(DecodeError::Truncated {
            needed: total,
            available: buf.len(),
        });
    }

    let name = if len == 0 {
        None
    } else {
        let raw = &buf[HEADER_SIZE..total];
        let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let trimmed = &raw[..end];

        if trimmed.is_empty() {
            return Err(DecodeError::Malformed {
                reason: "name length set but name is empty",
            });
        }
        if trimmed.contains(&0) {
            return Err(DecodeError::Malformed {
                reason: "name contains interior NUL",
            });
        }

        Some(OsStr::from_bytes(trimmed).to_os_string())
    };

    let event = Event {
        watch_descriptor: WatchDescriptor::from_raw(wd),
        mask: EventMask::from_bits_retain(mask),
        cookie,
        name,
    };

    Ok((event, total))
}

/// Encode an event the way the kernel lays it out
///
/// An empty name is written as no name. Names longer than `NAME_MAX` produce a
/// record `decode` rejects.
pub fn encode(event: &Event) -> Vec<u8> {
    let name = event
        .name
        .as_deref()
        .map(OsStrExt::as_bytes)
        .filter(|name| !name.is_empty());

    let len = name.map_or(0, |name| padded_len(name.len() + 1));

    let mut buf = Vec::with_capacity(HEADER_SIZE + len);
    buf.extend_from_slice(&event.watch_descriptor.as_raw().to_ne_bytes());
    buf.extend_from_slice(&event.mask.bits().to_ne_bytes());
    buf.extend_from_slice(&event.cookie.to_ne_bytes());
    buf.extend_from_slice(&(len as u32).to_ne_bytes());

    if let Some(name) = name {
        buf.extend_from_slice(name);
        buf.resize(HEADER_SIZE + len, 0);
    }

    buf
}

/// Iterator over consecutive records in one buffer
///
/// Stops after the first decode error.
pub struct Records<'a> {
    buf: &'a [u8],
}

impl<'a> Records<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Event, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() {
            return None;
        }

        match decode_record(self.buf) {
            Ok((event, used)) => {
                self.buf = &self.buf[used..];
                Some(Ok(event))
            }
            Err(e) => {
                self.buf = &[];
                Some(Err(e))
            }
        }
    }
}

/// Round up to the header alignment
fn padded_len(len: usize) -> usize {
    (len + HEADER_SIZE - 1) / HEADER_SIZE * HEADER_SIZE
}

/// Caller guarantees `offset + 4 <= buf.len()`
fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_ne_bytes(bytes)
}
