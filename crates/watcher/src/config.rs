//! Session configuration

use serde::Deserialize;

/// Options applied when a session opens its channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Return `WouldBlock` instead of waiting when nothing is queued
    pub nonblocking: bool,

    /// Set `IN_CLOEXEC` on the channel descriptor
    pub close_on_exec: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            nonblocking: false,
            close_on_exec: true,
        }
    }
}

impl SessionConfig {
    /// Flags for `inotify_init1`
    ///
    /// The channel is always non-blocking at the OS level; blocking reads
    /// wait in `poll` so a concurrent close can wake them.
    pub(crate) fn init_flags(&self) -> libc::c_int {
        let mut flags = libc::IN_NONBLOCK;
        if self.close_on_exec {
            flags |= libc::IN_CLOEXEC;
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> SessionConfig {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert!(!config.nonblocking);
        assert!(config.close_on_exec);
        assert_eq!(parse(""), config);
    }

    #[test]
    fn test_partial_toml() {
        let config = parse("nonblocking = true");
        assert!(config.nonblocking);
        assert!(config.close_on_exec);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(toml::from_str::<SessionConfig>("nonblocking = \"yes\"").is_err());
    }

    #[test]
    fn test_init_flags() {
        let config = parse("close_on_exec = false");
        assert_eq!(config.init_flags() & libc::IN_CLOEXEC, 0);
        assert_ne!(config.init_flags() & libc::IN_NONBLOCK, 0);

        let flags = SessionConfig::default().init_flags();
        assert_eq!(flags, libc::IN_NONBLOCK | libc::IN_CLOEXEC);
    }
}
