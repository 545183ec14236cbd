//! Watch paths and print events

use crate::output;
use anyhow::{Context, Result};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use watcher::mask::parse_kinds;
use watcher::{Error, EventMask, WatchSession};

/// Poll interval for sessions configured as non-blocking
const NONBLOCKING_POLL: Duration = Duration::from_millis(50);

pub fn run(
    paths: &[PathBuf],
    events: Option<&str>,
    count: Option<usize>,
    json: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = crate::config::load(config_path)?;

    let mask = match events.or(config.events.as_deref()) {
        Some(list) => parse_kinds(list).context("Invalid --events")?,
        None => EventMask::ALL_EVENTS,
    };
    if mask.is_empty() {
        anyhow::bail!("No event kinds selected");
    }

    let session = WatchSession::open_with(config.session)
        .context("Failed to open inotify session")?;

    let mut watched = 0usize;
    for path in paths {
        if let Some(wd) = session.find_by_path(path) {
            tracing::warn!(%wd, path = %path.display(), "Path given more than once, skipping");
            continue;
        }
        session
            .add_watch(path, mask)
            .with_context(|| format!("Failed to watch {}", path.display()))?;
        watched += 1;
    }
    eprintln!("watching {} path(s)", watched);

    let color = !json && std::io::stdout().is_terminal();
    let mut stdout = std::io::stdout().lock();
    let mut seen = 0usize;

    while count.map_or(true, |limit| seen < limit) {
        let event = match session.read_next_event() {
            Ok(event) => event,
            Err(Error::Interrupted) => continue,
            Err(Error::WouldBlock) => {
                std::thread::sleep(NONBLOCKING_POLL);
                continue;
            }
            Err(e) => return Err(e).context("Failed to read event"),
        };

        let path = session.event_path(&event);
        if json {
            writeln!(stdout, "{}", output::json_line(&event, path.as_deref()))?;
        } else {
            writeln!(stdout, "{}", output::text_line(&event, path.as_deref(), color))?;
        }
        stdout.flush()?;
        seen += 1;
    }

    session.close().context("Failed to close inotify session")?;
    Ok(())
}
