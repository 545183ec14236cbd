//! Event formatting

use owo_colors::OwoColorize;
use std::path::Path;
use watcher::{Event, EventMask};

/// Kind names plus kernel flags, comma separated
pub fn mask_label(mask: EventMask) -> String {
    let mut labels: Vec<&str> = mask.kinds().iter().map(|kind| kind.name()).collect();

    for (flag, label) in [
        (EventMask::ISDIR, "isdir"),
        (EventMask::IGNORED, "ignored"),
        (EventMask::Q_OVERFLOW, "overflow"),
        (EventMask::UNMOUNT, "unmount"),
    ] {
        if mask.contains(flag) {
            labels.push(label);
        }
    }

    labels.join(",")
}

/// One text line per event
pub fn text_line(event: &Event, path: Option<&Path>, color: bool) -> String {
    let label = mask_label(event.mask);
    let target = match (path, &event.name) {
        (Some(path), _) => path.display().to_string(),
        (None, Some(name)) => name.to_string_lossy().into_owned(),
        (None, None) => String::new(),
    };

    let mut line = if color {
        format!("{} {} {}", event.watch_descriptor.dimmed(), label.cyan(), target)
    } else {
        format!("{} {} {}", event.watch_descriptor, label, target)
    };

    if event.cookie != 0 {
        line.push_str(&format!(" cookie={}", event.cookie));
    }
    line
}

/// One JSON object per event
pub fn json_line(event: &Event, path: Option<&Path>) -> serde_json::Value {
    serde_json::json!({
        "wd": event.watch_descriptor.as_raw(),
        "mask": event.mask.bits(),
        "kinds": event.kinds().iter().map(|kind| kind.name()).collect::<Vec<_>>(),
        "cookie": event.cookie,
        "name": event.name.as_ref().map(|name| name.to_string_lossy().into_owned()),
        "path": path.map(|path| path.display().to_string()),
    })
}
