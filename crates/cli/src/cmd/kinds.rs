//! List the event bitmask registry

use anyhow::Result;
use watcher::EVENT_KINDS;

pub fn run() -> Result<()> {
    for (name, mask) in EVENT_KINDS.iter() {
        println!("{:<18} {:#010x}", name, mask.bits());
    }
    Ok(())
}
