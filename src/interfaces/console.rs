use crate::application::machine::MachineSnapshot;
use crate::domain::ports::NotificationSink;
use crate::error::Result;
use std::io::{self, Write};

/// Prints each status message on its own `status:` line.
///
/// The message cleared by a reset carries nothing worth printing and is
/// skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(&self, message: &str) {
        if message.is_empty() {
            return;
        }
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let _ = writeln!(out, "status: {message}");
    }
}

/// Writes a machine snapshot as pretty-printed JSON.
pub fn write_snapshot_json<W: Write>(mut out: W, snapshot: &MachineSnapshot) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, snapshot)?;
    writeln!(out)?;
    Ok(())
}
