use crate::domain::event::{EventRecord, MachineEvent};
use crate::error::{Result, VendingError};
use std::io::Read;

/// Reads a script of customer events from a CSV source.
///
/// Expects an `action, value` header. Whitespace is trimmed and rows without
/// a value column are accepted, so `card` and `refund` can be written bare.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily yields one event per row. A malformed row yields an error and
    /// does not stop the rows after it.
    pub fn events(self) -> impl Iterator<Item = Result<MachineEvent>> {
        self.reader
            .into_deserialize::<EventRecord>()
            .map(|result| result.map_err(VendingError::from).and_then(MachineEvent::try_from))
    }
}
