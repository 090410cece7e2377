use std::io::Write;
use tempfile::NamedTempFile;
use vendomat::application::machine::VendingMachine;
use vendomat::config::MachineConfig;
use vendomat::domain::drink::default_catalog;
use vendomat::domain::money::Money;
use vendomat::infrastructure::in_memory::{InMemoryLedger, RecordingSink};

/// A machine stocked with the default catalog, plus a handle on its messages.
pub fn machine() -> (VendingMachine, RecordingSink) {
    let sink = RecordingSink::new();
    let ledger = InMemoryLedger::new(default_catalog()).expect("default catalog is valid");
    let machine = VendingMachine::new(
        MachineConfig::default(),
        Box::new(ledger),
        Box::new(sink.clone()),
    );
    (machine, sink)
}

pub async fn stock_of(machine: &VendingMachine, name: &str) -> u32 {
    machine
        .snapshot()
        .await
        .unwrap()
        .drinks
        .into_iter()
        .find(|d| d.name == name)
        .expect("drink in catalog")
        .stock
}

pub async fn balance(machine: &VendingMachine) -> Money {
    machine.session().await.cash_balance()
}

/// Writes an event script with the `action, value` header.
pub fn script(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "action, value").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file.flush().unwrap();
    file
}
