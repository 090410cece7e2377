use super::money::Money;
use crate::error::{Result, VendingError};
use serde::Deserialize;
use std::time::Duration;

/// Actions a user (or a replayed script) can perform on the machine.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Cash,
    Card,
    Select,
    Refund,
    Wait,
}

/// One row of an event script as it appears on disk.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct EventRecord {
    pub action: Action,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineEvent {
    InsertCash(Money),
    InsertCard,
    SelectDrink(String),
    Refund,
    /// Lets the clock run for the given time before the next event.
    Wait(Duration),
}

impl TryFrom<EventRecord> for MachineEvent {
    type Error = VendingError;

    fn try_from(record: EventRecord) -> Result<Self> {
        let value = record.value.as_deref().map(str::trim).filter(|v| !v.is_empty());
        match (record.action, value) {
            (Action::Cash, Some(v)) => Ok(Self::InsertCash(Money::new(parse_number(v)?))),
            (Action::Card, _) => Ok(Self::InsertCard),
            (Action::Select, Some(name)) => Ok(Self::SelectDrink(name.to_string())),
            (Action::Refund, _) => Ok(Self::Refund),
            (Action::Wait, Some(v)) => Ok(Self::Wait(Duration::from_millis(parse_number(v)?))),
            (action, None) => Err(VendingError::InvalidEvent(format!(
                "{action:?} requires a value"
            ))),
        }
    }
}

fn parse_number(value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| VendingError::InvalidEvent(format!("expected a whole number, got {value:?}")))
}
