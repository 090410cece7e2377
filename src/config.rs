//! Machine configuration.

use crate::domain::denomination::DenominationSet;
use std::time::Duration;

/// Length of a card session, in countdown ticks.
pub const CARD_SESSION_SECS: u32 = 30;

/// Timing and acceptance settings for a [`VendingMachine`](crate::application::machine::VendingMachine).
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Ticks a card session lasts before it expires.
    pub card_session_secs: u32,

    /// Period of one countdown tick.
    pub tick_interval: Duration,

    /// Simulated round trip of a card charge.
    pub charge_delay: Duration,

    /// Pause between a settled card charge and the reset.
    pub settle_delay: Duration,

    /// Pause before resetting after a refund or an exact-change cash sale.
    pub reset_delay: Duration,

    /// Coins and bills the cash acceptor takes.
    pub denominations: DenominationSet,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            card_session_secs: CARD_SESSION_SECS,
            tick_interval: Duration::from_secs(1),
            charge_delay: Duration::from_millis(1000),
            settle_delay: Duration::from_millis(1500),
            reset_delay: Duration::from_millis(1500),
            denominations: DenominationSet::default(),
        }
    }
}

impl MachineConfig {
    /// Overrides the defaults with whatever timings were given on the
    /// command line.
    pub fn from_cli(
        card_session_secs: Option<u32>,
        charge_delay_ms: Option<u64>,
        settle_delay_ms: Option<u64>,
        reset_delay_ms: Option<u64>,
    ) -> Self {
        let mut config = Self::default();
        if let Some(secs) = card_session_secs {
            config.card_session_secs = secs.clamp(1, CARD_SESSION_SECS);
        }
        if let Some(ms) = charge_delay_ms {
            config.charge_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = settle_delay_ms {
            config.settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = reset_delay_ms {
            config.reset_delay = Duration::from_millis(ms);
        }
        config
    }
}
