//! The payment session: which payment method is active, how much cash is held
//! and how long an open card session has left.
//!
//! Every transition is an exhaustive match over [`SessionState`]; the shape of
//! the enum makes the session invariants unrepresentable when broken:
//! an idle machine holds no cash, and only a card session has a countdown.

use super::denomination::DenominationSet;
use super::money::Money;
use crate::error::{Result, VendingError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    None,
    Cash,
    Card,
}

/// Progress of a purchase within a card session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardPhase {
    /// Waiting for a selection; the countdown is running.
    Awaiting,
    /// A charge was submitted and has not completed; the countdown is frozen.
    Charging,
    /// The charge went through and the machine is waiting to reset.
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    CashActive { balance: Money },
    CardActive { seconds_remaining: u32, phase: CardPhase },
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running(u32),
    Expired,
    /// The session is not counting down; the tick should stop.
    Inactive,
}

/// Marker for the current session; bumped whenever scheduled work issued
/// earlier must no longer take effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SessionEpoch(u64);

impl SessionEpoch {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    state: SessionState,
}

impl Default for PaymentSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn method(&self) -> PaymentMethod {
        match self.state {
            SessionState::Idle => PaymentMethod::None,
            SessionState::CashActive { .. } => PaymentMethod::Cash,
            SessionState::CardActive { .. } => PaymentMethod::Card,
        }
    }

    pub fn cash_balance(&self) -> Money {
        match self.state {
            SessionState::CashActive { balance } => balance,
            SessionState::Idle | SessionState::CardActive { .. } => Money::ZERO,
        }
    }

    pub fn card_seconds_remaining(&self) -> u32 {
        match self.state {
            SessionState::CardActive {
                seconds_remaining, ..
            } => seconds_remaining,
            SessionState::Idle | SessionState::CashActive { .. } => 0,
        }
    }

    /// Adds a validated denomination to the cash balance and returns the new
    /// total. Cash is refused while a card session is open.
    pub fn insert_cash(&mut self, amount: Money, denominations: &DenominationSet) -> Result<Money> {
        let amount = denominations.validate(amount)?;
        let balance = match self.state {
            SessionState::Idle => amount,
            SessionState::CashActive { balance } => balance + amount,
            SessionState::CardActive { .. } => return Err(VendingError::CardSessionActive),
        };
        self.state = SessionState::CashActive { balance };
        Ok(balance)
    }

    /// Opens a card session with a fresh countdown. Any cash still held is
    /// settled as part of the transition and returned so the caller can hand
    /// it back. An open card session that has not submitted a charge is
    /// restarted.
    pub fn begin_card(&mut self, seconds: u32) -> Result<Money> {
        let settled = match self.state {
            SessionState::Idle => Money::ZERO,
            SessionState::CashActive { balance } => balance,
            SessionState::CardActive {
                phase: CardPhase::Awaiting,
                ..
            } => Money::ZERO,
            SessionState::CardActive {
                phase: CardPhase::Charging | CardPhase::Settled,
                ..
            } => return Err(VendingError::TransactionInProgress),
        };
        self.state = SessionState::CardActive {
            seconds_remaining: seconds,
            phase: CardPhase::Awaiting,
        };
        Ok(settled)
    }

    /// Empties the cash balance, returning what was held. The payment method
    /// is left alone; returning to idle is the caller's reset.
    pub fn take_refund(&mut self) -> Money {
        match self.state {
            SessionState::CashActive { balance } => {
                self.state = SessionState::CashActive {
                    balance: Money::ZERO,
                };
                balance
            }
            SessionState::Idle | SessionState::CardActive { .. } => Money::ZERO,
        }
    }

    /// Change owed if a drink at `price` were bought with the held cash.
    /// Does not mutate.
    pub fn cash_change_for(&self, price: Money) -> Result<Money> {
        match self.state {
            SessionState::Idle => Err(VendingError::PaymentMethodRequired),
            SessionState::CashActive { balance } => balance
                .checked_sub(price)
                .ok_or(VendingError::InsufficientFunds { balance, price }),
            SessionState::CardActive { .. } => Err(VendingError::TransactionInProgress),
        }
    }

    /// Leaves `change` as the new balance after a cash sale.
    pub fn settle_cash(&mut self, change: Money) {
        if let SessionState::CashActive { .. } = self.state {
            self.state = SessionState::CashActive { balance: change };
        }
    }

    /// Submits a card charge, freezing the countdown.
    pub fn begin_charge(&mut self) -> Result<()> {
        match self.state {
            SessionState::Idle => Err(VendingError::PaymentMethodRequired),
            SessionState::CashActive { .. } => Err(VendingError::TransactionInProgress),
            SessionState::CardActive {
                seconds_remaining,
                phase: CardPhase::Awaiting,
            } => {
                self.state = SessionState::CardActive {
                    seconds_remaining,
                    phase: CardPhase::Charging,
                };
                Ok(())
            }
            SessionState::CardActive {
                phase: CardPhase::Charging | CardPhase::Settled,
                ..
            } => Err(VendingError::TransactionInProgress),
        }
    }

    /// Marks the in-flight charge as completed. Returns `false` when no
    /// charge was in flight.
    pub fn settle_charge(&mut self) -> bool {
        match self.state {
            SessionState::CardActive {
                seconds_remaining,
                phase: CardPhase::Charging,
            } => {
                self.state = SessionState::CardActive {
                    seconds_remaining,
                    phase: CardPhase::Settled,
                };
                true
            }
            SessionState::Idle
            | SessionState::CashActive { .. }
            | SessionState::CardActive { .. } => false,
        }
    }

    /// Advances the card countdown by one second. Reaching zero closes the
    /// session.
    pub fn tick(&mut self) -> TickOutcome {
        match self.state {
            SessionState::CardActive {
                seconds_remaining,
                phase: CardPhase::Awaiting,
            } => match seconds_remaining.saturating_sub(1) {
                0 => {
                    self.state = SessionState::Idle;
                    TickOutcome::Expired
                }
                remaining => {
                    self.state = SessionState::CardActive {
                        seconds_remaining: remaining,
                        phase: CardPhase::Awaiting,
                    };
                    TickOutcome::Running(remaining)
                }
            },
            SessionState::Idle
            | SessionState::CashActive { .. }
            | SessionState::CardActive { .. } => TickOutcome::Inactive,
        }
    }

    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
    }
}
