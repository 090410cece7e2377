use super::money::Money;
use crate::error::{Result, VendingError};

/// Accepted coin values.
pub const COINS: [u64; 2] = [100, 500];
/// Accepted bill values.
pub const BILLS: [u64; 3] = [1000, 5000, 10000];

/// Amounts below this are taken to be coins when reporting a rejection.
const BILL_THRESHOLD: u64 = 1000;

/// The fixed set of coin and bill values the cash acceptor takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenominationSet {
    coins: Vec<Money>,
    bills: Vec<Money>,
}

impl Default for DenominationSet {
    fn default() -> Self {
        Self::new(COINS, BILLS)
    }
}

impl DenominationSet {
    pub fn new(
        coins: impl IntoIterator<Item = u64>,
        bills: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            coins: coins.into_iter().map(Money::new).collect(),
            bills: bills.into_iter().map(Money::new).collect(),
        }
    }

    pub fn is_coin(&self, amount: Money) -> bool {
        self.coins.contains(&amount)
    }

    pub fn is_bill(&self, amount: Money) -> bool {
        self.bills.contains(&amount)
    }

    /// Accepts `amount` or reports it as an invalid coin or bill.
    pub fn validate(&self, amount: Money) -> Result<Money> {
        if self.is_coin(amount) || self.is_bill(amount) {
            Ok(amount)
        } else {
            Err(VendingError::InvalidDenomination {
                amount,
                kind: Self::kind_of(amount),
            })
        }
    }

    /// Every accepted value, coins first.
    pub fn accepted(&self) -> impl Iterator<Item = Money> + '_ {
        self.coins.iter().chain(self.bills.iter()).copied()
    }

    fn kind_of(amount: Money) -> &'static str {
        if amount.value() < BILL_THRESHOLD {
            "coin"
        } else {
            "bill"
        }
    }
}
