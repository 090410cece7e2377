use crate::domain::money::Money;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VendingError {
    #[error("invalid {kind}: {amount}")]
    InvalidDenomination { amount: Money, kind: &'static str },
    #[error("payment method required")]
    PaymentMethodRequired,
    #[error("insufficient funds: balance {balance}, price {price}")]
    InsufficientFunds { balance: Money, price: Money },
    #[error("{drink} is out of stock")]
    OutOfStock { drink: String },
    #[error("cash cannot be inserted during a card session")]
    CardSessionActive,
    #[error("a card transaction is already in progress")]
    TransactionInProgress,
    #[error("unknown drink: {name}")]
    UnknownDrink { name: String },
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VendingError {
    /// Whether this is one of the expected, user-facing rejections that leave
    /// the machine untouched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidDenomination { .. }
                | Self::PaymentMethodRequired
                | Self::InsufficientFunds { .. }
                | Self::OutOfStock { .. }
                | Self::CardSessionActive
                | Self::TransactionInProgress
                | Self::UnknownDrink { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, VendingError>;
