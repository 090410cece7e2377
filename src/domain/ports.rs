use super::drink::Drink;
use crate::error::Result;
use async_trait::async_trait;

/// Per-drink stock keeping for a closed, pre-seeded catalog.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Looks up a drink by name.
    async fn get(&self, name: &str) -> Result<Drink>;
    /// Takes one unit out of stock and returns the updated entry. Fails with
    /// `OutOfStock`, without mutating, when nothing is left.
    async fn decrement(&self, name: &str) -> Result<Drink>;
    /// The whole catalog, in catalog order.
    async fn all_drinks(&self) -> Result<Vec<Drink>>;
}

/// Receives the status message produced by every state-affecting operation.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str);
}

pub type InventoryLedgerBox = Box<dyn InventoryLedger>;
pub type NotificationSinkBox = Box<dyn NotificationSink>;
