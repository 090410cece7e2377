use crate::domain::drink::Drink;
use crate::domain::ports::{InventoryLedger, NotificationSink};
use crate::error::{Result, VendingError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// An in-memory inventory ledger.
///
/// Keeps the catalog as an ordered `Vec` behind `Arc<RwLock<..>>` so the
/// display order of the catalog survives and clones share one stock count.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    drinks: Arc<RwLock<Vec<Drink>>>,
}

impl InMemoryLedger {
    /// Seeds the ledger with a catalog. Drink names must be unique.
    pub fn new(catalog: Vec<Drink>) -> Result<Self> {
        let mut seen = HashSet::new();
        for drink in &catalog {
            if !seen.insert(drink.name.as_str()) {
                return Err(VendingError::InvalidCatalog(format!(
                    "duplicate drink {}",
                    drink.name
                )));
            }
        }
        Ok(Self {
            drinks: Arc::new(RwLock::new(catalog)),
        })
    }
}

#[async_trait]
impl InventoryLedger for InMemoryLedger {
    async fn get(&self, name: &str) -> Result<Drink> {
        let drinks = self.drinks.read().await;
        drinks
            .iter()
            .find(|d| d.name == name)
            .cloned()
            .ok_or_else(|| VendingError::UnknownDrink {
                name: name.to_string(),
            })
    }

    async fn decrement(&self, name: &str) -> Result<Drink> {
        let mut drinks = self.drinks.write().await;
        let drink = drinks
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| VendingError::UnknownDrink {
                name: name.to_string(),
            })?;
        if !drink.in_stock() {
            return Err(VendingError::OutOfStock {
                drink: drink.name.clone(),
            });
        }
        drink.stock -= 1;
        Ok(drink.clone())
    }

    async fn all_drinks(&self) -> Result<Vec<Drink>> {
        let drinks = self.drinks.read().await;
        Ok(drinks.clone())
    }
}

/// A notification sink that remembers every message it was given.
///
/// Clones share the same history, so a test can keep one handle while the
/// machine owns another.
#[derive(Default, Clone)]
pub struct RecordingSink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<String> {
        self.messages
            .lock()
            .ok()
            .and_then(|m| m.last().cloned())
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
