use super::money::Money;
use crate::error::{Result, VendingError};
use serde::{Deserialize, Serialize};

/// A catalog entry together with its remaining stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drink {
    /// Unique name; the catalog key.
    pub name: String,
    /// Price of one unit, always positive.
    pub price: Money,
    /// Units left in the machine.
    pub stock: u32,
    /// Opaque reference to the drink's artwork, passed through to the UI.
    #[serde(rename = "image")]
    pub image_ref: String,
}

impl Drink {
    pub fn new(
        name: impl Into<String>,
        price: u64,
        stock: u32,
        image_ref: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(VendingError::InvalidCatalog(
                "drink name must not be empty".to_string(),
            ));
        }
        if price == 0 {
            return Err(VendingError::InvalidCatalog(format!(
                "price of {name} must be positive"
            )));
        }
        Ok(Self {
            name,
            price: Money::new(price),
            stock,
            image_ref: image_ref.into(),
        })
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// The catalog a freshly built machine is stocked with.
pub fn default_catalog() -> Vec<Drink> {
    vec![
        Drink {
            name: "cola".to_string(),
            price: Money::new(1100),
            stock: 5,
            image_ref: "/img/coke.png".to_string(),
        },
        Drink {
            name: "water".to_string(),
            price: Money::new(600),
            stock: 3,
            image_ref: "/img/water.png".to_string(),
        },
        Drink {
            name: "coffee".to_string(),
            price: Money::new(700),
            stock: 1,
            image_ref: "/img/coffee.png".to_string(),
        },
    ]
}
