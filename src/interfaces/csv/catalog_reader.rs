use crate::domain::drink::Drink;
use crate::error::{Result, VendingError};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct CatalogRecord {
    name: String,
    price: u64,
    stock: u32,
    #[serde(default)]
    image: String,
}

/// Loads a drink catalog from CSV with a `name, price, stock, image` header.
///
/// Unlike the event script, a catalog is all-or-nothing: the first bad row
/// fails the whole load.
pub fn read_catalog<R: Read>(source: R) -> Result<Vec<Drink>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source);
    let drinks = reader
        .deserialize()
        .map(|row| {
            let record: CatalogRecord = row?;
            Drink::new(record.name, record.price, record.stock, record.image)
        })
        .collect::<Result<Vec<_>>>()?;
    if drinks.is_empty() {
        return Err(VendingError::InvalidCatalog(
            "catalog has no drinks".to_string(),
        ));
    }
    Ok(drinks)
}
