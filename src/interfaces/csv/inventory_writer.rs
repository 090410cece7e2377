use crate::domain::drink::Drink;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct InventoryRecord<'a> {
    name: &'a str,
    price: u64,
    stock: u32,
}

/// Writes the final inventory as `name,price,stock` rows.
pub struct InventoryWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> InventoryWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_drinks(&mut self, drinks: &[Drink]) -> Result<()> {
        for drink in drinks {
            self.writer.serialize(InventoryRecord {
                name: &drink.name,
                price: drink.price.value(),
                stock: drink.stock,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
