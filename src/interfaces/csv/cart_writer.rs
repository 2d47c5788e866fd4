use crate::domain::cart::Cart;
use crate::error::Result;
use std::io::Write;

/// Writes a cart as CSV: one row per line item followed by a `total` row.
pub struct CartWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CartWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_cart(&mut self, cart: &Cart) -> Result<()> {
        self.writer
            .write_record(["product", "kind", "quantity", "unit_price", "line_total"])?;
        for item in cart.items() {
            self.writer.write_record([
                item.product.id.clone(),
                item.product.kind.to_string(),
                item.quantity.to_string(),
                item.unit_price.value().normalize().to_string(),
                item.line_total().value().normalize().to_string(),
            ])?;
        }
        self.writer.write_record([
            "total".to_string(),
            String::new(),
            cart.count().to_string(),
            String::new(),
            cart.total().value().normalize().to_string(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }
}
