use super::money::Money;
use super::product::{ProductRef, ProductSnapshot};
use serde::{Deserialize, Serialize};

/// One product row in a cart.
///
/// `unit_price` is captured when the product is added and is never refreshed
/// from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: ProductRef,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl LineItem {
    pub fn from_snapshot(snapshot: &ProductSnapshot, quantity: u32) -> Self {
        Self {
            product: snapshot.product.clone(),
            name: snapshot.name.clone(),
            unit: snapshot.unit.clone(),
            quantity: quantity.max(1),
            unit_price: snapshot.price,
        }
    }

    pub fn is_waste_item(&self) -> bool {
        self.product.is_waste()
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Ordered collection of line items, at most one row per `ProductRef`.
///
/// There is deliberately no cached total: `total()` always sums the rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cart from raw rows, folding duplicates and clamping quantities.
    pub fn from_items(items: impl IntoIterator<Item = LineItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            cart.insert_or_increment(item);
        }
        cart
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    pub fn get(&self, product: &ProductRef) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.product == product)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Adds `quantity` units of a product, incrementing an existing row.
    pub fn add(&mut self, snapshot: &ProductSnapshot, quantity: u32) -> &LineItem {
        let index = self.insert_or_increment(LineItem::from_snapshot(snapshot, quantity));
        &self.items[index]
    }

    fn insert_or_increment(&mut self, mut item: LineItem) -> usize {
        item.quantity = item.quantity.max(1);
        match self.items.iter().position(|row| row.product == item.product) {
            Some(index) => {
                let row = &mut self.items[index];
                row.quantity = row.quantity.saturating_add(item.quantity);
                index
            }
            None => {
                self.items.push(item);
                self.items.len() - 1
            }
        }
    }

    /// Sets a row's quantity, clamped to at least 1. Returns the stored quantity,
    /// or `None` when the product is not in the cart.
    pub fn set_quantity(&mut self, product: &ProductRef, quantity: i64) -> Option<u32> {
        let clamped = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
        let row = self.items.iter_mut().find(|row| &row.product == product)?;
        row.quantity = clamped;
        Some(clamped)
    }

    /// Removes a row. Removing an absent product is a no-op.
    pub fn remove(&mut self, product: &ProductRef) -> Option<LineItem> {
        let index = self.items.iter().position(|row| &row.product == product)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn total(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Number of units across all rows, as shown on the cart badge.
    pub fn count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }

    pub fn view(&self) -> CartView {
        CartView::of(self, None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineView {
    pub product: ProductRef,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Badge shown next to the cart icon, plus an optional toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartBadge {
    pub count: u32,
    pub message: Option<String>,
}

/// Everything the presentation layer needs to render a cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartView {
    pub lines: Vec<LineView>,
    pub total: Money,
    pub badge: CartBadge,
}

impl CartView {
    pub fn of(cart: &Cart, message: Option<String>) -> Self {
        let lines = cart
            .items()
            .iter()
            .map(|item| LineView {
                product: item.product.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total(),
            })
            .collect();
        Self {
            lines,
            total: cart.total(),
            badge: CartBadge {
                count: cart.count(),
                message,
            },
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.badge.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::CatalogKind;
    use rust_decimal_macros::dec;

    fn snapshot(id: &str, kind: CatalogKind, price: rust_decimal::Decimal) -> ProductSnapshot {
        ProductSnapshot {
            product: ProductRef {
                id: id.to_string(),
                kind,
            },
            name: id.to_uppercase(),
            price: Money::new(price),
            unit: "kg".to_string(),
            stock: 100,
            image: None,
        }
    }

    #[test]
    fn test_add_existing_product_increments() {
        let mut cart = Cart::new();
        let rice = snapshot("rice", CatalogKind::Standard, dec!(80));
        cart.add(&rice, 2);
        cart.add(&rice, 3);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(&rice.product).unwrap().quantity, 5);
    }

    #[test]
    fn test_standard_and_waste_rows_never_merge() {
        let mut cart = Cart::new();
        cart.add(&snapshot("husk", CatalogKind::Standard, dec!(10)), 1);
        cart.add(&snapshot("husk", CatalogKind::Waste, dec!(2)), 1);
        cart.add(&snapshot("husk", CatalogKind::Waste, dec!(2)), 1);

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.get(&ProductRef::waste("husk")).unwrap().quantity, 2);
        assert_eq!(cart.get(&ProductRef::standard("husk")).unwrap().quantity, 1);
    }

    #[test]
    fn test_total_is_sum_of_lines() {
        let mut cart = Cart::new();
        cart.add(&snapshot("rice", CatalogKind::Standard, dec!(80)), 2);
        cart.add(&snapshot("straw", CatalogKind::Waste, dec!(12.5)), 4);
        assert_eq!(cart.total(), Money::new(dec!(210)));

        cart.set_quantity(&ProductRef::standard("rice"), 1);
        assert_eq!(cart.total(), Money::new(dec!(130)));
        assert_eq!(cart.view().total, cart.total());
    }

    #[test]
    fn test_set_quantity_clamps_to_one() {
        let mut cart = Cart::new();
        let rice = snapshot("rice", CatalogKind::Standard, dec!(80));
        cart.add(&rice, 4);

        assert_eq!(cart.set_quantity(&rice.product, 0), Some(1));
        assert_eq!(cart.get(&rice.product).unwrap().quantity, 1);

        cart.set_quantity(&rice.product, 3);
        assert_eq!(cart.set_quantity(&rice.product, -5), Some(1));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_set_quantity_on_missing_product() {
        let mut cart = Cart::new();
        assert_eq!(cart.set_quantity(&ProductRef::standard("nope"), 3), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_twice_equals_once() {
        let mut cart = Cart::new();
        let rice = snapshot("rice", CatalogKind::Standard, dec!(80));
        let wheat = snapshot("wheat", CatalogKind::Standard, dec!(40));
        cart.add(&rice, 1);
        cart.add(&wheat, 1);

        cart.remove(&rice.product);
        let once = cart.clone();
        assert!(cart.remove(&rice.product).is_none());
        assert_eq!(cart, once);
    }

    #[test]
    fn test_from_items_folds_duplicates_and_clamps() {
        let rice = snapshot("rice", CatalogKind::Standard, dec!(80));
        let mut zero = LineItem::from_snapshot(&rice, 1);
        zero.quantity = 0;
        let cart = Cart::from_items(vec![LineItem::from_snapshot(&rice, 2), zero]);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(&rice.product).unwrap().quantity, 3);
    }

    #[test]
    fn test_view_badge_counts_units() {
        let mut cart = Cart::new();
        cart.add(&snapshot("rice", CatalogKind::Standard, dec!(80)), 2);
        cart.add(&snapshot("straw", CatalogKind::Waste, dec!(5)), 3);

        let view = cart.view().with_message("Added to cart");
        assert_eq!(view.badge.count, 5);
        assert_eq!(view.badge.message.as_deref(), Some("Added to cart"));
        assert_eq!(view.lines[1].line_total, Money::new(dec!(15)));
    }
}
