//! Anonymous cart persistence in the device-local store.
//!
//! The value under [`CART_KEY`] is a versioned envelope:
//!
//! ```json
//! {"version": 1, "items": [{"product": {"id": "rice", "kind": "standard"}, ...}]}
//! ```
//!
//! Older clients wrote a bare JSON array of camelCase rows; those are migrated
//! on read and rewritten in the current shape on the next save.

use crate::domain::cart::{Cart, LineItem};
use crate::domain::money::Money;
use crate::domain::ports::LocalStore;
use crate::domain::product::{CatalogKind, ProductRef};
use crate::error::{CartError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CART_KEY: &str = "cart";
pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    items: Vec<LineItem>,
}

/// Row layout written before the envelope existed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRow {
    #[serde(alias = "productRef", alias = "_id")]
    product_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    unit: String,
    quantity: i64,
    #[serde(alias = "unitPrice")]
    price: Money,
    #[serde(default)]
    is_waste_item: bool,
}

impl From<LegacyRow> for LineItem {
    fn from(row: LegacyRow) -> Self {
        let kind = if row.is_waste_item {
            CatalogKind::Waste
        } else {
            CatalogKind::Standard
        };
        LineItem {
            product: ProductRef {
                id: row.product_id,
                kind,
            },
            name: row.name,
            unit: row.unit,
            quantity: u32::try_from(row.quantity.max(1)).unwrap_or(u32::MAX),
            unit_price: row.price,
        }
    }
}

pub fn encode(cart: &Cart) -> Result<String> {
    let envelope = Envelope {
        version: CURRENT_VERSION,
        items: cart.items().to_vec(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Parses any known layout. Unknown versions are an error, never a guess.
pub fn decode(raw: &str) -> Result<Cart> {
    let value: Value = serde_json::from_str(raw)?;
    match value {
        Value::Array(_) => {
            let rows: Vec<LegacyRow> = serde_json::from_value(value)?;
            Ok(Cart::from_items(rows.into_iter().map(LineItem::from)))
        }
        Value::Object(ref fields) => match fields.get("version").and_then(Value::as_u64) {
            Some(1) => {
                let envelope: Envelope = serde_json::from_value(value)?;
                Ok(Cart::from_items(envelope.items))
            }
            Some(other) => Err(CartError::StorageError(format!(
                "unsupported local cart version {other}"
            ))),
            None => Err(CartError::StorageError(
                "local cart envelope has no version".to_string(),
            )),
        },
        _ => Err(CartError::StorageError(
            "local cart is neither an array nor an envelope".to_string(),
        )),
    }
}

/// Reads the local cart. Unreadable data is logged and treated as empty.
pub async fn load(store: &dyn LocalStore) -> Result<Cart> {
    let Some(raw) = store.get(CART_KEY).await? else {
        return Ok(Cart::new());
    };
    match decode(&raw) {
        Ok(cart) => Ok(cart),
        Err(error) => {
            tracing::warn!(error = %error, "Discarding unreadable local cart");
            Ok(Cart::new())
        }
    }
}

pub async fn save(store: &dyn LocalStore, cart: &Cart) -> Result<()> {
    store.set(CART_KEY, encode(cart)?).await
}

pub async fn clear(store: &dyn LocalStore) -> Result<()> {
    store.remove(CART_KEY).await
}
