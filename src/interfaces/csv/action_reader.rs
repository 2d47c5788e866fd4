use crate::domain::product::{CatalogKind, ProductRef};
use crate::error::{CartError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Add,
    Set,
    Remove,
    Clear,
    Login,
    Logout,
    Checkout,
    Buynow,
}

/// One recorded shopper action.
///
/// `detail` carries the login email for `login` and the payment method
/// (`cod`, `card`, `upi:<id>`, `upi-qr:<id>`) for `checkout` and `buynow`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ShopperAction {
    pub action: ActionType,
    pub product: Option<String>,
    pub kind: Option<CatalogKind>,
    pub quantity: Option<i64>,
    pub detail: Option<String>,
}

impl ShopperAction {
    pub fn product_ref(&self) -> Result<ProductRef> {
        match self.product.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(ProductRef {
                id: id.to_string(),
                kind: self.kind.unwrap_or_default(),
            }),
            _ => Err(CartError::ValidationError(format!(
                "{:?} needs a product",
                self.action
            ))),
        }
    }

    pub fn detail(&self) -> Result<&str> {
        match self.detail.as_deref().map(str::trim) {
            Some(detail) if !detail.is_empty() => Ok(detail),
            _ => Err(CartError::ValidationError(format!(
                "{:?} needs a detail value",
                self.action
            ))),
        }
    }
}

/// Reads shopper actions from a CSV source.
///
/// Whitespace is trimmed and trailing empty columns may be omitted.
pub struct ActionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ActionReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes actions; a malformed row yields an error and
    /// reading continues with the next one.
    pub fn actions(self) -> impl Iterator<Item = Result<ShopperAction>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(CartError::from))
    }
}
