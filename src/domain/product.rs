use super::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two catalogs a product lives in.
///
/// Waste products are validated and priced by different backend rules, so the
/// same id in both catalogs names two different products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    #[default]
    Standard,
    Waste,
}

impl CatalogKind {
    pub fn is_waste(&self) -> bool {
        matches!(self, CatalogKind::Waste)
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogKind::Standard => f.write_str("standard"),
            CatalogKind::Waste => f.write_str("waste"),
        }
    }
}

/// Identity of a catalog item: `(id, kind)` is the cart key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: String,
    #[serde(default)]
    pub kind: CatalogKind,
}

impl ProductRef {
    pub fn standard(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: CatalogKind::Standard,
        }
    }

    pub fn waste(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: CatalogKind::Waste,
        }
    }

    pub fn is_waste(&self) -> bool {
        self.kind.is_waste()
    }
}

impl fmt::Display for ProductRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Point-in-time catalog data for a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    #[serde(flatten)]
    pub product: ProductRef,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub unit: String,
    pub stock: u32,
    #[serde(default)]
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_id_in_both_catalogs_is_distinct() {
        assert_ne!(ProductRef::standard("p1"), ProductRef::waste("p1"));
        assert_eq!(ProductRef::waste("p1").to_string(), "waste:p1");
    }

    #[test]
    fn test_snapshot_deserializes_with_default_kind() {
        let json = r#"{"id":"rice","name":"Basmati","price":"80","unit":"kg","stock":10}"#;
        let snapshot: ProductSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.product, ProductRef::standard("rice"));
        assert_eq!(snapshot.image, None);
    }
}
