//! Catalog record types

use serde::{Deserialize, Serialize};

/// `other_details` text used for products that are not in any catalog
pub const FALLBACK_PRODUCT_DETAILS: &str = "An outdoor product from KETL Mtn. Apparel.";

/// A catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub features: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub fabric_details: String,
    #[serde(default)]
    pub other_details: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
}

impl ProductRecord {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            features: String::new(),
            details: String::new(),
            fabric_details: String::new(),
            other_details: String::new(),
            price: String::new(),
            colors: Vec::new(),
            sizes: Vec::new(),
        }
    }

    pub fn with_features(mut self, features: impl Into<String>) -> Self {
        self.features = features.into();
        self
    }

    pub fn with_fabric_details(mut self, fabric: impl Into<String>) -> Self {
        self.fabric_details = fabric.into();
        self
    }

    pub fn with_other_details(mut self, details: impl Into<String>) -> Self {
        self.other_details = details.into();
        self
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = price.into();
        self
    }

    /// Placeholder for an id no catalog knows about
    pub fn fallback(id: u32) -> Self {
        Self::new(id, format!("Product {}", id)).with_other_details(FALLBACK_PRODUCT_DETAILS)
    }

    /// Minimal record built from a sales pitch entry
    pub fn from_pitch(pitch: &SalesPitch) -> Self {
        Self::new(pitch.product_id, pitch.product_name.clone())
            .with_other_details(FALLBACK_PRODUCT_DETAILS)
    }
}

/// An existing sales pitch for a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesPitch {
    pub product_id: u32,
    pub product_name: String,
    #[serde(default)]
    pub sales_pitch: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_record() {
        let record = ProductRecord::fallback(42);
        assert_eq!(record.name, "Product 42");
        assert_eq!(record.other_details, FALLBACK_PRODUCT_DETAILS);
        assert!(record.features.is_empty());
    }

    #[test]
    fn test_sparse_record_deserializes() {
        let record: ProductRecord =
            serde_json::from_str(r#"{"id": 3, "name": "Vent Shorts"}"#).unwrap();
        assert_eq!(record, ProductRecord::new(3, "Vent Shorts"));
    }
}
