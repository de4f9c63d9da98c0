//! Vector-backed fixture store with a builder

use super::{FixtureStore, ProductRecord, SalesPitch};

/// Fixture store backed by vectors held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFixtureStore {
    products: Vec<ProductRecord>,
    pitches: Vec<SalesPitch>,
    style_guide: String,
    company_info: String,
    warranty_info: String,
}

impl InMemoryFixtureStore {
    pub fn builder() -> InMemoryFixtureStoreBuilder {
        InMemoryFixtureStoreBuilder::default()
    }
}

impl FixtureStore for InMemoryFixtureStore {
    fn find_product(&self, id: u32) -> Option<ProductRecord> {
        self.products.iter().find(|p| p.id == id).cloned()
    }

    fn products(&self) -> Vec<ProductRecord> {
        self.products.clone()
    }

    fn sales_pitch(&self, id: u32) -> Option<SalesPitch> {
        self.pitches.iter().find(|p| p.product_id == id).cloned()
    }

    fn sales_pitches(&self) -> Vec<SalesPitch> {
        self.pitches.clone()
    }

    fn style_guide(&self) -> String {
        self.style_guide.clone()
    }

    fn company_info(&self) -> String {
        self.company_info.clone()
    }

    fn warranty_info(&self) -> String {
        self.warranty_info.clone()
    }
}

/// Builder for [`InMemoryFixtureStore`]
#[derive(Debug, Default)]
pub struct InMemoryFixtureStoreBuilder {
    store: InMemoryFixtureStore,
}

impl InMemoryFixtureStoreBuilder {
    pub fn product(mut self, product: ProductRecord) -> Self {
        self.store.products.push(product);
        self
    }

    pub fn products(mut self, products: impl IntoIterator<Item = ProductRecord>) -> Self {
        self.store.products.extend(products);
        self
    }

    pub fn sales_pitch(mut self, pitch: SalesPitch) -> Self {
        self.store.pitches.push(pitch);
        self
    }

    pub fn style_guide(mut self, text: impl Into<String>) -> Self {
        self.store.style_guide = text.into();
        self
    }

    pub fn company_info(mut self, text: impl Into<String>) -> Self {
        self.store.company_info = text.into();
        self
    }

    pub fn warranty_info(mut self, text: impl Into<String>) -> Self {
        self.store.warranty_info = text.into();
        self
    }

    pub fn build(self) -> InMemoryFixtureStore {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FALLBACK_PRODUCT_DETAILS;

    fn pitch(id: u32, name: &str) -> SalesPitch {
        SalesPitch {
            product_id: id,
            product_name: name.to_string(),
            sales_pitch: format!("{} is great.", name),
        }
    }

    fn store() -> InMemoryFixtureStore {
        InMemoryFixtureStore::builder()
            .product(ProductRecord::new(1, "Vent Hoodie").with_price("$89"))
            .sales_pitch(pitch(1, "Vent Hoodie"))
            .sales_pitch(pitch(7, "Trail Cap"))
            .sales_pitch(pitch(8, "Camp Shorts"))
            .style_guide("Talk like a friend on the trail.")
            .build()
    }

    #[test]
    fn test_product_prefers_main_catalog() {
        let product = store().product(1);
        assert_eq!(product.price, "$89");
    }

    #[test]
    fn test_product_falls_back_to_pitch_catalog() {
        let product = store().product(7);
        assert_eq!(product.name, "Trail Cap");
        assert_eq!(product.other_details, FALLBACK_PRODUCT_DETAILS);
    }

    #[test]
    fn test_unknown_product_never_fails() {
        let product = store().product(999);
        assert_eq!(product.name, "Product 999");
        assert!(store().find_product(999).is_none());
    }

    #[test]
    fn test_example_pitches() {
        let examples = store().example_pitches(2, Some(1));
        let ids: Vec<u32> = examples.iter().map(|p| p.product_id).collect();
        assert_eq!(ids, vec![7, 8]);

        assert_eq!(store().example_pitches(10, None).len(), 3);
    }

    #[test]
    fn test_missing_text_is_empty() {
        let store = store();
        assert_eq!(store.style_guide(), "Talk like a friend on the trail.");
        assert!(store.company_info().is_empty());
        assert!(store.warranty_info().is_empty());
    }
}
