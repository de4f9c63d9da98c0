//! Read-only product and style fixtures
//!
//! Lookups never fail: a missing product resolves to a fallback record so
//! prompts can always be built.

mod memory;
mod records;

pub use memory::{InMemoryFixtureStore, InMemoryFixtureStoreBuilder};
pub use records::{ProductRecord, SalesPitch, FALLBACK_PRODUCT_DETAILS};

/// Read-only lookup of catalog data and brand text.
pub trait FixtureStore: Send + Sync {
    /// Product from the main catalog
    fn find_product(&self, id: u32) -> Option<ProductRecord>;

    /// Whole catalog, in catalog order
    fn products(&self) -> Vec<ProductRecord>;

    /// Sales pitch entry for a product
    fn sales_pitch(&self, id: u32) -> Option<SalesPitch>;

    /// All sales pitch entries, in catalog order
    fn sales_pitches(&self) -> Vec<SalesPitch>;

    /// Brand voice / style guide text; empty when absent
    fn style_guide(&self) -> String;

    /// "About us" text; empty when absent
    fn company_info(&self) -> String;

    /// Warranty and repair policy text; empty when absent
    fn warranty_info(&self) -> String;

    /// Resolve a product: main catalog first, then the sales-pitch
    /// catalog, then a fallback record.
    fn product(&self, id: u32) -> ProductRecord {
        if let Some(product) = self.find_product(id) {
            return product;
        }
        if let Some(pitch) = self.sales_pitch(id) {
            tracing::debug!(product_id = id, "product resolved from sales pitch catalog");
            return ProductRecord::from_pitch(&pitch);
        }
        tracing::warn!(product_id = id, "product not found, using fallback record");
        ProductRecord::fallback(id)
    }

    /// Up to `limit` pitches, skipping `exclude`
    fn example_pitches(&self, limit: usize, exclude: Option<u32>) -> Vec<SalesPitch> {
        self.sales_pitches()
            .into_iter()
            .filter(|p| Some(p.product_id) != exclude)
            .take(limit)
            .collect()
    }
}
