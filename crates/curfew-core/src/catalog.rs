//! Catalog collaborator: products, categories and their membership.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// Product identifier assigned by the store.
pub type ProductId = u64;

/// A product category as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    /// Unique, case-sensitive identifier.
    pub slug: String,
    /// Human-readable name.
    pub name: String,
}

impl Category {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
        }
    }
}

/// Read access to the store's product catalog.
pub trait Catalog: Send + Sync {
    /// Categories assigned to a product, in catalog order.
    fn categories_for_product(&self, product_id: ProductId) -> Result<Vec<Category>, LookupError>;

    /// Looks up a single category.
    fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, LookupError>;

    /// Every product category, for settings pages.
    fn all_categories(&self) -> Result<Vec<Category>, LookupError>;
}

/// A catalog held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    categories: Vec<Category>,
    products: HashMap<ProductId, Vec<String>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a category, replacing any with the same slug.
    pub fn add_category(&mut self, category: Category) {
        if let Some(existing) = self.categories.iter_mut().find(|c| c.slug == category.slug) {
            *existing = category;
        } else {
            self.categories.push(category);
        }
    }

    /// Assigns a product to categories, in order.
    pub fn assign(&mut self, product_id: ProductId, slugs: &[&str]) {
        self.products
            .insert(product_id, slugs.iter().map(|s| s.to_string()).collect());
    }

    /// Builder form of [`add_category`](Self::add_category).
    pub fn with_category(mut self, slug: &str, name: &str) -> Self {
        self.add_category(Category::new(slug, name));
        self
    }

    /// Builder form of [`assign`](Self::assign).
    pub fn with_product(mut self, product_id: ProductId, slugs: &[&str]) -> Self {
        self.assign(product_id, slugs);
        self
    }
}

impl Catalog for InMemoryCatalog {
    fn categories_for_product(&self, product_id: ProductId) -> Result<Vec<Category>, LookupError> {
        let Some(slugs) = self.products.get(&product_id) else {
            return Ok(Vec::new());
        };

        Ok(slugs
            .iter()
            .map(|slug| {
                self.categories
                    .iter()
                    .find(|c| &c.slug == slug)
                    .cloned()
                    .unwrap_or_else(|| Category::new(slug.clone(), slug.clone()))
            })
            .collect())
    }

    fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, LookupError> {
        Ok(self.categories.iter().find(|c| c.slug == slug).cloned())
    }

    fn all_categories(&self) -> Result<Vec<Category>, LookupError> {
        Ok(self.categories.clone())
    }
}
