//! High-level database interface.

use std::path::PathBuf;

use curfew_core::config::keys;
use curfew_core::{Catalog, Category, LookupError, ProductId, RestrictionConfig, SettingsSource};
use directories::ProjectDirs;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{Result, StorageError};
use crate::models::Setting;
use crate::pool::ConnectionPool;
use crate::repository::{CategoriesRepo, SettingsRepo};

/// High-level database interface for Curfew.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "curfew", "curfew")
            .ok_or_else(|| {
                StorageError::Config("Could not determine app data directory".into())
            })?;

        Ok(proj_dirs.data_dir().join("curfew.db"))
    }

    // === Settings ===

    /// Get a setting.
    pub fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        let conn = self.pool.get()?;
        SettingsRepo::get(&conn, key)
    }

    /// Set a setting.
    pub fn set_setting(&self, key: &str, value: &Value) -> Result<()> {
        let conn = self.pool.get()?;
        SettingsRepo::set(&conn, key, value)
    }

    /// Remove a setting so its default applies again.
    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        SettingsRepo::delete(&conn, key)
    }

    /// Get every stored setting.
    pub fn get_all_settings(&self) -> Result<Vec<Setting>> {
        let conn = self.pool.get()?;
        SettingsRepo::get_all(&conn)
    }

    /// Read the restriction configuration, with defaults for unset keys.
    pub fn load_restriction_config(&self) -> Result<RestrictionConfig> {
        RestrictionConfig::load(self)
    }

    /// Store every field of `config` under its settings key.
    pub fn save_restriction_config(&self, config: &RestrictionConfig) -> Result<()> {
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        let flag = |b: bool| json!(if b { "yes" } else { "no" });

        SettingsRepo::set(&tx, keys::ENABLED, &flag(config.enabled))?;
        SettingsRepo::set(&tx, keys::RESTRICTION_START, &json!(config.restriction_start))?;
        SettingsRepo::set(&tx, keys::RESTRICTION_END, &json!(config.restriction_end))?;
        SettingsRepo::set(&tx, keys::CATEGORY, &json!(config.restricted_categories))?;
        SettingsRepo::set(&tx, keys::WARNING, &json!(config.warning_template))?;
        SettingsRepo::set(&tx, keys::WARN_PRODUCT, &flag(config.warn_on_product))?;
        SettingsRepo::set(&tx, keys::WARN_CATEGORY, &flag(config.warn_on_category))?;
        SettingsRepo::set(&tx, keys::STRIP_CART, &flag(config.strip_cart_items))?;
        tx.commit()?;

        info!("Saved restriction settings");
        Ok(())
    }

    // === Catalog ===

    /// Insert or rename a category.
    pub fn upsert_category(&self, category: &Category) -> Result<()> {
        let conn = self.pool.get()?;
        CategoriesRepo::upsert(&conn, category)
    }

    /// Delete a category and its assignments.
    pub fn delete_category(&self, slug: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        CategoriesRepo::delete(&conn, slug)
    }

    /// Replace a product's categories.
    pub fn assign_product(&self, product_id: ProductId, slugs: &[String]) -> Result<()> {
        let conn = self.pool.get()?;
        CategoriesRepo::assign_product(&conn, product_id, slugs)
    }

    /// Get a category by slug.
    pub fn get_category(&self, slug: &str) -> Result<Option<Category>> {
        let conn = self.pool.get()?;
        CategoriesRepo::get(&conn, slug)
    }

    /// Get all categories.
    pub fn get_all_categories(&self) -> Result<Vec<Category>> {
        let conn = self.pool.get()?;
        CategoriesRepo::get_all(&conn)
    }

    /// Get a product's categories in order.
    pub fn get_product_categories(&self, product_id: ProductId) -> Result<Vec<Category>> {
        let conn = self.pool.get()?;
        CategoriesRepo::get_for_product(&conn, product_id)
    }
}

impl SettingsSource for Database {
    type Error = StorageError;

    fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        Ok(Database::get_setting(self, key)?.map(|s| s.value))
    }
}

impl Catalog for Database {
    fn categories_for_product(
        &self,
        product_id: ProductId,
    ) -> std::result::Result<Vec<Category>, LookupError> {
        Ok(self.get_product_categories(product_id)?)
    }

    fn category_by_slug(&self, slug: &str) -> std::result::Result<Option<Category>, LookupError> {
        Ok(self.get_category(slug)?)
    }

    fn all_categories(&self) -> std::result::Result<Vec<Category>, LookupError> {
        Ok(self.get_all_categories()?)
    }
}
