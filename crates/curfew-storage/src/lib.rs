//! Curfew Storage - SQLite persistence layer.
//!
//! Holds the two things the storefront owns and Curfew reads:
//!
//! - Settings: key-value pairs (JSON values) that make up the restriction
//!   configuration
//! - Catalog: categories and the ordered category list of each product
//!
//! [`Database`] implements both [`curfew_core::SettingsSource`] and
//! [`curfew_core::Catalog`].
//!
//! # Example
//!
//! ```no_run
//! use curfew_core::Category;
//! use curfew_storage::Database;
//!
//! let db = Database::in_memory().unwrap();
//! db.upsert_category(&Category::new("wine", "Wine")).unwrap();
//! db.assign_product(42, &["wine".to_string()]).unwrap();
//!
//! let config = db.load_restriction_config().unwrap();
//! assert!(!config.enabled);
//! ```

mod database;
pub mod error;
pub mod models;
mod pool;
pub mod repository;
mod schema;

pub use database::Database;
pub use error::{Result, StorageError};
pub use models::Setting;
pub use pool::{ConnectionPool, PooledConnection};
