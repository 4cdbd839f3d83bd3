//! Database repositories for each table.

pub mod categories;
pub mod settings;

pub use categories::CategoriesRepo;
pub use settings::SettingsRepo;
