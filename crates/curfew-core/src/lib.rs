//! Curfew Core - hour-of-day sale restrictions for product categories.
//!
//! Given a daily window and a set of restricted category slugs, this crate
//! decides whether a product (or a category archive) can be sold right now
//! and renders the warning shown to customers when it cannot.
//!
//! Collaborators the storefront provides are traits: [`catalog::Catalog`],
//! [`config::SettingsSource`], [`notice::NotificationSink`],
//! [`time_window::Clock`] and [`template::ContentFilter`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use curfew_core::{
//!     FixedClock, InMemoryCatalog, NoticeBuffer, RestrictionConfig, RestrictionEvaluator,
//! };
//!
//! let catalog = InMemoryCatalog::new()
//!     .with_category("wine", "Wine")
//!     .with_product(7, &["wine"]);
//! let config = RestrictionConfig {
//!     enabled: true,
//!     restricted_categories: ["wine".to_string()].into(),
//!     ..Default::default()
//! };
//!
//! let evaluator = RestrictionEvaluator::new(config, Arc::new(catalog))
//!     .with_clock(Arc::new(FixedClock("23:00".parse().unwrap())));
//!
//! let notices = NoticeBuffer::new();
//! assert!(!evaluator.validate_product(7, true, &notices));
//! assert_eq!(notices.len(), 1);
//! ```

pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod hooks;
pub mod notice;
pub mod template;
pub mod time_window;

pub use cart::{Cart, CartLine};
pub use catalog::{Catalog, Category, InMemoryCatalog, ProductId};
pub use config::{RestrictionConfig, SettingsSource};
pub use error::{ConfigError, CoreError, LookupError, TemplateError, TimeParseError};
pub use evaluator::RestrictionEvaluator;
pub use hooks::{Behavior, HookSet, WarningBlock};
pub use notice::{Notice, NoticeBuffer, NotificationSink, Severity};
pub use template::{format_template, ContentFilter, PassThrough, Shortcodes};
pub use time_window::{Clock, FixedClock, LocalClock, RestrictionWindow, TimeOfDay};
