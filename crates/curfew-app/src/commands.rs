//! Command implementations for the `curfew` binary.
//!
//! Every command works against an open [`Database`] and returns a report
//! that `main` prints; nothing here writes to stdout.

use std::fmt;
use std::sync::Arc;

use curfew_core::config::{keys, value_to_bool, SETTINGS_PREFIX};
use curfew_core::{
    Behavior, Category, FixedClock, HookSet, NoticeBuffer, ProductId,
    RestrictionEvaluator, RestrictionWindow, TimeOfDay, TimeParseError,
};
use curfew_storage::{Database, StorageError};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info};

/// Command errors.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("unknown setting: {0}")]
    UnknownSetting(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("invalid time: {0}")]
    InvalidTime(#[from] TimeParseError),

    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

pub type Result<T> = std::result::Result<T, CommandError>;

/// Builds the evaluator the server would use, optionally pinned to `at`.
fn evaluator(db: &Database, at: Option<TimeOfDay>) -> Result<RestrictionEvaluator> {
    let config = db.load_restriction_config()?;
    let evaluator = RestrictionEvaluator::new(config, Arc::new(db.clone()));

    Ok(match at {
        Some(time) => evaluator.with_clock(Arc::new(FixedClock(time))),
        None => evaluator,
    })
}

// === Status ===

/// Effective restriction state at one moment.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub enabled: bool,
    pub time: TimeOfDay,
    pub restricted_now: bool,
    pub window: Option<RestrictionWindow>,
    pub restricted_categories: Vec<String>,
    pub behaviors: Vec<Behavior>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "enabled:     {}", self.enabled)?;
        match self.window {
            Some(window) => writeln!(f, "window:      {window}")?,
            None => writeln!(f, "window:      (invalid settings)")?,
        }
        writeln!(f, "categories:  {}", self.restricted_categories.join(", "))?;
        writeln!(f, "behaviors:   {:?}", self.behaviors)?;
        write!(
            f,
            "at {}:    {}",
            self.time,
            if self.restricted_now {
                "restricted"
            } else {
                "selling"
            }
        )
    }
}

/// Reports whether restricted categories are blocked now (or at `at`).
pub fn status(db: &Database, at: Option<TimeOfDay>) -> Result<StatusReport> {
    let evaluator = evaluator(db, at)?;
    let time = evaluator.current_time();
    let restricted_now = !evaluator.sale_permitted_at(time);
    let restricted_categories = evaluator
        .config()
        .restricted_categories
        .iter()
        .cloned()
        .collect();
    let window = evaluator.window();
    let enabled = evaluator.is_enabled();
    let behaviors = HookSet::from_evaluator(Arc::new(evaluator)).behaviors();

    Ok(StatusReport {
        enabled,
        time,
        restricted_now,
        window,
        restricted_categories,
        behaviors,
    })
}

// === Check ===

/// Outcome of checking one product.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub product_id: ProductId,
    pub time: TimeOfDay,
    pub purchasable: bool,
    /// First restricted category the product belongs to, if any.
    pub restricted_category: Option<String>,
    pub warning: Option<String>,
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "product {} at {}: {}",
            self.product_id,
            self.time,
            if self.purchasable {
                "purchasable"
            } else {
                "blocked"
            }
        )?;
        if let Some(category) = &self.restricted_category {
            write!(f, " (restricted category: {category})")?;
        }
        if let Some(warning) = &self.warning {
            write!(f, "\n{warning}")?;
        }
        Ok(())
    }
}

/// Runs the add-to-cart validation for `product_id` without notifying.
pub fn check_product(
    db: &Database,
    product_id: ProductId,
    at: Option<TimeOfDay>,
) -> Result<CheckReport> {
    Ok(product_report(&evaluator(db, at)?, product_id))
}

/// A failed catalog lookup reports the product as unrestricted, matching
/// what the storefront would do.
fn product_report(evaluator: &RestrictionEvaluator, product_id: ProductId) -> CheckReport {
    let restricted_category = match evaluator.restricted_category_for_product(product_id) {
        Ok(slug) => slug,
        Err(e) => {
            error!(product_id, error = %e, "Category lookup failed");
            None
        }
    };

    CheckReport {
        product_id,
        time: evaluator.current_time(),
        purchasable: evaluator.validate_product(product_id, false, &NoticeBuffer::new()),
        restricted_category,
        warning: evaluator.product_warning(product_id),
    }
}

// === Settings ===

/// Accepts a key with or without the `curfew_` prefix.
fn resolve_key(key: &str) -> Result<&'static str> {
    let full = if key.starts_with(SETTINGS_PREFIX) {
        key.to_string()
    } else {
        format!("{SETTINGS_PREFIX}{key}")
    };
    keys::ALL
        .iter()
        .copied()
        .find(|k| *k == full)
        .ok_or_else(|| CommandError::UnknownSetting(key.to_string()))
}

/// Converts command-line text into the stored JSON value for `key`.
fn parse_setting(key: &'static str, raw: &str) -> Result<Value> {
    let raw = raw.trim();
    match key {
        keys::RESTRICTION_START | keys::RESTRICTION_END => {
            raw.parse::<TimeOfDay>()?;
            Ok(json!(raw))
        }
        keys::CATEGORY => {
            let slugs: Vec<&str> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            Ok(json!(slugs))
        }
        keys::WARNING => Ok(json!(raw)),
        _ => match value_to_bool(&json!(raw)) {
            Some(flag) => Ok(json!(if flag { "yes" } else { "no" })),
            None => Err(CommandError::InvalidValue {
                key,
                reason: format!("expected yes/no, got {raw:?}"),
            }),
        },
    }
}

/// Stores one setting from command-line text.
pub fn set_setting(db: &Database, key: &str, raw: &str) -> Result<Value> {
    let key = resolve_key(key)?;
    let value = parse_setting(key, raw)?;
    db.set_setting(key, &value)?;
    info!(key, value = %value, "Setting updated");
    Ok(value)
}

/// Removes a setting so its default applies again.
pub fn reset_setting(db: &Database, key: &str) -> Result<bool> {
    let key = resolve_key(key)?;
    Ok(db.delete_setting(key)?)
}

/// Stored value (or `None` for default) of every known setting.
pub fn show_settings(db: &Database) -> Result<Vec<(&'static str, Option<Value>)>> {
    let stored = db.get_all_settings()?;
    Ok(keys::ALL
        .iter()
        .map(|key| {
            let value = stored.iter().find(|s| s.key == *key).map(|s| s.value.clone());
            (*key, value)
        })
        .collect())
}

// === Catalog ===

/// Adds a category, or renames an existing one.
pub fn add_category(db: &Database, slug: &str, name: &str) -> Result<Category> {
    let category = Category::new(slug, name);
    db.upsert_category(&category)?;
    info!(slug, name, "Category saved");
    Ok(category)
}

/// Deletes a category and every product assignment to it.
pub fn remove_category(db: &Database, slug: &str) -> Result<()> {
    if !db.delete_category(slug)? {
        return Err(CommandError::UnknownCategory(slug.to_string()));
    }
    info!(slug, "Category removed");
    Ok(())
}

/// Replaces the categories of `product_id`, in the given order.
pub fn assign_product(db: &Database, product_id: ProductId, slugs: &[String]) -> Result<()> {
    for slug in slugs {
        if db.get_category(slug)?.is_none() {
            return Err(CommandError::UnknownCategory(slug.clone()));
        }
    }
    db.assign_product(product_id, slugs)?;
    info!(product_id, categories = ?slugs, "Product categories assigned");
    Ok(())
}
