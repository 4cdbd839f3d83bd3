//! Restriction configuration and settings loading.
//!
//! A [`RestrictionConfig`] is read once from a [`SettingsSource`] and never
//! mutated afterwards; picking up new settings means building a new one.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::time_window::{RestrictionWindow, TimeOfDay};

/// Prefix shared by every settings key.
pub const SETTINGS_PREFIX: &str = "curfew_";

/// Settings keys read by [`RestrictionConfig::load`].
pub mod keys {
    pub const ENABLED: &str = "curfew_enabled";
    pub const RESTRICTION_START: &str = "curfew_restriction_start";
    pub const RESTRICTION_END: &str = "curfew_restriction_end";
    pub const CATEGORY: &str = "curfew_category";
    pub const WARNING: &str = "curfew_warning";
    pub const WARN_PRODUCT: &str = "curfew_warn_product";
    pub const WARN_CATEGORY: &str = "curfew_warn_category";
    pub const STRIP_CART: &str = "curfew_strip_cart";

    /// Every key, in settings-page order.
    pub const ALL: [&str; 8] = [
        ENABLED,
        RESTRICTION_START,
        RESTRICTION_END,
        CATEGORY,
        WARNING,
        WARN_PRODUCT,
        WARN_CATEGORY,
        STRIP_CART,
    ];
}

pub const DEFAULT_RESTRICTION_START: &str = "22:00";
pub const DEFAULT_RESTRICTION_END: &str = "09:00";
pub const DEFAULT_WARNING_TEMPLATE: &str =
    "The sale of products in the \"%1$s\" category is prohibited from %2$s to %3$s.";

/// Key-value settings storage owned by the host.
pub trait SettingsSource {
    type Error: std::error::Error;

    /// Returns the stored value for `key`, or `None` if it was never set.
    fn get_setting(&self, key: &str) -> Result<Option<Value>, Self::Error>;
}

/// Everything that drives restriction decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionConfig {
    /// Master switch. Forced off when validation fails.
    pub enabled: bool,
    /// Start of the window as entered, e.g. "22:00".
    pub restriction_start: String,
    /// End of the window as entered, e.g. "09:00".
    pub restriction_end: String,
    /// Category slugs subject to the restriction.
    pub restricted_categories: BTreeSet<String>,
    /// Warning message with `%1$s` (category), `%2$s` (start), `%3$s` (end).
    pub warning_template: String,
    /// Show the warning on product pages.
    pub warn_on_product: bool,
    /// Show the warning on category archive pages.
    pub warn_on_category: bool,
    /// Remove restricted lines from carts during cart checks.
    pub strip_cart_items: bool,
}

impl Default for RestrictionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            restriction_start: DEFAULT_RESTRICTION_START.to_string(),
            restriction_end: DEFAULT_RESTRICTION_END.to_string(),
            restricted_categories: BTreeSet::new(),
            warning_template: DEFAULT_WARNING_TEMPLATE.to_string(),
            warn_on_product: true,
            warn_on_category: true,
            strip_cart_items: false,
        }
    }
}

impl RestrictionConfig {
    /// Reads every setting, applying per-key defaults for missing or
    /// mistyped values.
    pub fn load<S: SettingsSource>(source: &S) -> Result<Self, S::Error> {
        let defaults = Self::default();

        let enabled = source
            .get_setting(keys::ENABLED)?
            .and_then(|v| value_to_bool(&v))
            .unwrap_or(defaults.enabled);
        let restriction_start = source
            .get_setting(keys::RESTRICTION_START)?
            .and_then(|v| value_to_string(&v))
            .unwrap_or(defaults.restriction_start);
        let restriction_end = source
            .get_setting(keys::RESTRICTION_END)?
            .and_then(|v| value_to_string(&v))
            .unwrap_or(defaults.restriction_end);
        let restricted_categories = source
            .get_setting(keys::CATEGORY)?
            .map(|v| value_to_slugs(&v))
            .unwrap_or(defaults.restricted_categories);
        let warning_template = source
            .get_setting(keys::WARNING)?
            .and_then(|v| value_to_string(&v))
            .unwrap_or(defaults.warning_template);
        let warn_on_product = source
            .get_setting(keys::WARN_PRODUCT)?
            .and_then(|v| value_to_bool(&v))
            .unwrap_or(defaults.warn_on_product);
        let warn_on_category = source
            .get_setting(keys::WARN_CATEGORY)?
            .and_then(|v| value_to_bool(&v))
            .unwrap_or(defaults.warn_on_category);
        let strip_cart_items = source
            .get_setting(keys::STRIP_CART)?
            .and_then(|v| value_to_bool(&v))
            .unwrap_or(defaults.strip_cart_items);

        let config = Self {
            enabled,
            restriction_start,
            restriction_end,
            restricted_categories,
            warning_template,
            warn_on_product,
            warn_on_category,
            strip_cart_items,
        };
        debug!(
            enabled = config.enabled,
            start = %config.restriction_start,
            end = %config.restriction_end,
            categories = config.restricted_categories.len(),
            "Loaded restriction settings"
        );
        Ok(config)
    }

    /// Checks the configuration and returns the parsed window.
    pub fn validate(&self) -> Result<RestrictionWindow, ConfigError> {
        if self.restricted_categories.is_empty() {
            return Err(ConfigError::NoRestrictedCategories);
        }
        if self.restriction_start.trim().is_empty() {
            return Err(ConfigError::MissingTime("start"));
        }
        if self.restriction_end.trim().is_empty() {
            return Err(ConfigError::MissingTime("end"));
        }

        let start: TimeOfDay = self.restriction_start.parse()?;
        let end: TimeOfDay = self.restriction_end.parse()?;
        if start == end {
            return Err(ConfigError::EmptyWindow(start.to_string()));
        }

        Ok(RestrictionWindow::new(start, end))
    }

    /// Returns false when the configuration cannot drive restrictions.
    pub fn validate_settings(&self) -> bool {
        self.validate().is_ok()
    }

    /// Validates and returns the window, switching the feature off on failure.
    pub fn into_effective(mut self) -> (Self, Option<RestrictionWindow>) {
        match self.validate() {
            Ok(window) => (self, Some(window)),
            Err(e) => {
                if self.enabled {
                    warn!(error = %e, "Restriction settings invalid, disabling restrictions");
                }
                self.enabled = false;
                (self, None)
            }
        }
    }

    /// Exact, case-sensitive membership test.
    pub fn is_restricted_category(&self, slug: &str) -> bool {
        self.restricted_categories.contains(slug)
    }
}

/// Interprets a stored flag the way the settings page writes it.
///
/// Accepts JSON booleans, 0/1, and the strings yes/no, true/false, on/off, 1/0.
pub fn value_to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "on" | "1" => Some(true),
            "no" | "false" | "off" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A category list may be stored as an array or a single slug.
fn value_to_slugs(value: &Value) -> BTreeSet<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .filter(|slug| !slug.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(s) if !s.is_empty() => BTreeSet::from([s.clone()]),
        _ => BTreeSet::new(),
    }
}
