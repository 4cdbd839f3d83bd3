//! Storefront events and the behaviors that answer them.
//!
//! The active behaviors are chosen once, when the [`HookSet`] is built from
//! an evaluator's configuration. Every event is then passed through that
//! fixed list; an event no behavior handles returns the storefront's input
//! unchanged.
//!
//! | Behavior          | Active when                         | Events                           |
//! |-------------------|-------------------------------------|----------------------------------|
//! | `Enforcement`     | enabled                             | purchasable, add-to-cart         |
//! | `CartStripping`   | enabled and `strip_cart_items`      | cart check                       |
//! | `ProductWarning`  | enabled and `warn_on_product`       | product summary                  |
//! | `CategoryWarning` | enabled and `warn_on_category`      | archive description              |

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cart::Cart;
use crate::catalog::{Category, ProductId};
use crate::evaluator::RestrictionEvaluator;
use crate::notice::NotificationSink;

/// A behavior that can be switched on by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    Enforcement,
    CartStripping,
    ProductWarning,
    CategoryWarning,
}

/// A warning ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningBlock {
    /// Plain rendered message.
    pub message: String,
    /// Message wrapped in the storefront's markup. The message is cleaned
    /// to an allow-list of inline formatting tags first; scripts, event
    /// handlers and unknown elements are dropped.
    pub html: String,
}

impl WarningBlock {
    /// Stock-status paragraph shown in a product summary.
    pub fn product(message: String) -> Self {
        let html = format!(
            "<p class=\"stock out-of-stock\">{}</p>",
            ammonia::clean(&message)
        );
        Self { message, html }
    }

    /// Description block shown at the top of a category archive.
    pub fn category(message: String) -> Self {
        let html = format!(
            "<div class=\"term-description\">{}</div>",
            ammonia::clean(&message)
        );
        Self { message, html }
    }
}

/// Handler for storefront events. Defaults pass the input through.
pub trait Hook: Send + Sync {
    fn behavior(&self) -> Behavior;

    fn is_purchasable(&self, current: bool, _product_id: ProductId) -> bool {
        current
    }

    fn validate_add_to_cart(
        &self,
        passed: bool,
        _product_id: ProductId,
        _quantity: u32,
        _sink: &dyn NotificationSink,
    ) -> bool {
        passed
    }

    fn check_cart_items(&self, _cart: &mut Cart, _sink: &dyn NotificationSink) -> Vec<String> {
        Vec::new()
    }

    fn product_summary(&self, _product_id: ProductId) -> Option<WarningBlock> {
        None
    }

    fn archive_description(&self, _category: &Category) -> Option<WarningBlock> {
        None
    }
}

struct Enforcement(Arc<RestrictionEvaluator>);

impl Hook for Enforcement {
    fn behavior(&self) -> Behavior {
        Behavior::Enforcement
    }

    fn is_purchasable(&self, current: bool, product_id: ProductId) -> bool {
        let permitted = self.0.validate_product(product_id, false, &NoSink);
        current && permitted
    }

    fn validate_add_to_cart(
        &self,
        passed: bool,
        product_id: ProductId,
        _quantity: u32,
        sink: &dyn NotificationSink,
    ) -> bool {
        let permitted = self.0.validate_product(product_id, true, sink);
        passed && permitted
    }
}

struct CartStripping(Arc<RestrictionEvaluator>);

impl Hook for CartStripping {
    fn behavior(&self) -> Behavior {
        Behavior::CartStripping
    }

    fn check_cart_items(&self, cart: &mut Cart, sink: &dyn NotificationSink) -> Vec<String> {
        self.0.remove_restricted_lines(cart, sink)
    }
}

struct ProductWarning(Arc<RestrictionEvaluator>);

impl Hook for ProductWarning {
    fn behavior(&self) -> Behavior {
        Behavior::ProductWarning
    }

    fn product_summary(&self, product_id: ProductId) -> Option<WarningBlock> {
        self.0.product_warning(product_id).map(WarningBlock::product)
    }
}

struct CategoryWarning(Arc<RestrictionEvaluator>);

impl Hook for CategoryWarning {
    fn behavior(&self) -> Behavior {
        Behavior::CategoryWarning
    }

    fn archive_description(&self, category: &Category) -> Option<WarningBlock> {
        self.0.category_warning(category).map(WarningBlock::category)
    }
}

/// Discards notices; purchasability queries never show them.
struct NoSink;

impl NotificationSink for NoSink {
    fn notify(&self, _message: &str, _severity: crate::notice::Severity) {}
}

/// The fixed set of behaviors for one loaded configuration.
pub struct HookSet {
    evaluator: Arc<RestrictionEvaluator>,
    hooks: Vec<Box<dyn Hook>>,
}

impl HookSet {
    /// Selects behaviors from the evaluator's effective configuration.
    pub fn from_evaluator(evaluator: Arc<RestrictionEvaluator>) -> Self {
        let config = evaluator.config();
        let mut hooks: Vec<Box<dyn Hook>> = Vec::new();

        if config.enabled {
            hooks.push(Box::new(Enforcement(evaluator.clone())));
            if config.strip_cart_items {
                hooks.push(Box::new(CartStripping(evaluator.clone())));
            }
            if config.warn_on_product {
                hooks.push(Box::new(ProductWarning(evaluator.clone())));
            }
            if config.warn_on_category {
                hooks.push(Box::new(CategoryWarning(evaluator.clone())));
            }
        }

        let set = Self { evaluator, hooks };
        info!(behaviors = ?set.behaviors(), "Storefront hooks registered");
        set
    }

    /// Active behaviors in registration order.
    pub fn behaviors(&self) -> Vec<Behavior> {
        self.hooks.iter().map(|h| h.behavior()).collect()
    }

    pub fn evaluator(&self) -> &Arc<RestrictionEvaluator> {
        &self.evaluator
    }

    /// "Is this product purchasable?" Starts from the storefront's answer.
    pub fn is_purchasable(&self, current: bool, product_id: ProductId) -> bool {
        self.hooks
            .iter()
            .fold(current, |acc, hook| hook.is_purchasable(acc, product_id))
    }

    /// "May this product be added to the cart?"
    pub fn validate_add_to_cart(
        &self,
        passed: bool,
        product_id: ProductId,
        quantity: u32,
        sink: &dyn NotificationSink,
    ) -> bool {
        self.hooks.iter().fold(passed, |acc, hook| {
            hook.validate_add_to_cart(acc, product_id, quantity, sink)
        })
    }

    /// Cart check pass. Returns the keys of removed lines.
    pub fn check_cart_items(&self, cart: &mut Cart, sink: &dyn NotificationSink) -> Vec<String> {
        self.hooks
            .iter()
            .flat_map(|hook| hook.check_cart_items(cart, sink))
            .collect()
    }

    /// Warning for a product detail page.
    pub fn product_summary(&self, product_id: ProductId) -> Option<WarningBlock> {
        self.hooks
            .iter()
            .find_map(|hook| hook.product_summary(product_id))
    }

    /// Warning for a category archive page.
    pub fn archive_description(&self, category: &Category) -> Option<WarningBlock> {
        self.hooks
            .iter()
            .find_map(|hook| hook.archive_description(category))
    }
}
