//! API request and response models.

use curfew_core::{
    Behavior, CartLine, Category, Notice, ProductId, RestrictionWindow, TimeOfDay, WarningBlock,
};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_quantity() -> u32 {
    1
}

/// Response body for GET /api/status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Whether the feature is active after validation.
    pub enabled: bool,
    /// Whether restricted products are blocked at `current_time`.
    pub restricted_now: bool,
    pub current_time: TimeOfDay,
    /// Absent when the stored settings are invalid.
    pub window: Option<RestrictionWindow>,
    pub restricted_categories: Vec<String>,
    pub behaviors: Vec<Behavior>,
}

/// Response body for GET /api/categories.
#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

/// Request body for POST /api/purchasable.
#[derive(Debug, Deserialize)]
pub struct PurchasableRequest {
    pub product_id: ProductId,
    /// The storefront's own answer before restrictions apply.
    #[serde(default = "default_true")]
    pub is_purchasable: bool,
}

/// Response body for POST /api/purchasable.
#[derive(Debug, Serialize)]
pub struct PurchasableResponse {
    pub purchasable: bool,
}

/// Request body for POST /api/cart/add.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Result of the storefront's earlier validators.
    #[serde(default = "default_true")]
    pub passed: bool,
}

/// Response body for POST /api/cart/add.
#[derive(Debug, Serialize)]
pub struct AddToCartResponse {
    pub passed: bool,
    pub notices: Vec<Notice>,
}

/// Request body for POST /api/cart/check.
#[derive(Debug, Deserialize)]
pub struct CartCheckRequest {
    pub lines: Vec<CartLine>,
}

/// Response body for POST /api/cart/check.
#[derive(Debug, Serialize)]
pub struct CartCheckResponse {
    /// Lines left in the cart.
    pub lines: Vec<CartLine>,
    /// Keys of the lines that were removed.
    pub removed: Vec<String>,
    pub notices: Vec<Notice>,
}

/// Response body for the warning endpoints.
#[derive(Debug, Default, Serialize)]
pub struct WarningResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl From<Option<WarningBlock>> for WarningResponse {
    fn from(block: Option<WarningBlock>) -> Self {
        match block {
            Some(block) => Self {
                message: Some(block.message),
                html: Some(block.html),
            },
            None => Self::default(),
        }
    }
}
