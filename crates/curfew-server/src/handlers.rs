//! API route handlers.
//!
//! Each request gets its own [`NoticeBuffer`]; whatever the hooks push to it
//! is returned in the response body.

use axum::extract::{Path, State};
use axum::Json;
use tracing::{debug, error};

use curfew_core::{Cart, NoticeBuffer, ProductId};

use crate::error::{ApiError, Result};
use crate::models::{
    AddToCartRequest, AddToCartResponse, CartCheckRequest, CartCheckResponse, CategoriesResponse,
    PurchasableRequest, PurchasableResponse, StatusResponse, WarningResponse,
};
use crate::state::AppState;

/// GET /api/status - Current restriction state.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let evaluator = state.evaluator();
    let config = evaluator.config();

    Json(StatusResponse {
        enabled: evaluator.is_enabled(),
        restricted_now: !evaluator.sale_permitted_now(),
        current_time: evaluator.current_time(),
        window: evaluator.window(),
        restricted_categories: config.restricted_categories.iter().cloned().collect(),
        behaviors: state.hooks.behaviors(),
    })
}

/// GET /api/categories - All catalog categories.
pub async fn get_categories(State(state): State<AppState>) -> Result<Json<CategoriesResponse>> {
    let categories = state.db.get_all_categories()?;
    Ok(Json(CategoriesResponse { categories }))
}

/// POST /api/purchasable - Combine the storefront's answer with the restriction.
pub async fn check_purchasable(
    State(state): State<AppState>,
    Json(req): Json<PurchasableRequest>,
) -> Json<PurchasableResponse> {
    let purchasable = state
        .hooks
        .is_purchasable(req.is_purchasable, req.product_id);
    debug!(product_id = req.product_id, purchasable, "Purchasable check");

    Json(PurchasableResponse { purchasable })
}

/// POST /api/cart/add - Validate an add-to-cart request.
pub async fn validate_add_to_cart(
    State(state): State<AppState>,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<AddToCartResponse>> {
    if req.quantity == 0 {
        return Err(ApiError::BadRequest("quantity must be at least 1".into()));
    }

    let notices = NoticeBuffer::new();
    let passed = state
        .hooks
        .validate_add_to_cart(req.passed, req.product_id, req.quantity, &notices);
    debug!(product_id = req.product_id, passed, "Add-to-cart check");

    Ok(Json(AddToCartResponse {
        passed,
        notices: notices.take(),
    }))
}

/// POST /api/cart/check - Strip restricted lines from a cart.
pub async fn check_cart(
    State(state): State<AppState>,
    Json(req): Json<CartCheckRequest>,
) -> Json<CartCheckResponse> {
    let mut cart = Cart::new(req.lines);
    let notices = NoticeBuffer::new();
    let removed = state.hooks.check_cart_items(&mut cart, &notices);

    Json(CartCheckResponse {
        lines: cart.lines,
        removed,
        notices: notices.take(),
    })
}

/// GET /api/products/{id}/warning - Warning for a product page.
pub async fn get_product_warning(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Json<WarningResponse> {
    Json(state.hooks.product_summary(product_id).into())
}

/// GET /api/categories/{slug}/warning - Warning for a category archive.
pub async fn get_category_warning(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<WarningResponse>> {
    let category = match state.evaluator().catalog().category_by_slug(&slug) {
        Ok(Some(category)) => category,
        Ok(None) => return Err(ApiError::NotFound(format!("category {slug}"))),
        Err(e) => {
            error!(
                category_slug = %slug,
                error = %e,
                "Category lookup failed, showing no warning"
            );
            return Ok(Json(WarningResponse::default()));
        }
    };

    Ok(Json(state.hooks.archive_description(&category).into()))
}
