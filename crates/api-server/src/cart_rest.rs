//! Session cart endpoints. The cart lives in the session store; every mutation
//! is loaded, applied, and written back within the request.

use crate::error::ApiError;
use crate::rest::ErrorResponse;
use crate::scope::{SessionId, TenantScope};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_checkout::{Cart, CartItem};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartItem>,
    /// Total units.
    pub count: u32,
    pub subtotal: Decimal,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().to_vec(),
            count: cart.count(),
            subtotal: cart.subtotal(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    /// Signed change; reaching zero removes the line.
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct CartItemPath {
    product_id: Uuid,
}

fn not_in_cart(product_id: Uuid) -> ApiError {
    ApiError::not_found("item_not_in_cart", format!("product {product_id} is not in the cart"))
}

/// GET /v1/cart: Current cart.
#[utoipa::path(
    get,
    path = "/v1/cart",
    tag = "Cart",
    params(("x-session-id" = String, Header, description = "Session id")),
    responses((status = 200, description = "Cart contents", body = CartView))
)]
pub async fn handle_get_cart(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
) -> Result<Json<CartView>, ApiError> {
    let session = state.load_session(&scope, &sid).await?;
    Ok(Json(CartView::from(&session.cart)))
}

/// POST /v1/cart/items: Add a product, merging with an existing line.
#[utoipa::path(
    post,
    path = "/v1/cart/items",
    tag = "Cart",
    params(("x-session-id" = String, Header, description = "Session id")),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartView),
        (status = 404, description = "No such product in this store", body = ErrorResponse),
    )
)]
pub async fn handle_add_item(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    let product = state
        .datastore
        .catalog
        .product(&scope.tenant.slug, request.product_id)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(
                "product_not_found",
                format!("product {} not found", request.product_id),
            )
        })?;

    let mut session = state.load_session(&scope, &sid).await?;
    session.cart.add(product, request.quantity);
    state.save_session(&scope, &sid, &session).await?;
    Ok(Json(CartView::from(&session.cart)))
}

/// PATCH /v1/cart/items/:product_id: Change a line's quantity.
#[utoipa::path(
    patch,
    path = "/v1/cart/items/{product_id}",
    tag = "Cart",
    params(
        ("product_id" = Uuid, Path, description = "Product id"),
        ("x-session-id" = String, Header, description = "Session id"),
    ),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartView),
        (status = 404, description = "Product not in cart", body = ErrorResponse),
    )
)]
pub async fn handle_update_item(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
    Path(CartItemPath { product_id }): Path<CartItemPath>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>, ApiError> {
    let mut session = state.load_session(&scope, &sid).await?;
    if !session.cart.update_quantity(product_id, request.delta) {
        return Err(not_in_cart(product_id));
    }
    state.save_session(&scope, &sid, &session).await?;
    Ok(Json(CartView::from(&session.cart)))
}

/// DELETE /v1/cart/items/:product_id: Remove a line.
#[utoipa::path(
    delete,
    path = "/v1/cart/items/{product_id}",
    tag = "Cart",
    params(
        ("product_id" = Uuid, Path, description = "Product id"),
        ("x-session-id" = String, Header, description = "Session id"),
    ),
    responses(
        (status = 200, description = "Updated cart", body = CartView),
        (status = 404, description = "Product not in cart", body = ErrorResponse),
    )
)]
pub async fn handle_remove_item(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
    Path(CartItemPath { product_id }): Path<CartItemPath>,
) -> Result<Json<CartView>, ApiError> {
    let mut session = state.load_session(&scope, &sid).await?;
    if !session.cart.remove(product_id) {
        return Err(not_in_cart(product_id));
    }
    state.save_session(&scope, &sid, &session).await?;
    Ok(Json(CartView::from(&session.cart)))
}

/// DELETE /v1/cart: Empty the cart.
#[utoipa::path(
    delete,
    path = "/v1/cart",
    tag = "Cart",
    params(("x-session-id" = String, Header, description = "Session id")),
    responses((status = 204, description = "Cart cleared"))
)]
pub async fn handle_clear_cart(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
) -> Result<StatusCode, ApiError> {
    let mut session = state.load_session(&scope, &sid).await?;
    session.cart.clear();
    state.save_session(&scope, &sid, &session).await?;
    Ok(StatusCode::NO_CONTENT)
}
