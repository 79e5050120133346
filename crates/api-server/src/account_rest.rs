//! Customer identification and account endpoints.

use crate::error::ApiError;
use crate::rest::ErrorResponse;
use crate::scope::{SessionId, TenantScope};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use storefront_checkout::WalletView;
use storefront_core::types::{Customer, OrderSummary, Product, ProfileUpdate};
use storefront_licensing::LicenseFeature;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Required only when the phone is not registered yet.
    #[serde(default)]
    pub name: Option<String>,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct FavoritePath {
    product_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteToggled {
    pub product_id: Uuid,
    pub favorite: bool,
}

/// POST /v1/session/login: Passwordless login-or-register by phone.
#[utoipa::path(
    post,
    path = "/v1/session/login",
    tag = "Account",
    params(("x-session-id" = String, Header, description = "Session id")),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Customer identified", body = Customer),
        (status = 422, description = "Invalid phone or missing name", body = ErrorResponse),
    )
)]
pub async fn handle_login(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Customer>, ApiError> {
    let mut session = state.load_session(&scope, &sid).await?;
    let customer = state
        .accounts
        .login(
            &scope.tenant.slug,
            &mut session,
            request.name.as_deref(),
            &request.phone,
        )
        .await?;
    state.save_session(&scope, &sid, &session).await?;
    Ok(Json(customer))
}

/// POST /v1/session/logout: Forget the customer, keep the cart.
#[utoipa::path(
    post,
    path = "/v1/session/logout",
    tag = "Account",
    params(("x-session-id" = String, Header, description = "Session id")),
    responses((status = 204, description = "Logged out"))
)]
pub async fn handle_logout(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
) -> Result<StatusCode, ApiError> {
    let mut session = state.load_session(&scope, &sid).await?;
    state.accounts.logout(&mut session);
    state.save_session(&scope, &sid, &session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /v1/session/profile: Update the identified customer's profile.
#[utoipa::path(
    patch,
    path = "/v1/session/profile",
    tag = "Account",
    params(("x-session-id" = String, Header, description = "Session id")),
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = Customer),
        (status = 422, description = "Not identified or invalid field", body = ErrorResponse),
    )
)]
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Customer>, ApiError> {
    let mut session = state.load_session(&scope, &sid).await?;
    let customer = state.accounts.update_profile(&mut session, &update).await?;
    state.save_session(&scope, &sid, &session).await?;
    Ok(Json(customer))
}

/// GET /v1/orders: Orders from the last six months.
#[utoipa::path(
    get,
    path = "/v1/orders",
    tag = "Account",
    params(("x-session-id" = String, Header, description = "Session id")),
    responses((status = 200, description = "Order history", body = Vec<OrderSummary>))
)]
pub async fn handle_orders(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    let session = state.load_session(&scope, &sid).await?;
    Ok(Json(state.accounts.order_history(&session).await?))
}

/// GET /v1/cashback: Wallet balance and ledger.
#[utoipa::path(
    get,
    path = "/v1/cashback",
    tag = "Account",
    params(("x-session-id" = String, Header, description = "Session id")),
    responses(
        (status = 200, description = "Cashback wallet", body = WalletView),
        (status = 403, description = "Cashback not licensed for this store", body = ErrorResponse),
    )
)]
pub async fn handle_cashback(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
) -> Result<Json<WalletView>, ApiError> {
    if !scope.feature_enabled(LicenseFeature::Cashback) {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "feature_disabled",
            "cashback is not available for this store",
        ));
    }
    let session = state.load_session(&scope, &sid).await?;
    Ok(Json(state.accounts.wallet(&session).await?))
}

/// GET /v1/favorites: The customer's favorite products.
#[utoipa::path(
    get,
    path = "/v1/favorites",
    tag = "Account",
    params(("x-session-id" = String, Header, description = "Session id")),
    responses((status = 200, description = "Favorite products", body = Vec<Product>))
)]
pub async fn handle_favorites(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
) -> Result<Json<Vec<Product>>, ApiError> {
    let session = state.load_session(&scope, &sid).await?;
    Ok(Json(state.accounts.favorites(&session).await?))
}

/// POST /v1/favorites/:product_id: Toggle a favorite.
#[utoipa::path(
    post,
    path = "/v1/favorites/{product_id}",
    tag = "Account",
    params(
        ("product_id" = Uuid, Path, description = "Product id"),
        ("x-session-id" = String, Header, description = "Session id"),
    ),
    responses((status = 200, description = "Favorite state after the toggle", body = FavoriteToggled))
)]
pub async fn handle_toggle_favorite(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
    Path(FavoritePath { product_id }): Path<FavoritePath>,
) -> Result<Json<FavoriteToggled>, ApiError> {
    let session = state.load_session(&scope, &sid).await?;
    let favorite = state.accounts.toggle_favorite(&session, product_id).await?;
    Ok(Json(FavoriteToggled {
        product_id,
        favorite,
    }))
}
