//! Tenant-scoped catalog and store settings.

use crate::error::ApiError;
use crate::rest::ErrorResponse;
use crate::scope::{BlockedResponse, TenantScope};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use storefront_core::settings::StoreSettings;
use storefront_core::types::{DailyOffer, Product};
use storefront_datastore::settings_or_default;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ProductPath {
    id: Uuid,
}

/// GET /v1/catalog/products: Every product of the store.
#[utoipa::path(
    get,
    path = "/v1/catalog/products",
    tag = "Catalog",
    responses(
        (status = 200, description = "Product list", body = Vec<Product>),
        (status = 403, description = "Storefront blocked", body = BlockedResponse),
    )
)]
pub async fn handle_products(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state.datastore.catalog.products(&scope.tenant.slug).await?;
    Ok(Json(products))
}

/// GET /v1/catalog/products/:id: A single product.
#[utoipa::path(
    get,
    path = "/v1/catalog/products/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "No such product in this store", body = ErrorResponse),
    )
)]
pub async fn handle_product(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(ProductPath { id }): Path<ProductPath>,
) -> Result<Json<Product>, ApiError> {
    state
        .datastore
        .catalog
        .product(&scope.tenant.slug, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("product_not_found", format!("product {id} not found")))
}

/// GET /v1/catalog/offers: Active daily offers.
#[utoipa::path(
    get,
    path = "/v1/catalog/offers",
    tag = "Catalog",
    responses((status = 200, description = "Active offers", body = Vec<DailyOffer>))
)]
pub async fn handle_offers(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
) -> Result<Json<Vec<DailyOffer>>, ApiError> {
    let offers = state
        .datastore
        .catalog
        .daily_offers(&scope.tenant.slug)
        .await?
        .into_iter()
        .filter(|o| o.active)
        .collect();
    Ok(Json(offers))
}

/// GET /v1/settings: Store settings with defaults filled in.
#[utoipa::path(
    get,
    path = "/v1/settings",
    tag = "Catalog",
    responses((status = 200, description = "Store settings", body = StoreSettings))
)]
pub async fn handle_settings(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
) -> Json<StoreSettings> {
    Json(settings_or_default(state.datastore.catalog.as_ref(), &scope.tenant.slug).await)
}
