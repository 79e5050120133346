//! Pricing quotes and order submission.

use crate::error::ApiError;
use crate::rest::ErrorResponse;
use crate::scope::{SessionId, TenantScope};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use storefront_checkout::{CheckoutRequest, OrderReceipt, PricingBreakdown};
use storefront_core::types::DeliveryMethod;
use storefront_datastore::settings_or_default;
use storefront_licensing::LicenseFeature;
use tracing::{debug, warn};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuoteRequest {
    pub delivery_method: DeliveryMethod,
    #[serde(default)]
    pub apply_cashback: bool,
}

/// Cashback is only redeemable where the license enables it.
fn cashback_allowed(scope: &TenantScope, requested: bool) -> bool {
    if requested && !scope.feature_enabled(LicenseFeature::Cashback) {
        debug!(tenant_id = %scope.tenant.id, "Cashback requested but not licensed, ignoring");
        return false;
    }
    requested
}

/// POST /v1/checkout/quote: Price the current cart.
#[utoipa::path(
    post,
    path = "/v1/checkout/quote",
    tag = "Checkout",
    params(("x-session-id" = String, Header, description = "Session id")),
    request_body = QuoteRequest,
    responses((status = 200, description = "Rounded pricing breakdown", body = PricingBreakdown))
)]
pub async fn handle_quote(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<PricingBreakdown>, ApiError> {
    let session = state.load_session(&scope, &sid).await?;
    let settings = settings_or_default(state.datastore.catalog.as_ref(), &scope.tenant.slug).await;
    let breakdown = state
        .orders
        .quote(
            &session,
            &settings,
            request.delivery_method,
            cashback_allowed(&scope, request.apply_cashback),
        )
        .await;
    Ok(Json(breakdown.display()))
}

/// POST /v1/checkout/orders: Submit the cart as an order.
#[utoipa::path(
    post,
    path = "/v1/checkout/orders",
    tag = "Checkout",
    params(("x-session-id" = String, Header, description = "Session id")),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created", body = OrderReceipt),
        (status = 422, description = "Checkout preconditions not met", body = ErrorResponse),
        (status = 502, description = "Order creation failed; cart kept", body = ErrorResponse),
    )
)]
pub async fn handle_submit_order(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    SessionId(sid): SessionId,
    Json(mut request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderReceipt>), ApiError> {
    request.apply_cashback = cashback_allowed(&scope, request.apply_cashback);

    let mut session = state.load_session(&scope, &sid).await?;
    let settings = settings_or_default(state.datastore.catalog.as_ref(), &scope.tenant.slug).await;
    let result = state
        .orders
        .submit(&scope.tenant.slug, &mut session, &settings, &request)
        .await;

    match result {
        Ok(receipt) => {
            // The order exists; a failed save must not invite a resubmit.
            if let Err(e) = state.save_session(&scope, &sid, &session).await {
                warn!(
                    tenant_id = %scope.tenant.id,
                    order_id = %receipt.order_id,
                    error = ?e,
                    "Order created but session could not be saved"
                );
                metrics::counter!("api.session_save_failed").increment(1);
            }
            Ok((StatusCode::CREATED, Json(receipt)))
        }
        Err(e) => {
            // The profile address may have changed even when submission failed.
            state.save_session(&scope, &sid, &session).await?;
            Err(e.into())
        }
    }
}
