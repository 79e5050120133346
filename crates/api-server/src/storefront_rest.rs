//! Endpoints that stay reachable while the storefront is blocked: store
//! identity and availability, support tickets, billing links, and payment
//! provider webhooks.

use crate::error::ApiError;
use crate::rest::ErrorResponse;
use crate::scope::{AvailabilityView, TenantScope};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use storefront_core::types::PaymentProviderKind;
use storefront_licensing::LicenseStatus;
use storefront_tenancy::{billing_checkout_link, AccessDecision, SlugSource, SupportRequest};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Serialize, ToSchema)]
pub struct StoreIdentity {
    pub id: Uuid,
    pub slug: String,
    pub display_name: String,
    pub logo_url: Option<String>,
    pub whatsapp_number: Option<String>,
    pub plan: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StorefrontView {
    pub store: StoreIdentity,
    pub resolved_from: SlugSource,
    pub access: AccessDecision,
    pub availability: AvailabilityView,
    pub license: LicenseStatus,
    /// Licensed features currently enabled, by wire name.
    pub features: Vec<String>,
}

/// GET /v1/storefront: Store identity, availability, and feature flags.
#[utoipa::path(
    get,
    path = "/v1/storefront",
    tag = "Storefront",
    params(("tenant" = Option<String>, Query, description = "Store slug override")),
    responses(
        (status = 200, description = "Store identity and availability", body = StorefrontView),
        (status = 404, description = "Store not found or inactive", body = ErrorResponse),
    )
)]
pub async fn handle_storefront(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
) -> Json<StorefrontView> {
    let availability = scope.availability(&state.billing.master_base_url);
    let features = scope
        .license
        .features
        .enabled()
        .iter()
        .map(|f| f.as_str().to_string())
        .collect();
    let tenant = &scope.tenant;
    Json(StorefrontView {
        store: StoreIdentity {
            id: tenant.id,
            slug: tenant.slug.clone(),
            display_name: tenant.display_name.clone(),
            logo_url: tenant.logo_url.clone(),
            whatsapp_number: tenant.whatsapp_number.clone(),
            plan: tenant.plan_label().to_string(),
        },
        resolved_from: scope.source,
        access: scope.access.clone(),
        availability,
        license: scope.license.clone(),
        features,
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketCreated {
    pub ticket_id: Uuid,
}

/// POST /v1/support/tickets: Open a support ticket from the block screen.
#[utoipa::path(
    post,
    path = "/v1/support/tickets",
    tag = "Storefront",
    request_body = SupportRequest,
    responses(
        (status = 201, description = "Ticket opened", body = TicketCreated),
        (status = 422, description = "Invalid contact data", body = ErrorResponse),
        (status = 502, description = "Ticket could not be stored", body = ErrorResponse),
    )
)]
pub async fn handle_support_ticket(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Json(request): Json<SupportRequest>,
) -> Result<(StatusCode, Json<TicketCreated>), ApiError> {
    let ticket_id = state.support.submit(&scope.tenant, &request).await?;
    Ok((StatusCode::CREATED, Json(TicketCreated { ticket_id })))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutLink {
    pub url: String,
}

/// GET /v1/billing/checkout-link: Deep link into the master billing checkout.
#[utoipa::path(
    get,
    path = "/v1/billing/checkout-link",
    tag = "Storefront",
    responses(
        (status = 200, description = "Billing checkout link", body = CheckoutLink),
        (status = 500, description = "Master base URL misconfigured", body = ErrorResponse),
    )
)]
pub async fn handle_checkout_link(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
) -> Result<Json<CheckoutLink>, ApiError> {
    let url = billing_checkout_link(&state.billing.master_base_url, &scope.tenant)
        .map_err(|e| ApiError::internal(format!("invalid master base url: {e}")))?;
    Ok(Json(CheckoutLink { url: url.into() }))
}

#[derive(Debug, Deserialize)]
pub struct ProviderPath {
    provider: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    pub event_id: String,
    pub event_type: String,
}

/// POST /v1/billing/webhooks/:provider: Verify and acknowledge a provider
/// webhook.
#[utoipa::path(
    post,
    path = "/v1/billing/webhooks/{provider}",
    tag = "Billing",
    params(("provider" = String, Path, description = "stripe | mercadopago | pacpay")),
    request_body(content = String, description = "Raw event payload"),
    responses(
        (status = 200, description = "Event verified", body = WebhookAck),
        (status = 400, description = "Signature or payload rejected", body = ErrorResponse),
        (status = 501, description = "Provider has no webhook support", body = ErrorResponse),
    )
)]
pub async fn handle_webhook(
    State(state): State<AppState>,
    Path(ProviderPath { provider }): Path<ProviderPath>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let kind: PaymentProviderKind = provider
        .parse()
        .map_err(|e: String| ApiError::not_found("unknown_provider", e))?;
    let adapter = state.payments.provider(kind)?;

    let secret = state
        .billing
        .webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(storefront_billing::PaymentError::NotConfigured("webhook_secret"))?;
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match adapter.construct_webhook_event(&body, signature, secret) {
        Ok(event) => {
            info!(provider = %kind, event_id = %event.id, event_type = %event.kind, "Webhook verified");
            metrics::counter!("billing.webhook.received").increment(1);
            Ok(Json(WebhookAck {
                received: true,
                event_id: event.id,
                event_type: event.kind,
            }))
        }
        Err(e) => {
            warn!(provider = %kind, error = %e, "Webhook rejected");
            Err(e.into())
        }
    }
}
