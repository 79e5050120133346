//! Per-request tenant scope. Every `/v1` storefront request is bound to one
//! tenant before any handler runs; gated routes additionally require that
//! neither the tenant status nor the license blocks the storefront.

use crate::error::ApiError;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::{FromRequestParts, OriginalUri, Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use storefront_core::types::Tenant;
use storefront_licensing::{LicenseFeature, LicenseStatus};
use storefront_tenancy::{
    billing_checkout_link, AccessDecision, AccessPredicate, RequestContext, SlugSource,
};
use tracing::{debug, info};
use utoipa::ToSchema;

pub const SESSION_HEADER: &str = "x-session-id";
const MAX_SESSION_ID_LEN: usize = 128;
const LICENSE_UNAVAILABLE_REASON: &str = "Esta loja está temporariamente indisponível.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Open,
    /// Tenant status blocks the store (suspension, non-payment, cancellation).
    BlockedByTenant,
    /// The license authority reports the subscription as blocked, or could not
    /// be reached for too long.
    Unavailable,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailabilityView {
    pub state: Availability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_link: Option<String>,
    /// Support tickets are accepted in every state.
    pub support_available: bool,
}

/// Body of a 403 from a gated route.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BlockedResponse {
    pub error: String,
    pub availability: AvailabilityView,
}

#[derive(Clone)]
pub struct TenantScope {
    pub tenant: Tenant,
    pub source: SlugSource,
    pub access: AccessDecision,
    pub license: LicenseStatus,
}

impl TenantScope {
    pub fn feature_enabled(&self, feature: LicenseFeature) -> bool {
        self.license.features.is_enabled(feature)
    }

    /// The tenant's own block takes precedence over the license block.
    pub fn availability(&self, master_base_url: &str) -> AvailabilityView {
        if self.access.is_blocked {
            return AvailabilityView {
                state: Availability::BlockedByTenant,
                reason: self.access.reason.clone(),
                billing_link: billing_checkout_link(master_base_url, &self.tenant)
                    .ok()
                    .map(String::from),
                support_available: true,
            };
        }
        if self.license.is_blocked() {
            return AvailabilityView {
                state: Availability::Unavailable,
                reason: Some(LICENSE_UNAVAILABLE_REASON.to_string()),
                billing_link: None,
                support_available: true,
            };
        }
        AvailabilityView {
            state: Availability::Open,
            reason: None,
            billing_link: None,
            support_available: true,
        }
    }
}

fn request_context(req: &Request) -> RequestContext {
    let mut ctx = RequestContext::new();

    if let Some(query) = req.uri().query() {
        let tenant = url::form_urlencoded::parse(query.as_bytes()).find(|(k, _)| k == "tenant");
        if let Some((_, slug)) = tenant {
            ctx = ctx.with_query_tenant(slug.into_owned());
        }
    }

    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    if let Some(slug) = path.strip_prefix("/s/").and_then(|rest| rest.split('/').next()) {
        ctx = ctx.with_path_slug(slug);
    }

    if let Some(host) = req.headers().get(header::HOST).and_then(|h| h.to_str().ok()) {
        ctx = ctx.with_host(host);
    }
    ctx
}

/// Resolve the tenant (any status), evaluate both gates, and attach the
/// resulting [`TenantScope`] to the request.
pub async fn resolve_tenant(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let ctx = request_context(&req);
    let resolved = match state.resolver.resolve(&ctx, AccessPredicate::AnyStatus).await {
        Ok(resolved) => resolved,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let access = state.guard.evaluate(&resolved.tenant);
    let gate = state.licenses.gate_for(resolved.tenant.id).await;
    let license = match gate.snapshot() {
        Some(status) => status,
        None => gate.check_license().await,
    };
    debug!(tenant_id = %resolved.tenant.id, license = ?license.status, "Tenant scope attached");

    req.extensions_mut().insert(TenantScope {
        tenant: resolved.tenant,
        source: resolved.source,
        access,
        license,
    });
    next.run(req).await
}

/// Reject the request with the availability payload unless the storefront is
/// open.
pub async fn require_open(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(scope) = req.extensions().get::<TenantScope>() else {
        return ApiError::internal("tenant scope missing").into_response();
    };
    let availability = scope.availability(&state.billing.master_base_url);
    if availability.state != Availability::Open {
        info!(
            tenant_id = %scope.tenant.id,
            state = ?availability.state,
            "Gated request refused"
        );
        metrics::counter!("api.storefront_blocked").increment(1);
        return (
            StatusCode::FORBIDDEN,
            Json(BlockedResponse {
                error: "storefront_blocked".to_string(),
                availability,
            }),
        )
            .into_response();
    }
    next.run(req).await
}

/// Value of the `x-session-id` header.
pub struct SessionId(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .unwrap_or_default();
        let valid = !raw.is_empty()
            && raw.len() <= MAX_SESSION_ID_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ApiError::bad_request(
                "invalid_session",
                format!("header `{SESSION_HEADER}` must carry a session id"),
            ));
        }
        Ok(Self(raw.to_string()))
    }
}
