//! Access guard: decides from a tenant's status whether its storefront may be
//! served, and builds the billing link shown on the block screen.

use serde::Serialize;
use storefront_core::types::{Tenant, TenantStatus};
use tracing::info;
use url::Url;
use utoipa::ToSchema;

const ADMINISTRATIVE_REASON: &str = "A loja está com pendências administrativas.";
const NON_PAYMENT_REASON: &str = "A assinatura desta loja está com pagamento pendente.";
const CANCELLED_REASON: &str = "A assinatura desta loja foi cancelada.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AccessDecision {
    pub is_blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AccessDecision {
    fn open() -> Self {
        Self {
            is_blocked: false,
            reason: None,
        }
    }

    fn blocked(reason: impl Into<String>) -> Self {
        Self {
            is_blocked: true,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AccessGuard;

impl AccessGuard {
    pub fn new() -> Self {
        Self
    }

    /// Re-evaluated on every fresh tenant fetch; nothing is cached here.
    pub fn evaluate(&self, tenant: &Tenant) -> AccessDecision {
        let decision = match tenant.status {
            TenantStatus::Active | TenantStatus::Trial => AccessDecision::open(),
            TenantStatus::Suspended | TenantStatus::Blocked => {
                let reason = tenant
                    .blocked_reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .unwrap_or(ADMINISTRATIVE_REASON);
                AccessDecision::blocked(reason)
            }
            TenantStatus::PastDue => AccessDecision::blocked(NON_PAYMENT_REASON),
            TenantStatus::Cancelled => AccessDecision::blocked(CANCELLED_REASON),
        };

        if decision.is_blocked {
            info!(tenant_id = %tenant.id, status = %tenant.status, "Storefront blocked by tenant status");
            metrics::counter!("tenancy.access.blocked").increment(1);
        }
        decision
    }
}

/// `<master>/billing/checkout?tenantId=..&planId=..&reason=block`. The plan id
/// falls back to the plan code, then to empty.
pub fn billing_checkout_link(master_base_url: &str, tenant: &Tenant) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(master_base_url.trim_end_matches('/'))?;
    let path = format!("{}/billing/checkout", url.path().trim_end_matches('/'));
    url.set_path(&path);

    let plan_id = tenant
        .plan_id
        .as_deref()
        .or(tenant.plan_code.as_deref())
        .unwrap_or("");
    url.query_pairs_mut()
        .append_pair("tenantId", &tenant.id.to_string())
        .append_pair("planId", plan_id)
        .append_pair("reason", "block");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn tenant(status: TenantStatus, reason: Option<&str>) -> Tenant {
        Tenant {
            id: Uuid::nil(),
            slug: "farmavida".into(),
            display_name: "Farmavida".into(),
            logo_url: None,
            status,
            blocked_reason: reason.map(str::to_string),
            plan_id: None,
            plan_code: None,
            plan_name: None,
            plan_features: BTreeMap::new(),
            whatsapp_number: None,
            store_base_url: None,
            admin_base_url: None,
            billing_provider: None,
        }
    }

    #[test]
    fn test_status_decision_table() {
        let guard = AccessGuard::new();
        for status in TenantStatus::ALL {
            let decision = guard.evaluate(&tenant(*status, None));
            let expected_blocked = !matches!(status, TenantStatus::Active | TenantStatus::Trial);
            assert_eq!(decision.is_blocked, expected_blocked, "status {status}");
            assert_eq!(decision.reason.is_some(), expected_blocked);
        }
    }

    #[test]
    fn test_blocked_reason_is_used_unless_blank() {
        let guard = AccessGuard::new();
        let with_reason = guard.evaluate(&tenant(TenantStatus::Suspended, Some("Documentação pendente")));
        assert_eq!(with_reason.reason.as_deref(), Some("Documentação pendente"));

        let blank = guard.evaluate(&tenant(TenantStatus::Blocked, Some("   ")));
        assert_eq!(blank.reason.as_deref(), Some(ADMINISTRATIVE_REASON));

        // Only suspended/blocked carry the tenant's own reason.
        let past_due = guard.evaluate(&tenant(TenantStatus::PastDue, Some("ignored")));
        assert_eq!(past_due.reason.as_deref(), Some(NON_PAYMENT_REASON));
    }

    #[test]
    fn test_billing_link_plan_fallbacks() {
        let mut t = tenant(TenantStatus::PastDue, None);
        let link = billing_checkout_link("https://master.example.com/", &t).unwrap();
        assert_eq!(
            link.as_str(),
            "https://master.example.com/billing/checkout?tenantId=00000000-0000-0000-0000-000000000000&planId=&reason=block"
        );

        t.plan_code = Some("pro".into());
        let link = billing_checkout_link("https://master.example.com", &t).unwrap();
        assert!(link.as_str().contains("planId=pro"));

        t.plan_id = Some("plan_123".into());
        let link = billing_checkout_link("https://master.example.com", &t).unwrap();
        assert!(link.as_str().contains("planId=plan_123"));
    }
}
