use crate::{PacPayAdapter, PaymentError, PaymentProvider, StripeAdapter};
use std::sync::Arc;
use storefront_core::config::BillingConfig;
use storefront_core::types::{PaymentProviderKind, Tenant};
use tracing::info;

/// Picks the payment backend for a tenant: the tenant's own override when set,
/// otherwise the platform default.
pub struct ProviderFactory {
    default_provider: PaymentProviderKind,
    stripe: Option<Arc<StripeAdapter>>,
}

impl ProviderFactory {
    pub fn new(config: &BillingConfig) -> Self {
        let stripe = StripeAdapter::from_config(config).ok().map(Arc::new);
        info!(
            default_provider = %config.default_provider,
            stripe_configured = stripe.is_some(),
            "Payment providers initialized"
        );
        Self {
            default_provider: config.default_provider,
            stripe,
        }
    }

    pub fn kind_for(&self, tenant: &Tenant) -> PaymentProviderKind {
        tenant.billing_provider.unwrap_or(self.default_provider)
    }

    pub fn provider(&self, kind: PaymentProviderKind) -> Result<Arc<dyn PaymentProvider>, PaymentError> {
        match kind {
            PaymentProviderKind::Stripe => self
                .stripe
                .clone()
                .map(|s| s as Arc<dyn PaymentProvider>)
                .ok_or(PaymentError::NotConfigured("stripe_secret_key")),
            PaymentProviderKind::PacPay => Ok(Arc::new(PacPayAdapter)),
            PaymentProviderKind::MercadoPago => Err(PaymentError::Unsupported {
                provider: PaymentProviderKind::MercadoPago,
                operation: "any operation",
            }),
        }
    }

    pub fn for_tenant(&self, tenant: &Tenant) -> Result<Arc<dyn PaymentProvider>, PaymentError> {
        self.provider(self.kind_for(tenant))
    }
}
