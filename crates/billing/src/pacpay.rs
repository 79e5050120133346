use crate::{
    CheckoutSession, CreateCheckoutSessionParams, CreateCustomerParams, PaymentError,
    PaymentProvider, PortalSession, SubscriptionInfo, WebhookEvent,
};
use async_trait::async_trait;
use storefront_core::types::PaymentProviderKind;

/// Declared but not integrated yet: every operation is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacPayAdapter;

impl PacPayAdapter {
    fn unsupported<T>(operation: &'static str) -> Result<T, PaymentError> {
        Err(PaymentError::Unsupported {
            provider: PaymentProviderKind::PacPay,
            operation,
        })
    }
}

#[async_trait]
impl PaymentProvider for PacPayAdapter {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::PacPay
    }

    async fn create_customer(&self, _params: &CreateCustomerParams) -> Result<String, PaymentError> {
        Self::unsupported("create_customer")
    }

    async fn create_checkout_session(
        &self,
        _params: &CreateCheckoutSessionParams,
    ) -> Result<CheckoutSession, PaymentError> {
        Self::unsupported("create_checkout_session")
    }

    async fn create_portal_session(
        &self,
        _customer_id: &str,
        _return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        Self::unsupported("create_portal_session")
    }

    async fn get_subscription_info(
        &self,
        _subscription_id: &str,
    ) -> Result<SubscriptionInfo, PaymentError> {
        Self::unsupported("get_subscription_info")
    }

    async fn cancel_subscription(&self, _subscription_id: &str) -> Result<(), PaymentError> {
        Self::unsupported("cancel_subscription")
    }

    fn construct_webhook_event(
        &self,
        _payload: &[u8],
        _signature: &str,
        _secret: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        Self::unsupported("construct_webhook_event")
    }
}
