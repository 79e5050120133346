//! Subscription billing providers for the platform (master) side: customer and
//! checkout-session creation, billing portal, subscription lookup and
//! cancellation, and webhook verification.
//!
//! Each backend is a [`PaymentProvider`]; [`ProviderFactory`] picks one per
//! tenant.

#![warn(clippy::unwrap_used)]

pub mod factory;
pub mod pacpay;
pub mod stripe;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use storefront_core::types::PaymentProviderKind;
use thiserror::Error;

pub use factory::ProviderFactory;
pub use pacpay::PacPayAdapter;
pub use stripe::StripeAdapter;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{operation} is not supported by the {provider} provider")]
    Unsupported {
        provider: PaymentProviderKind,
        operation: &'static str,
    },

    #[error("payment provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("payment provider unreachable: {0}")]
    Transport(String),

    #[error("payment provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected payment provider response: {0}")]
    Decode(String),

    #[error("webhook signature header is malformed: {0}")]
    MalformedSignature(&'static str),

    #[error("webhook signature does not match")]
    SignatureMismatch,

    #[error("webhook timestamp outside the {0} s tolerance")]
    TimestampOutOfTolerance(i64),

    #[error("checkout session was created without a URL")]
    MissingCheckoutUrl,
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateCustomerParams {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    #[default]
    Subscription,
    Payment,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::Payment => "payment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCheckoutSessionParams {
    pub customer_id: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub mode: CheckoutMode,
    /// Only honoured in subscription mode.
    #[serde(default)]
    pub trial_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalSession {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub id: String,
    pub status: String,
    pub current_period_end: DateTime<Utc>,
    pub price_id: Option<String>,
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn kind(&self) -> PaymentProviderKind;

    /// Returns the provider's customer id.
    async fn create_customer(&self, params: &CreateCustomerParams) -> Result<String, PaymentError>;

    async fn create_checkout_session(
        &self,
        params: &CreateCheckoutSessionParams,
    ) -> Result<CheckoutSession, PaymentError>;

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError>;

    async fn get_subscription_info(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionInfo, PaymentError>;

    /// Cancel at the end of the current period, never immediately.
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentError>;

    /// Verify a webhook delivery and parse its event.
    fn construct_webhook_event(
        &self,
        payload: &[u8],
        signature: &str,
        secret: &str,
    ) -> Result<WebhookEvent, PaymentError>;
}
