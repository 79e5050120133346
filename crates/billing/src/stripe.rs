//! Stripe over its REST API: form-encoded requests, bearer secret key.

use crate::{
    CheckoutMode, CheckoutSession, CreateCheckoutSessionParams, CreateCustomerParams,
    PaymentError, PaymentProvider, PortalSession, SubscriptionInfo, WebhookEvent,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::time::Duration;
use storefront_core::config::BillingConfig;
use storefront_core::types::PaymentProviderKind;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

const API_VERSION: &str = "2023-10-16";
const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Deserialize)]
struct SessionBody {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct PortalBody {
    url: String,
}

#[derive(Deserialize)]
struct PriceRef {
    id: String,
}

#[derive(Deserialize)]
struct SubscriptionItem {
    price: PriceRef,
}

#[derive(Deserialize, Default)]
struct SubscriptionItems {
    #[serde(default)]
    data: Vec<SubscriptionItem>,
}

#[derive(Deserialize)]
struct SubscriptionBody {
    id: String,
    status: String,
    current_period_end: i64,
    #[serde(default)]
    cancel_at_period_end: bool,
    #[serde(default)]
    items: SubscriptionItems,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Deserialize)]
struct EventBody {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: EventData,
}

#[derive(Deserialize)]
struct EventData {
    object: serde_json::Value,
}

fn push_metadata(form: &mut Vec<(String, String)>, metadata: &BTreeMap<String, String>) {
    for (key, value) in metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
}

pub struct StripeAdapter {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
    tolerance_secs: i64,
}

impl StripeAdapter {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            tolerance_secs: 300,
        }
    }

    pub fn from_config(config: &BillingConfig) -> Result<Self, PaymentError> {
        let key = config
            .stripe_secret_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(PaymentError::NotConfigured("stripe_secret_key"))?;
        Ok(Self::new(key, config.stripe_api_base.clone())
            .with_tolerance(config.webhook_tolerance_secs))
    }

    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PaymentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        warn!(status = status.as_u16(), message = %message, "Stripe request rejected");
        metrics::counter!("billing.stripe.rejected").increment(1);
        Err(PaymentError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, PaymentError> {
        debug!(path = %path, "Stripe POST");
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.secret_key)
            .header("Stripe-Version", API_VERSION)
            .form(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Check a `Stripe-Signature` header (`t=<ts>,v1=<hex>[,v1=...]`) against
    /// `payload` as of `now`.
    pub fn verify_signature_at(
        &self,
        payload: &[u8],
        header: &str,
        secret: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = Some(
                        value
                            .parse::<i64>()
                            .map_err(|_| PaymentError::MalformedSignature("timestamp"))?,
                    );
                }
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }
        let timestamp = timestamp.ok_or(PaymentError::MalformedSignature("missing timestamp"))?;
        if signatures.is_empty() {
            return Err(PaymentError::MalformedSignature("missing v1 signature"));
        }

        let matched = signatures.iter().any(|candidate| {
            let Ok(expected) = hex::decode(candidate) else {
                return false;
            };
            let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
                return false;
            };
            mac.update(timestamp.to_string().as_bytes());
            mac.update(b".");
            mac.update(payload);
            mac.verify_slice(&expected).is_ok()
        });
        if !matched {
            metrics::counter!("billing.webhook.rejected").increment(1);
            return Err(PaymentError::SignatureMismatch);
        }

        if (now.timestamp() - timestamp).abs() > self.tolerance_secs {
            metrics::counter!("billing.webhook.rejected").increment(1);
            return Err(PaymentError::TimestampOutOfTolerance(self.tolerance_secs));
        }
        Ok(())
    }

    pub fn construct_webhook_event_at(
        &self,
        payload: &[u8],
        signature: &str,
        secret: &str,
        now: DateTime<Utc>,
    ) -> Result<WebhookEvent, PaymentError> {
        self.verify_signature_at(payload, signature, secret, now)?;
        let event: EventBody =
            serde_json::from_slice(payload).map_err(|e| PaymentError::Decode(e.to_string()))?;
        Ok(WebhookEvent {
            id: event.id,
            kind: event.kind,
            data: event.data.object,
        })
    }
}

#[async_trait]
impl PaymentProvider for StripeAdapter {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::Stripe
    }

    async fn create_customer(&self, params: &CreateCustomerParams) -> Result<String, PaymentError> {
        let mut form = vec![
            ("email".to_string(), params.email.clone()),
            ("name".to_string(), params.name.clone()),
        ];
        push_metadata(&mut form, &params.metadata);
        let customer: IdOnly = self.post("customers", &form).await?;
        Ok(customer.id)
    }

    async fn create_checkout_session(
        &self,
        params: &CreateCheckoutSessionParams,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut form = vec![
            ("customer".to_string(), params.customer_id.clone()),
            ("line_items[0][price]".to_string(), params.price_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("mode".to_string(), params.mode.as_str().to_string()),
            ("success_url".to_string(), params.success_url.clone()),
            ("cancel_url".to_string(), params.cancel_url.clone()),
            ("allow_promotion_codes".to_string(), "true".to_string()),
        ];
        push_metadata(&mut form, &params.metadata);
        if let (CheckoutMode::Subscription, Some(days)) = (params.mode, params.trial_days) {
            if days > 0 {
                form.push((
                    "subscription_data[trial_period_days]".to_string(),
                    days.to_string(),
                ));
            }
        }

        let session: SessionBody = self.post("checkout/sessions", &form).await?;
        let url = session.url.ok_or(PaymentError::MissingCheckoutUrl)?;
        Ok(CheckoutSession {
            session_id: session.id,
            url,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        let form = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];
        let portal: PortalBody = self.post("billing_portal/sessions", &form).await?;
        Ok(PortalSession { url: portal.url })
    }

    async fn get_subscription_info(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionInfo, PaymentError> {
        let response = self
            .client
            .get(self.url(&format!("subscriptions/{subscription_id}")))
            .bearer_auth(&self.secret_key)
            .header("Stripe-Version", API_VERSION)
            .send()
            .await?;
        let sub: SubscriptionBody = Self::decode(response).await?;
        let current_period_end = DateTime::from_timestamp(sub.current_period_end, 0)
            .ok_or_else(|| PaymentError::Decode("current_period_end out of range".into()))?;
        Ok(SubscriptionInfo {
            id: sub.id,
            status: sub.status,
            current_period_end,
            price_id: sub.items.data.into_iter().next().map(|item| item.price.id),
            cancel_at_period_end: sub.cancel_at_period_end,
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentError> {
        let form = vec![("cancel_at_period_end".to_string(), "true".to_string())];
        let _: IdOnly = self
            .post(&format!("subscriptions/{subscription_id}"), &form)
            .await?;
        Ok(())
    }

    fn construct_webhook_event(
        &self,
        payload: &[u8],
        signature: &str,
        secret: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        self.construct_webhook_event_at(payload, signature, secret, Utc::now())
    }
}
