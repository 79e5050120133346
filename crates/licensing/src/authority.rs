//! Remote license authority.

use crate::{LicenseError, LicenseStatus};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use storefront_core::config::LicensingConfig;
use tracing::debug;
use uuid::Uuid;

#[async_trait]
pub trait LicenseAuthority: Send + Sync {
    async fn fetch(&self, tenant_id: Uuid) -> Result<LicenseStatus, LicenseError>;
}

/// `GET <authority_url>?tenant_id=<id>` with a bounded timeout.
pub struct HttpLicenseAuthority {
    client: Client,
    url: String,
}

impl HttpLicenseAuthority {
    pub fn new(config: &LicensingConfig) -> Result<Self, LicenseError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            url: config.authority_url.clone(),
        })
    }
}

#[async_trait]
impl LicenseAuthority for HttpLicenseAuthority {
    async fn fetch(&self, tenant_id: Uuid) -> Result<LicenseStatus, LicenseError> {
        debug!(tenant_id = %tenant_id, url = %self.url, "Checking license");
        let response = self
            .client
            .get(&self.url)
            .query(&[("tenant_id", tenant_id.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LicenseError::Rejected(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LicenseState;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn authority(server: &MockServer, timeout_ms: u64) -> HttpLicenseAuthority {
        HttpLicenseAuthority::new(&LicensingConfig {
            authority_url: format!("{}/api/license-status", server.uri()),
            timeout_ms,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_parses_status() {
        let server = MockServer::start().await;
        let tenant_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/api/license-status"))
            .and(query_param("tenant_id", tenant_id.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "pending",
                "plan": "Pro",
                "daysRemaining": 3,
                "features": { "cashback": true, "api_whatsapp": true },
                "tenantId": tenant_id,
                "tenantName": "Farmavida"
            })))
            .mount(&server)
            .await;

        let status = authority(&server, 5000).fetch(tenant_id).await.unwrap();
        assert_eq!(status.status, LicenseState::Pending);
        assert!(status.features.api_whatsapp);
    }

    #[tokio::test]
    async fn test_non_success_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = authority(&server, 5000).fetch(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, LicenseError::Rejected(503)));
    }

    #[tokio::test]
    async fn test_slow_authority_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "active" }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = authority(&server, 50).fetch(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, LicenseError::Timeout));
    }
}
