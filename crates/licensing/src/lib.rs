//! Storefront licensing: subscription status fetched from the license
//! authority, cached with a bounded staleness window, and exposed as feature
//! flags.
//!
//! Every tenant gets one [`LicenseGate`] from the [`LicenseRegistry`]. The gate
//! checks the authority on creation and then on a fixed interval; when the
//! authority is unreachable the last cached answer is trusted for a limited
//! time, after which the gate fails closed.

#![warn(clippy::unwrap_used)]

pub mod authority;
pub mod gate;
pub mod registry;

pub use authority::{HttpLicenseAuthority, LicenseAuthority};
pub use gate::{CachedLicense, LicenseGate};
pub use registry::LicenseRegistry;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("license authority timed out")]
    Timeout,
    #[error("license authority unreachable: {0}")]
    Transport(String),
    #[error("license authority answered HTTP {0}")]
    Rejected(u16),
    #[error("unexpected license payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for LicenseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// License state and features
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LicenseState {
    Active,
    Pending,
    Blocked,
}

/// Every feature the license authority can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LicenseFeature {
    Cashback,
    ApiWhatsapp,
    CurveAbc,
    MultiLoja,
    ListaInteligente,
    NotaFiscal,
    CrmCampaigns,
}

impl LicenseFeature {
    pub const ALL: &'static [LicenseFeature] = &[
        Self::Cashback,
        Self::ApiWhatsapp,
        Self::CurveAbc,
        Self::MultiLoja,
        Self::ListaInteligente,
        Self::NotaFiscal,
        Self::CrmCampaigns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cashback => "cashback",
            Self::ApiWhatsapp => "api_whatsapp",
            Self::CurveAbc => "curve_abc",
            Self::MultiLoja => "multi_loja",
            Self::ListaInteligente => "lista_inteligente",
            Self::NotaFiscal => "nota_fiscal",
            Self::CrmCampaigns => "crm_campaigns",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Cashback => "Cashback wallet and redemption at checkout",
            Self::ApiWhatsapp => "WhatsApp API notifications",
            Self::CurveAbc => "ABC curve inventory analysis",
            Self::MultiLoja => "Multiple stores per account",
            Self::ListaInteligente => "Smart shopping lists",
            Self::NotaFiscal => "Invoice emission",
            Self::CrmCampaigns => "CRM campaigns",
        }
    }
}

impl std::fmt::Display for LicenseFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LicenseFeature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown license feature `{s}`"))
    }
}

/// Feature flags as sent by the authority. Absent flags read as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LicenseFeatures {
    #[serde(default)]
    pub cashback: bool,
    #[serde(default)]
    pub api_whatsapp: bool,
    #[serde(default)]
    pub curve_abc: bool,
    #[serde(default)]
    pub multi_loja: bool,
    #[serde(default)]
    pub lista_inteligente: bool,
    #[serde(default)]
    pub nota_fiscal: bool,
    #[serde(default)]
    pub crm_campaigns: bool,
}

impl LicenseFeatures {
    pub fn is_enabled(&self, feature: LicenseFeature) -> bool {
        match feature {
            LicenseFeature::Cashback => self.cashback,
            LicenseFeature::ApiWhatsapp => self.api_whatsapp,
            LicenseFeature::CurveAbc => self.curve_abc,
            LicenseFeature::MultiLoja => self.multi_loja,
            LicenseFeature::ListaInteligente => self.lista_inteligente,
            LicenseFeature::NotaFiscal => self.nota_fiscal,
            LicenseFeature::CrmCampaigns => self.crm_campaigns,
        }
    }

    pub fn enabled(&self) -> Vec<LicenseFeature> {
        LicenseFeature::ALL
            .iter()
            .copied()
            .filter(|f| self.is_enabled(*f))
            .collect()
    }
}

pub const FAIL_CLOSED_TENANT_NAME: &str = "Connection Error";
const FAIL_CLOSED_PLAN: &str = "Fallback Basic";

/// Subscription status for one tenant, in the authority's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LicenseStatus {
    pub status: LicenseState,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub days_remaining: i64,
    #[serde(default)]
    pub features: LicenseFeatures,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub tenant_name: String,
}

impl LicenseStatus {
    /// Status reported when the authority is unreachable and no recent cached
    /// answer exists.
    pub fn fail_closed(tenant_id: impl Into<String>) -> Self {
        Self {
            status: LicenseState::Blocked,
            plan: FAIL_CLOSED_PLAN.to_string(),
            days_remaining: 0,
            features: LicenseFeatures::default(),
            tenant_id: tenant_id.into(),
            tenant_name: FAIL_CLOSED_TENANT_NAME.to_string(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.status == LicenseState::Blocked
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
