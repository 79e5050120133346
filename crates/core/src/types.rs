//! Storefront domain types shared across the workspace: tenants, catalog,
//! customers, orders, cashback, and support tickets.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Tenants ────────────────────────────────────────────────────────────────

/// Lifecycle status of a tenant row. Tenants are never deleted, only moved
/// between these states by admin or billing actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
    Blocked,
    PastDue,
    Cancelled,
    Trial,
}

impl TenantStatus {
    pub const ALL: &'static [TenantStatus] = &[
        Self::Active,
        Self::Suspended,
        Self::Blocked,
        Self::PastDue,
        Self::Cancelled,
        Self::Trial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Blocked => "blocked",
            Self::PastDue => "past_due",
            Self::Cancelled => "cancelled",
            Self::Trial => "trial",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plan feature value: either an on/off flag or a numeric limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanEntitlement {
    Flag(bool),
    Limit(i64),
}

impl PlanEntitlement {
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Flag(enabled) => *enabled,
            Self::Limit(limit) => *limit > 0,
        }
    }
}

/// Payment backend used for the tenant's subscription billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum PaymentProviderKind {
    #[serde(rename = "stripe")]
    Stripe,
    #[serde(rename = "mercadopago")]
    MercadoPago,
    #[serde(rename = "pacpay")]
    PacPay,
}

impl PaymentProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::MercadoPago => "mercadopago",
            Self::PacPay => "pacpay",
        }
    }
}

impl std::fmt::Display for PaymentProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "mercadopago" => Ok(Self::MercadoPago),
            "pacpay" => Ok(Self::PacPay),
            other => Err(format!("unknown payment provider `{other}`")),
        }
    }
}

/// One isolated store (pharmacy) on the platform.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Tenant {
    pub id: Uuid,
    pub slug: String,
    pub display_name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    pub status: TenantStatus,
    #[serde(default)]
    pub blocked_reason: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub plan_code: Option<String>,
    #[serde(default)]
    pub plan_name: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub plan_features: BTreeMap<String, PlanEntitlement>,
    #[serde(default)]
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub store_base_url: Option<String>,
    #[serde(default)]
    pub admin_base_url: Option<String>,
    #[serde(default)]
    pub billing_provider: Option<PaymentProviderKind>,
}

impl Tenant {
    /// Whether the tenant's plan grants `feature`. Unknown features are off.
    pub fn plan_feature(&self, feature: &str) -> bool {
        self.plan_features
            .get(feature)
            .map(PlanEntitlement::is_enabled)
            .unwrap_or(false)
    }

    /// Plan label used in support metadata.
    pub fn plan_label(&self) -> &str {
        self.plan_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
            .unwrap_or("N/A")
    }
}

// ─── Catalog ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub promotional_price: Option<Decimal>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub requires_prescription: bool,
    #[serde(default)]
    pub stock: u32,
}

impl Product {
    /// Unit price actually charged: the promotional price wins whenever it is
    /// set to a positive amount.
    pub fn effective_price(&self) -> Decimal {
        match self.promotional_price {
            Some(promo) if promo > Decimal::ZERO => promo,
            _ => self.price,
        }
    }

    pub fn is_on_promotion(&self) -> bool {
        self.effective_price() != self.price
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyOffer {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    pub active: bool,
}

// ─── Customers ──────────────────────────────────────────────────────────────

/// Tag marking a customer as part of the VIP segment.
pub const VIP_TAG: &str = "VIP";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn is_vip(&self) -> bool {
        self.tags.iter().any(|tag| tag == VIP_TAG)
    }
}

/// Partial profile update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

impl ProfileUpdate {
    pub fn address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.address.is_none()
            && self.cpf.is_none()
            && self.birth_date.is_none()
    }

    pub fn apply_to(&self, customer: &mut Customer) {
        if let Some(name) = &self.name {
            customer.name = name.clone();
        }
        if let Some(email) = &self.email {
            customer.email = Some(email.clone());
        }
        if let Some(address) = &self.address {
            customer.address = Some(address.clone());
        }
        if let Some(cpf) = &self.cpf {
            customer.cpf = Some(cpf.clone());
        }
        if let Some(birth_date) = self.birth_date {
            customer.birth_date = Some(birth_date);
        }
    }
}

// ─── Orders ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Delivery,
    Pickup,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Pickup => "pickup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Credit,
    Pix,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Pix => "pix",
            Self::Cash => "cash",
        }
    }
}

/// One priced line of an order. `price` is the already-discounted unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: u32,
    pub price: Decimal,
}

/// Payload of the atomic order-creation call.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub items: Vec<OrderLine>,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub delivery_method: DeliveryMethod,
    pub delivery_fee: Decimal,
    pub cashback_applied: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub id: Uuid,
    pub total: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub address: Option<String>,
    pub payment_method: PaymentMethod,
    pub delivery_method: DeliveryMethod,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

// ─── Cashback ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CashbackWallet {
    pub balance: Decimal,
    #[serde(default)]
    pub last_credit_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_debit_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl CashbackWallet {
    /// A customer without a wallet row has nothing to redeem.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            balance: Decimal::ZERO,
            last_credit_at: None,
            last_debit_at: None,
            updated_at: now,
        }
    }

    /// Redeemable balance; never negative.
    pub fn available(&self) -> Decimal {
        self.balance.max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CashbackTransactionKind {
    Credit,
    Debit,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CashbackTransaction {
    pub id: Uuid,
    pub kind: CashbackTransactionKind,
    pub amount: Decimal,
    #[serde(default)]
    pub order_id: Option<Uuid>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ─── Support ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TicketMetadata {
    pub plan: String,
    pub status: TenantStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupportTicket {
    pub tenant_id: Uuid,
    pub origin: String,
    pub subject: String,
    pub message: String,
    pub contact_name: String,
    pub contact_email: String,
    pub status: TicketStatus,
    pub metadata: TicketMetadata,
}
