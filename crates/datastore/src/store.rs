//! Boundary traits. Every call is tenant-scoped either by slug or by an id that
//! the store already binds to one tenant.

use crate::error::DatastoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use storefront_core::settings::StoreSettings;
use storefront_core::types::{
    CashbackTransaction, CashbackWallet, Customer, DailyOffer, NewOrder, OrderSummary, Product,
    ProfileUpdate, SupportTicket, Tenant,
};
use tracing::warn;
use uuid::Uuid;

/// Order history is bounded to this many months back.
pub const ORDER_HISTORY_MONTHS: u32 = 6;

#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Look up a tenant by slug regardless of status.
    async fn find_by_slug(&self, slug: &str) -> DatastoreResult<Option<Tenant>>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn products(&self, slug: &str) -> DatastoreResult<Vec<Product>>;

    async fn product(&self, slug: &str, product_id: Uuid) -> DatastoreResult<Option<Product>> {
        let products = self.products(slug).await?;
        Ok(products.into_iter().find(|p| p.id == product_id))
    }

    async fn daily_offers(&self, slug: &str) -> DatastoreResult<Vec<DailyOffer>>;

    /// Raw settings row; `None` when the tenant never saved any.
    async fn settings(&self, slug: &str) -> DatastoreResult<Option<StoreSettings>>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_by_phone(&self, slug: &str, phone: &str) -> DatastoreResult<Option<Customer>>;

    /// Passwordless login: returns the existing customer for `phone` or
    /// registers a new one.
    async fn login_or_register(
        &self,
        slug: &str,
        name: &str,
        phone: &str,
    ) -> DatastoreResult<Customer>;

    async fn update_profile(&self, customer_id: Uuid, update: &ProfileUpdate)
        -> DatastoreResult<()>;

    async fn orders_since(
        &self,
        customer_id: Uuid,
        since: DateTime<Utc>,
    ) -> DatastoreResult<Vec<OrderSummary>>;

    async fn favorites(&self, customer_id: Uuid) -> DatastoreResult<Vec<Product>>;

    /// Returns whether the product is a favorite after the toggle.
    async fn toggle_favorite(&self, customer_id: Uuid, product_id: Uuid) -> DatastoreResult<bool>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Atomic order creation: either the whole order exists afterwards or
    /// nothing does.
    async fn create_order(&self, slug: &str, order: &NewOrder) -> DatastoreResult<Uuid>;
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Wallet for a customer; an empty wallet when none exists yet.
    async fn wallet(&self, customer_id: Uuid) -> DatastoreResult<CashbackWallet>;

    /// Ledger entries, newest first.
    async fn transactions(&self, customer_id: Uuid) -> DatastoreResult<Vec<CashbackTransaction>>;

    /// Atomic debit tied to an order. `Ok(false)` means the store refused it
    /// (e.g. insufficient balance).
    async fn debit(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
        amount: Decimal,
    ) -> DatastoreResult<bool>;
}

#[async_trait]
pub trait SupportDesk: Send + Sync {
    async fn create_ticket(&self, ticket: &SupportTicket) -> DatastoreResult<Uuid>;
}

/// All boundary capabilities bundled for wiring.
#[derive(Clone)]
pub struct Datastore {
    pub tenants: Arc<dyn TenantDirectory>,
    pub catalog: Arc<dyn CatalogStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub orders: Arc<dyn OrderStore>,
    pub wallets: Arc<dyn WalletStore>,
    pub support: Arc<dyn SupportDesk>,
}

impl Datastore {
    /// Use one backend for every capability.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: TenantDirectory
            + CatalogStore
            + CustomerStore
            + OrderStore
            + WalletStore
            + SupportDesk
            + 'static,
    {
        Self {
            tenants: backend.clone(),
            catalog: backend.clone(),
            customers: backend.clone(),
            orders: backend.clone(),
            wallets: backend.clone(),
            support: backend,
        }
    }
}

/// Store settings with the default object substituted on error or absence.
pub async fn settings_or_default(catalog: &dyn CatalogStore, slug: &str) -> StoreSettings {
    match catalog.settings(slug).await {
        Ok(Some(settings)) => settings,
        Ok(None) => StoreSettings::default(),
        Err(e) => {
            warn!(slug = %slug, error = %e, "Settings fetch failed, using defaults");
            metrics::counter!("datastore.settings.fallback").increment(1);
            StoreSettings::default()
        }
    }
}

/// Orders placed in the last [`ORDER_HISTORY_MONTHS`] months.
pub async fn recent_orders(
    customers: &dyn CustomerStore,
    customer_id: Uuid,
    now: DateTime<Utc>,
) -> DatastoreResult<Vec<OrderSummary>> {
    let since = now
        .checked_sub_months(Months::new(ORDER_HISTORY_MONTHS))
        .unwrap_or_else(|| now - Duration::days(183));
    customers.orders_since(customer_id, since).await
}
