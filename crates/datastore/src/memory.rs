//! In-memory data store backed by DashMap. Used for local development and
//! tests; swap to [`crate::RestDatastore`] for hosted deployments.

use crate::error::{DatastoreError, DatastoreResult};
use crate::store::{CatalogStore, CustomerStore, OrderStore, SupportDesk, TenantDirectory, WalletStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use storefront_core::settings::{DeliveryConfig, StoreSettings, VipConfig};
use storefront_core::types::{
    CashbackTransaction, CashbackTransactionKind, CashbackWallet, Customer, DailyOffer, NewOrder,
    OrderSummary, PlanEntitlement, Product, ProfileUpdate, SupportTicket, Tenant, TenantStatus,
};
use tracing::info;
use uuid::Uuid;

struct StoredCustomer {
    tenant_slug: String,
    customer: Customer,
}

struct StoredOrder {
    customer_id: Uuid,
    summary: OrderSummary,
}

fn digits(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Whole platform state held in process.
#[derive(Default)]
pub struct InMemoryDatastore {
    tenants: DashMap<String, Tenant>,
    products: DashMap<String, Vec<Product>>,
    offers: DashMap<String, Vec<DailyOffer>>,
    settings: DashMap<String, StoreSettings>,
    customers: DashMap<Uuid, StoredCustomer>,
    orders: DashMap<Uuid, StoredOrder>,
    wallets: DashMap<Uuid, CashbackWallet>,
    transactions: DashMap<Uuid, Vec<CashbackTransaction>>,
    favorites: DashMap<Uuid, Vec<Uuid>>,
    tickets: DashMap<Uuid, SupportTicket>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_tenant(&self, tenant: Tenant) {
        self.tenants.insert(tenant.slug.clone(), tenant);
    }

    pub fn set_tenant_status(&self, slug: &str, status: TenantStatus, reason: Option<String>) {
        if let Some(mut tenant) = self.tenants.get_mut(slug) {
            tenant.status = status;
            tenant.blocked_reason = reason;
            info!(slug = %slug, status = %status, "Tenant status changed");
        }
    }

    pub fn set_products(&self, slug: &str, products: Vec<Product>) {
        self.products.insert(slug.to_string(), products);
    }

    pub fn set_offers(&self, slug: &str, offers: Vec<DailyOffer>) {
        self.offers.insert(slug.to_string(), offers);
    }

    pub fn set_settings(&self, slug: &str, settings: StoreSettings) {
        self.settings.insert(slug.to_string(), settings);
    }

    /// Register a customer directly (bypassing login), e.g. to seed VIPs.
    pub fn insert_customer(&self, slug: &str, customer: Customer) {
        self.customers.insert(
            customer.id,
            StoredCustomer {
                tenant_slug: slug.to_string(),
                customer,
            },
        );
    }

    pub fn customer(&self, customer_id: Uuid) -> Option<Customer> {
        self.customers
            .get(&customer_id)
            .map(|entry| entry.customer.clone())
    }

    /// Credit cashback, as the order-completion flow would.
    pub fn credit_wallet(&self, customer_id: Uuid, amount: Decimal) {
        let now = Utc::now();
        let mut wallet = self
            .wallets
            .entry(customer_id)
            .or_insert_with(|| CashbackWallet::empty(now));
        wallet.balance += amount;
        wallet.last_credit_at = Some(now);
        wallet.updated_at = now;
        drop(wallet);

        self.transactions
            .entry(customer_id)
            .or_default()
            .push(CashbackTransaction {
                id: Uuid::new_v4(),
                kind: CashbackTransactionKind::Credit,
                amount,
                order_id: None,
                expires_at: None,
                created_at: now,
            });
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn order(&self, order_id: Uuid) -> Option<OrderSummary> {
        self.orders.get(&order_id).map(|o| o.summary.clone())
    }

    pub fn tickets(&self) -> Vec<SupportTicket> {
        self.tickets.iter().map(|e| e.value().clone()).collect()
    }

    fn tenant_slug_of(&self, customer_id: Uuid) -> Option<String> {
        self.customers
            .get(&customer_id)
            .map(|entry| entry.tenant_slug.clone())
    }

    /// Seed three demo pharmacies in different lifecycle states.
    pub fn seed_demo(&self) {
        let active = demo_tenant("farmavida", "Farmavida", TenantStatus::Active);
        self.insert_tenant(active);
        self.set_products(
            "farmavida",
            vec![
                demo_product("Dipirona 500mg", Decimal::new(1290, 2), None),
                demo_product("Vitamina C 1g", Decimal::new(3490, 2), Some(Decimal::new(2990, 2))),
                demo_product("Protetor Solar FPS 50", Decimal::new(6990, 2), None),
            ],
        );
        self.set_settings(
            "farmavida",
            StoreSettings {
                delivery: DeliveryConfig {
                    fixed_fee: Decimal::new(590, 2),
                    free_shipping_threshold: Decimal::new(100, 0),
                    ..Default::default()
                },
                vip: VipConfig {
                    enabled: true,
                    discount_percentage: Decimal::new(10, 0),
                },
                ..Default::default()
            },
        );

        let mut suspended = demo_tenant("saude-mais", "Saúde Mais", TenantStatus::Suspended);
        suspended.blocked_reason = Some("Documentação pendente".into());
        self.insert_tenant(suspended);

        self.insert_tenant(demo_tenant(
            "drogaria-central",
            "Drogaria Central",
            TenantStatus::PastDue,
        ));

        info!("Demo tenants seeded");
    }
}

fn demo_tenant(slug: &str, name: &str, status: TenantStatus) -> Tenant {
    let mut features = BTreeMap::new();
    features.insert("cashback".to_string(), PlanEntitlement::Flag(true));
    features.insert("max_products".to_string(), PlanEntitlement::Limit(5000));
    Tenant {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        display_name: name.to_string(),
        logo_url: None,
        status,
        blocked_reason: None,
        plan_id: Some("plan_pro".into()),
        plan_code: Some("pro".into()),
        plan_name: Some("Profissional".into()),
        plan_features: features,
        whatsapp_number: None,
        store_base_url: None,
        admin_base_url: None,
        billing_provider: None,
    }
}

fn demo_product(name: &str, price: Decimal, promo: Option<Decimal>) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: String::new(),
        price,
        promotional_price: promo,
        category: "geral".into(),
        image: String::new(),
        requires_prescription: false,
        stock: 100,
    }
}

#[async_trait]
impl TenantDirectory for InMemoryDatastore {
    async fn find_by_slug(&self, slug: &str) -> DatastoreResult<Option<Tenant>> {
        Ok(self.tenants.get(slug).map(|t| t.value().clone()))
    }
}

#[async_trait]
impl CatalogStore for InMemoryDatastore {
    async fn products(&self, slug: &str) -> DatastoreResult<Vec<Product>> {
        Ok(self
            .products
            .get(slug)
            .map(|p| p.value().clone())
            .unwrap_or_default())
    }

    async fn daily_offers(&self, slug: &str) -> DatastoreResult<Vec<DailyOffer>> {
        Ok(self
            .offers
            .get(slug)
            .map(|o| o.iter().filter(|offer| offer.active).cloned().collect())
            .unwrap_or_default())
    }

    async fn settings(&self, slug: &str) -> DatastoreResult<Option<StoreSettings>> {
        Ok(self.settings.get(slug).map(|s| s.value().clone()))
    }
}

#[async_trait]
impl CustomerStore for InMemoryDatastore {
    async fn find_by_phone(&self, slug: &str, phone: &str) -> DatastoreResult<Option<Customer>> {
        let wanted = digits(phone);
        Ok(self
            .customers
            .iter()
            .find(|entry| entry.tenant_slug == slug && digits(&entry.customer.phone) == wanted)
            .map(|entry| entry.customer.clone()))
    }

    async fn login_or_register(
        &self,
        slug: &str,
        name: &str,
        phone: &str,
    ) -> DatastoreResult<Customer> {
        if !self.tenants.contains_key(slug) {
            return Err(DatastoreError::constraint(format!("store `{slug}` does not exist")));
        }
        if let Some(existing) = self.find_by_phone(slug, phone).await? {
            return Ok(existing);
        }

        let customer = Customer {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            phone: phone.to_string(),
            email: None,
            address: None,
            cpf: None,
            birth_date: None,
            tags: Vec::new(),
            created_at: Some(Utc::now()),
        };
        self.insert_customer(slug, customer.clone());
        info!(slug = %slug, customer_id = %customer.id, "Customer registered");
        Ok(customer)
    }

    async fn update_profile(
        &self,
        customer_id: Uuid,
        update: &ProfileUpdate,
    ) -> DatastoreResult<()> {
        let mut entry = self
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| DatastoreError::constraint("customer not found"))?;
        update.apply_to(&mut entry.customer);
        Ok(())
    }

    async fn orders_since(
        &self,
        customer_id: Uuid,
        since: DateTime<Utc>,
    ) -> DatastoreResult<Vec<OrderSummary>> {
        let mut orders: Vec<OrderSummary> = self
            .orders
            .iter()
            .filter(|o| o.customer_id == customer_id && o.summary.created_at >= since)
            .map(|o| o.summary.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn favorites(&self, customer_id: Uuid) -> DatastoreResult<Vec<Product>> {
        let Some(slug) = self.tenant_slug_of(customer_id) else {
            return Ok(Vec::new());
        };
        let ids = self
            .favorites
            .get(&customer_id)
            .map(|f| f.value().clone())
            .unwrap_or_default();
        let catalog = self.products(&slug).await?;
        Ok(catalog
            .into_iter()
            .filter(|p| ids.contains(&p.id))
            .collect())
    }

    async fn toggle_favorite(&self, customer_id: Uuid, product_id: Uuid) -> DatastoreResult<bool> {
        let mut favorites = self.favorites.entry(customer_id).or_default();
        if let Some(pos) = favorites.iter().position(|id| *id == product_id) {
            favorites.remove(pos);
            Ok(false)
        } else {
            favorites.push(product_id);
            Ok(true)
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryDatastore {
    async fn create_order(&self, slug: &str, order: &NewOrder) -> DatastoreResult<Uuid> {
        // Validate everything first; the single insert below is the commit point.
        if !self.tenants.contains_key(slug) {
            return Err(DatastoreError::constraint(format!("store `{slug}` does not exist")));
        }
        match self.tenant_slug_of(order.customer_id) {
            Some(owner) if owner == slug => {}
            _ => return Err(DatastoreError::constraint("customer does not belong to this store")),
        }
        if order.items.is_empty() {
            return Err(DatastoreError::constraint("order has no items"));
        }

        let catalog = self.products(slug).await?;
        for line in &order.items {
            if line.quantity == 0 {
                return Err(DatastoreError::constraint("item quantity must be positive"));
            }
            if line.price < Decimal::ZERO {
                return Err(DatastoreError::constraint("item price must not be negative"));
            }
            if !catalog.iter().any(|p| p.id == line.product_id) {
                return Err(DatastoreError::constraint(format!(
                    "product {} is not available in this store",
                    line.product_id
                )));
            }
        }

        let id = Uuid::new_v4();
        let summary = OrderSummary {
            id,
            total: order.total,
            status: "pending".into(),
            created_at: Utc::now(),
            address: Some(order.address.clone()).filter(|a| !a.is_empty()),
            payment_method: order.payment_method,
            delivery_method: order.delivery_method,
            items: order.items.clone(),
        };
        self.orders.insert(
            id,
            StoredOrder {
                customer_id: order.customer_id,
                summary,
            },
        );
        info!(slug = %slug, order_id = %id, total = %order.total, "Order stored");
        Ok(id)
    }
}

#[async_trait]
impl WalletStore for InMemoryDatastore {
    async fn wallet(&self, customer_id: Uuid) -> DatastoreResult<CashbackWallet> {
        Ok(self
            .wallets
            .get(&customer_id)
            .map(|w| w.value().clone())
            .unwrap_or_else(|| CashbackWallet::empty(Utc::now())))
    }

    async fn transactions(&self, customer_id: Uuid) -> DatastoreResult<Vec<CashbackTransaction>> {
        let mut entries = self
            .transactions
            .get(&customer_id)
            .map(|t| t.value().clone())
            .unwrap_or_default();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn debit(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
        amount: Decimal,
    ) -> DatastoreResult<bool> {
        if amount <= Decimal::ZERO {
            return Ok(false);
        }
        match self.orders.get(&order_id) {
            Some(order) if order.customer_id == customer_id => {}
            _ => return Ok(false),
        }

        let now = Utc::now();
        {
            let Some(mut wallet) = self.wallets.get_mut(&customer_id) else {
                return Ok(false);
            };
            if wallet.balance < amount {
                return Ok(false);
            }
            wallet.balance -= amount;
            wallet.last_debit_at = Some(now);
            wallet.updated_at = now;
        }

        self.transactions
            .entry(customer_id)
            .or_default()
            .push(CashbackTransaction {
                id: Uuid::new_v4(),
                kind: CashbackTransactionKind::Debit,
                amount,
                order_id: Some(order_id),
                expires_at: None,
                created_at: now,
            });
        Ok(true)
    }
}

#[async_trait]
impl SupportDesk for InMemoryDatastore {
    async fn create_ticket(&self, ticket: &SupportTicket) -> DatastoreResult<Uuid> {
        if !self
            .tenants
            .iter()
            .any(|t| t.value().id == ticket.tenant_id)
        {
            return Err(DatastoreError::constraint("unknown tenant"));
        }
        let id = Uuid::new_v4();
        self.tickets.insert(id, ticket.clone());
        Ok(id)
    }
}
