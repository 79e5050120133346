//! PostgREST-style client for the hosted data store.
//!
//! Reads go through security-definer RPCs (`POST /rest/v1/rpc/<fn>`) that set
//! the tenant context server-side; the few plain views are read with
//! `GET /rest/v1/<view>?<col>=eq.<value>`.

use crate::error::{DatastoreError, DatastoreResult};
use crate::store::{CatalogStore, CustomerStore, OrderStore, SupportDesk, TenantDirectory, WalletStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use storefront_core::config::DatastoreConfig;
use storefront_core::settings::{
    Appearance, DeliveryConfig, DeliveryMethods, FeeType, PaymentConfig, PharmacyInfo,
    StoreSettings, StorefrontContent, VipConfig,
};
use storefront_core::types::{
    CashbackTransaction, CashbackTransactionKind, CashbackWallet, Customer, DailyOffer, NewOrder,
    OrderLine, OrderSummary, PaymentProviderKind, PlanEntitlement, Product, ProfileUpdate,
    SupportTicket, Tenant, TenantStatus,
};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

pub struct RestDatastore {
    client: Client,
    base: Url,
    api_key: String,
}

impl RestDatastore {
    pub fn new(config: &DatastoreConfig) -> DatastoreResult<Self> {
        let mut base = Url::parse(&config.url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base,
            api_key: config.api_key.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        function: &str,
        args: serde_json::Value,
    ) -> DatastoreResult<T> {
        let url = self.base.join(&format!("rest/v1/rpc/{function}"))?;
        debug!(function = function, "Data store RPC");
        metrics::counter!("datastore.rpc.calls").increment(1);

        let response = self
            .authorize(self.client.post(url))
            .json(&args)
            .send()
            .await?;
        decode(function, response).await
    }

    /// RPC whose result is irrelevant (void functions answer 204).
    async fn rpc_void(&self, function: &str, args: serde_json::Value) -> DatastoreResult<()> {
        let url = self.base.join(&format!("rest/v1/rpc/{function}"))?;
        metrics::counter!("datastore.rpc.calls").increment(1);
        let response = self
            .authorize(self.client.post(url))
            .json(&args)
            .send()
            .await?;
        ensure_success(function, response).await?;
        Ok(())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        view: &str,
        columns: &str,
        filters: &[(&str, String)],
        order: Option<&str>,
    ) -> DatastoreResult<Vec<T>> {
        let mut url = self.base.join(&format!("rest/v1/{view}"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", columns);
            for (column, value) in filters {
                query.append_pair(column, &format!("eq.{value}"));
            }
            if let Some(order) = order {
                query.append_pair("order", order);
            }
        }
        let response = self.authorize(self.client.get(url)).send().await?;
        decode(view, response).await
    }
}

#[derive(Deserialize)]
struct PostgrestError {
    message: String,
}

async fn ensure_success(call: &str, response: Response) -> DatastoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<PostgrestError>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    warn!(call = call, status = status.as_u16(), message = %message, "Data store rejected call");
    metrics::counter!("datastore.rpc.rejected").increment(1);
    Err(DatastoreError::Rejected {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(call: &str, response: Response) -> DatastoreResult<T> {
    Ok(ensure_success(call, response).await?.json().await?)
}

// ─── Row mappings ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TenantRow {
    tenant_id: Uuid,
    tenant_slug: String,
    tenant_name: String,
    tenant_status: TenantStatus,
    #[serde(default)]
    logo_url: Option<String>,
    #[serde(default)]
    blocked_reason: Option<String>,
    #[serde(default)]
    plan_id: Option<String>,
    #[serde(default)]
    plan_code: Option<String>,
    #[serde(default)]
    plan_name: Option<String>,
    #[serde(default)]
    plan_features: Option<BTreeMap<String, PlanEntitlement>>,
    #[serde(default)]
    whatsapp_number: Option<String>,
    #[serde(default)]
    store_base_url: Option<String>,
    #[serde(default)]
    admin_base_url: Option<String>,
    #[serde(default)]
    billing_provider: Option<String>,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            id: row.tenant_id,
            slug: row.tenant_slug,
            display_name: row.tenant_name,
            logo_url: row.logo_url,
            status: row.tenant_status,
            blocked_reason: row.blocked_reason,
            plan_id: row.plan_id,
            plan_code: row.plan_code,
            plan_name: row.plan_name,
            plan_features: row.plan_features.unwrap_or_default(),
            whatsapp_number: row.whatsapp_number,
            store_base_url: row.store_base_url,
            admin_base_url: row.admin_base_url,
            billing_provider: row
                .billing_provider
                .and_then(|p| p.parse::<PaymentProviderKind>().ok()),
        }
    }
}

#[derive(Deserialize)]
struct ProductRow {
    id: Uuid,
    name: String,
    #[serde(default)]
    description: Option<String>,
    price: Decimal,
    #[serde(default)]
    promotional_price: Option<Decimal>,
    #[serde(default)]
    images: Option<Vec<String>>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    requires_prescription: Option<bool>,
    #[serde(default)]
    total_stock: Option<i64>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description.unwrap_or_default(),
            price: row.price,
            promotional_price: row.promotional_price,
            image: row
                .images
                .and_then(|images| images.into_iter().next())
                .unwrap_or_default(),
            category: row.category.unwrap_or_default(),
            requires_prescription: row.requires_prescription.unwrap_or(false),
            stock: row
                .total_stock
                .map(|s| u32::try_from(s.max(0)).unwrap_or(u32::MAX))
                .unwrap_or(0),
        }
    }
}

#[derive(Deserialize)]
struct FavoriteRow {
    product: ProductRow,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DeliveryConfigColumn {
    #[serde(default)]
    methods: Option<DeliveryMethods>,
    #[serde(default)]
    fixed_fee: Option<Decimal>,
    #[serde(default)]
    free_shipping_threshold: Option<Decimal>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PaymentConfigColumn {
    #[serde(default)]
    pix_enabled: Option<bool>,
    #[serde(default)]
    max_installments: Option<u8>,
}

/// Flat settings row. Null columns fall back to the typed defaults.
#[derive(Deserialize)]
struct SettingsRow {
    pharmacy_name: Option<String>,
    cnpj: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    opening_hours: Option<String>,
    logo_url: Option<String>,
    primary_color: Option<String>,
    secondary_color: Option<String>,
    border_radius: Option<String>,
    delivery_config: Option<DeliveryConfigColumn>,
    minimum_order_value: Option<Decimal>,
    payment_config: Option<PaymentConfigColumn>,
    vip_enabled: Option<bool>,
    vip_discount_percentage: Option<Decimal>,
    welcome_message: Option<String>,
    welcome_message_bg_color: Option<String>,
    welcome_message_text_color: Option<String>,
    banner_url: Option<String>,
}

impl From<SettingsRow> for StoreSettings {
    fn from(row: SettingsRow) -> Self {
        let defaults = StoreSettings::default();
        let delivery = row.delivery_config.unwrap_or_default();
        let payment = row.payment_config.unwrap_or_default();

        StoreSettings {
            pharmacy: PharmacyInfo {
                name: row.pharmacy_name.unwrap_or(defaults.pharmacy.name),
                cnpj: row.cnpj.unwrap_or_default(),
                address: row.address.unwrap_or_default(),
                phone: row.phone.unwrap_or_default(),
                email: row.email.unwrap_or_default(),
                opening_hours: row.opening_hours.unwrap_or_default(),
                logo_url: row.logo_url.unwrap_or_default(),
            },
            appearance: Appearance {
                primary_color: row.primary_color.unwrap_or(defaults.appearance.primary_color),
                secondary_color: row
                    .secondary_color
                    .unwrap_or(defaults.appearance.secondary_color),
                border_radius: row.border_radius.unwrap_or(defaults.appearance.border_radius),
            },
            delivery: DeliveryConfig {
                methods: delivery.methods.unwrap_or(defaults.delivery.methods),
                fee_type: FeeType::Fixed,
                fixed_fee: delivery.fixed_fee.unwrap_or_default(),
                free_shipping_threshold: delivery.free_shipping_threshold.unwrap_or_default(),
                minimum_order_value: row.minimum_order_value,
            },
            payment: PaymentConfig {
                pix_enabled: payment.pix_enabled != Some(false),
                max_installments: payment
                    .max_installments
                    .unwrap_or(defaults.payment.max_installments),
            },
            vip: VipConfig {
                enabled: row.vip_enabled.unwrap_or(false),
                discount_percentage: row.vip_discount_percentage.unwrap_or_default(),
            },
            store: StorefrontContent {
                welcome_message: row.welcome_message.unwrap_or_default(),
                welcome_message_bg_color: row
                    .welcome_message_bg_color
                    .unwrap_or(defaults.store.welcome_message_bg_color),
                welcome_message_text_color: row
                    .welcome_message_text_color
                    .unwrap_or(defaults.store.welcome_message_text_color),
                banner_url: row.banner_url.unwrap_or_default(),
            },
        }
    }
}

#[derive(Deserialize)]
struct CustomerRow {
    id: Uuid,
    name: String,
    phone: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    cpf: Option<String>,
    #[serde(default)]
    birth_date: Option<NaiveDate>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        let blank_to_none = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Customer {
            id: row.id,
            name: row.name,
            phone: row.phone,
            email: blank_to_none(row.email),
            address: blank_to_none(row.address),
            cpf: blank_to_none(row.cpf),
            birth_date: row.birth_date,
            tags: row.tags.unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

#[derive(Deserialize)]
struct CustomerCheck {
    exists: bool,
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

#[derive(Deserialize)]
struct OrderRow {
    id: Uuid,
    total_amount: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    delivery_address: Option<String>,
    payment_method: storefront_core::types::PaymentMethod,
    delivery_method: storefront_core::types::DeliveryMethod,
    #[serde(default)]
    items: Option<Vec<OrderLine>>,
}

impl From<OrderRow> for OrderSummary {
    fn from(row: OrderRow) -> Self {
        OrderSummary {
            id: row.id,
            total: row.total_amount,
            status: row.status,
            created_at: row.created_at,
            address: row.delivery_address,
            payment_method: row.payment_method,
            delivery_method: row.delivery_method,
            items: row.items.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct WalletRow {
    saldo_atual: Decimal,
    #[serde(default)]
    ultimo_credito: Option<DateTime<Utc>>,
    #[serde(default)]
    ultimo_debito: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum TransactionKindColumn {
    Credito,
    Debito,
    Expirado,
}

#[derive(Deserialize)]
struct TransactionRow {
    id: Uuid,
    tipo: TransactionKindColumn,
    valor: Decimal,
    #[serde(default)]
    order_id: Option<Uuid>,
    #[serde(default)]
    data_expiracao: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<TransactionRow> for CashbackTransaction {
    fn from(row: TransactionRow) -> Self {
        CashbackTransaction {
            id: row.id,
            kind: match row.tipo {
                TransactionKindColumn::Credito => CashbackTransactionKind::Credit,
                TransactionKindColumn::Debito => CashbackTransactionKind::Debit,
                TransactionKindColumn::Expirado => CashbackTransactionKind::Expired,
            },
            amount: row.valor,
            order_id: row.order_id,
            expires_at: row.data_expiracao,
            created_at: row.created_at,
        }
    }
}

#[derive(Serialize)]
struct OrderItemArg {
    product_id: Uuid,
    quantity: u32,
    price: Decimal,
}

#[derive(Deserialize)]
struct InsertedRow {
    id: Uuid,
}

// ─── Boundary implementations ───────────────────────────────────────────────

#[async_trait]
impl TenantDirectory for RestDatastore {
    async fn find_by_slug(&self, slug: &str) -> DatastoreResult<Option<Tenant>> {
        let rows: Vec<TenantRow> = self
            .select("tenant_with_plan", "*", &[("tenant_slug", slug.to_string())], None)
            .await?;
        Ok(rows.into_iter().next().map(Tenant::from))
    }
}

#[async_trait]
impl CatalogStore for RestDatastore {
    async fn products(&self, slug: &str) -> DatastoreResult<Vec<Product>> {
        let rows: Vec<ProductRow> = self
            .rpc("get_store_products_with_batches", json!({ "p_slug": slug }))
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn daily_offers(&self, slug: &str) -> DatastoreResult<Vec<DailyOffer>> {
        self.rpc("get_store_offers_rpc", json!({ "p_slug": slug }))
            .await
    }

    async fn settings(&self, slug: &str) -> DatastoreResult<Option<StoreSettings>> {
        let rows: Vec<SettingsRow> = self
            .rpc("get_store_settings", json!({ "p_slug": slug }))
            .await?;
        Ok(rows.into_iter().next().map(StoreSettings::from))
    }
}

#[async_trait]
impl CustomerStore for RestDatastore {
    async fn find_by_phone(&self, slug: &str, phone: &str) -> DatastoreResult<Option<Customer>> {
        let check: Option<CustomerCheck> = self
            .rpc("check_customer_v2", json!({ "p_slug": slug, "p_phone": phone }))
            .await?;
        Ok(check.filter(|c| c.exists).and_then(|c| {
            Some(Customer {
                id: c.id?,
                name: c.name.unwrap_or_default(),
                phone: c.phone.unwrap_or_else(|| phone.to_string()),
                email: None,
                address: None,
                cpf: None,
                birth_date: None,
                tags: Vec::new(),
                created_at: None,
            })
        }))
    }

    async fn login_or_register(
        &self,
        slug: &str,
        name: &str,
        phone: &str,
    ) -> DatastoreResult<Customer> {
        let row: Option<CustomerRow> = self
            .rpc(
                "login_or_register_customer_v2",
                json!({ "p_slug": slug, "p_name": name, "p_phone": phone }),
            )
            .await?;
        let mut customer = row
            .map(Customer::from)
            .ok_or_else(|| DatastoreError::Decode("login returned no customer".into()))?;
        if customer.created_at.is_none() {
            customer.created_at = Some(Utc::now());
        }
        Ok(customer)
    }

    async fn update_profile(
        &self,
        customer_id: Uuid,
        update: &ProfileUpdate,
    ) -> DatastoreResult<()> {
        self.rpc_void(
                "update_customer_profile",
                json!({
                    "p_id": customer_id,
                    "p_name": update.name,
                    "p_email": update.email,
                    "p_address": update.address,
                    "p_cpf": update.cpf,
                    "p_birth_date": update.birth_date,
                }),
            )
            .await
    }

    async fn orders_since(
        &self,
        customer_id: Uuid,
        since: DateTime<Utc>,
    ) -> DatastoreResult<Vec<OrderSummary>> {
        let rows: Vec<OrderRow> = self
            .rpc("get_customer_orders", json!({ "p_customer_id": customer_id }))
            .await?;
        let mut orders: Vec<OrderSummary> = rows
            .into_iter()
            .map(OrderSummary::from)
            .filter(|o| o.created_at >= since)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn favorites(&self, customer_id: Uuid) -> DatastoreResult<Vec<Product>> {
        let rows: Vec<FavoriteRow> = self
            .rpc("get_customer_favorites", json!({ "p_user_id": customer_id }))
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| Product {
                stock: 0,
                ..Product::from(row.product)
            })
            .collect())
    }

    async fn toggle_favorite(&self, customer_id: Uuid, product_id: Uuid) -> DatastoreResult<bool> {
        self.rpc(
            "toggle_customer_favorite",
            json!({ "p_user_id": customer_id, "p_product_id": product_id }),
        )
        .await
    }
}

#[async_trait]
impl OrderStore for RestDatastore {
    async fn create_order(&self, slug: &str, order: &NewOrder) -> DatastoreResult<Uuid> {
        let items: Vec<OrderItemArg> = order
            .items
            .iter()
            .map(|line| OrderItemArg {
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
            })
            .collect();
        self.rpc(
            "create_complete_order_v2",
            json!({
                "p_slug": slug,
                "p_customer_id": order.customer_id,
                "p_items": items,
                "p_total": order.total,
                "p_payment_method": order.payment_method.as_str(),
                "p_delivery_method": order.delivery_method.as_str(),
                "p_address": order.address,
                "p_delivery_fee": order.delivery_fee,
            }),
        )
        .await
    }
}

#[async_trait]
impl WalletStore for RestDatastore {
    async fn wallet(&self, customer_id: Uuid) -> DatastoreResult<CashbackWallet> {
        let rows: Vec<WalletRow> = self
            .select(
                "cashback_wallet",
                "saldo_atual,ultimo_credito,ultimo_debito,updated_at",
                &[("customer_id", customer_id.to_string())],
                None,
            )
            .await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| CashbackWallet {
                balance: row.saldo_atual,
                last_credit_at: row.ultimo_credito,
                last_debit_at: row.ultimo_debito,
                updated_at: row.updated_at,
            })
            .unwrap_or_else(|| CashbackWallet::empty(Utc::now())))
    }

    async fn transactions(&self, customer_id: Uuid) -> DatastoreResult<Vec<CashbackTransaction>> {
        let rows: Vec<TransactionRow> = self
            .select(
                "cashback_transactions",
                "*",
                &[("customer_id", customer_id.to_string())],
                Some("created_at.desc"),
            )
            .await?;
        Ok(rows.into_iter().map(CashbackTransaction::from).collect())
    }

    async fn debit(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
        amount: Decimal,
    ) -> DatastoreResult<bool> {
        self.rpc(
            "use_cashback",
            json!({
                "p_order_id": order_id,
                "p_customer_id": customer_id,
                "p_amount_to_use": amount,
            }),
        )
        .await
    }
}

#[async_trait]
impl SupportDesk for RestDatastore {
    async fn create_ticket(&self, ticket: &SupportTicket) -> DatastoreResult<Uuid> {
        let url = self.base.join("rest/v1/support_tickets")?;
        let response = self
            .authorize(self.client.post(url))
            .header("Prefer", "return=representation")
            .json(ticket)
            .send()
            .await?;
        let rows: Vec<InsertedRow> = decode("support_tickets", response).await?;
        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| DatastoreError::Decode("ticket insert returned no row".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> RestDatastore {
        RestDatastore::new(&DatastoreConfig {
            url: server.uri(),
            api_key: "anon-key".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_products_map_rows_and_send_credentials() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_store_products_with_batches"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .and(body_partial_json(json!({ "p_slug": "farmavida" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": id,
                "name": "Dipirona",
                "description": null,
                "price": 12.9,
                "promotional_price": 9.9,
                "images": ["a.png", "b.png"],
                "category": "analgesicos",
                "requires_prescription": false,
                "total_stock": 7
            }])))
            .mount(&server)
            .await;

        let products = client_for(&server).products("farmavida").await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, id);
        assert_eq!(products[0].image, "a.png");
        assert_eq!(products[0].stock, 7);
        assert_eq!(products[0].effective_price(), dec!(9.9));
    }

    #[tokio::test]
    async fn test_tenant_lookup_reads_view_columns() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/rest/v1/tenant_with_plan"))
            .and(query_param("tenant_slug", "eq.farmavida"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "tenant_id": id,
                "tenant_slug": "farmavida",
                "tenant_name": "Farmavida",
                "tenant_status": "past_due",
                "plan_code": "pro",
                "plan_features": { "cashback": true, "max_products": 100 },
                "billing_provider": "stripe"
            }])))
            .mount(&server)
            .await;

        let tenant = client_for(&server)
            .find_by_slug("farmavida")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tenant.id, id);
        assert_eq!(tenant.status, TenantStatus::PastDue);
        assert!(tenant.plan_feature("cashback"));
        assert_eq!(tenant.billing_provider, Some(PaymentProviderKind::Stripe));
    }

    #[tokio::test]
    async fn test_missing_tenant_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/tenant_with_plan"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(client_for(&server).find_by_slug("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejection_message_is_kept_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/create_complete_order_v2"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "P0001",
                "message": "Produto sem estoque suficiente"
            })))
            .mount(&server)
            .await;

        let order = NewOrder {
            customer_id: Uuid::new_v4(),
            customer_name: "Ana".into(),
            customer_phone: "11987654321".into(),
            address: String::new(),
            items: vec![],
            total: dec!(10),
            payment_method: storefront_core::types::PaymentMethod::Pix,
            delivery_method: storefront_core::types::DeliveryMethod::Pickup,
            delivery_fee: Decimal::ZERO,
            cashback_applied: Decimal::ZERO,
        };
        let err = client_for(&server)
            .create_order("farmavida", &order)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Produto sem estoque suficiente");
        assert!(matches!(err, DatastoreError::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_settings_row_fills_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_store_settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "pharmacy_name": "Farmavida",
                "delivery_config": { "fixedFee": 7.5, "freeShippingThreshold": 120 },
                "payment_config": null,
                "vip_enabled": true,
                "vip_discount_percentage": 15
            }])))
            .mount(&server)
            .await;

        let settings = client_for(&server).settings("farmavida").await.unwrap().unwrap();
        assert_eq!(settings.pharmacy.name, "Farmavida");
        assert_eq!(settings.delivery.fixed_fee, dec!(7.5));
        assert_eq!(settings.delivery.free_shipping_threshold(), Some(dec!(120)));
        assert!(settings.delivery.methods.delivery);
        assert!(settings.payment.pix_enabled);
        assert_eq!(settings.vip.effective_percentage(), dec!(15));
        assert_eq!(settings.appearance, StoreSettings::default().appearance);
    }

    #[tokio::test]
    async fn test_empty_wallet_and_ledger_mapping() {
        let server = MockServer::start().await;
        let customer_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/rest/v1/cashback_wallet"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/cashback_transactions"))
            .and(query_param("order", "created_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": Uuid::new_v4(),
                "tipo": "debito",
                "valor": 5,
                "created_at": "2026-01-10T12:00:00Z"
            }])))
            .mount(&server)
            .await;

        let store = client_for(&server);
        assert_eq!(store.wallet(customer_id).await.unwrap().balance, Decimal::ZERO);
        let ledger = store.transactions(customer_id).await.unwrap();
        assert_eq!(ledger[0].kind, CashbackTransactionKind::Debit);
        assert_eq!(ledger[0].amount, dec!(5));
    }
}
