use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use storefront_checkout::{AccountService, CheckoutError, CheckoutRequest, OrderSubmitter, Session};
use storefront_core::settings::StoreSettings;
use storefront_core::types::{
    CashbackTransaction, CashbackWallet, Customer, DeliveryMethod, NewOrder, OrderSummary,
    PaymentMethod, Product, ProfileUpdate, VIP_TAG,
};
use storefront_core::ValidationError;
use storefront_datastore::{
    settings_or_default, CatalogStore, CustomerStore, DatastoreError, DatastoreResult,
    InMemoryDatastore, OrderStore, WalletStore,
};
use uuid::Uuid;

const SLUG: &str = "farmavida";

struct Fixture {
    store: Arc<InMemoryDatastore>,
    accounts: AccountService,
    settings: StoreSettings,
}

impl Fixture {
    async fn new() -> Self {
        let store = Arc::new(InMemoryDatastore::new());
        store.seed_demo();
        let settings = settings_or_default(store.as_ref(), SLUG).await;
        let accounts = AccountService::new(store.clone(), store.clone());
        Self {
            store,
            accounts,
            settings,
        }
    }

    fn submitter(&self) -> OrderSubmitter {
        OrderSubmitter::new(self.store.clone(), self.store.clone(), self.store.clone())
    }

    async fn product(&self, name_prefix: &str) -> Product {
        self.store
            .products(SLUG)
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.name.starts_with(name_prefix))
            .unwrap()
    }

    async fn logged_in(&self) -> Session {
        let mut session = Session::default();
        self.accounts
            .login(SLUG, &mut session, Some("Ana"), "(11) 91234-5678")
            .await
            .unwrap();
        session
    }
}

fn request(method: DeliveryMethod, address: &str) -> CheckoutRequest {
    CheckoutRequest {
        delivery_method: method,
        payment_method: PaymentMethod::Pix,
        address: address.into(),
        complement: None,
        apply_cashback: false,
    }
}

#[tokio::test]
async fn test_delivery_order_end_to_end() {
    let fx = Fixture::new().await;
    let mut session = fx.logged_in().await;
    session.cart.add(fx.product("Dipirona").await, 2);

    let mut req = request(DeliveryMethod::Delivery, "Rua A, 10");
    req.complement = Some("Apto 3".into());
    let receipt = fx
        .submitter()
        .submit(SLUG, &mut session, &fx.settings, &req)
        .await
        .unwrap();

    assert_eq!(receipt.pricing.subtotal, dec!(25.80));
    assert_eq!(receipt.pricing.delivery_fee, dec!(5.90));
    assert_eq!(receipt.pricing.total, dec!(31.70));
    assert!(receipt.cashback_warning.is_none());
    assert!(session.cart.is_empty());

    let stored = fx.store.order(receipt.order_id).unwrap();
    assert_eq!(stored.total, dec!(31.70));
    assert_eq!(stored.address.as_deref(), Some("Rua A, 10 - Apto 3"));

    // The delivery address is remembered on the profile.
    let customer_id = session.customer.as_ref().map(|c| c.id).unwrap();
    assert_eq!(
        fx.store.customer(customer_id).and_then(|c| c.address).as_deref(),
        Some("Rua A, 10 - Apto 3")
    );
}

#[tokio::test]
async fn test_pickup_without_address_is_free_of_fee() {
    let fx = Fixture::new().await;
    let mut session = fx.logged_in().await;
    session.cart.add(fx.product("Dipirona").await, 1);

    let receipt = fx
        .submitter()
        .submit(SLUG, &mut session, &fx.settings, &request(DeliveryMethod::Pickup, ""))
        .await
        .unwrap();
    assert_eq!(receipt.pricing.delivery_fee, Decimal::ZERO);
    assert_eq!(receipt.pricing.total, dec!(12.90));
}

#[tokio::test]
async fn test_delivery_without_address_is_rejected_locally() {
    let fx = Fixture::new().await;
    let mut session = fx.logged_in().await;
    session.cart.add(fx.product("Dipirona").await, 1);

    let err = fx
        .submitter()
        .submit(SLUG, &mut session, &fx.settings, &request(DeliveryMethod::Delivery, "  "))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Invalid(ValidationError::MissingAddress)));
    assert_eq!(fx.store.order_count(), 0);
    assert_eq!(session.cart.count(), 1);
}

#[tokio::test]
async fn test_anonymous_checkout_is_rejected() {
    let fx = Fixture::new().await;
    let mut session = Session::default();
    session.cart.add(fx.product("Dipirona").await, 1);

    let err = fx
        .submitter()
        .submit(SLUG, &mut session, &fx.settings, &request(DeliveryMethod::Pickup, ""))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Invalid(ValidationError::NotIdentified)));
}

#[tokio::test]
async fn test_vip_line_prices_match_total() {
    let fx = Fixture::new().await;
    fx.store.insert_customer(
        SLUG,
        Customer {
            id: Uuid::new_v4(),
            name: "Bia".into(),
            phone: "11955554444".into(),
            email: None,
            address: Some("Rua B, 20".into()),
            cpf: None,
            birth_date: None,
            tags: vec![VIP_TAG.into()],
            created_at: None,
        },
    );
    let mut session = Session::default();
    fx.accounts
        .login(SLUG, &mut session, None, "11955554444")
        .await
        .unwrap();
    session.cart.add(fx.product("Vitamina C").await, 3);

    let receipt = fx
        .submitter()
        .submit(SLUG, &mut session, &fx.settings, &request(DeliveryMethod::Delivery, "Rua B, 20"))
        .await
        .unwrap();

    assert!(receipt.pricing.is_vip);
    assert_eq!(receipt.pricing.subtotal, dec!(89.70));
    assert_eq!(receipt.pricing.vip_discount, dec!(8.97));
    assert_eq!(receipt.pricing.total, dec!(86.63));

    let stored = fx.store.order(receipt.order_id).unwrap();
    let lines: Decimal = stored
        .items
        .iter()
        .map(|l| l.price * Decimal::from(l.quantity))
        .sum();
    assert_eq!(lines, dec!(80.73));
}

#[tokio::test]
async fn test_cashback_is_debited() {
    let fx = Fixture::new().await;
    let mut session = fx.logged_in().await;
    let customer_id = session.customer.as_ref().map(|c| c.id).unwrap();
    fx.store.credit_wallet(customer_id, dec!(5));
    session.cart.add(fx.product("Dipirona").await, 1);

    let mut req = request(DeliveryMethod::Pickup, "");
    req.apply_cashback = true;
    let receipt = fx
        .submitter()
        .submit(SLUG, &mut session, &fx.settings, &req)
        .await
        .unwrap();

    assert_eq!(receipt.pricing.cashback_discount, dec!(5));
    assert_eq!(receipt.pricing.total, dec!(7.90));
    assert!(receipt.cashback_warning.is_none());
    assert_eq!(fx.store.wallet(customer_id).await.unwrap().balance, dec!(0));
}

/// Reports a balance but refuses every debit.
struct RefusingWallet;

#[async_trait]
impl WalletStore for RefusingWallet {
    async fn wallet(&self, _customer_id: Uuid) -> DatastoreResult<CashbackWallet> {
        let mut wallet = CashbackWallet::empty(chrono::Utc::now());
        wallet.balance = dec!(10);
        Ok(wallet)
    }

    async fn transactions(&self, _customer_id: Uuid) -> DatastoreResult<Vec<CashbackTransaction>> {
        Ok(Vec::new())
    }

    async fn debit(&self, _order: Uuid, _customer: Uuid, _amount: Decimal) -> DatastoreResult<bool> {
        Ok(false)
    }
}

#[tokio::test]
async fn test_refused_debit_keeps_order_and_warns() {
    let fx = Fixture::new().await;
    let mut session = fx.logged_in().await;
    session.cart.add(fx.product("Dipirona").await, 1);

    let submitter = OrderSubmitter::new(fx.store.clone(), fx.store.clone(), Arc::new(RefusingWallet));
    let mut req = request(DeliveryMethod::Delivery, "Rua A, 10");
    req.apply_cashback = true;
    let receipt = submitter
        .submit(SLUG, &mut session, &fx.settings, &req)
        .await
        .unwrap();

    assert_eq!(receipt.pricing.total, dec!(8.80));
    assert!(receipt.cashback_warning.is_some());
    assert!(fx.store.order(receipt.order_id).is_some());
    assert!(session.cart.is_empty());
}

struct RejectingOrders;

#[async_trait]
impl OrderStore for RejectingOrders {
    async fn create_order(&self, _slug: &str, _order: &NewOrder) -> DatastoreResult<Uuid> {
        Err(DatastoreError::Rejected {
            status: 400,
            message: "Estoque insuficiente para Dipirona 500mg".into(),
        })
    }
}

#[tokio::test]
async fn test_failed_submission_keeps_cart_and_message() {
    let fx = Fixture::new().await;
    let mut session = fx.logged_in().await;
    session.cart.add(fx.product("Dipirona").await, 4);

    let submitter =
        OrderSubmitter::new(Arc::new(RejectingOrders), fx.store.clone(), fx.store.clone());
    let err = submitter
        .submit(SLUG, &mut session, &fx.settings, &request(DeliveryMethod::Pickup, ""))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Submission(_)));
    assert_eq!(err.to_string(), "Estoque insuficiente para Dipirona 500mg");
    assert_eq!(session.cart.count(), 4);
}

#[tokio::test]
async fn test_pickup_with_address_updates_profile() {
    let fx = Fixture::new().await;
    let mut session = fx.logged_in().await;
    let customer_id = session.customer.as_ref().map(|c| c.id).unwrap();
    session.cart.add(fx.product("Dipirona").await, 1);

    let receipt = fx
        .submitter()
        .submit(SLUG, &mut session, &fx.settings, &request(DeliveryMethod::Pickup, "Rua C, 5"))
        .await
        .unwrap();

    assert_eq!(receipt.pricing.total, dec!(12.90));
    assert_eq!(
        fx.store.customer(customer_id).and_then(|c| c.address).as_deref(),
        Some("Rua C, 5")
    );
    assert_eq!(
        session.customer.as_ref().and_then(|c| c.address.as_deref()),
        Some("Rua C, 5")
    );
}

/// Customer store that serves reads but cannot save profile changes.
struct ReadOnlyProfiles(Arc<InMemoryDatastore>);

#[async_trait]
impl CustomerStore for ReadOnlyProfiles {
    async fn find_by_phone(&self, slug: &str, phone: &str) -> DatastoreResult<Option<Customer>> {
        self.0.find_by_phone(slug, phone).await
    }

    async fn login_or_register(
        &self,
        slug: &str,
        name: &str,
        phone: &str,
    ) -> DatastoreResult<Customer> {
        self.0.login_or_register(slug, name, phone).await
    }

    async fn update_profile(
        &self,
        _customer_id: Uuid,
        _update: &ProfileUpdate,
    ) -> DatastoreResult<()> {
        Err(DatastoreError::Transport("connection reset".into()))
    }

    async fn orders_since(
        &self,
        customer_id: Uuid,
        since: DateTime<Utc>,
    ) -> DatastoreResult<Vec<OrderSummary>> {
        self.0.orders_since(customer_id, since).await
    }

    async fn favorites(&self, customer_id: Uuid) -> DatastoreResult<Vec<Product>> {
        self.0.favorites(customer_id).await
    }

    async fn toggle_favorite(&self, customer_id: Uuid, product_id: Uuid) -> DatastoreResult<bool> {
        self.0.toggle_favorite(customer_id, product_id).await
    }
}

#[tokio::test]
async fn test_profile_save_failure_does_not_block_order() {
    let fx = Fixture::new().await;
    let mut session = fx.logged_in().await;
    let customer_id = session.customer.as_ref().map(|c| c.id).unwrap();
    session.cart.add(fx.product("Dipirona").await, 1);

    let submitter = OrderSubmitter::new(
        fx.store.clone(),
        Arc::new(ReadOnlyProfiles(fx.store.clone())),
        fx.store.clone(),
    );
    let receipt = submitter
        .submit(SLUG, &mut session, &fx.settings, &request(DeliveryMethod::Delivery, "Rua A, 10"))
        .await
        .unwrap();

    let stored = fx.store.order(receipt.order_id).unwrap();
    assert_eq!(stored.address.as_deref(), Some("Rua A, 10"));
    assert!(session.cart.is_empty());
    assert!(session.customer.as_ref().and_then(|c| c.address.as_ref()).is_none());
    assert!(fx.store.customer(customer_id).and_then(|c| c.address).is_none());
}
