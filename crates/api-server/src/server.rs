//! API server: the storefront REST router plus the Prometheus exporter.

use crate::scope::{require_open, resolve_tenant};
use crate::state::AppState;
use crate::swagger::ApiDoc;
use crate::{account_rest, cart_rest, catalog_rest, checkout_rest, rest, storefront_rest};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use axum::Router;
use std::net::SocketAddr;
use storefront_core::config::AppConfig;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Routes bound to one store. Mounted under both `/v1` and `/s/:slug/v1`.
fn storefront_routes(state: &AppState) -> Router<AppState> {
    // Refused with the availability payload while the store is blocked.
    let gated = Router::new()
        // Catalog
        .route("/catalog/products", get(catalog_rest::handle_products))
        .route("/catalog/products/:id", get(catalog_rest::handle_product))
        .route("/catalog/offers", get(catalog_rest::handle_offers))
        .route("/settings", get(catalog_rest::handle_settings))
        // Cart
        .route(
            "/cart",
            get(cart_rest::handle_get_cart).delete(cart_rest::handle_clear_cart),
        )
        .route("/cart/items", post(cart_rest::handle_add_item))
        .route(
            "/cart/items/:product_id",
            patch(cart_rest::handle_update_item).delete(cart_rest::handle_remove_item),
        )
        // Account
        .route("/session/login", post(account_rest::handle_login))
        .route("/session/logout", post(account_rest::handle_logout))
        .route("/session/profile", patch(account_rest::handle_update_profile))
        .route("/orders", get(account_rest::handle_orders))
        .route("/cashback", get(account_rest::handle_cashback))
        .route("/favorites", get(account_rest::handle_favorites))
        .route(
            "/favorites/:product_id",
            post(account_rest::handle_toggle_favorite),
        )
        // Checkout
        .route("/checkout/quote", post(checkout_rest::handle_quote))
        .route("/checkout/orders", post(checkout_rest::handle_submit_order))
        .route_layer(from_fn_with_state(state.clone(), require_open));

    // Reachable in every tenant state.
    let open = Router::new()
        .route("/storefront", get(storefront_rest::handle_storefront))
        .route("/support/tickets", post(storefront_rest::handle_support_ticket))
        .route(
            "/billing/checkout-link",
            get(storefront_rest::handle_checkout_link),
        );

    gated
        .merge(open)
        .route_layer(from_fn_with_state(state.clone(), resolve_tenant))
}

/// Full application router.
pub fn router(state: AppState) -> Router {
    let scoped = storefront_routes(&state);

    Router::new()
        .nest("/v1", scoped.clone())
        .nest("/s/:slug/v1", scoped)
        // Provider callbacks carry no store context.
        .route(
            "/v1/billing/webhooks/:provider",
            post(storefront_rest::handle_webhook),
        )
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Main API server.
pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        if !self.config.metrics.enabled {
            info!("Metrics exporter disabled");
            return Ok(());
        }

        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use storefront_cache::{KeyValueStore, LocalCache};
    use storefront_datastore::{Datastore, InMemoryDatastore};
    use storefront_licensing::{
        LicenseAuthority, LicenseError, LicenseFeatures, LicenseRegistry, LicenseState,
        LicenseStatus,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    struct StaticAuthority {
        state: LicenseState,
        cashback: bool,
    }

    #[async_trait]
    impl LicenseAuthority for StaticAuthority {
        async fn fetch(&self, tenant_id: Uuid) -> Result<LicenseStatus, LicenseError> {
            Ok(LicenseStatus {
                status: self.state,
                plan: "Pro".into(),
                days_remaining: 20,
                features: LicenseFeatures {
                    cashback: self.cashback,
                    ..Default::default()
                },
                tenant_id: tenant_id.to_string(),
                tenant_name: "Demo".into(),
            })
        }
    }

    fn app_with(state: LicenseState, cashback: bool) -> (Router, Arc<InMemoryDatastore>) {
        app_with_kv(state, cashback, Arc::new(LocalCache::new(60, 1000)))
    }

    fn app_with_kv(
        state: LicenseState,
        cashback: bool,
        kv: Arc<dyn KeyValueStore>,
    ) -> (Router, Arc<InMemoryDatastore>) {
        let config = AppConfig::default();
        let memory = Arc::new(InMemoryDatastore::new());
        memory.seed_demo();
        let licenses = LicenseRegistry::new(
            Arc::new(StaticAuthority { state, cashback }),
            kv.clone(),
            config.licensing.clone(),
        )
        .without_background_refresh();
        let app_state = AppState::new(
            &config,
            Datastore::from_backend(Arc::clone(&memory)),
            kv,
            licenses,
        );
        (router(app_state), memory)
    }

    fn app() -> Router {
        app_with(LicenseState::Active, true).0
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-session-id", "sess-1")
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-session-id", "sess-1")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn decimal(value: &Value) -> Decimal {
        serde_json::from_value(value.clone()).unwrap()
    }

    async fn first_product_id(app: &Router) -> String {
        let (_, products) = send(app, get_req("/v1/catalog/products?tenant=farmavida")).await;
        products[0]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unknown_store_is_not_found() {
        let (status, body) = send(&app(), get_req("/v1/catalog/products?tenant=nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "store_not_found");

        let (status, _) = send(&app(), get_req("/v1/storefront")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_catalog_by_query_and_path_prefix() {
        let app = app();
        let (status, products) = send(&app, get_req("/v1/catalog/products?tenant=farmavida")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(products.as_array().unwrap().len(), 3);

        let (status, products) = send(&app, get_req("/s/farmavida/v1/catalog/products")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(products.as_array().unwrap().len(), 3);

        let (status, storefront) = send(&app, get_req("/s/farmavida/v1/storefront")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(storefront["resolved_from"], "path");
    }

    #[tokio::test]
    async fn test_suspended_store_is_gated_but_storefront_stays_open() {
        let app = app();
        let (status, body) = send(&app, get_req("/v1/catalog/products?tenant=saude-mais")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "storefront_blocked");
        assert_eq!(body["availability"]["state"], "blocked_by_tenant");
        assert_eq!(body["availability"]["support_available"], true);

        let (status, body) = send(&app, get_req("/v1/storefront?tenant=saude-mais")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["store"]["slug"], "saude-mais");
        assert_eq!(body["availability"]["state"], "blocked_by_tenant");
    }

    #[tokio::test]
    async fn test_blocked_license_makes_store_unavailable() {
        let (app, _) = app_with(LicenseState::Blocked, true);
        let (status, body) = send(&app, get_req("/v1/cart?tenant=farmavida")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["availability"]["state"], "unavailable");
        assert_eq!(
            body["availability"]["reason"],
            "Esta loja está temporariamente indisponível."
        );
    }

    #[tokio::test]
    async fn test_session_header_required() {
        let req = Request::builder()
            .uri("/v1/cart?tenant=farmavida")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_session");
    }

    #[tokio::test]
    async fn test_cart_round_trip_through_session() {
        let app = app();
        let product_id = first_product_id(&app).await;

        let (status, cart) = send(
            &app,
            post_json(
                "/v1/cart/items?tenant=farmavida",
                json!({ "product_id": product_id, "quantity": 2 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["count"], 2);

        let (_, cart) = send(&app, get_req("/v1/cart?tenant=farmavida")).await;
        assert_eq!(cart["count"], 2);
        assert_eq!(decimal(&cart["subtotal"]), Decimal::new(2580, 2));

        let (status, cart) = send(&app, get_req("/s/farmavida/v1/cart")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["count"], 2);
    }

    #[tokio::test]
    async fn test_past_due_store_offers_billing_link() {
        let (status, body) = send(&app(), get_req("/v1/cart?tenant=drogaria-central")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let link = body["availability"]["billing_link"].as_str().unwrap();
        assert!(link.contains("/billing/checkout?tenantId="));
        assert!(link.contains("planId=plan_pro"));
    }

    #[tokio::test]
    async fn test_quote_ignores_cashback_when_not_licensed() {
        let (app, _) = app_with(LicenseState::Active, false);
        let product_id = first_product_id(&app).await;
        send(
            &app,
            post_json(
                "/v1/cart/items?tenant=farmavida",
                json!({ "product_id": product_id }),
            ),
        )
        .await;

        let (status, quote) = send(
            &app,
            post_json(
                "/v1/checkout/quote?tenant=farmavida",
                json!({ "delivery_method": "delivery", "apply_cashback": true }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decimal(&quote["cashback_discount"]), Decimal::ZERO);
        assert_eq!(decimal(&quote["total"]), Decimal::new(1880, 2));

        let (status, body) = send(&app, get_req("/v1/cashback?tenant=farmavida")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "feature_disabled");
    }

    #[tokio::test]
    async fn test_login_and_submit_order() {
        let (app, memory) = app_with(LicenseState::Active, true);
        let product_id = first_product_id(&app).await;

        let (status, customer) = send(
            &app,
            post_json(
                "/v1/session/login?tenant=farmavida",
                json!({ "name": "Ana", "phone": "(11) 98765-4321" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(customer["name"], "Ana");

        send(
            &app,
            post_json(
                "/v1/cart/items?tenant=farmavida",
                json!({ "product_id": product_id }),
            ),
        )
        .await;

        let (status, receipt) = send(
            &app,
            post_json(
                "/v1/checkout/orders?tenant=farmavida",
                json!({
                    "delivery_method": "pickup",
                    "payment_method": "pix",
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(decimal(&receipt["pricing"]["total"]), Decimal::new(1290, 2));
        assert_eq!(memory.order_count(), 1);

        let (_, cart) = send(&app, get_req("/v1/cart?tenant=farmavida")).await;
        assert_eq!(cart["count"], 0);
    }

    #[tokio::test]
    async fn test_checkout_requires_identified_customer() {
        let app = app();
        let product_id = first_product_id(&app).await;
        send(
            &app,
            post_json(
                "/v1/cart/items?tenant=farmavida",
                json!({ "product_id": product_id }),
            ),
        )
        .await;

        let (status, body) = send(
            &app,
            post_json(
                "/v1/checkout/orders?tenant=farmavida",
                json!({ "delivery_method": "pickup", "payment_method": "cash" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_failed");
    }

    #[tokio::test]
    async fn test_webhook_for_unknown_provider() {
        let req = Request::builder()
            .method("POST")
            .uri("/v1/billing/webhooks/paypal")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(&app(), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown_provider");
    }

    /// Local cache whose writes can be switched off mid-test.
    struct FlakyCache {
        inner: LocalCache,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyCache {
        async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                anyhow::bail!("cache unavailable");
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> anyhow::Result<()> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn test_order_confirmed_when_session_save_fails() {
        let cache = Arc::new(FlakyCache {
            inner: LocalCache::new(60, 1000),
            fail_writes: AtomicBool::new(false),
        });
        let (app, memory) = app_with_kv(LicenseState::Active, true, cache.clone());
        let product_id = first_product_id(&app).await;

        send(
            &app,
            post_json(
                "/v1/session/login?tenant=farmavida",
                json!({ "name": "Ana", "phone": "(11) 98765-4321" }),
            ),
        )
        .await;
        send(
            &app,
            post_json(
                "/v1/cart/items?tenant=farmavida",
                json!({ "product_id": product_id }),
            ),
        )
        .await;

        cache.fail_writes.store(true, Ordering::SeqCst);
        let (status, receipt) = send(
            &app,
            post_json(
                "/v1/checkout/orders?tenant=farmavida",
                json!({
                    "delivery_method": "pickup",
                    "payment_method": "pix",
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(receipt["order_id"].is_string());
        assert_eq!(memory.order_count(), 1);
    }
}
