use crate::error::ApiError;
use crate::scope::TenantScope;
use std::sync::Arc;
use std::time::Instant;
use storefront_billing::ProviderFactory;
use storefront_cache::KeyValueStore;
use storefront_checkout::{AccountService, CheckoutError, OrderSubmitter, Session, SessionStore};
use storefront_core::config::{AppConfig, BillingConfig};
use storefront_datastore::Datastore;
use storefront_licensing::LicenseRegistry;
use storefront_tenancy::{AccessGuard, SlugChain, SupportTicketService, TenantResolver};

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub node_id: String,
    pub start_time: Instant,
    pub resolver: Arc<TenantResolver>,
    pub guard: AccessGuard,
    pub licenses: Arc<LicenseRegistry>,
    pub datastore: Datastore,
    pub sessions: Arc<SessionStore>,
    pub accounts: Arc<AccountService>,
    pub orders: Arc<OrderSubmitter>,
    pub support: Arc<SupportTicketService>,
    pub payments: Arc<ProviderFactory>,
    pub billing: Arc<BillingConfig>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        datastore: Datastore,
        kv: Arc<dyn KeyValueStore>,
        licenses: LicenseRegistry,
    ) -> Self {
        Self {
            node_id: config.node_id.clone(),
            start_time: Instant::now(),
            resolver: Arc::new(TenantResolver::new(
                SlugChain::from_config(&config.tenancy),
                Arc::clone(&datastore.tenants),
            )),
            guard: AccessGuard::new(),
            licenses: Arc::new(licenses),
            sessions: Arc::new(SessionStore::new(kv)),
            accounts: Arc::new(AccountService::new(
                Arc::clone(&datastore.customers),
                Arc::clone(&datastore.wallets),
            )),
            orders: Arc::new(OrderSubmitter::new(
                Arc::clone(&datastore.orders),
                Arc::clone(&datastore.customers),
                Arc::clone(&datastore.wallets),
            )),
            support: Arc::new(SupportTicketService::new(Arc::clone(&datastore.support))),
            payments: Arc::new(ProviderFactory::new(&config.billing)),
            billing: Arc::new(config.billing.clone()),
            datastore,
        }
    }

    pub async fn load_session(
        &self,
        scope: &TenantScope,
        session_id: &str,
    ) -> Result<Session, ApiError> {
        self.sessions
            .load(scope.tenant.id, session_id)
            .await
            .map_err(|e| CheckoutError::Session(e).into())
    }

    pub async fn save_session(
        &self,
        scope: &TenantScope,
        session_id: &str,
        session: &Session,
    ) -> Result<(), ApiError> {
        self.sessions
            .save(scope.tenant.id, session_id, session)
            .await
            .map_err(|e| CheckoutError::Session(e).into())
    }
}
