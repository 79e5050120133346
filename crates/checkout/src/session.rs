//! Per-visitor session state: the identified customer and the cart.
//!
//! Loaded at the start of a request, passed explicitly through the call chain,
//! and written back at the end. Keys are scoped by tenant and session id.

use crate::cart::Cart;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_cache::{get_json, put_json, KeyValueStore};
use storefront_core::types::Customer;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub customer: Option<Customer>,
    pub cart: Cart,
}

impl Session {
    pub fn is_identified(&self) -> bool {
        self.customer.is_some()
    }
}

pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn cart_key(tenant_id: Uuid, session_id: &str) -> String {
        format!("session:{tenant_id}:{session_id}:cart")
    }

    fn user_key(tenant_id: Uuid, session_id: &str) -> String {
        format!("session:{tenant_id}:{session_id}:user")
    }

    /// Missing keys yield an empty session.
    pub async fn load(&self, tenant_id: Uuid, session_id: &str) -> anyhow::Result<Session> {
        let cart: Option<Cart> =
            get_json(self.kv.as_ref(), &Self::cart_key(tenant_id, session_id)).await?;
        let customer: Option<Customer> =
            get_json(self.kv.as_ref(), &Self::user_key(tenant_id, session_id)).await?;
        Ok(Session {
            customer,
            cart: cart.unwrap_or_default(),
        })
    }

    pub async fn save(
        &self,
        tenant_id: Uuid,
        session_id: &str,
        session: &Session,
    ) -> anyhow::Result<()> {
        put_json(
            self.kv.as_ref(),
            &Self::cart_key(tenant_id, session_id),
            &session.cart,
        )
        .await?;

        let user_key = Self::user_key(tenant_id, session_id);
        match &session.customer {
            Some(customer) => put_json(self.kv.as_ref(), &user_key, customer).await?,
            None => self.kv.remove(&user_key).await?,
        }
        debug!(tenant_id = %tenant_id, items = session.cart.count(), "Session saved");
        Ok(())
    }
}
