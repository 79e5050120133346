//! Customer identification and the customer-facing account surfaces:
//! profile, order history, favorites, cashback wallet.

use crate::error::CheckoutError;
use crate::session::Session;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use storefront_core::types::{
    CashbackTransaction, CashbackWallet, Customer, OrderSummary, Product, ProfileUpdate,
};
use storefront_core::ValidationError;
use storefront_datastore::{recent_orders, CustomerStore, WalletStore};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const PHONE_DIGITS: usize = 11;

/// Strip formatting and require exactly 11 digits (area code + number).
pub fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == PHONE_DIGITS {
        Ok(digits)
    } else {
        Err(ValidationError::InvalidPhone)
    }
}

fn validate_update(update: &ProfileUpdate) -> Result<(), ValidationError> {
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
    }
    if let Some(email) = &update.email {
        let valid = email
            .split_once('@')
            .map(|(user, domain)| !user.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !valid {
            return Err(ValidationError::InvalidEmail(email.clone()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletView {
    pub wallet: CashbackWallet,
    pub transactions: Vec<CashbackTransaction>,
}

pub struct AccountService {
    customers: Arc<dyn CustomerStore>,
    wallets: Arc<dyn WalletStore>,
}

impl AccountService {
    pub fn new(customers: Arc<dyn CustomerStore>, wallets: Arc<dyn WalletStore>) -> Self {
        Self { customers, wallets }
    }

    /// Passwordless login by phone. A known phone logs straight in; a new one
    /// needs a name to register.
    pub async fn login(
        &self,
        slug: &str,
        session: &mut Session,
        name: Option<&str>,
        phone: &str,
    ) -> Result<Customer, CheckoutError> {
        let phone = normalize_phone(phone)?;

        let customer = match self.customers.find_by_phone(slug, &phone).await? {
            Some(existing) => existing,
            None => {
                let name = name
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or(ValidationError::MissingField("name"))?;
                self.customers.login_or_register(slug, name, &phone).await?
            }
        };

        info!(slug = %slug, customer_id = %customer.id, "Customer logged in");
        metrics::counter!("checkout.logins").increment(1);
        session.customer = Some(customer.clone());
        Ok(customer)
    }

    /// Forget the customer; the cart stays.
    pub fn logout(&self, session: &mut Session) {
        session.customer = None;
    }

    fn current(session: &Session) -> Result<&Customer, ValidationError> {
        session.customer.as_ref().ok_or(ValidationError::NotIdentified)
    }

    pub async fn update_profile(
        &self,
        session: &mut Session,
        update: &ProfileUpdate,
    ) -> Result<Customer, CheckoutError> {
        let customer_id = Self::current(session)?.id;
        validate_update(update)?;
        if !update.is_empty() {
            self.customers.update_profile(customer_id, update).await?;
        }

        let customer = session
            .customer
            .as_mut()
            .ok_or(ValidationError::NotIdentified)?;
        update.apply_to(customer);
        Ok(customer.clone())
    }

    pub async fn order_history(&self, session: &Session) -> Result<Vec<OrderSummary>, CheckoutError> {
        let customer = Self::current(session)?;
        Ok(recent_orders(self.customers.as_ref(), customer.id, Utc::now()).await?)
    }

    pub async fn favorites(&self, session: &Session) -> Result<Vec<Product>, CheckoutError> {
        let customer = Self::current(session)?;
        Ok(self.customers.favorites(customer.id).await?)
    }

    pub async fn toggle_favorite(
        &self,
        session: &Session,
        product_id: Uuid,
    ) -> Result<bool, CheckoutError> {
        let customer = Self::current(session)?;
        Ok(self.customers.toggle_favorite(customer.id, product_id).await?)
    }

    /// Balance and ledger. A failed ledger read still returns the balance.
    pub async fn wallet(&self, session: &Session) -> Result<WalletView, CheckoutError> {
        let customer = Self::current(session)?;
        let wallet = self.wallets.wallet(customer.id).await?;
        let transactions = match self.wallets.transactions(customer.id).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(customer_id = %customer.id, error = %e, "Cashback ledger unavailable");
                Vec::new()
            }
        };
        Ok(WalletView {
            wallet,
            transactions,
        })
    }
}
