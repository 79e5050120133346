//! Order submission: validate, price, create atomically, then settle cashback.

use crate::error::CheckoutError;
use crate::pricing::{PricingBreakdown, PricingEngine, PricingInput};
use crate::session::Session;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::money::format_brl;
use storefront_core::settings::StoreSettings;
use storefront_core::types::{DeliveryMethod, NewOrder, PaymentMethod, ProfileUpdate};
use storefront_core::ValidationError;
use storefront_datastore::{CustomerStore, OrderStore, WalletStore};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub complement: Option<String>,
    #[serde(default)]
    pub apply_cashback: bool,
}

impl CheckoutRequest {
    /// Address with the complement appended as `"address - complement"`.
    pub fn full_address(&self) -> String {
        let address = self.address.trim();
        match self.complement.as_deref().map(str::trim) {
            Some(complement) if !complement.is_empty() && !address.is_empty() => {
                format!("{address} - {complement}")
            }
            _ => address.to_string(),
        }
    }

    fn validate(&self, session: &Session, settings: &StoreSettings) -> Result<(), ValidationError> {
        if session.cart.is_empty() {
            return Err(ValidationError::EmptyCart);
        }
        if !session.is_identified() {
            return Err(ValidationError::NotIdentified);
        }
        if !settings.delivery.offers(self.delivery_method) {
            return Err(ValidationError::DeliveryMethodUnavailable(
                self.delivery_method.as_str().to_string(),
            ));
        }
        if self.delivery_method == DeliveryMethod::Delivery && self.address.trim().is_empty() {
            return Err(ValidationError::MissingAddress);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderReceipt {
    pub order_id: Uuid,
    /// Display-rounded breakdown of what was charged.
    pub pricing: PricingBreakdown,
    /// Set when the order went through but the cashback debit did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashback_warning: Option<String>,
}

pub struct OrderSubmitter {
    orders: Arc<dyn OrderStore>,
    customers: Arc<dyn CustomerStore>,
    wallets: Arc<dyn WalletStore>,
}

impl OrderSubmitter {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        customers: Arc<dyn CustomerStore>,
        wallets: Arc<dyn WalletStore>,
    ) -> Self {
        Self {
            orders,
            customers,
            wallets,
        }
    }

    async fn wallet_balance(&self, session: &Session, apply_cashback: bool) -> Decimal {
        let Some(customer) = session.customer.as_ref().filter(|_| apply_cashback) else {
            return Decimal::ZERO;
        };
        match self.wallets.wallet(customer.id).await {
            Ok(wallet) => wallet.available(),
            Err(e) => {
                warn!(customer_id = %customer.id, error = %e, "Wallet unavailable, pricing without cashback");
                Decimal::ZERO
            }
        }
    }

    /// Full-precision breakdown for the current cart.
    pub async fn quote(
        &self,
        session: &Session,
        settings: &StoreSettings,
        delivery_method: DeliveryMethod,
        apply_cashback: bool,
    ) -> PricingBreakdown {
        let wallet_balance = self.wallet_balance(session, apply_cashback).await;
        PricingEngine::quote(&PricingInput {
            cart: &session.cart,
            settings,
            customer: session.customer.as_ref(),
            delivery_method,
            apply_cashback,
            wallet_balance,
        })
    }

    /// Submit the session's cart as an order. The cart is cleared only once the
    /// order exists; a cashback debit failure after that is reported on the
    /// receipt and does not undo the order.
    pub async fn submit(
        &self,
        slug: &str,
        session: &mut Session,
        settings: &StoreSettings,
        request: &CheckoutRequest,
    ) -> Result<OrderReceipt, CheckoutError> {
        request.validate(session, settings)?;
        let customer = session
            .customer
            .clone()
            .ok_or(ValidationError::NotIdentified)?;

        let address = request.full_address();
        if !address.is_empty() && customer.address.as_deref() != Some(address.as_str()) {
            let update = ProfileUpdate::address(address.clone());
            match self.customers.update_profile(customer.id, &update).await {
                Ok(()) => {
                    if let Some(c) = session.customer.as_mut() {
                        update.apply_to(c);
                    }
                }
                Err(e) => {
                    warn!(customer_id = %customer.id, error = %e, "Could not save address to profile");
                }
            }
        }

        let pricing = self
            .quote(
                session,
                settings,
                request.delivery_method,
                request.apply_cashback,
            )
            .await;
        let items = PricingEngine::line_prices(&session.cart, pricing.vip_percentage);

        let order = NewOrder {
            customer_id: customer.id,
            customer_name: customer.name.clone(),
            customer_phone: customer.phone.clone(),
            address,
            items,
            total: pricing.total,
            payment_method: request.payment_method,
            delivery_method: request.delivery_method,
            delivery_fee: pricing.delivery_fee,
            cashback_applied: pricing.cashback_discount,
        };

        let order_id = match self.orders.create_order(slug, &order).await {
            Ok(id) => id,
            Err(e) => {
                warn!(slug = %slug, customer_id = %customer.id, error = %e, "Order creation failed");
                metrics::counter!("checkout.orders_failed").increment(1);
                return Err(CheckoutError::Submission(e));
            }
        };

        let mut cashback_warning = None;
        if pricing.cashback_discount > Decimal::ZERO {
            let failure = match self
                .wallets
                .debit(order_id, customer.id, pricing.cashback_discount)
                .await
            {
                Ok(true) => None,
                Ok(false) => Some("o saldo de cashback não pôde ser debitado".to_string()),
                Err(e) => Some(e.to_string()),
            };
            if let Some(reason) = failure {
                warn!(order_id = %order_id, customer_id = %customer.id, reason = %reason, "Cashback debit failed");
                metrics::counter!("checkout.cashback_debit_failed").increment(1);
                cashback_warning = Some(format!(
                    "Pedido criado, mas o cashback não foi aplicado: {reason}"
                ));
            }
        }

        session.cart.clear();
        info!(
            slug = %slug,
            order_id = %order_id,
            customer_id = %customer.id,
            total = %format_brl(pricing.total),
            "Order submitted"
        );
        metrics::counter!("checkout.orders_created").increment(1);

        Ok(OrderReceipt {
            order_id,
            pricing: pricing.display(),
            cashback_warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: DeliveryMethod, address: &str, complement: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            delivery_method: method,
            payment_method: PaymentMethod::Pix,
            address: address.into(),
            complement: complement.map(Into::into),
            apply_cashback: false,
        }
    }

    #[test]
    fn test_full_address_joins_complement() {
        let r = request(DeliveryMethod::Delivery, "Rua A, 10", Some("Apto 3"));
        assert_eq!(r.full_address(), "Rua A, 10 - Apto 3");

        let r = request(DeliveryMethod::Delivery, "Rua A, 10", Some("  "));
        assert_eq!(r.full_address(), "Rua A, 10");

        let r = request(DeliveryMethod::Pickup, "", Some("Apto 3"));
        assert_eq!(r.full_address(), "");
    }

    #[test]
    fn test_validation_order() {
        let settings = StoreSettings::default();
        let session = Session::default();
        let r = request(DeliveryMethod::Delivery, "", None);
        assert_eq!(r.validate(&session, &settings), Err(ValidationError::EmptyCart));
    }
}
