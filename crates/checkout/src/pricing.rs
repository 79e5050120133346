//! Cart pricing. Pure and synchronous; every step works at full decimal
//! precision and only [`PricingBreakdown::display`] rounds.
//!
//! Order of operations:
//! 1. subtotal from effective unit prices
//! 2. VIP discount on the subtotal
//! 3. delivery fee, judged against the pre-VIP subtotal
//! 4. partial total = subtotal - VIP discount + delivery fee
//! 5. cashback, capped at the partial total
//! 6. total

use crate::cart::Cart;
use rust_decimal::Decimal;
use serde::Serialize;
use storefront_core::money::{percent_of, round_display};
use storefront_core::settings::StoreSettings;
use storefront_core::types::{Customer, DeliveryMethod, OrderLine};
use utoipa::ToSchema;

pub struct PricingInput<'a> {
    pub cart: &'a Cart,
    pub settings: &'a StoreSettings,
    pub customer: Option<&'a Customer>,
    pub delivery_method: DeliveryMethod,
    pub apply_cashback: bool,
    pub wallet_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PricingBreakdown {
    pub subtotal: Decimal,
    pub is_vip: bool,
    pub vip_percentage: Decimal,
    pub vip_discount: Decimal,
    pub delivery_fee: Decimal,
    pub free_shipping_threshold: Option<Decimal>,
    pub partial_total: Decimal,
    pub cashback_discount: Decimal,
    pub total: Decimal,
    pub can_checkout: bool,
}

impl PricingBreakdown {
    /// Same breakdown with every amount rounded to cents.
    pub fn display(&self) -> Self {
        Self {
            subtotal: round_display(self.subtotal),
            vip_discount: round_display(self.vip_discount),
            delivery_fee: round_display(self.delivery_fee),
            free_shipping_threshold: self.free_shipping_threshold.map(round_display),
            partial_total: round_display(self.partial_total),
            cashback_discount: round_display(self.cashback_discount),
            total: round_display(self.total),
            ..self.clone()
        }
    }
}

pub struct PricingEngine;

impl PricingEngine {
    /// VIP percentage for this customer, 0 when the customer is anonymous,
    /// not tagged VIP, or the store has VIP pricing off.
    pub fn vip_percentage(settings: &StoreSettings, customer: Option<&Customer>) -> Decimal {
        match customer {
            Some(c) if c.is_vip() && settings.vip.enabled => settings.vip.effective_percentage(),
            _ => Decimal::ZERO,
        }
    }

    pub fn delivery_fee(
        settings: &StoreSettings,
        method: DeliveryMethod,
        subtotal: Decimal,
    ) -> Decimal {
        if method == DeliveryMethod::Pickup {
            return Decimal::ZERO;
        }
        match settings.delivery.free_shipping_threshold() {
            None => Decimal::ZERO,
            Some(threshold) if subtotal >= threshold => Decimal::ZERO,
            Some(_) => settings.delivery.charged_fee(),
        }
    }

    pub fn quote(input: &PricingInput<'_>) -> PricingBreakdown {
        let subtotal = input.cart.subtotal();
        let vip_percentage = Self::vip_percentage(input.settings, input.customer);
        let is_vip =
            input.settings.vip.enabled && input.customer.map(Customer::is_vip).unwrap_or(false);
        let vip_discount = percent_of(subtotal, vip_percentage);

        let delivery_fee = if input.cart.is_empty() {
            Decimal::ZERO
        } else {
            Self::delivery_fee(input.settings, input.delivery_method, subtotal)
        };
        let partial_total = subtotal - vip_discount + delivery_fee;

        let cashback_discount = if input.apply_cashback {
            input.wallet_balance.max(Decimal::ZERO).min(partial_total)
        } else {
            Decimal::ZERO
        };

        PricingBreakdown {
            subtotal,
            is_vip,
            vip_percentage,
            vip_discount,
            delivery_fee,
            free_shipping_threshold: input.settings.delivery.free_shipping_threshold(),
            partial_total,
            cashback_discount,
            total: partial_total - cashback_discount,
            can_checkout: !input.cart.is_empty(),
        }
    }

    /// Unit price after the VIP discount.
    pub fn vip_unit_price(unit_price: Decimal, vip_percentage: Decimal) -> Decimal {
        unit_price - percent_of(unit_price, vip_percentage)
    }

    /// Order lines with the VIP discount applied per unit.
    pub fn line_prices(cart: &Cart, vip_percentage: Decimal) -> Vec<OrderLine> {
        cart.items()
            .iter()
            .map(|item| OrderLine {
                product_id: item.product.id,
                quantity: item.quantity,
                price: Self::vip_unit_price(item.unit_price(), vip_percentage),
            })
            .collect()
    }
}
