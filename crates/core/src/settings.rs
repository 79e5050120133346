//! Typed store configuration. Every default lives here; callers never patch in
//! their own fallbacks.

use crate::types::DeliveryMethod;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fee charged for home delivery when a fee is owed but none is configured.
pub const DEFAULT_DELIVERY_FEE: Decimal = Decimal::from_parts(590, 0, 0, false, 2);

/// Per-tenant store settings as returned by the data store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StoreSettings {
    #[serde(default)]
    pub pharmacy: PharmacyInfo,
    #[serde(default)]
    pub appearance: Appearance,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub vip: VipConfig,
    #[serde(default)]
    pub store: StorefrontContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PharmacyInfo {
    #[serde(default = "default_pharmacy_name")]
    pub name: String,
    #[serde(default)]
    pub cnpj: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub opening_hours: String,
    #[serde(default)]
    pub logo_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Appearance {
    #[serde(default = "default_primary_color")]
    pub primary_color: String,
    #[serde(default = "default_secondary_color")]
    pub secondary_color: String,
    #[serde(default = "default_border_radius")]
    pub border_radius: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryMethods {
    #[serde(default = "default_true")]
    pub delivery: bool,
    #[serde(default = "default_true")]
    pub pickup: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    #[default]
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub methods: DeliveryMethods,
    #[serde(default)]
    pub fee_type: FeeType,
    #[serde(default)]
    pub fixed_fee: Decimal,
    #[serde(default)]
    pub free_shipping_threshold: Decimal,
    #[serde(default)]
    pub minimum_order_value: Option<Decimal>,
}

impl DeliveryConfig {
    /// Configured free-shipping threshold. Zero or negative means "unset".
    pub fn free_shipping_threshold(&self) -> Option<Decimal> {
        Some(self.free_shipping_threshold).filter(|t| *t > Decimal::ZERO)
    }

    /// Fee charged when a delivery is not free.
    pub fn charged_fee(&self) -> Decimal {
        if self.fixed_fee > Decimal::ZERO {
            self.fixed_fee
        } else {
            DEFAULT_DELIVERY_FEE
        }
    }

    pub fn offers(&self, method: DeliveryMethod) -> bool {
        match method {
            DeliveryMethod::Delivery => self.methods.delivery,
            DeliveryMethod::Pickup => self.methods.pickup,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentConfig {
    #[serde(default = "default_true")]
    pub pix_enabled: bool,
    #[serde(default = "default_max_installments")]
    pub max_installments: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VipConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub discount_percentage: Decimal,
}

impl VipConfig {
    /// Discount percentage clamped to `[0, 100]`.
    pub fn effective_percentage(&self) -> Decimal {
        self.discount_percentage
            .max(Decimal::ZERO)
            .min(Decimal::ONE_HUNDRED)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StorefrontContent {
    #[serde(default)]
    pub welcome_message: String,
    #[serde(default = "default_welcome_bg")]
    pub welcome_message_bg_color: String,
    #[serde(default = "default_welcome_text")]
    pub welcome_message_text_color: String,
    #[serde(default)]
    pub banner_url: String,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_pharmacy_name() -> String {
    "Farma Store".to_string()
}
fn default_primary_color() -> String {
    "#10B981".to_string()
}
fn default_secondary_color() -> String {
    "#34D399".to_string()
}
fn default_border_radius() -> String {
    "0.5rem".to_string()
}
fn default_max_installments() -> u8 {
    1
}
fn default_welcome_bg() -> String {
    "#2563eb".to_string()
}
fn default_welcome_text() -> String {
    "#ffffff".to_string()
}

impl Default for PharmacyInfo {
    fn default() -> Self {
        Self {
            name: default_pharmacy_name(),
            cnpj: String::new(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
            opening_hours: String::new(),
            logo_url: String::new(),
        }
    }
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            primary_color: default_primary_color(),
            secondary_color: default_secondary_color(),
            border_radius: default_border_radius(),
        }
    }
}

impl Default for DeliveryMethods {
    fn default() -> Self {
        Self {
            delivery: true,
            pickup: true,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            methods: DeliveryMethods::default(),
            fee_type: FeeType::Fixed,
            fixed_fee: Decimal::ZERO,
            free_shipping_threshold: Decimal::ZERO,
            minimum_order_value: None,
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            pix_enabled: true,
            max_installments: default_max_installments(),
        }
    }
}

impl Default for StorefrontContent {
    fn default() -> Self {
        Self {
            welcome_message: String::new(),
            welcome_message_bg_color: default_welcome_bg(),
            welcome_message_text_color: default_welcome_text(),
            banner_url: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_object_yields_documented_defaults() {
        let settings: StoreSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, StoreSettings::default());
        assert_eq!(settings.pharmacy.name, "Farma Store");
        assert_eq!(settings.appearance.primary_color, "#10B981");
        assert!(settings.delivery.methods.delivery);
        assert!(settings.delivery.methods.pickup);
        assert!(settings.payment.pix_enabled);
        assert!(!settings.vip.enabled);
        assert_eq!(settings.delivery.free_shipping_threshold(), None);
    }

    #[test]
    fn test_partial_sections_fill_missing_fields() {
        let settings: StoreSettings = serde_json::from_str(
            r#"{"delivery": {"fixed_fee": "7.50", "free_shipping_threshold": 100}, "vip": {"enabled": true}}"#,
        )
        .unwrap();
        assert_eq!(settings.delivery.fixed_fee, dec!(7.50));
        assert_eq!(settings.delivery.free_shipping_threshold(), Some(dec!(100)));
        assert!(settings.delivery.methods.pickup);
        assert!(settings.vip.enabled);
        assert_eq!(settings.vip.discount_percentage, Decimal::ZERO);
    }

    #[test]
    fn test_unset_fee_charges_default() {
        let delivery = DeliveryConfig::default();
        assert_eq!(delivery.charged_fee(), dec!(5.90));

        let configured = DeliveryConfig {
            fixed_fee: dec!(8),
            ..Default::default()
        };
        assert_eq!(configured.charged_fee(), dec!(8));
    }

    #[test]
    fn test_vip_percentage_is_clamped() {
        let over = VipConfig {
            enabled: true,
            discount_percentage: dec!(150),
        };
        assert_eq!(over.effective_percentage(), dec!(100));

        let negative = VipConfig {
            enabled: true,
            discount_percentage: dec!(-5),
        };
        assert_eq!(negative.effective_percentage(), Decimal::ZERO);
    }
}
