//! Session cart. A line never holds a zero quantity: anything that would bring
//! it to zero removes it instead.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_core::types::Product;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn unit_price(&self) -> Decimal {
        self.product.effective_price()
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    #[serde(default)]
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn get(&self, product_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product.id == product_id)
    }

    /// Add `quantity` units, merging with an existing line. The stored product
    /// snapshot is refreshed.
    pub fn add(&mut self, product: Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.items.iter_mut().find(|i| i.product.id == product.id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(quantity);
                item.product = product;
            }
            None => self.items.push(CartItem { product, quantity }),
        }
    }

    pub fn remove(&mut self, product_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product.id != product_id);
        self.items.len() != before
    }

    /// Change a line by `delta` units. Returns `false` when the product is not
    /// in the cart.
    pub fn update_quantity(&mut self, product_id: Uuid, delta: i64) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.product.id == product_id) else {
            return false;
        };
        let next = i64::from(item.quantity).saturating_add(delta);
        if next <= 0 {
            self.remove(product_id);
        } else {
            item.quantity = u32::try_from(next).unwrap_or(u32::MAX);
        }
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units.
    pub fn count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(price: Decimal, promo: Option<Decimal>) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Item".into(),
            description: String::new(),
            price,
            promotional_price: promo,
            category: String::new(),
            image: String::new(),
            requires_prescription: false,
            stock: 10,
        }
    }

    #[test]
    fn test_add_merges_lines() {
        let mut cart = Cart::new();
        let p = product(dec!(10), None);
        cart.add(p.clone(), 1);
        cart.add(p.clone(), 2);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.count(), 3);

        cart.add(p, 0);
        assert_eq!(cart.count(), 3);
    }

    #[test]
    fn test_decrement_past_one_removes_item() {
        let mut cart = Cart::new();
        let p = product(dec!(10), None);
        cart.add(p.clone(), 1);

        assert!(cart.update_quantity(p.id, -1));
        assert!(cart.is_empty());
        assert!(cart.get(p.id).is_none());

        cart.add(p.clone(), 2);
        assert!(cart.update_quantity(p.id, -5));
        assert!(cart.is_empty());

        assert!(!cart.update_quantity(p.id, 1));
    }

    #[test]
    fn test_increment_and_remove() {
        let mut cart = Cart::new();
        let p = product(dec!(10), None);
        cart.add(p.clone(), 1);
        cart.update_quantity(p.id, 2);
        assert_eq!(cart.get(p.id).map(|i| i.quantity), Some(3));

        assert!(cart.remove(p.id));
        assert!(!cart.remove(p.id));
    }

    #[test]
    fn test_subtotal_uses_effective_price() {
        let mut cart = Cart::new();
        cart.add(product(dec!(10), Some(dec!(8))), 2);
        cart.add(product(dec!(12.5), Some(dec!(0))), 1);
        assert_eq!(cart.subtotal(), dec!(28.5));
    }
}
