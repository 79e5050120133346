//! Cart, pricing, customer session, and order submission for one tenant's
//! storefront.

#![warn(clippy::unwrap_used)]

pub mod account;
pub mod cart;
pub mod error;
pub mod order;
pub mod pricing;
pub mod session;

pub use account::{normalize_phone, AccountService, WalletView};
pub use cart::{Cart, CartItem};
pub use error::CheckoutError;
pub use order::{CheckoutRequest, OrderReceipt, OrderSubmitter};
pub use pricing::{PricingBreakdown, PricingEngine, PricingInput};
pub use session::{Session, SessionStore};
