#![warn(clippy::unwrap_used)]

pub mod account_rest;
pub mod cart_rest;
pub mod catalog_rest;
pub mod checkout_rest;
pub mod error;
pub mod rest;
pub mod scope;
pub mod server;
pub mod state;
pub mod storefront_rest;
pub mod swagger;

pub use server::{router, ApiServer};
pub use state::AppState;
pub use swagger::ApiDoc;
