//! Data/RPC boundary of the storefront: the calls the core makes against the
//! tenant-isolated data store, plus two implementations (in-memory for
//! development and tests, PostgREST-style RPC for hosted deployments).

#![warn(clippy::unwrap_used)]

pub mod error;
pub mod memory;
pub mod rest;
pub mod store;

pub use error::{DatastoreError, DatastoreResult};
pub use memory::InMemoryDatastore;
pub use rest::RestDatastore;
pub use store::{
    recent_orders, settings_or_default, CatalogStore, CustomerStore, Datastore, OrderStore,
    SupportDesk, TenantDirectory, WalletStore, ORDER_HISTORY_MONTHS,
};
