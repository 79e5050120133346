use storefront_core::ValidationError;
use storefront_datastore::DatastoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Caught locally; nothing was sent anywhere.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Order creation failed. The store's message is surfaced as-is and the
    /// cart is left untouched.
    #[error("{0}")]
    Submission(DatastoreError),

    #[error("data store error: {0}")]
    Datastore(#[from] DatastoreError),

    #[error("session storage failed: {0}")]
    Session(#[from] anyhow::Error),
}
