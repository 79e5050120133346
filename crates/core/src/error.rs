use thiserror::Error;

pub type StorefrontResult<T> = Result<T, StorefrontError>;

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Input problems caught before any network call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("a delivery address is required for home delivery")]
    MissingAddress,

    #[error("phone number must contain 11 digits including area code")]
    InvalidPhone,

    #[error("the cart is empty")]
    EmptyCart,

    #[error("customer is not identified; log in first")]
    NotIdentified,

    #[error("field `{0}` must not be empty")]
    MissingField(&'static str),

    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),

    #[error("delivery method `{0}` is not offered by this store")]
    DeliveryMethodUnavailable(String),
}
