pub mod config;
pub mod error;
pub mod generation;
pub mod money;
pub mod settings;
pub mod types;

pub use config::AppConfig;
pub use error::{StorefrontError, StorefrontResult, ValidationError};
pub use settings::StoreSettings;
